mod error;
mod manage;
mod service;
pub mod types;
mod verify;

pub use error::DocumentError;
pub use service::{DocumentService, DEFAULT_LIST_LIMIT};
pub use verify::{VerificationResolver, VerificationResult, VerifyError};

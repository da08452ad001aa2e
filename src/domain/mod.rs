pub mod codec;
pub mod config;
pub mod document;
pub mod session;
pub mod token;
pub mod value;

pub use config::{DocumentConfig, DocumentType};
pub use document::{fields, Document, DocumentStatus};
pub use session::Session;
pub use value::{Record, Timestamp, Value};

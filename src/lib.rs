pub mod application;
pub mod config;
pub mod domain;
pub mod handlers;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{DocumentError, DocumentService, VerificationResolver, VerificationResult, VerifyError};
pub use config::AppConfig;
pub use domain::{Document, DocumentConfig, DocumentStatus, DocumentType, Record, Session, Value};
pub use infrastructure::database::{DocumentStore, SqliteStore, StoreError};

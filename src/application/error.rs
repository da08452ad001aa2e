use crate::infrastructure::database::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("You must be signed in to perform this action")]
    Unauthenticated,

    #[error("Document {0} not found")]
    NotFound(String),

    #[error("You do not have permission to modify document {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Document {id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("{message}")]
    Persistence {
        message: &'static str,
        #[source]
        source: StoreError,
    },
}

use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, TavleError>;

#[derive(Debug, Error)]
pub enum TavleError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No parent selected")]
    NoParentSelected,

    #[error("Row not found: {0}")]
    RowNotFound(Uuid),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

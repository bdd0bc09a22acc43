use thiserror::Error;

use crate::naming::quote;

#[derive(Debug, Error)]
pub enum GenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unknown option cr:{0}")]
    UnknownOption(String),

    #[error("Cannot render type {} in this position", quote(.0))]
    UnrenderableType(String),

    #[error("Malformed constant: expected {expected} for type {ty}, found {found}")]
    MalformedConstant {
        ty:       String,
        expected: &'static str,
        found:    &'static str,
    },

    #[error("Type error: {} has no field {}", quote(.ty), quote(.field))]
    UnknownField {
        ty:    String,
        field: String,
    },

    #[error("Unresolved type reference {}", quote(.0))]
    UnresolvedType(String),
}

pub type Result<T> = std::result::Result<T, GenError>;

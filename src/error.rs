use thiserror::Error;

use crate::data::{EquipmentType, Token};
use crate::gate::Stage;

/// Errors surfaced by the bridge.
///
/// Nothing here is retried internally. A cursor running out of items is not
/// an error and never appears as one of these variants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// The engine returned its failure code; `message` is the text read from
    /// the error side-channel right after the call.
    #[error("{operation}: native failure: {message}")]
    NativeFailure {
        operation: &'static str,
        message: String,
    },

    /// A result query was attempted before the fault run / pick it depends on.
    /// Raised without calling the engine.
    #[error("{operation}: {required}")]
    State {
        operation: &'static str,
        required: Stage,
    },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("no array length known for equipment type {equipment}, token {token}")]
    Schema { equipment: EquipmentType, token: Token },

    #[error("token {0} has no known field kind")]
    UnknownToken(Token),

    /// A lookup composed from several engine calls found nothing.
    #[error("{operation}: not found: {what}")]
    NotFound {
        operation: &'static str,
        what: String,
    },

    #[error("{operation}: invalid argument: {reason}")]
    InvalidArgument {
        operation: &'static str,
        reason: String,
    },

    /// The native library could not be loaded or is missing a procedure.
    /// A session cannot exist without it.
    #[error("failed to load native library: {0}")]
    LibraryLoad(String),
}

impl BridgeError {
    pub(crate) fn native(operation: &'static str, message: impl Into<String>) -> Self {
        BridgeError::NativeFailure {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn invalid(operation: &'static str, reason: impl Into<String>) -> Self {
        BridgeError::InvalidArgument {
            operation,
            reason: reason.into(),
        }
    }

    /// True for errors produced by the engine itself rather than by local checks.
    pub fn is_native(&self) -> bool {
        matches!(self, BridgeError::NativeFailure { .. })
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

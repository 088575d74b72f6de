use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaccError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl WaccError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        WaccError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Decimal arithmetic left the representable range.
    pub(crate) fn overflow(field: &str) -> Self {
        WaccError::invalid(field, "Arithmetic overflow: input magnitude out of range")
    }

    /// True for both `InvalidInput` and its `DivisionByZero` specialisation.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            WaccError::InvalidInput { .. } | WaccError::DivisionByZero { .. }
        )
    }
}

impl From<serde_json::Error> for WaccError {
    fn from(e: serde_json::Error) -> Self {
        WaccError::SerializationError(e.to_string())
    }
}

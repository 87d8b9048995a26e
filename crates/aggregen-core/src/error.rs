use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured compile-time error with a stable internal classification.
/// Raised when two compiler phases disagree about a contract (operand
/// arity, operand types, layout state). Not recoverable by the caller.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    /// Construct an InternalError.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct an aggregation-origin invariant violation.
    pub(crate) fn aggregation_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Aggregation,
            message.into(),
        )
    }

    /// Construct a storage-origin invariant violation.
    pub(crate) fn storage_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Storage,
            message.into(),
        )
    }

    /// Construct a codegen-origin invariant violation.
    pub(crate) fn codegen_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Codegen,
            message.into(),
        )
    }

    /// Construct a codegen-origin unsupported error.
    pub(crate) fn codegen_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Codegen, message.into())
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for compile-time classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for compile-time classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Aggregation,
    Storage,
    Codegen,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Aggregation => "aggregation",
            Self::Storage => "storage",
            Self::Codegen => "codegen",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_class_prefixes_origin_and_class() {
        let err = InternalError::codegen_invariant("label bound twice");

        assert_eq!(
            err.display_with_class(),
            "codegen:invariant_violation: label bound twice"
        );
        assert_eq!(err.to_string(), "label bound twice");
    }
}

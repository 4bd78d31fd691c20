//! Status codes and errors shared by every entry point

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Variant;

/// Host-visible outcome of the most recent call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum Status {
    #[default]
    Okay = 0,
    NotFound = 1,
    InvalidInput = 2,
}

impl Status {
    /// Numeric code handed to the host
    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn is_okay(self) -> bool {
        self == Status::Okay
    }
}

/// Errors from preprocessing, table construction and host calls
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VdfError {
    #[error("No value for required field '{field}' at link index {link}")]
    MissingRequired { field: &'static str, link: usize },

    #[error("Value out of bounds for field '{field}' at link index {link}: {value}")]
    OutOfBounds {
        field: &'static str,
        link: usize,
        value: f64,
    },

    #[error("Link index {link} not found ({links} links)")]
    LinkNotFound { link: usize, links: usize },

    #[error("Column '{field}' has {found} values, expected {expected}")]
    ColumnLength {
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("Defaults vector has {found} values, expected {expected}")]
    DefaultsLength { expected: usize, found: usize },

    #[error("Table holds {found:?} fields, expected {expected:?}")]
    VariantMismatch { expected: Variant, found: Variant },

    #[error("Unknown field key: {0}")]
    UnknownField(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl VdfError {
    /// Status code the host sees for this error
    pub fn status(&self) -> Status {
        match self {
            VdfError::LinkNotFound { .. } => Status::NotFound,
            _ => Status::InvalidInput,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Okay.code(), 0);
        assert_eq!(Status::NotFound.code(), 1);
        assert_eq!(Status::InvalidInput.code(), 2);
        assert!(Status::default().is_okay());
    }

    #[test]
    fn test_error_messages() {
        let err = VdfError::MissingRequired {
            field: "Time",
            link: 3,
        };
        assert_eq!(err.to_string(), "No value for required field 'Time' at link index 3");
        assert_eq!(err.status(), Status::InvalidInput);

        let err = VdfError::LinkNotFound { link: 9, links: 2 };
        assert_eq!(err.status(), Status::NotFound);

        let err = VdfError::VariantMismatch {
            expected: Variant::Extended,
            found: Variant::Baseline,
        };
        assert_eq!(err.to_string(), "Table holds Baseline fields, expected Extended");
        assert_eq!(err.status(), Status::InvalidInput);
    }
}

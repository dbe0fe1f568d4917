//! Error types for the forecast sheet engine.
//!
//! Conditions the sheet silently ignores (navigating with nothing selected,
//! opening an editor on a non-editable cell) are not errors; they surface
//! as `KeyOutcome::Ignored` instead.

use std::fmt;

use forecast_core::NameError;

/// Failure to tokenize, parse or bind an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    /// Expression text was blank.
    Empty,
    /// Character that starts no token.
    UnexpectedChar { ch: char, pos: usize },
    /// Token in a position the grammar does not allow.
    UnexpectedToken { token: String, pos: usize },
    /// Input ended while an operand or `)` was still expected.
    UnexpectedEnd,
    /// Identifier that matches no variable title.
    UnknownName(String),
    /// Malformed numeric literal.
    BadNumber(String),
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::Empty => write!(f, "Expression is empty"),
            ExprError::UnexpectedChar { ch, pos } => {
                write!(f, "Unexpected character '{}' at position {}", ch, pos)
            }
            ExprError::UnexpectedToken { token, pos } => {
                write!(f, "Unexpected '{}' at position {}", token, pos)
            }
            ExprError::UnexpectedEnd => write!(f, "Unexpected end of expression"),
            ExprError::UnknownName(name) => write!(f, "Unknown variable '{}'", name),
            ExprError::BadNumber(text) => write!(f, "Invalid number '{}'", text),
        }
    }
}

impl std::error::Error for ExprError {}

/// User input rejected before any mutation was dispatched.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A pasted token is not a number (after stripping thousands separators).
    NonNumericPaste(String),
    InvalidName(NameError),
    /// Editor content is not a number.
    InvalidNumber(String),
    InvalidExpression(ExprError),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NonNumericPaste(token) => {
                write!(f, "Pasted data must be numeric (found '{}')", token)
            }
            ValidationError::InvalidName(e) => write!(f, "{}", e),
            ValidationError::InvalidNumber(text) => write!(f, "'{}' is not a number", text),
            ValidationError::InvalidExpression(e) => write!(f, "Invalid expression: {}", e),
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ValidationError::InvalidName(e) => Some(e),
            ValidationError::InvalidExpression(e) => Some(e),
            _ => None,
        }
    }
}

impl From<NameError> for ValidationError {
    fn from(e: NameError) -> Self {
        ValidationError::InvalidName(e)
    }
}

impl From<ExprError> for ValidationError {
    fn from(e: ExprError) -> Self {
        ValidationError::InvalidExpression(e)
    }
}

/// Errors reported by `ForecastSheet` operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetError {
    Validation(ValidationError),
    /// The store reported a version older than the one already seen.
    /// Editing stays disabled until the sheet is reloaded.
    Sync { local: u64, remote: u64 },
    /// Editing is disabled (read-only release view, or after a sync error).
    ReadOnly,
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::Validation(e) => write!(f, "{}", e),
            SheetError::Sync { local, remote } => write!(
                f,
                "Sheet was changed elsewhere (received version {}, have {}); reload to continue editing",
                remote, local
            ),
            SheetError::ReadOnly => write!(f, "Sheet is read-only"),
        }
    }
}

impl std::error::Error for SheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SheetError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for SheetError {
    fn from(e: ValidationError) -> Self {
        SheetError::Validation(e)
    }
}

impl From<NameError> for SheetError {
    fn from(e: NameError) -> Self {
        SheetError::Validation(ValidationError::InvalidName(e))
    }
}

impl From<ExprError> for SheetError {
    fn from(e: ExprError) -> Self {
        SheetError::Validation(ValidationError::InvalidExpression(e))
    }
}

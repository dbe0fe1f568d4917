//! Variable title validation.
//!
//! Titles double as identifiers inside expressions, so they are restricted
//! to ASCII letters, digits and underscores, and must not look like a
//! number.

use std::fmt;

use crate::variable::{Variable, VariableId};

/// Why a proposed variable title was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    Empty,
    /// Contains a space, tab or newline.
    Whitespace,
    /// Contains a character outside `[0-9A-Za-z_]`.
    InvalidChars(char),
    /// Made only of digits and underscores.
    DigitsOrUnderscoresOnly,
    /// Another variable already has this title.
    Duplicate(String),
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::Empty => write!(f, "Name cannot be empty"),
            NameError::Whitespace => write!(f, "Name cannot contain whitespace"),
            NameError::InvalidChars(c) => write!(
                f,
                "Name can only contain letters, numbers and underscores (found '{}')",
                c
            ),
            NameError::DigitsOrUnderscoresOnly => {
                write!(f, "Name must contain at least one letter")
            }
            NameError::Duplicate(name) => write!(f, "A variable named '{}' already exists", name),
        }
    }
}

impl std::error::Error for NameError {}

/// Check the shape of a title, without looking at other variables.
pub fn validate_name_shape(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.chars().any(char::is_whitespace) {
        return Err(NameError::Whitespace);
    }
    if let Some(bad) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(NameError::InvalidChars(bad));
    }
    if name.chars().all(|c| c.is_ascii_digit() || c == '_') {
        return Err(NameError::DigitsOrUnderscoresOnly);
    }
    Ok(())
}

/// Validate a title against shape rules and the titles of `existing`.
///
/// `ignore` is the id of the variable being renamed, so keeping a title
/// unchanged is not reported as a duplicate.
pub fn validate_variable_name(
    name: &str,
    existing: &[Variable],
    ignore: Option<&VariableId>,
) -> Result<(), NameError> {
    validate_name_shape(name)?;
    let taken = existing
        .iter()
        .filter(|v| Some(&v.id) != ignore)
        .any(|v| v.title == name);
    if taken {
        return Err(NameError::Duplicate(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::VariableType;

    #[test]
    fn test_valid_names() {
        assert!(validate_name_shape("Revenue").is_ok());
        assert!(validate_name_shape("cost_2024").is_ok());
        assert!(validate_name_shape("_a").is_ok());
        assert!(validate_name_shape("2x").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(validate_name_shape(""), Err(NameError::Empty));
        assert_eq!(validate_name_shape("Net Income"), Err(NameError::Whitespace));
        assert_eq!(validate_name_shape("a\tb"), Err(NameError::Whitespace));
        assert_eq!(validate_name_shape("a-b"), Err(NameError::InvalidChars('-')));
        assert_eq!(validate_name_shape("Café"), Err(NameError::InvalidChars('é')));
        assert_eq!(validate_name_shape("123"), Err(NameError::DigitsOrUnderscoresOnly));
        assert_eq!(validate_name_shape("__1_"), Err(NameError::DigitsOrUnderscoresOnly));
    }

    #[test]
    fn test_duplicate_ignores_self() {
        let vars = vec![
            Variable::new("v1", "Revenue", VariableType::Real),
            Variable::new("v2", "Cost", VariableType::Real),
        ];
        assert_eq!(
            validate_variable_name("Cost", &vars, None),
            Err(NameError::Duplicate("Cost".into()))
        );
        assert!(validate_variable_name("Cost", &vars, Some(&VariableId::new("v2"))).is_ok());
        assert!(validate_variable_name("Margin", &vars, None).is_ok());
    }
}

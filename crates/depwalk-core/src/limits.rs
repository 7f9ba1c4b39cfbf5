//! Traversal limits for resource protection

/// Maximum nesting of recursive dependency walks (64)
pub const MAX_DEPENDENCY_DEPTH: usize = 64;

/// Maximum length of a scope override path (256 chars)
pub const MAX_SCOPE_PATH_LEN: usize = 256;

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyScopePath,
    EmptyScopeName,
    ScopePathTooLong { len: usize, max: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyScopePath => write!(f, "Scope override path cannot be empty"),
            Self::EmptyScopeName => write!(f, "Scope override name cannot be empty"),
            Self::ScopePathTooLong { len, max } => {
                write!(f, "Scope override path too long: {} chars (max {})", len, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a `path=scope` override pair
pub fn validate_scope_override(path: &str, scope: &str) -> Result<(), ValidationError> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(ValidationError::EmptyScopePath);
    }
    if path.len() > MAX_SCOPE_PATH_LEN {
        return Err(ValidationError::ScopePathTooLong {
            len: path.len(),
            max: MAX_SCOPE_PATH_LEN,
        });
    }
    if scope.is_empty() {
        return Err(ValidationError::EmptyScopeName);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_scope_override() {
        assert!(validate_scope_override("customer", "active").is_ok());
        assert!(validate_scope_override("order.customer", "active").is_ok());
        assert!(validate_scope_override("", "active").is_err());
        assert!(validate_scope_override("order..customer", "active").is_err());
        assert!(validate_scope_override("customer", "").is_err());
        assert!(validate_scope_override(&"x".repeat(300), "active").is_err());
    }
}

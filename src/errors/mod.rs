use thiserror::Error;

/// The two failure categories reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Io,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "ValidationError",
            ErrorCategory::Io => "IOError",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum DsiError {
    // Validation errors
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Could not parse {source_name}: {message}")]
    InputParse {
        source_name: String,
        message: String,
    },

    #[error("Key error: {0}")]
    Key(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("OPML generation failed: {0}")]
    Opml(String),
}

impl DsiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DsiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn parse(source_name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        DsiError::InputParse {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            DsiError::Validation { .. }
            | DsiError::InvalidInput(_)
            | DsiError::InputParse { .. }
            | DsiError::Key(_)
            | DsiError::AlreadyExists(_) => ErrorCategory::Validation,
            DsiError::Io(_) | DsiError::Render(_) | DsiError::Opml(_) => ErrorCategory::Io,
        }
    }
}

impl From<rss::Error> for DsiError {
    fn from(err: rss::Error) -> Self {
        DsiError::Render(err.to_string())
    }
}

impl From<atom_syndication::Error> for DsiError {
    fn from(err: atom_syndication::Error) -> Self {
        DsiError::Render(err.to_string())
    }
}

impl From<image::ImageError> for DsiError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => DsiError::Io(e),
            other => DsiError::Render(other.to_string()),
        }
    }
}

impl From<ed25519_dalek::pkcs8::Error> for DsiError {
    fn from(err: ed25519_dalek::pkcs8::Error) -> Self {
        DsiError::Key(err.to_string())
    }
}

impl From<ed25519_dalek::pkcs8::spki::Error> for DsiError {
    fn from(err: ed25519_dalek::pkcs8::spki::Error) -> Self {
        DsiError::Key(err.to_string())
    }
}

pub type DsiResult<T> = Result<T, DsiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_category() {
        let err = DsiError::validation("name", "must not be empty");
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.to_string(), "name: must not be empty");
    }

    #[test]
    fn test_io_category() {
        let err: DsiError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert_eq!(err.category(), ErrorCategory::Io);
        assert_eq!(err.category().as_str(), "IOError");
    }
}

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a directory or not accessible: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Unresolved export '{exposed}' in {package}: {target}")]
    Resolution {
        package: String,
        exposed: String,
        target: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl ExtractorError {
    /// Process exit status for this error. An invalid repository root has
    /// its own code so callers can tell it apart from runtime failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            ExtractorError::InvalidRoot(_) => 2,
            _ => 1,
        }
    }
}

impl From<serde_yaml::Error> for ExtractorError {
    fn from(e: serde_yaml::Error) -> Self {
        ExtractorError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExtractorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_root_exit_code() {
        let err = ExtractorError::InvalidRoot(PathBuf::from("/missing"));
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("/missing"));
    }

    #[test]
    fn test_other_errors_exit_code() {
        let err = ExtractorError::Config("bad".to_string());
        assert_eq!(err.exit_code(), 1);

        let err = ExtractorError::Io(std::io::Error::other("boom"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_resolution_display() {
        let err = ExtractorError::Resolution {
            package: "pkg".to_string(),
            exposed: "run".to_string(),
            target: "pkg.impl.compute".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unresolved export 'run' in pkg: pkg.impl.compute"
        );
    }
}

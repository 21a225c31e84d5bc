//! Error types for declaration and synthesis.

use std::path::PathBuf;

/// Error raised while declaring resources or synthesizing a cloud assembly.
#[derive(Debug, thiserror::Error)]
pub enum CdkError {
    /// A required environment variable is unset or empty.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid AWS account ID format.
    #[error("invalid AWS account ID: {0} (must be 12-digit numeric string)")]
    InvalidAccountId(String),

    /// Invalid AWS region identifier.
    #[error("invalid AWS region: {0:?}")]
    InvalidRegion(String),

    /// Two constructs were declared at the same path inside one stack.
    #[error("construct path already declared: {0}")]
    DuplicateConstructPath(String),

    /// Two distinct construct paths resolved to the same logical ID.
    #[error("logical ID {logical_id} already allocated in stack {stack}")]
    DuplicateLogicalId {
        /// Stack name.
        stack: String,
        /// The colliding logical ID.
        logical_id: String,
    },

    /// A stack with the same name was already added to the app.
    #[error("stack {0} already exists in the app")]
    DuplicateStack(String),

    /// The same export name was declared twice in one stack.
    #[error("export {export_name} already declared in stack {stack}")]
    DuplicateExport {
        /// Stack name.
        stack: String,
        /// The colliding export name.
        export_name: String,
    },

    /// A stack references another stack that was not added before it.
    #[error("stack {stack} depends on {dependency}, which was not added to the app before it")]
    UnknownDependency {
        /// The consuming stack.
        stack: String,
        /// The missing producer stack.
        dependency: String,
    },

    /// An asset source path does not exist.
    #[error("cannot find asset at {}", .0.display())]
    AssetNotFound(PathBuf),

    /// Filesystem error while fingerprinting, staging, or writing output.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization or parsing error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CdkError {
    /// Closure for `.map_err()` that wraps an I/O error with its path.
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Convenience result type for declaration and synthesis.
pub type CdkResult<T> = Result<T, CdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_format_missing_env_var() {
        let err = CdkError::MissingEnvVar("AWS_REGION".to_owned());
        assert_eq!(
            err.to_string(),
            "missing required environment variable: AWS_REGION"
        );
    }

    #[test]
    fn test_should_wrap_io_error_with_path() {
        let err = CdkError::io("/tmp/missing")(std::io::Error::from(
            std::io::ErrorKind::NotFound,
        ));
        assert!(err.to_string().starts_with("I/O error at /tmp/missing"));
    }
}

//! Error types for resolution, installation and manifest handling

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the packbox engine, carrying enough context to log
/// a useful message without the caller re-attaching paths or URLs.
#[derive(Error, Debug)]
pub enum PackboxError {
    /// Transport-level HTTP failure (connect, TLS, body read)
    #[error("HTTP request to '{url}' failed")]
    HttpRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("HTTP request to '{url}' returned status {status}")]
    HttpStatus {
        url: String,
        status: u16,
    },

    /// File system I/O errors with file context
    #[error("File operation failed on '{path}' while {operation}")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// JSON encoding or decoding failed
    #[error("Malformed JSON in {context}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A required piece of configuration (manifest, API key) is absent
    #[error("{what} not found")]
    ConfigMissing {
        what: String,
        suggestion: String,
    },

    /// Present but unusable configuration
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    #[error("Unsupported folder '{folder}' (supported: mods, resourcepacks, shaderpacks)")]
    UnsupportedFolder {
        folder: String,
    },

    /// A textual value could not be parsed into one of the manifest enums
    #[error("Unknown {kind} '{value}'")]
    InvalidValue {
        kind: &'static str,
        value: String,
    },
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    Create,
    CreateDir,
    Metadata,
    Rename,
    ListDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Create => write!(f, "creating"),
            FileOperation::CreateDir => write!(f, "creating directory"),
            FileOperation::Metadata => write!(f, "reading metadata"),
            FileOperation::Rename => write!(f, "renaming"),
            FileOperation::ListDir => write!(f, "listing directory"),
        }
    }
}

pub type Result<T> = std::result::Result<T, PackboxError>;

impl PackboxError {
    /// Shorthand for the common "io error on this path" case
    pub fn fs<P: Into<PathBuf>>(path: P, operation: FileOperation, source: std::io::Error) -> Self {
        PackboxError::FileSystem {
            path: path.into(),
            operation,
            source,
        }
    }

    pub fn http<S: Into<String>>(url: S, source: reqwest::Error) -> Self {
        PackboxError::HttpRequest {
            url: url.into(),
            source,
        }
    }

    pub fn json<S: Into<String>>(context: S, source: serde_json::Error) -> Self {
        PackboxError::Json {
            context: context.into(),
            source,
        }
    }

    /// Whether this error must abort the whole operation rather than a single file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PackboxError::ConfigMissing { .. }
                | PackboxError::Configuration { .. }
                | PackboxError::UnsupportedFolder { .. }
                | PackboxError::InvalidUrl { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            PackboxError::HttpRequest { .. } => "http_request",
            PackboxError::HttpStatus { .. } => "http_status",
            PackboxError::FileSystem { .. } => "file_system",
            PackboxError::InvalidUrl { .. } => "invalid_url",
            PackboxError::Json { .. } => "json",
            PackboxError::ConfigMissing { .. } => "config_missing",
            PackboxError::Configuration { .. } => "configuration",
            PackboxError::UnsupportedFolder { .. } => "unsupported_folder",
            PackboxError::InvalidValue { .. } => "invalid_value",
        }
    }

    /// Get user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            PackboxError::ConfigMissing { suggestion, .. } => Some(suggestion),
            PackboxError::UnsupportedFolder { .. } => {
                Some("Pick any of: mods, resourcepacks, shaderpacks")
            }
            PackboxError::InvalidValue { kind: "source", .. } => {
                Some("Valid sources are: modrinth, curseforge, none")
            }
            PackboxError::InvalidValue { kind: "loader", .. } => {
                Some("Valid loaders are: fabric, forge, neoforge, quilt")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_missing_is_fatal_and_carries_suggestion() {
        let err = PackboxError::ConfigMissing {
            what: "Manifest file".to_string(),
            suggestion: "run `packbox init` first".to_string(),
        };
        assert!(err.is_fatal());
        assert_eq!(err.category(), "config_missing");
        assert_eq!(err.suggestion(), Some("run `packbox init` first"));
        assert_eq!(err.to_string(), "Manifest file not found");
    }

    #[test]
    fn test_file_system_error_is_not_fatal() {
        let err = PackboxError::fs(
            "mods/a.jar",
            FileOperation::Read,
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("mods/a.jar"));
        assert!(err.to_string().contains("reading"));
    }
}

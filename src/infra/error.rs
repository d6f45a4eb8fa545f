use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    /// A file the preview reads or writes on the user's behalf.
    #[error("cannot access {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("render endpoint `{base}` cannot be resolved: {source}")]
    Endpoint {
        base: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn file(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::File {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn endpoint(base: impl Into<String>, source: url::ParseError) -> Self {
        Self::Endpoint {
            base: base.into(),
            source,
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MapperError {
    #[error("retries exceeded after {attempts} attempts: url {url}")]
    #[diagnostic(help("the remote API kept answering with a non-200 status"))]
    RetriesExceeded { url: String, attempts: u32 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("{stage} stage lost its workers after {received} of {expected} results")]
    StageDisconnected {
        stage: &'static str,
        received: usize,
        expected: usize,
    },

    #[error("layout import for region {region} failed: {message}")]
    RegionImport { region: String, message: String },

    #[error("malformed layout data in region {region}: {field} = {value:?}")]
    #[diagnostic(help("the external layout source changed its format"))]
    MalformedLayout {
        region: String,
        field: String,
        value: String,
    },

    #[error("map document not found: {0}")]
    UnknownMapDocument(String),

    #[error("map document {id} is malformed: {message}")]
    MalformedMapDocument { id: String, message: String },

    #[error("invalid map identifier: {0}")]
    InvalidMapId(String),

    #[error("missing galaxy snapshot at {0}")]
    #[diagnostic(help("run `spyglass-map generate` first"))]
    MissingGalaxy(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("server error: {0}")]
    Server(String),
}

//! Error types for the regcache-core library.

use thiserror::Error;

/// Main error type for the regcache library.
#[derive(Error, Debug)]
pub enum RegcacheError {
    /// Rule cache error. Always fatal for a run.
    #[error("rule store error: {0}")]
    Store(#[from] StoreError),

    /// A single document could not be processed.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// LLM fallback error.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Pattern registration error.
    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RegcacheError {
    /// Whether the batch may continue after this error.
    ///
    /// Store and configuration failures terminate the run; everything tied to
    /// one document is reported and skipped.
    pub fn is_per_document(&self) -> bool {
        matches!(self, Self::Document(_) | Self::Pdf(_))
    }
}

/// Errors from the persistent rule cache.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The store lock was poisoned by a panicking writer.
    #[error("rule store lock poisoned")]
    Poisoned,

    /// Failed to create or remove the database file.
    #[error("database file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors tied to a single document of a batch.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document file does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The document could not be read.
    #[error("failed to read {path}: {reason}")]
    Unreadable { path: String, reason: String },

    /// The document has no extractable text.
    #[error("no text extracted from {0}")]
    EmptyText(String),

    /// The file extension is not supported.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// A dataset entry is missing required keys or has a bad schema.
    #[error("malformed dataset entry #{index}: {reason}")]
    MalformedEntry { index: usize, reason: String },
}

/// Errors from the LLM client.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Could not reach the API.
    #[error("connection to {0} failed")]
    Connection(String),

    /// HTTP client failure (timeout, TLS, ...).
    #[error("HTTP client error: {0}")]
    Http(String),

    /// The API answered with a non-success status.
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The API answer could not be parsed.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The API key is missing.
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors from registering patterns.
#[derive(Error, Debug)]
pub enum PatternError {
    /// The regex does not compile.
    #[error("invalid pattern {name}: {source}")]
    InvalidRegex {
        name: String,
        #[source]
        source: regex::Error,
    },

    /// A pattern with this name already exists.
    #[error("pattern already registered: {0}")]
    Duplicate(String),
}

/// Result type for the regcache library.
pub type Result<T> = std::result::Result<T, RegcacheError>;

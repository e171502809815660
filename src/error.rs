//! Rich diagnostic error types for the flashcard pipeline.
//!
//! Each collaborator boundary defines its own error type with miette
//! `#[diagnostic]` derives, providing error codes and help text. The
//! response recovery parser has no error type: it degrades to an empty
//! mapping instead of failing.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for a flashcard generation request.
///
/// Every variant is fatal to the current request; the HTTP boundary turns
/// any of them into a 500 with the message preserved.
#[derive(Debug, Error, Diagnostic)]
pub enum FlashcardError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Document loading errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("document not found: \"{path}\"")]
    #[diagnostic(
        code(flashcard::load::not_found),
        help("Check the path. The loader needs an existing PDF file.")
    )]
    NotFound { path: String },

    #[error("failed to read \"{path}\": {source}")]
    #[diagnostic(
        code(flashcard::load::io),
        help("A filesystem operation failed. Check file permissions.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("\"{path}\" is not a readable PDF: {message}")]
    #[diagnostic(
        code(flashcard::load::parse),
        help(
            "The document could not be parsed. Verify the file is a valid PDF \
             and not corrupted or encrypted."
        )
    )]
    Parse { path: String, message: String },

    #[error("empty document: no text extracted from \"{path}\"")]
    #[diagnostic(
        code(flashcard::load::empty_document),
        help(
            "The PDF contains no extractable text. Scanned documents need OCR \
             before they can be turned into flashcards."
        )
    )]
    EmptyDocument { path: String },
}

// ---------------------------------------------------------------------------
// Embedding / generative model errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CollaboratorError {
    #[error("missing credentials for {service}: {variable} is not set")]
    #[diagnostic(
        code(flashcard::collaborator::missing_credentials),
        help("Export {variable} or put it in a .env file next to the binary.")
    )]
    MissingCredentials { service: String, variable: String },

    #[error("{service} is not reachable at {url}")]
    #[diagnostic(
        code(flashcard::collaborator::unavailable),
        help("Check that the service is running and the base URL is correct.")
    )]
    Unavailable { service: String, url: String },

    #[error("{service} returned HTTP {status}: {body}")]
    #[diagnostic(
        code(flashcard::collaborator::status),
        help("401/403 usually means a bad API key, 429 an exhausted quota.")
    )]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{service} request failed: {message}")]
    #[diagnostic(
        code(flashcard::collaborator::request_failed),
        help("The request did not complete. Check network connectivity and timeouts.")
    )]
    RequestFailed { service: String, message: String },

    #[error("unexpected response from {service}: {message}")]
    #[diagnostic(
        code(flashcard::collaborator::malformed_response),
        help("The service answered with a payload in an unexpected shape.")
    )]
    MalformedResponse { service: String, message: String },

    #[error("{service} returned {actual} embeddings for {expected} inputs")]
    #[diagnostic(
        code(flashcard::collaborator::count_mismatch),
        help("The embedding backend dropped or duplicated inputs in a batch.")
    )]
    CountMismatch {
        service: String,
        expected: usize,
        actual: usize,
    },
}

// ---------------------------------------------------------------------------
// Vector index errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IndexError {
    #[error("cannot build an index over zero chunks")]
    #[diagnostic(
        code(flashcard::index::empty),
        help("The document produced no chunks; there is nothing to retrieve from.")
    )]
    Empty,

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    #[diagnostic(
        code(flashcard::index::dim_mismatch),
        help(
            "All vectors in the index and the query must come from the same \
             embedding model. Do not mix embedding backends within a request."
        )
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("{chunks} chunks but {embeddings} embeddings")]
    #[diagnostic(
        code(flashcard::index::count_mismatch),
        help("Every chunk needs exactly one embedding.")
    )]
    CountMismatch { chunks: usize, embeddings: usize },

    #[error("HNSW index error: {message}")]
    #[diagnostic(
        code(flashcard::index::hnsw),
        help("The HNSW nearest-neighbor index encountered an internal error.")
    )]
    Hnsw { message: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(flashcard::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(flashcard::config::parse),
        help("Check the TOML syntax and section names in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("invalid value for {key}: {message}")]
    #[diagnostic(code(flashcard::config::invalid_value), help("{message}"))]
    InvalidValue { key: String, message: String },
}

/// Convenience alias for functions returning flashcard results.
pub type FlashcardResult<T> = std::result::Result<T, FlashcardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_converts_to_flashcard_error() {
        let err = LoadError::NotFound {
            path: "missing.pdf".into(),
        };
        let top: FlashcardError = err.into();
        assert!(matches!(top, FlashcardError::Load(LoadError::NotFound { .. })));
    }

    #[test]
    fn collaborator_error_message_is_preserved() {
        let err = CollaboratorError::Status {
            service: "gemini".into(),
            status: 429,
            body: "quota exceeded".into(),
        };
        let top: FlashcardError = err.into();
        let msg = top.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("quota exceeded"));
    }

    #[test]
    fn index_error_display_is_descriptive() {
        let err = IndexError::DimensionMismatch {
            expected: 768,
            actual: 384,
        };
        let msg = format!("{err}");
        assert!(msg.contains("768"));
        assert!(msg.contains("384"));
    }
}

//! Error types for the PDF/OCR toolkit

use thiserror::Error;

/// Result type alias for the toolkit
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure classes.
///
/// Batch operations recover from `PageProcessing` failures locally; every
/// other class is fatal to the call that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The document could not be opened (empty, malformed, encrypted)
    Document,
    /// A caller-supplied argument violates a precondition
    Validation,
    /// A single page failed to render or recognize
    PageProcessing,
    /// A collaborator engine failed unexpectedly
    Engine,
}

/// Error types for the toolkit
#[derive(Error, Debug)]
pub enum Error {
    /// Empty byte buffer where a document was expected
    #[error("Document is empty")]
    EmptyInput,

    /// Invalid PDF file
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// PDF is encrypted and cannot be opened without a password
    #[error("Cannot open encrypted/password-protected PDF")]
    PasswordRequired,

    /// PDF parsed but has no pages
    #[error("PDF has no pages")]
    NoPages,

    /// Document handle used after it was closed
    #[error("Document handle used after close")]
    DocumentClosed,

    /// Page index out of bounds (zero-based index)
    #[error("Invalid page index {index}. PDF has {total} pages (valid range: 0-{})", .total.saturating_sub(1))]
    PageOutOfBounds { index: u32, total: u32 },

    /// Password does not meet the minimum length
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    /// Any other argument precondition
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Image input could not be decoded
    #[error("Invalid image: {reason}")]
    InvalidImage { reason: String },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// A single page failed to rasterize (page number is one-based)
    #[error("Failed to render page {page}: {reason}")]
    Render { page: u32, reason: String },

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// qpdf error
    #[error("qpdf error: {reason}")]
    Qpdf { reason: String },

    /// OCR engine failure at a named stage
    #[error("OCR engine error during {stage}: {reason}")]
    Engine { stage: &'static str, reason: String },

    /// Blocking task failed to join
    #[error("Task join error: {reason}")]
    TaskJoin { reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure wrapped with the operation that was running
    #[error("{stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with the name of the failing operation.
    pub fn during(self, stage: &'static str) -> Self {
        Error::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// Shorthand for an engine failure.
    pub fn engine(stage: &'static str, reason: impl std::fmt::Display) -> Self {
        Error::Engine {
            stage,
            reason: reason.to_string(),
        }
    }

    /// Classify this error into the failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyInput
            | Error::InvalidPdf { .. }
            | Error::PasswordRequired
            | Error::NoPages
            | Error::DocumentClosed => ErrorKind::Document,
            Error::PageOutOfBounds { .. }
            | Error::PasswordTooShort { .. }
            | Error::InvalidArgument { .. }
            | Error::InvalidImage { .. }
            | Error::Base64Decode(_) => ErrorKind::Validation,
            Error::Render { .. } => ErrorKind::PageProcessing,
            Error::Pdfium { .. }
            | Error::Qpdf { .. }
            | Error::Engine { .. }
            | Error::TaskJoin { .. }
            | Error::Io(_)
            | Error::Serialization(_) => ErrorKind::Engine,
            Error::Stage { source, .. } => source.kind(),
        }
    }

    /// Return a sanitized error message safe to send to a host.
    /// Internal details (library errors, paths) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::EmptyInput => "Document is empty".to_string(),
            Error::InvalidPdf { .. } => "Invalid or corrupted PDF file".to_string(),
            Error::PasswordRequired => {
                "Cannot open encrypted/password-protected PDF".to_string()
            }
            Error::NoPages => "PDF has no pages".to_string(),
            Error::DocumentClosed => "Document handle used after close".to_string(),
            Error::PageOutOfBounds { .. }
            | Error::PasswordTooShort { .. }
            | Error::InvalidArgument { .. } => self.to_string(),
            Error::InvalidImage { .. } => "Invalid image data".to_string(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::Render { page, .. } => format!("Failed to render page {}", page),
            Error::Pdfium { .. } | Error::Qpdf { .. } => "PDF processing error".to_string(),
            Error::Engine { stage, .. } => format!("OCR engine error during {}", stage),
            Error::TaskJoin { .. } => "Internal task error".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
            Error::Stage { stage, source } => {
                format!("{} failed: {}", stage, source.client_message())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::PasswordRequired.kind(), ErrorKind::Document);
        assert_eq!(Error::NoPages.kind(), ErrorKind::Document);
        assert_eq!(
            Error::PageOutOfBounds { index: 5, total: 3 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::PasswordTooShort { min: 6 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::Render {
                page: 1,
                reason: "boom".into()
            }
            .kind(),
            ErrorKind::PageProcessing
        );
        assert_eq!(Error::engine("recognize", "boom").kind(), ErrorKind::Engine);
    }

    #[test]
    fn test_stage_wrapping_keeps_kind_and_cause() {
        let err = Error::PageOutOfBounds { index: 5, total: 3 }.during("PDF split");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "PDF split failed: Invalid page index 5. PDF has 3 pages (valid range: 0-2)"
        );
    }

    #[test]
    fn test_client_message_hides_internal_detail() {
        let err = Error::Qpdf {
            reason: "/tmp/secret/path: xref damaged".into(),
        }
        .during("PDF merge");
        let msg = err.client_message();
        assert_eq!(msg, "PDF merge failed: PDF processing error");
        assert!(!msg.contains("secret"));
    }

    #[test]
    fn test_out_of_bounds_message_for_empty_document() {
        let err = Error::PageOutOfBounds { index: 0, total: 0 };
        assert!(err.to_string().contains("valid range: 0-0"));
    }
}

//! Whole-document PDF operations on qpdf
//!
//! Merge, split, password protection, page counting and best-effort
//! compression. Every operation opens its own in-memory qpdf document,
//! validates its arguments before copying anything, and either returns a
//! complete output buffer or an error (never partial output).

use crate::error::{Error, Result};
use qpdf::{EncryptionParams, EncryptionParamsR6, ObjectStreamMode, PrintPermission, QPdf};

/// Minimum accepted length, in characters, for `protect`
pub const MIN_PASSWORD_LEN: usize = 6;

/// Stateless entry point for qpdf operations
pub struct PdfMutator;

/// Open a QPdf from memory
fn open_qpdf(data: &[u8]) -> Result<QPdf> {
    if data.is_empty() {
        return Err(Error::EmptyInput);
    }
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: "Not a valid PDF file".to_string(),
        });
    }
    QPdf::read_from_memory(data).map_err(|e| match map_qpdf_error(e) {
        Error::Qpdf { reason } => Error::InvalidPdf { reason },
        other => other,
    })
}

/// Map qpdf crate errors to our error types
fn map_qpdf_error(e: qpdf::QPdfError) -> Error {
    match e.error_code() {
        qpdf::QPdfErrorCode::InvalidPassword => Error::PasswordRequired,
        _ => Error::Qpdf {
            reason: e.to_string(),
        },
    }
}

/// Check every index up front so no copy starts on a bad request.
fn validate_indices(indices: &[u32], num_pages: u32) -> Result<()> {
    if indices.is_empty() {
        return Err(Error::InvalidArgument {
            reason: "no pages selected".to_string(),
        });
    }
    match indices.iter().find(|&&i| i >= num_pages) {
        Some(&index) => Err(Error::PageOutOfBounds {
            index,
            total: num_pages,
        }),
        None => Ok(()),
    }
}

impl PdfMutator {
    /// Merge PDFs, concatenating their pages in input order.
    pub fn merge(inputs: &[&[u8]]) -> Result<Vec<u8>> {
        if inputs.is_empty() {
            return Err(Error::InvalidArgument {
                reason: "no input PDFs provided".to_string(),
            });
        }

        tracing::info!(count = inputs.len(), "Merging PDFs");

        // Load everything first so a bad input fails before any copying.
        let mut sources = Vec::with_capacity(inputs.len());
        for (i, input_data) in inputs.iter().enumerate() {
            let source = open_qpdf(input_data).map_err(|e| match e {
                Error::InvalidPdf { reason } => Error::InvalidPdf {
                    reason: format!("Failed to read input PDF {}: {}", i, reason),
                },
                other => other,
            })?;
            sources.push(source);
        }

        let dest = QPdf::empty();
        for (i, source) in sources.iter().enumerate() {
            let pages = source.get_pages().map_err(|e| Error::Qpdf {
                reason: format!("Failed to get pages from input PDF {}: {}", i, e),
            })?;
            tracing::debug!(input = i, pages = pages.len(), "Copying pages");

            for page in &pages {
                let copied = dest.copy_from_foreign(page);
                dest.add_page(&copied, false).map_err(map_qpdf_error)?;
            }
        }

        let output = dest.writer().write_to_memory().map_err(map_qpdf_error)?;
        tracing::info!(bytes = output.len(), "Saved merged PDF");
        Ok(output)
    }

    /// Build a new PDF from `page_indices` (zero-based) of `input_data`.
    ///
    /// Pages are copied in the order given; repeats are allowed.
    pub fn split(input_data: &[u8], page_indices: &[u32]) -> Result<Vec<u8>> {
        let source = open_qpdf(input_data)?;
        let num_pages = source.get_num_pages().map_err(map_qpdf_error)?;
        tracing::info!(
            source_pages = num_pages,
            extract = page_indices.len(),
            "Splitting PDF"
        );

        validate_indices(page_indices, num_pages)?;

        let dest = QPdf::empty();
        for &idx in page_indices {
            let page = source.get_page(idx).ok_or(Error::PageOutOfBounds {
                index: idx,
                total: num_pages,
            })?;
            let copied = dest.copy_from_foreign(&page);
            dest.add_page(&copied, false).map_err(map_qpdf_error)?;
        }

        let mut writer = dest.writer();
        writer.preserve_encryption(false);
        writer.write_to_memory().map_err(map_qpdf_error)
    }

    /// Encrypt with `password` as both user and owner password.
    ///
    /// Printing (high resolution) and accessibility extraction stay allowed;
    /// modification, copying, annotation, form filling and assembly do not.
    pub fn protect(input_data: &[u8], password: &str) -> Result<Vec<u8>> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }

        let qpdf = open_qpdf(input_data)?;
        let pages = qpdf.get_num_pages().map_err(map_qpdf_error)?;
        tracing::info!(pages, "Protecting PDF with password");

        let encryption = EncryptionParams::R6(EncryptionParamsR6 {
            user_password: password.to_string(),
            owner_password: password.to_string(),
            allow_accessibility: true,
            allow_extract: false,
            allow_assemble: false,
            allow_annotate_and_form: false,
            allow_form_filling: false,
            allow_modify_other: false,
            allow_print: PrintPermission::Full,
            encrypt_metadata: true,
        });

        let mut writer = qpdf.writer();
        writer
            .preserve_encryption(false)
            .encryption_params(encryption);
        writer.write_to_memory().map_err(map_qpdf_error)
    }

    /// Get the page count of a PDF
    pub fn page_count(input_data: &[u8]) -> Result<u32> {
        let qpdf = open_qpdf(input_data)?;
        qpdf.get_num_pages().map_err(map_qpdf_error)
    }

    /// Re-serialize with structural optimizations.
    ///
    /// Generates object streams, compresses streams and drops unreferenced
    /// objects. Embedded images are not recompressed and `quality` does not
    /// change the output; the result can be larger than the input.
    pub fn compress(input_data: &[u8], quality: f32) -> Result<Vec<u8>> {
        if !quality.is_finite() || !(0.0..=1.0).contains(&quality) {
            return Err(Error::InvalidArgument {
                reason: format!("quality must be within 0.0-1.0, got {}", quality),
            });
        }

        let qpdf = open_qpdf(input_data)?;
        let pages = qpdf.get_num_pages().map_err(map_qpdf_error)?;
        tracing::info!(pages, quality, "Compressing PDF");

        let mut writer = qpdf.writer();
        writer
            .object_stream_mode(ObjectStreamMode::Generate)
            .compress_streams(true)
            .preserve_unreferenced_objects(false)
            .preserve_encryption(false);
        let output = writer.write_to_memory().map_err(map_qpdf_error)?;

        let savings = (1.0 - output.len() as f64 / input_data.len() as f64) * 100.0;
        tracing::info!(
            original = input_data.len(),
            compressed = output.len(),
            savings = %format!("{:.1}%", savings),
            "Compression complete"
        );
        Ok(output)
    }
}

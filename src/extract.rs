//! Text extraction for uploaded binary documents.
//!
//! Admin uploads and file ingestion hand in raw PDF bytes; this module
//! returns plain UTF-8 text. Extraction never panics on malformed input;
//! callers get an error and skip the document.

/// Extraction error. `Empty` covers structurally valid PDFs with no text
/// layer (scans, image-only pages).
#[derive(Debug)]
pub enum ExtractError {
    Unreadable(String),
    Empty,
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Unreadable(e) => write!(f, "could not extract PDF text: {}", e),
            ExtractError::Empty => write!(f, "PDF contains no extractable text"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract the text layer of a PDF held in memory.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractError::Unreadable(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pdf_returns_error() {
        let err = extract_pdf(b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable(_)));
    }

    #[test]
    fn test_error_messages_name_the_failure() {
        assert!(ExtractError::Empty.to_string().contains("no extractable text"));
        assert!(ExtractError::Unreadable("bad xref".to_string())
            .to_string()
            .contains("bad xref"));
    }
}

//! Header region codec.
//!
//! The first `HEADER_SIZE` bytes of a page file hold the page count as ASCII
//! decimal digits followed by zero padding. Readers only look at the leading
//! run of digits.

use super::HEADER_SIZE;
use super::error::{FileError, FileResult};

/// Encode `total_pages` into a full header region.
pub fn encode_header(total_pages: usize) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    let digits = total_pages.to_string();
    // usize::MAX has 20 digits, well below HEADER_SIZE
    header[..digits.len()].copy_from_slice(digits.as_bytes());
    header
}

/// Parse the page count out of a header region.
pub fn parse_header(header: &[u8]) -> FileResult<usize> {
    if header.len() < HEADER_SIZE {
        return Err(FileError::CorruptHeader(format!(
            "header region is {} bytes, expected {}",
            header.len(),
            HEADER_SIZE
        )));
    }

    let digits = header[..HEADER_SIZE]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return Err(FileError::CorruptHeader(
            "page count field is not numeric".to_string(),
        ));
    }

    // Only ASCII digits were taken, so this is valid UTF-8
    let text = std::str::from_utf8(&header[..digits])
        .map_err(|e| FileError::CorruptHeader(e.to_string()))?;
    text.parse::<usize>()
        .map_err(|e| FileError::CorruptHeader(format!("page count {text:?}: {e}")))
}

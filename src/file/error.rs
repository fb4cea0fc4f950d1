use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Corrupt header: {0}")]
    CorruptHeader(String),

    /// `page` is signed so that a cursor step below page 0 can be reported as-is.
    #[error("Page not found: page_id={page}, total_pages={total_pages}")]
    PageNotFound { page: i64, total_pages: usize },

    #[error("Invalid page size: expected {expected}, got {actual}")]
    InvalidPageSize { expected: usize, actual: usize },

    #[error("Invalid file handle: {0}")]
    InvalidHandle(String),
}

impl FileError {
    pub(crate) fn page_not_found(page: usize, total_pages: usize) -> Self {
        FileError::PageNotFound {
            page: page as i64,
            total_pages,
        }
    }
}

pub type FileResult<T> = Result<T, FileError>;

mod error;
mod file_manager;
mod header;
#[cfg(test)]
mod tests;

pub use error::{FileError, FileResult};
pub use file_manager::{
    FileHandle, PagedFileManager, close_page_file, create_page_file, destroy_page_file,
    open_page_file,
};
pub use header::{encode_header, parse_header};

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Size of the header region at the start of every page file
pub const HEADER_SIZE: usize = 50;

/// Page ID type
pub type PageId = usize;

/// Byte offset of a page inside its file
pub(crate) fn page_offset(page_id: PageId) -> u64 {
    HEADER_SIZE as u64 + page_id as u64 * PAGE_SIZE as u64
}

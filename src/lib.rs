pub mod file;

pub use file::{
    FileError, FileHandle, FileResult, HEADER_SIZE, PAGE_SIZE, PageId, PagedFileManager,
    close_page_file, create_page_file, destroy_page_file, open_page_file,
};

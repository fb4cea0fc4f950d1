use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::error::{FileError, FileResult};
use super::header::{encode_header, parse_header};
use super::{HEADER_SIZE, PAGE_SIZE, PageId, page_offset};

const ZERO_PAGE: [u8; PAGE_SIZE] = [0u8; PAGE_SIZE];

/// Handle to an open page file.
///
/// The handle is the only owner of the underlying `File`. The page count is
/// kept in memory and written back to the header by [`FileHandle::close`];
/// dropping a handle without closing it leaves the on-disk header stale.
#[derive(Debug)]
pub struct FileHandle {
    file_name: PathBuf,
    file: Option<File>,
    total_pages: usize,
    /// Page count as last read from or written to the header
    persisted_pages: usize,
    cur_page_pos: PageId,
}

impl FileHandle {
    fn new(file_name: PathBuf, file: File, total_pages: usize) -> Self {
        Self {
            file_name,
            file: Some(file),
            total_pages,
            persisted_pages: total_pages,
            cur_page_pos: 0,
        }
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    /// Number of pages, including ones appended but not yet persisted
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn invalid_handle(&self) -> FileError {
        FileError::InvalidHandle(self.file_name.display().to_string())
    }

    fn check_open(&self) -> FileResult<()> {
        if self.file.is_none() {
            return Err(self.invalid_handle());
        }
        Ok(())
    }

    fn file_mut(&mut self) -> FileResult<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| FileError::InvalidHandle(self.file_name.display().to_string()))
    }

    fn check_page(&self, page_num: PageId) -> FileResult<()> {
        if page_num >= self.total_pages {
            return Err(FileError::page_not_found(page_num, self.total_pages));
        }
        Ok(())
    }

    fn check_page_size(len: usize) -> FileResult<()> {
        if len != PAGE_SIZE {
            return Err(FileError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: len,
            });
        }
        Ok(())
    }

    /// Current cursor position (the last page read or appended)
    pub fn get_block_pos(&self) -> FileResult<PageId> {
        self.check_open()?;
        Ok(self.cur_page_pos)
    }

    /// Read a page into `buffer`, which must be exactly `PAGE_SIZE` bytes.
    /// Moves the cursor to `page_num` on success.
    pub fn read_block_into(&mut self, page_num: PageId, buffer: &mut [u8]) -> FileResult<()> {
        self.check_open()?;
        self.check_page(page_num)?;
        Self::check_page_size(buffer.len())?;

        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(page_offset(page_num)))?;
        file.read_exact(buffer)?;

        self.cur_page_pos = page_num;
        debug!("read page {} of {}", page_num, self.file_name.display());
        Ok(())
    }

    /// Read a page into a freshly allocated buffer
    pub fn read_block(&mut self, page_num: PageId) -> FileResult<Vec<u8>> {
        let mut buffer = vec![0u8; PAGE_SIZE];
        self.read_block_into(page_num, &mut buffer)?;
        Ok(buffer)
    }

    pub fn read_first_block(&mut self) -> FileResult<Vec<u8>> {
        self.read_block(0)
    }

    pub fn read_previous_block(&mut self) -> FileResult<Vec<u8>> {
        self.check_open()?;
        let page_num = self
            .cur_page_pos
            .checked_sub(1)
            .ok_or(FileError::PageNotFound {
                page: -1,
                total_pages: self.total_pages,
            })?;
        self.read_block(page_num)
    }

    pub fn read_current_block(&mut self) -> FileResult<Vec<u8>> {
        self.read_block(self.cur_page_pos)
    }

    pub fn read_next_block(&mut self) -> FileResult<Vec<u8>> {
        self.read_block(self.cur_page_pos + 1)
    }

    pub fn read_last_block(&mut self) -> FileResult<Vec<u8>> {
        self.check_open()?;
        let page_num = self
            .total_pages
            .checked_sub(1)
            .ok_or(FileError::PageNotFound {
                page: -1,
                total_pages: 0,
            })?;
        self.read_block(page_num)
    }

    /// Write a full page. The cursor is left where it was.
    pub fn write_block(&mut self, page_num: PageId, data: &[u8]) -> FileResult<()> {
        self.check_open()?;
        self.check_page(page_num)?;
        Self::check_page_size(data.len())?;

        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(page_offset(page_num)))?;
        file.write_all(data)?;

        debug!("wrote page {} of {}", page_num, self.file_name.display());
        Ok(())
    }

    pub fn write_current_block(&mut self, data: &[u8]) -> FileResult<()> {
        self.write_block(self.cur_page_pos, data)
    }

    /// Append one zero-filled page and make it the current page
    pub fn append_empty_block(&mut self) -> FileResult<()> {
        let offset = page_offset(self.total_pages);
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&ZERO_PAGE)?;

        self.total_pages += 1;
        self.cur_page_pos = self.total_pages - 1;
        debug!(
            "appended page {} to {}",
            self.cur_page_pos,
            self.file_name.display()
        );
        Ok(())
    }

    /// Grow the file until it holds at least `target_pages` pages.
    ///
    /// Appends one page at a time. The first failed append aborts the loop
    /// and its error is returned; pages appended before it are not rolled
    /// back, and `total_pages` and the cursor already reflect them. They are
    /// persisted by the next successful `close`. Never shrinks the file.
    pub fn ensure_capacity(&mut self, target_pages: usize) -> FileResult<()> {
        self.check_open()?;
        if self.total_pages >= target_pages {
            return Ok(());
        }

        debug!(
            "growing {} from {} to {} pages",
            self.file_name.display(),
            self.total_pages,
            target_pages
        );
        while self.total_pages < target_pages {
            self.append_empty_block()?;
        }
        Ok(())
    }

    /// Flush written pages to disk without touching the header
    pub fn sync(&mut self) -> FileResult<()> {
        self.file_mut()?.sync_data()?;
        Ok(())
    }

    /// Persist the page count to the header and release the file
    pub fn close(&mut self) -> FileResult<()> {
        self.close_with_sync(false)
    }

    fn close_with_sync(&mut self, sync: bool) -> FileResult<()> {
        let mut file = self.file.take().ok_or_else(|| self.invalid_handle())?;

        let written = write_header(&mut file, self.total_pages).and_then(|()| {
            if sync {
                file.sync_all()?;
            }
            Ok(())
        });
        if let Err(e) = written {
            // The handle is closed either way; the in-memory count is lost
            warn!(
                "{}: header write failed on close, header may still say {} pages instead of {}: {}",
                self.file_name.display(),
                self.persisted_pages,
                self.total_pages,
                e
            );
            return Err(e);
        }
        self.persisted_pages = self.total_pages;

        info!(
            "closed {} with {} pages",
            self.file_name.display(),
            self.total_pages
        );
        Ok(())
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        if self.file.is_some() && self.total_pages != self.persisted_pages {
            warn!(
                "{} dropped without close: header still says {} pages, handle has {}",
                self.file_name.display(),
                self.persisted_pages,
                self.total_pages
            );
        }
    }
}

/// Rewrite the header region at the start of `file`
fn write_header<F: Write + Seek>(file: &mut F, total_pages: usize) -> FileResult<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&encode_header(total_pages))?;
    file.flush()?;
    Ok(())
}

fn map_not_found(err: io::Error, path: &Path) -> FileError {
    if err.kind() == io::ErrorKind::NotFound {
        FileError::FileNotFound(path.display().to_string())
    } else {
        FileError::Io(err)
    }
}

/// Creates, opens, closes and removes page files
#[derive(Debug, Clone)]
pub struct PagedFileManager {
    /// Create missing parent directories in `create_file`
    create_parent_dirs: bool,
    /// fsync the file after the header is rewritten on close
    sync_on_close: bool,
}

impl PagedFileManager {
    /// Create a new paged file manager
    pub fn new() -> Self {
        Self {
            create_parent_dirs: true,
            sync_on_close: false,
        }
    }

    pub fn with_create_parent_dirs(mut self, create_parent_dirs: bool) -> Self {
        self.create_parent_dirs = create_parent_dirs;
        self
    }

    pub fn with_sync_on_close(mut self, sync_on_close: bool) -> Self {
        self.sync_on_close = sync_on_close;
        self
    }

    /// Create a page file holding one zero-filled page, replacing any
    /// existing file at `path`
    pub fn create_file<P: AsRef<Path>>(&self, path: P) -> FileResult<()> {
        let path = path.as_ref();

        if self.create_parent_dirs
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(path)?;
        file.write_all(&encode_header(1))?;
        file.write_all(&ZERO_PAGE)?;
        file.flush()?;
        if self.sync_on_close {
            file.sync_all()?;
        }

        info!("created page file {}", path.display());
        Ok(())
    }

    /// Open an existing page file for reading and writing
    pub fn open_file<P: AsRef<Path>>(&self, path: P) -> FileResult<FileHandle> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| map_not_found(e, path))?;

        let mut header = Vec::with_capacity(HEADER_SIZE);
        (&mut file).take(HEADER_SIZE as u64).read_to_end(&mut header)?;
        let total_pages = parse_header(&header)?;

        let expected_len = total_pages
            .checked_mul(PAGE_SIZE)
            .and_then(|n| n.checked_add(HEADER_SIZE))
            .ok_or_else(|| {
                FileError::CorruptHeader(format!("page count {total_pages} is out of range"))
            })?;
        let actual_len = file.metadata()?.len();
        if actual_len != expected_len as u64 {
            warn!(
                "{}: header says {} pages ({} bytes) but file is {} bytes",
                path.display(),
                total_pages,
                expected_len,
                actual_len
            );
        }

        info!("opened {} with {} pages", path.display(), total_pages);
        Ok(FileHandle::new(path.to_path_buf(), file, total_pages))
    }

    /// Write the page count back to the header and release the file
    pub fn close_file(&self, handle: &mut FileHandle) -> FileResult<()> {
        handle.close_with_sync(self.sync_on_close)
    }

    /// Remove (delete) a page file. No handle on it may be open.
    pub fn remove_file<P: AsRef<Path>>(&self, path: P) -> FileResult<()> {
        let path = path.as_ref();
        fs::remove_file(path).map_err(|e| map_not_found(e, path))?;
        info!("destroyed page file {}", path.display());
        Ok(())
    }
}

impl Default for PagedFileManager {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_page_file<P: AsRef<Path>>(path: P) -> FileResult<()> {
    PagedFileManager::new().create_file(path)
}

pub fn open_page_file<P: AsRef<Path>>(path: P) -> FileResult<FileHandle> {
    PagedFileManager::new().open_file(path)
}

pub fn close_page_file(handle: &mut FileHandle) -> FileResult<()> {
    PagedFileManager::new().close_file(handle)
}

pub fn destroy_page_file<P: AsRef<Path>>(path: P) -> FileResult<()> {
    PagedFileManager::new().remove_file(path)
}

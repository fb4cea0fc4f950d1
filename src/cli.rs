use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use prettytable::{Table, row};
use serde::Serialize;

use pagefile::{FileHandle, FileResult, HEADER_SIZE, PAGE_SIZE, PageId, PagedFileManager};

/// Inspect and edit page files
#[derive(Parser, Debug)]
#[command(name = "pagefile", version, about = "Page file tool")]
pub struct Cli {
    /// fsync on create and close
    #[arg(long, global = true)]
    pub sync: bool,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Create a page file with one empty page (replaces an existing file)
    Create { path: PathBuf },
    /// Delete a page file
    Destroy { path: PathBuf },
    /// Show page count and size of a page file
    Info {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print one page, raw or as a hex dump
    Read {
        path: PathBuf,
        page: PageId,
        #[arg(long)]
        hex: bool,
    },
    /// Overwrite one page with a fill byte or a file's contents (zero-padded)
    Write {
        path: PathBuf,
        page: PageId,
        #[arg(long, conflicts_with = "input", required_unless_present = "input")]
        fill: Option<u8>,
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Append empty pages
    Append {
        path: PathBuf,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Grow the file to at least `pages` pages
    Ensure { path: PathBuf, pages: usize },
}

#[derive(Debug, Serialize)]
struct FileInfo {
    file_name: String,
    total_pages: usize,
    page_size: usize,
    header_size: usize,
    file_size: u64,
    consistent: bool,
}

/// Open `path`, run `f`, and close the handle whether or not `f` failed
fn with_handle<T>(
    manager: &PagedFileManager,
    path: &Path,
    f: impl FnOnce(&mut FileHandle) -> FileResult<T>,
) -> Result<T> {
    let mut handle = manager
        .open_file(path)
        .with_context(|| format!("open {}", path.display()))?;
    let result = f(&mut handle);
    let closed = manager.close_file(&mut handle);

    let value = result.with_context(|| path.display().to_string())?;
    closed.with_context(|| format!("close {}", path.display()))?;
    Ok(value)
}

pub fn run(cli: Cli) -> Result<()> {
    let manager = PagedFileManager::new().with_sync_on_close(cli.sync);

    match cli.cmd {
        Cmd::Create { path } => {
            manager
                .create_file(&path)
                .with_context(|| format!("create {}", path.display()))?;
        }
        Cmd::Destroy { path } => {
            manager
                .remove_file(&path)
                .with_context(|| format!("destroy {}", path.display()))?;
        }
        Cmd::Info { path, json } => {
            let info = with_handle(&manager, &path, |handle| {
                let file_size = fs::metadata(handle.file_name())?.len();
                let total_pages = handle.total_pages();
                Ok(FileInfo {
                    file_name: handle.file_name().display().to_string(),
                    total_pages,
                    page_size: PAGE_SIZE,
                    header_size: HEADER_SIZE,
                    file_size,
                    consistent: file_size == (HEADER_SIZE + total_pages * PAGE_SIZE) as u64,
                })
            })?;
            print_info(&info, json)?;
        }
        Cmd::Read { path, page, hex } => {
            let data = with_handle(&manager, &path, |handle| handle.read_block(page))?;
            let mut out = std::io::stdout().lock();
            if hex {
                write_hex_dump(&mut out, &data)?;
            } else {
                out.write_all(&data)?;
            }
            out.flush()?;
        }
        Cmd::Write {
            path,
            page,
            fill,
            input,
        } => {
            let data = match (fill, input) {
                (Some(byte), _) => vec![byte; PAGE_SIZE],
                (None, Some(input)) => {
                    let mut data = fs::read(&input)
                        .with_context(|| format!("read {}", input.display()))?;
                    if data.len() > PAGE_SIZE {
                        bail!(
                            "{} is {} bytes, larger than a page ({} bytes)",
                            input.display(),
                            data.len(),
                            PAGE_SIZE
                        );
                    }
                    data.resize(PAGE_SIZE, 0);
                    data
                }
                (None, None) => bail!("either --fill or --input is required"),
            };
            with_handle(&manager, &path, |handle| handle.write_block(page, &data))?;
        }
        Cmd::Append { path, count } => {
            let total = with_handle(&manager, &path, |handle| {
                for _ in 0..count {
                    handle.append_empty_block()?;
                }
                Ok(handle.total_pages())
            })?;
            println!("{total}");
        }
        Cmd::Ensure { path, pages } => {
            let total = with_handle(&manager, &path, |handle| {
                handle.ensure_capacity(pages)?;
                Ok(handle.total_pages())
            })?;
            println!("{total}");
        }
    }

    Ok(())
}

fn print_info(info: &FileInfo, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(info)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row!["file", info.file_name]);
    table.add_row(row!["total pages", info.total_pages]);
    table.add_row(row!["page size", info.page_size]);
    table.add_row(row!["header size", info.header_size]);
    table.add_row(row!["file size", info.file_size]);
    table.add_row(row!["consistent", info.consistent]);
    table.printstd();
    Ok(())
}

fn write_hex_dump<W: Write>(out: &mut W, data: &[u8]) -> std::io::Result<()> {
    for (i, chunk) in data.chunks(16).enumerate() {
        write!(out, "{:08x} ", i * 16)?;
        for byte in chunk {
            write!(out, " {byte:02x}")?;
        }
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
            .collect();
        writeln!(out, "  |{ascii}|")?;
    }
    Ok(())
}

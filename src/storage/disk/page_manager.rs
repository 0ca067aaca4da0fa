use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Raw page I/O over one file. Page `n` lives at byte `n * page_size`.
#[derive(Debug)]
pub struct PageManager {
    file: File,
    page_size: usize,
}

impl PageManager {
    /// Open a file, creating it empty if it does not exist.
    pub fn open(path: &Path, page_size: usize) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self { file, page_size })
    }

    pub fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> StorageResult<()> {
        self.check_len(buf.len())?;

        self.file.seek(SeekFrom::Start(self.page_offset(page_id)))?;
        self.file.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => StorageError::ShortRead {
                page_id,
                expected: self.page_size,
            },
            _ => StorageError::Io(e),
        })
    }

    pub fn write_page(&mut self, page_id: PageId, data: &[u8]) -> StorageResult<()> {
        self.check_len(data.len())?;

        self.file.seek(SeekFrom::Start(self.page_offset(page_id)))?;
        self.file.write_all(data)?;
        self.file.sync_all()?;

        Ok(())
    }

    /// Number of whole pages in the file. A trailing partial page is not counted.
    pub fn num_pages(&self) -> StorageResult<u32> {
        let file_size = self.file.metadata()?.len();
        Ok((file_size / self.page_size as u64) as u32)
    }

    /// Append a zeroed page and return its page number.
    pub fn allocate_page(&mut self) -> StorageResult<u32> {
        let current_pages = self.num_pages()?;

        let new_size = (current_pages as u64 + 1) * self.page_size as u64;
        self.file.set_len(new_size)?;
        self.file.sync_all()?;

        Ok(current_pages)
    }

    fn check_len(&self, len: usize) -> StorageResult<()> {
        if len != self.page_size {
            return Err(StorageError::IllegalState(
                "page buffer length differs from the file's page size",
            ));
        }
        Ok(())
    }

    fn page_offset(&self, page_id: PageId) -> u64 {
        page_id.page_number as u64 * self.page_size as u64
    }
}

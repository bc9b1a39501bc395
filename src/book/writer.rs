use std::io::{self, Write};

use super::Book;
use crate::error::Result;

/// Write handle for a file opened with [`Book::create_file`].
///
/// Only one file can be open at a time; the handle borrows the book until
/// it is closed or dropped.
pub struct FileWriter<'a> {
    book: &'a mut Book,
    closed: bool,
}

impl<'a> FileWriter<'a> {
    pub(super) fn new(book: &'a mut Book) -> Self {
        Self {
            book,
            closed: false,
        }
    }

    /// Close the file, reporting any error from the driver.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.book.close_entry()
    }
}

impl Write for FileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.book.write_bytes(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for FileWriter<'_> {
    fn drop(&mut self) {
        if !self.closed
            && let Err(e) = self.book.close_entry()
        {
            log::warn!("closing file failed: {e}");
        }
    }
}

//! Physical packaging of books.
//!
//! A [`Driver`] receives the files a [`Book`](crate::Book) produces and
//! decides where the bytes go: into an EPUB container ([`ArchiveDriver`]) or
//! onto a plain directory tree ([`DirectoryDriver`]) for inspection.

use std::io::Write;

use crate::book::Package;
use crate::error::Result;

mod archive;
mod directory;
mod package;

pub use archive::{ArchiveConfig, ArchiveDriver};
pub use directory::DirectoryDriver;
pub use package::{CONTAINER_XML, EPUB_MIME_TYPE, generate_opf};

/// Root directory of the content files inside the package.
pub const CONTENT_DIR: &str = "OEBPS";

/// Template selection key reported by a driver.
///
/// Archive output is read by e-readers and uses EPUB markup; directory output
/// is meant to be opened in a browser and gets plain XHTML with navigation
/// links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Epub,
    Xhtml,
}

/// Capability interface for writing a book's files somewhere.
///
/// The book writer keeps at most one entry open at a time: it calls
/// [`create`](Driver::create), writes through [`writer`](Driver::writer),
/// then calls [`finish_entry`](Driver::finish_entry).
pub trait Driver {
    /// Map a path relative to the content root onto an entry name relative
    /// to the output root.
    fn make_path(&self, path: &str) -> String;

    /// Start a new entry at `target` (as returned by `make_path`).
    fn create(&mut self, target: &str) -> Result<()>;

    /// Stream for the entry started by the last `create`.
    fn writer(&mut self) -> Result<&mut dyn Write>;

    /// Finish the current entry.
    fn finish_entry(&mut self) -> Result<()>;

    fn flavor(&self) -> Flavor;

    /// Write the structural package documents and finalize the output.
    fn close(&mut self, package: &Package) -> Result<()>;
}

/// Join [`CONTENT_DIR`] and a package-relative path.
pub(crate) fn content_path(path: &str) -> String {
    format!("{CONTENT_DIR}/{path}")
}

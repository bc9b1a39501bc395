//! Book assembly.
//!
//! A [`Book`] receives a stream of section and text events and turns it into
//! numbered XHTML chapters, a table of contents, and the package documents.
//! The physical output is delegated to a [`Driver`].
//!
//! ```no_run
//! use epubtex::Book;
//!
//! let mut book = Book::create_epub("out.epub", "my-book")?;
//! book.add_title("A Book", &["Some Author".to_string()])?;
//! book.add_section(1, "Introduction", None)?;
//! book.write_str("<p>Hello.</p>\n")?;
//! book.close()?;
//! # Ok::<(), epubtex::Error>(())
//! ```

use std::fs;
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::epub::{ArchiveConfig, ArchiveDriver, DirectoryDriver, Driver, Flavor};
use crate::error::{Error, Result};
use crate::util::time_now_rfc3339;

mod media;
mod section;
mod store;
mod templates;
mod writer;

pub use media::{File, MediaType};
pub use section::{Nav, SecNo, TocEntry};
pub use store::ContentStore;
pub use templates::STYLESHEET;
pub use writer::FileWriter;

use templates::Templates;

/// Namespace for deriving book identifiers.
const BASE_NAMESPACE_URL: &str = "http://ebook.seehuhn.de/";

const CSS_NAME: &str = "book";
const NAV_NAME: &str = "nav";
const COVER_NAME: &str = "cover";
const TITLE_NAME: &str = "title";
const FRONT_NAME: &str = "front";

/// Book metadata.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    /// RFC 3339 timestamp of this build.
    pub last_modified: String,
}

/// Configuration for a new book.
#[derive(Debug, Clone)]
pub struct BookConfig {
    pub language: String,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            language: "en-GB".to_string(),
        }
    }
}

impl BookConfig {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// Everything a driver needs to write the package documents.
#[derive(Debug, Clone)]
pub struct Package {
    pub uuid: Uuid,
    pub metadata: Metadata,
    pub files: ContentStore,
    /// Content files in reading order.
    pub spine: Vec<File>,
    pub nav: Nav,
    pub nav_path: String,
    pub css_path: String,
    pub cover_image_id: Option<String>,
    pub cover_id: Option<String>,
}

impl Package {
    fn new(identifier: &str, config: BookConfig) -> Self {
        let mut files = ContentStore::new();
        let nav_path = files.register(NAV_NAME, MediaType::Xhtml).path;
        let css_path = files.register(CSS_NAME, MediaType::Css).path;

        Self {
            uuid: book_uuid(identifier),
            metadata: Metadata {
                language: config.language,
                last_modified: time_now_rfc3339(),
                ..Default::default()
            },
            files,
            spine: Vec::new(),
            nav: Nav::new(),
            nav_path,
            css_path,
            cover_image_id: None,
            cover_id: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new("test", BookConfig::default())
    }
}

/// Derive the book's UUID from a caller supplied identifier.
///
/// The same identifier always gives the same UUID, so rebuilding a book
/// does not turn it into a different publication.
pub fn book_uuid(identifier: &str) -> Uuid {
    let namespace = Uuid::new_v5(&Uuid::NAMESPACE_URL, BASE_NAMESPACE_URL.as_bytes());
    Uuid::new_v5(&namespace, identifier.as_bytes())
}

/// A book under construction.
///
/// Single writer: at most one output file is open at any time. Sections
/// are numbered hierarchically and recorded in the table of contents.
pub struct Book {
    package: Package,
    number: SecNo,
    depth: usize,
    chapter_path: String,
    file_open: bool,
    /// Stylesheet and nav document written, no more content accepted.
    sealed: bool,
    open: bool,
    driver: Box<dyn Driver>,
}

impl Book {
    /// Create a book writing through `driver`.
    pub fn new(driver: Box<dyn Driver>, identifier: &str) -> Self {
        Self::with_config(driver, identifier, BookConfig::default())
    }

    pub fn with_config(driver: Box<dyn Driver>, identifier: &str, config: BookConfig) -> Self {
        Self {
            package: Package::new(identifier, config),
            number: SecNo::default(),
            depth: 0,
            chapter_path: String::new(),
            file_open: false,
            sealed: false,
            open: true,
            driver,
        }
    }

    /// Create a book that writes an EPUB container to `writer`.
    pub fn epub<W: Write + Seek + 'static>(writer: W, identifier: &str) -> Result<Self> {
        let driver = ArchiveDriver::new(writer, ArchiveConfig::default())?;
        Ok(Self::new(Box::new(driver), identifier))
    }

    /// Create a book that writes an EPUB container to the file at `path`.
    pub fn create_epub<P: AsRef<Path>>(path: P, identifier: &str) -> Result<Self> {
        let file = fs::File::create(path)?;
        Self::epub(BufWriter::new(file), identifier)
    }

    /// Create a book that writes plain files below `base`.
    pub fn directory(base: impl Into<PathBuf>, identifier: &str) -> Result<Self> {
        let driver = DirectoryDriver::new(base)?;
        Ok(Self::new(Box::new(driver), identifier))
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn uuid(&self) -> Uuid {
        self.package.uuid
    }

    pub fn metadata(&self) -> &Metadata {
        &self.package.metadata
    }

    pub fn files(&self) -> &ContentStore {
        &self.package.files
    }

    pub fn spine(&self) -> &[File] {
        &self.package.spine
    }

    pub fn nav(&self) -> &[TocEntry] {
        self.package.nav.entries()
    }

    pub fn section_number(&self) -> &SecNo {
        &self.number
    }

    /// Number of currently open section levels.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_closed(&self) -> bool {
        !self.open
    }

    pub fn flavor(&self) -> Flavor {
        self.driver.flavor()
    }

    /// Register a new file with the book.
    ///
    /// Files in the spine are appended to the reading order.
    pub fn register_file(
        &mut self,
        base_name: &str,
        media_type: MediaType,
        in_spine: bool,
    ) -> File {
        let file = self.package.files.register(base_name, media_type);
        if in_spine {
            self.package.spine.push(file.clone());
        }
        file
    }

    /// Open `file` for writing.
    ///
    /// Any open sections are closed first. The returned handle closes the
    /// file when dropped.
    pub fn create_file(&mut self, file: &File) -> Result<FileWriter<'_>> {
        self.ensure_open()?;
        self.close_sections(0)?;
        self.open_entry(&file.path)?;
        Ok(FileWriter::new(self))
    }

    /// Start a new section at `level`.
    ///
    /// `level` may be at most one deeper than the current depth. Top-level
    /// sections start a new chapter file. Without an explicit `id`, an anchor
    /// is derived from the section number.
    pub fn add_section(&mut self, level: usize, title: &str, id: Option<&str>) -> Result<()> {
        self.ensure_open()?;
        if level == 0 || level > self.depth + 1 {
            return Err(Error::WrongSectionLevel {
                level,
                depth: self.depth,
            });
        }
        self.close_sections(level - 1)?;
        self.depth = level;
        self.number.inc(level);

        if !self.file_open {
            let file = self.register_file(&format!("ch{}", self.number), MediaType::Xhtml, true);
            self.open_entry(&file.path)?;
            self.chapter_path = file.path;
            let head = self.templates().chapter_head(title);
            self.write_raw(&head)?;
        }

        let id = match id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("epub-{}", self.number),
        };
        self.package
            .nav
            .push(level, title, self.chapter_path.clone(), id.clone());

        let head = self
            .templates()
            .section_head(level, &self.number, title, &id);
        self.write_raw(&head)
    }

    /// Append text to the current section.
    ///
    /// Text before the first section goes into a front matter file.
    pub fn write_str(&mut self, text: &str) -> Result<()> {
        self.ensure_open()?;
        if !self.file_open {
            if self.depth > 0 || !self.number.is_front() {
                return Err(Error::UnexpectedFrontMatter);
            }
            self.depth = 1;
            self.number = SecNo::front();

            let file = self.register_file(FRONT_NAME, MediaType::Xhtml, true);
            self.open_entry(&file.path)?;
            self.chapter_path = file.path;
            let head = self.templates().front_head();
            self.write_raw(&head)?;
        }
        self.write_raw(text)
    }

    /// Add a cover image and a page showing it.
    ///
    /// The image type is sniffed from the data; anything but PNG or JPEG
    /// is rejected.
    pub fn add_cover_image<R: Read>(&mut self, mut reader: R) -> Result<()> {
        self.ensure_open()?;

        let mut head = Vec::with_capacity(512);
        reader.by_ref().take(512).read_to_end(&mut head)?;
        let mime = infer::get(&head)
            .map(|kind| kind.mime_type())
            .unwrap_or("application/octet-stream");
        if !mime.starts_with("image/") {
            return Err(Error::WrongFileType(mime.to_string()));
        }
        let media_type = MediaType::from_mime(mime)?;

        let image = self.register_file(COVER_NAME, media_type, false);
        let mut out = self.create_file(&image)?;
        out.write_all(&head)?;
        io::copy(&mut reader, &mut out)?;
        out.close()?;
        self.package.cover_image_id = Some(image.id);

        let page = self.register_file(COVER_NAME, MediaType::Xhtml, true);
        let content = self.templates().cover_page(&image.path);
        self.add_file_from_template(&page.path, &content)?;
        self.package.cover_id = Some(page.id);
        Ok(())
    }

    /// Record title and authors and add a title page.
    pub fn add_title(&mut self, title: &str, authors: &[String]) -> Result<()> {
        self.ensure_open()?;

        self.package.metadata.title = title.to_string();
        self.package.metadata.authors = authors.to_vec();
        let file = self.register_file(TITLE_NAME, MediaType::Xhtml, true);
        let content = self.templates().title_page(title, authors);
        self.add_file_from_template(&file.path, &content)
    }

    /// Finish the book and hand it to the driver.
    ///
    /// Once this succeeds, calling `close` again has no effect. If the
    /// driver fails, the book stays open but accepts no more content, and
    /// `close` hands it to the driver again.
    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }

        if !self.sealed {
            self.close_sections(0)?;
            self.package.nav.seal();

            let css_path = self.package.css_path.clone();
            self.add_file_from_template(&css_path, STYLESHEET)?;

            let fallback = self.package.spine.first().map(|f| f.path.as_str());
            let nav = self
                .templates()
                .nav_document(self.package.nav.entries(), fallback);
            let nav_path = self.package.nav_path.clone();
            self.add_file_from_template(&nav_path, &nav)?;
            self.sealed = true;
        }

        log::info!(
            "closing book: {} files, {} sections",
            self.package.files.len(),
            self.package.nav.len()
        );
        self.driver.close(&self.package)?;
        self.open = false;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open && !self.sealed {
            Ok(())
        } else {
            Err(Error::BookClosed)
        }
    }

    fn templates(&self) -> Templates<'_> {
        Templates {
            flavor: self.driver.flavor(),
            language: &self.package.metadata.language,
            css_path: &self.package.css_path,
            nav_path: &self.package.nav_path,
        }
    }

    fn open_entry(&mut self, path: &str) -> Result<()> {
        if self.file_open {
            log::warn!("file not closed before writing {path}");
            self.close_entry()?;
        }
        log::info!("writing {path} ...");
        let target = self.driver.make_path(path);
        self.driver.create(&target)?;
        self.file_open = true;
        Ok(())
    }

    pub(crate) fn close_entry(&mut self) -> Result<()> {
        self.file_open = false;
        self.driver.finish_entry()
    }

    pub(crate) fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.driver.writer()?.write_all(buf)?;
        Ok(())
    }

    fn write_raw(&mut self, text: &str) -> Result<()> {
        self.write_bytes(text.as_bytes())
    }

    fn add_file_from_template(&mut self, path: &str, content: &str) -> Result<()> {
        self.close_sections(0)?;
        self.open_entry(path)?;
        self.write_raw(content)?;
        self.close_entry()
    }

    /// Close open sections until only `level` remain.
    ///
    /// Closing the last level also finishes the chapter file.
    fn close_sections(&mut self, level: usize) -> Result<()> {
        if self.depth <= level {
            return Ok(());
        }

        while self.depth > level {
            // The front matter pseudo-section has no heading to close.
            if !(self.depth == 1 && self.number.is_front()) {
                let tail = self.templates().section_tail();
                self.write_raw(tail)?;
            }
            self.depth -= 1;
        }

        if self.depth == 0 {
            let tail = if self.number.is_front() {
                self.templates().front_tail()
            } else {
                self.templates().chapter_tail()
            };
            self.write_raw(&tail)?;
            self.close_entry()?;
        }
        Ok(())
    }
}

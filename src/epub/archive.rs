//! EPUB container output.

use std::io::{self, Seek, Write};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::package::{CONTAINER_XML, EPUB_MIME_TYPE, generate_opf};
use super::{Driver, Flavor, content_path};
use crate::book::Package;
use crate::error::{Error, Result};

/// Configuration for EPUB container output.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Compression level for deflate (0-9, default 9).
    pub compression_level: i64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: 9,
        }
    }
}

impl ArchiveConfig {
    pub fn with_compression_level(mut self, level: i64) -> Self {
        self.compression_level = level;
        self
    }
}

/// Writes a book into a ZIP container following the EPUB OCF rules.
pub struct ArchiveDriver<W: Write + Seek> {
    zip: Option<ZipWriter<W>>,
    finished: Option<W>,
    deflated: SimpleFileOptions,
    in_entry: bool,
}

impl<W: Write + Seek> ArchiveDriver<W> {
    /// Start a container on `writer`.
    ///
    /// The `mimetype` entry is written immediately: it must be the first
    /// entry of the archive and must be stored uncompressed.
    pub fn new(writer: W, config: ArchiveConfig) -> Result<Self> {
        let mut zip = ZipWriter::new(writer);

        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file("mimetype", stored)?;
        zip.write_all(EPUB_MIME_TYPE.as_bytes())?;

        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(config.compression_level));

        Ok(Self {
            zip: Some(zip),
            finished: None,
            deflated,
            in_entry: false,
        })
    }

    /// The underlying writer, once the container has been closed.
    pub fn into_inner(self) -> Option<W> {
        self.finished
    }

    fn zip(&mut self) -> Result<&mut ZipWriter<W>> {
        self.zip.as_mut().ok_or(Error::BookClosed)
    }

    fn write_entry(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let options = self.deflated;
        let zip = self.zip()?;
        zip.start_file(name, options)?;
        zip.write_all(data)?;
        Ok(())
    }
}

impl<W: Write + Seek> Driver for ArchiveDriver<W> {
    fn make_path(&self, path: &str) -> String {
        content_path(path)
    }

    fn create(&mut self, target: &str) -> Result<()> {
        let options = self.deflated;
        self.zip()?.start_file(target, options)?;
        self.in_entry = true;
        Ok(())
    }

    fn writer(&mut self) -> Result<&mut dyn Write> {
        if !self.in_entry {
            return Err(io::Error::other("no archive entry open").into());
        }
        let zip: &mut dyn Write = self.zip()?;
        Ok(zip)
    }

    fn finish_entry(&mut self) -> Result<()> {
        // The zip writer finishes an entry when the next one starts.
        self.in_entry = false;
        Ok(())
    }

    fn flavor(&self) -> Flavor {
        Flavor::Epub
    }

    fn close(&mut self, package: &Package) -> Result<()> {
        self.in_entry = false;
        self.write_entry("META-INF/container.xml", CONTAINER_XML.as_bytes())?;
        let opf = generate_opf(package);
        self.write_entry(&content_path("content.opf"), opf.as_bytes())?;

        let Some(zip) = self.zip.take() else {
            return Ok(());
        };
        let mut inner = zip.finish()?;
        inner.flush()?;
        self.finished = Some(inner);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use zip::ZipArchive;

    use super::*;

    fn memory_driver() -> ArchiveDriver<Cursor<Vec<u8>>> {
        ArchiveDriver::new(Cursor::new(Vec::new()), ArchiveConfig::default()).unwrap()
    }

    #[test]
    fn test_mimetype_is_first_and_stored() {
        let mut driver = memory_driver();
        let target = driver.make_path("ch1.xhtml");
        assert_eq!(target, "OEBPS/ch1.xhtml");
        driver.create(&target).unwrap();
        driver.writer().unwrap().write_all(b"<html/>").unwrap();
        driver.finish_entry().unwrap();
        driver.close(&Package::for_tests()).unwrap();

        let bytes = driver.into_inner().unwrap().into_inner();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let mut first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), CompressionMethod::Stored);
        let mut content = String::new();
        first.read_to_string(&mut content).unwrap();
        assert_eq!(content, "application/epub+zip");
        drop(first);

        let chapter = archive.by_name("OEBPS/ch1.xhtml").unwrap();
        assert_eq!(chapter.compression(), CompressionMethod::Deflated);
        drop(chapter);
        assert!(archive.by_name("META-INF/container.xml").is_ok());
        assert!(archive.by_name("OEBPS/content.opf").is_ok());
    }

    #[test]
    fn test_writer_requires_entry() {
        let mut driver = memory_driver();
        assert!(driver.writer().is_err());
    }

    #[test]
    fn test_second_close_reports_closed() {
        let mut driver = memory_driver();
        let package = Package::for_tests();
        driver.close(&package).unwrap();
        assert!(matches!(driver.close(&package), Err(Error::BookClosed)));
    }
}

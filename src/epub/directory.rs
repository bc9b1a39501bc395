//! Unpacked output onto a directory tree.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::package::{CONTAINER_XML, EPUB_MIME_TYPE, generate_opf};
use super::{Driver, Flavor, content_path};
use crate::book::Package;
use crate::error::Result;

/// Mirrors the package tree under a base directory, uncompressed.
///
/// Useful for looking at the generated XHTML in a browser.
pub struct DirectoryDriver {
    base: PathBuf,
    current: Option<BufWriter<fs::File>>,
}

impl DirectoryDriver {
    pub fn new(base: impl Into<PathBuf>) -> Result<Self> {
        let base = base.into();
        fs::create_dir_all(&base)?;
        fs::write(base.join("mimetype"), EPUB_MIME_TYPE)?;
        Ok(Self {
            base,
            current: None,
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn write_file(&self, rel: &str, data: &[u8]) -> Result<()> {
        let path = self.base.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }
}

impl Driver for DirectoryDriver {
    fn make_path(&self, path: &str) -> String {
        content_path(path)
    }

    /// `target` is relative to the base directory.
    fn create(&mut self, target: &str) -> Result<()> {
        self.finish_entry()?;
        let path = self.base.join(target);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.current = Some(BufWriter::new(fs::File::create(path)?));
        Ok(())
    }

    fn writer(&mut self) -> Result<&mut dyn Write> {
        match self.current.as_mut() {
            Some(out) => Ok(out as &mut dyn Write),
            None => Err(std::io::Error::other("no file open").into()),
        }
    }

    fn finish_entry(&mut self) -> Result<()> {
        if let Some(mut out) = self.current.take() {
            out.flush()?;
        }
        Ok(())
    }

    fn flavor(&self) -> Flavor {
        Flavor::Xhtml
    }

    fn close(&mut self, package: &Package) -> Result<()> {
        self.finish_entry()?;
        self.write_file("META-INF/container.xml", CONTAINER_XML.as_bytes())?;
        self.write_file(&content_path("content.opf"), generate_opf(package).as_bytes())
    }
}

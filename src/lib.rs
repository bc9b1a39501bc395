//! # epubtex
//!
//! Building blocks for converting LaTeX documents into EPUB books.
//!
//! ## Features
//!
//! - Assemble numbered chapters, sections and a table of contents
//! - Write an EPUB container or a browsable directory of XHTML files
//! - Render TeX formulas to cropped PNG images, with an on-disk cache
//! - Expand LaTeX macros, with packages supplied by an explicit registry
//!
//! ## Quick Start
//!
//! ```no_run
//! use epubtex::Book;
//!
//! let mut book = Book::create_epub("output.epub", "urn:example:book")?;
//! book.add_title("My Book", &["Author Name".to_string()])?;
//! book.add_section(1, "Introduction", None)?;
//! book.write_str("<p>Hello.</p>\n")?;
//! book.add_section(2, "Details", None)?;
//! book.write_str("<p>More.</p>\n")?;
//! book.close()?;
//! # Ok::<(), epubtex::Error>(())
//! ```
//!
//! Formulas are collected with a [`math::Renderer`] and rendered in one
//! batch before the text that uses them is written.

pub mod book;
pub mod epub;
pub mod error;
pub mod macros;
pub mod math;
pub(crate) mod util;

pub use book::{Book, BookConfig, File, FileWriter, MediaType, Metadata, SecNo, TocEntry};
pub use epub::{ArchiveConfig, Driver, Flavor};
pub use error::{Error, Result};
pub use macros::{Macro, MacroTable, PackageRegistry, Session};
pub use math::{CacheConfig, LatexTypesetter, Renderer};

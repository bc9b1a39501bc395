//! Media types and registered files.

use crate::error::{Error, Result};

/// The media types a book may contain.
///
/// Each variant fixes the subdirectory and extension used for its files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Xhtml,
    Css,
    Png,
    Jpeg,
}

impl MediaType {
    /// Look up a media type by its MIME string.
    pub fn from_mime(mime: &str) -> Result<Self> {
        match mime {
            "application/xhtml+xml" => Ok(MediaType::Xhtml),
            "text/css" => Ok(MediaType::Css),
            "image/png" => Ok(MediaType::Png),
            "image/jpeg" => Ok(MediaType::Jpeg),
            other => Err(Error::UnsupportedMediaType(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Xhtml => "application/xhtml+xml",
            MediaType::Css => "text/css",
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
        }
    }

    /// Subdirectory (with trailing slash) for files of this type.
    pub fn dir(self) -> &'static str {
        match self {
            MediaType::Xhtml => "",
            MediaType::Css => "css/",
            MediaType::Png | MediaType::Jpeg => "img/",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaType::Xhtml => ".xhtml",
            MediaType::Css => ".css",
            MediaType::Png => ".png",
            MediaType::Jpeg => ".jpg",
        }
    }

    pub fn is_image(self) -> bool {
        matches!(self, MediaType::Png | MediaType::Jpeg)
    }
}

/// A file registered with a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// Manifest id (`f0`, `f1`, ...).
    pub id: String,
    pub media_type: MediaType,
    /// Path relative to the package root, e.g. `img/cover.png`.
    pub path: String,
}

//! Error types for epubtex operations.

use thiserror::Error;

/// Errors that can occur while assembling a book or rendering formulas.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("attempt to write in a closed book")]
    BookClosed,

    #[error("wrong section level {level} (current depth {depth})")]
    WrongSectionLevel { level: usize, depth: usize },

    #[error("wrong file type: {0}")]
    WrongFileType(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("unexpected front matter after sections started")]
    UnexpectedFrontMatter,

    #[error("invalid math environment {0:?}")]
    InvalidMathEnvironment(String),

    #[error("typesetter returned too few images ({rendered} of {expected})")]
    MissingImage { rendered: usize, expected: usize },

    #[error("rendered formula contains no ink: {0:?}")]
    BlankImage(String),

    #[error("typesetting failed: {0}")]
    Typesetting(String),

    #[error("unknown macro {0}")]
    UnknownMacro(String),
}

pub type Result<T> = std::result::Result<T, Error>;

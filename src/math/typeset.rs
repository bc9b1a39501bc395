//! Typesetting backends.
//!
//! A [`Typesetter`] turns a TeX document into one raster per page. The
//! formula renderer opens at most one session per batch.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::DynamicImage;
use tempfile::TempDir;

use crate::error::{Error, Result};

/// Lazily produced page images, in page order.
pub type Pages<'a> = Box<dyn Iterator<Item = Result<DynamicImage>> + 'a>;

/// A typesetting backend.
pub trait Typesetter {
    /// Start a session rendering pages at `resolution` dots per inch.
    fn open(&self, resolution: u32) -> Result<Box<dyn TypesetSession>>;
}

/// An open typesetting session.
pub trait TypesetSession {
    /// Typeset `source` and return its pages.
    ///
    /// The pages must be in page order; the renderer pairs them with the
    /// submitted formulas by position.
    fn submit(&mut self, source: &str) -> Result<Pages<'_>>;

    /// Release the backend's resources.
    fn finish(self: Box<Self>) -> Result<()>;
}

const JOB_NAME: &str = "formulas";

/// Typesetting with `pdflatex`, rasterised by Ghostscript.
#[derive(Debug, Clone)]
pub struct LatexTypesetter {
    latex: PathBuf,
    ghostscript: PathBuf,
}

impl LatexTypesetter {
    /// Find `pdflatex` and `gs` on the search path.
    pub fn new() -> Result<Self> {
        Ok(Self {
            latex: find_program("pdflatex")?,
            ghostscript: find_program("gs")?,
        })
    }

    pub fn with_programs(latex: impl Into<PathBuf>, ghostscript: impl Into<PathBuf>) -> Self {
        Self {
            latex: latex.into(),
            ghostscript: ghostscript.into(),
        }
    }
}

fn find_program(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|e| Error::Typesetting(format!("`{name}` not found: {e}")))
}

impl Typesetter for LatexTypesetter {
    fn open(&self, resolution: u32) -> Result<Box<dyn TypesetSession>> {
        let dir = tempfile::Builder::new().prefix("epubtex-").tempdir()?;
        log::debug!("typesetting in {}", dir.path().display());
        Ok(Box::new(LatexSession {
            dir,
            resolution,
            latex: self.latex.clone(),
            ghostscript: self.ghostscript.clone(),
        }))
    }
}

struct LatexSession {
    dir: TempDir,
    resolution: u32,
    latex: PathBuf,
    ghostscript: PathBuf,
}

impl TypesetSession for LatexSession {
    fn submit(&mut self, source: &str) -> Result<Pages<'_>> {
        let dir = self.dir.path();
        fs::write(dir.join(format!("{JOB_NAME}.tex")), source)?;

        let tex_file = format!("{JOB_NAME}.tex");
        let status = run(
            &self.latex,
            dir,
            [
                "-interaction=batchmode",
                "-halt-on-error",
                tex_file.as_str(),
            ],
        );
        if let Err(e) = status {
            // batch mode keeps the details in the log file
            let log = fs::read_to_string(dir.join(format!("{JOB_NAME}.log"))).unwrap_or_default();
            let tail: Vec<_> = log.lines().rev().take(20).collect();
            let tail: Vec<_> = tail.into_iter().rev().collect();
            return Err(Error::Typesetting(format!("{e}\n{}", tail.join("\n"))));
        }

        let resolution = format!("-r{}", self.resolution);
        let pdf_file = format!("{JOB_NAME}.pdf");
        run(
            &self.ghostscript,
            dir,
            [
                "-dSAFER",
                "-dBATCH",
                "-dNOPAUSE",
                "-dQUIET",
                "-sDEVICE=pngalpha",
                resolution.as_str(),
                "-dTextAlphaBits=4",
                "-dGraphicsAlphaBits=4",
                "-sOutputFile=page-%d.png",
                pdf_file.as_str(),
            ],
        )?;

        let dir = dir.to_path_buf();
        Ok(Box::new((1..).map_while(move |n: usize| {
            let page = dir.join(format!("page-{n}.png"));
            if !page.is_file() {
                return None;
            }
            Some(image::open(&page).map_err(Error::from))
        })))
    }

    fn finish(self: Box<Self>) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

fn run<I, S>(program: &Path, dir: &Path, args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = program.display().to_string();
    log::debug!("running {name}");
    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| Error::Typesetting(format!("failed to run `{name}`: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Typesetting(format!(
            "`{name}` failed with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

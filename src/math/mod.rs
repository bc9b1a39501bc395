//! Rendering of TeX formulas into images.
//!
//! Formulas are collected while a document is converted, then rendered in
//! one batch by [`Renderer::finish`]. Every distinct formula becomes one
//! PNG file in the book; repeated formulas share it.
//!
//! ```no_run
//! use epubtex::Book;
//! use epubtex::math::{CacheConfig, FormulaKey, LatexTypesetter, Renderer};
//!
//! let mut book = Book::create_epub("out.epub", "my-book")?;
//! let mut maths = Renderer::new(&CacheConfig::default())?;
//! maths.add_preamble(r"\usepackage{amsmath}");
//! maths.add_formula("$", "x^2")?;
//!
//! let images = maths.finish(&mut book, &LatexTypesetter::new()?)?;
//! book.add_section(1, "Squares", None)?;
//! book.write_str(&images[&FormulaKey::new("$", "x^2")])?;
//! book.close()?;
//! # Ok::<(), epubtex::Error>(())
//! ```

use std::collections::HashMap;

use image::RgbaImage;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::book::{Book, MediaType};
use crate::error::{Error, Result};
use crate::util::{encode_href, escape_xml};

mod cache;
mod crop;
mod tex;
mod typeset;

pub use cache::{CACHE_ENV, CacheConfig, RenderCache, content_address};
pub use crop::{Bounds, crop_displayed, crop_inline};
pub use tex::{CALIBRATION_MARK, batch_source};
pub use typeset::{LatexTypesetter, Pages, TypesetSession, Typesetter};

/// Resolution formulas are rendered at, in dots per inch.
pub const RENDER_RESOLUTION: u32 = 3 * 96;

/// Environment name of inline formulas.
pub const INLINE_ENV: &str = "$";

/// x-height of the 10pt maths font, in TeX points.
const X_HEIGHT: f64 = 4.30554;

/// TeX points per inch.
const POINTS_PER_INCH: f64 = 72.27;

/// Character separating environment and formula in cache addresses.
const KEY_SEPARATOR: char = '%';

/// Subdirectory of the book's image directory holding formula images.
const IMAGE_DIR: &str = "m/";

/// A formula together with the environment it is typeset in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormulaKey {
    pub env: String,
    pub formula: String,
}

impl FormulaKey {
    pub fn new(env: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            formula: formula.into(),
        }
    }

    pub fn is_inline(&self) -> bool {
        self.env == INLINE_ENV
    }
}

impl From<(&str, &str)> for FormulaKey {
    fn from((env, formula): (&str, &str)) -> Self {
        Self::new(env, formula)
    }
}

/// HTML fragments for rendered formulas.
pub type Images = HashMap<FormulaKey, String>;

/// What is known about one distinct formula during [`Renderer::finish`].
#[derive(Debug)]
struct FormulaInfo {
    key: FormulaKey,
    count: usize,
    cached: Option<RgbaImage>,
}

impl FormulaInfo {
    fn needs_rendering(&self) -> bool {
        self.cached.is_none()
    }
}

/// Collects formulas and renders them in a single batch.
#[derive(Debug)]
pub struct Renderer {
    preamble: Vec<String>,
    formulas: HashMap<FormulaKey, usize>,
    cache: RenderCache,
}

impl Renderer {
    pub fn new(cache: &CacheConfig) -> Result<Self> {
        Ok(Self::with_cache(RenderCache::open(cache, RENDER_RESOLUTION)?))
    }

    pub fn with_cache(cache: RenderCache) -> Self {
        Self {
            preamble: Vec::new(),
            formulas: HashMap::new(),
            cache,
        }
    }

    /// Add a line to the preamble of the TeX document.
    ///
    /// Lines are kept in order; duplicates are not removed.
    pub fn add_preamble(&mut self, line: impl Into<String>) {
        self.preamble.push(line.into());
    }

    /// Record one occurrence of `formula` in environment `env`.
    ///
    /// Use [`INLINE_ENV`] for inline maths, otherwise the name of a LaTeX
    /// display environment such as `equation*`.
    pub fn add_formula(&mut self, env: &str, formula: &str) -> Result<()> {
        if env.contains(KEY_SEPARATOR) {
            return Err(Error::InvalidMathEnvironment(env.to_string()));
        }
        *self
            .formulas
            .entry(FormulaKey::new(env, formula))
            .or_default() += 1;
        Ok(())
    }

    /// Number of distinct formulas recorded so far.
    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    /// Render all recorded formulas and add their images to `book`.
    ///
    /// Formulas found in the cache are not typeset again. If anything
    /// needs rendering, exactly one session of `typesetter` is used for
    /// all of it. Returns the `<img>` fragment for every formula.
    pub fn finish(self, book: &mut Book, typesetter: &dyn Typesetter) -> Result<Images> {
        if self.formulas.is_empty() {
            return Ok(Images::new());
        }

        let all = self.formula_info();
        let missing: Vec<&FormulaKey> = all
            .iter()
            .filter(|info| info.needs_rendering())
            .map(|info| &info.key)
            .collect();

        if missing.is_empty() {
            log::info!("all {} formulas found in cache", all.len());
            return self.emit(book, all, None);
        }

        log::info!("rendering {} of {} formulas", missing.len(), all.len());
        let source = batch_source(&self.preamble, missing);
        let mut session = typesetter.open(RENDER_RESOLUTION)?;
        let result = session
            .submit(&source)
            .and_then(|mut pages| self.emit(book, all, Some(&mut pages)));
        let finished = session.finish();

        // an error while rendering takes precedence over one while cleaning up
        result.and_then(|images| finished.map(|()| images))
    }

    /// Distinct formulas in file name order, with cached images loaded.
    ///
    /// Frequent formulas come first so that they get the shortest names.
    fn formula_info(&self) -> Vec<FormulaInfo> {
        let mut all: Vec<_> = self
            .formulas
            .iter()
            .map(|(key, &count)| FormulaInfo {
                key: key.clone(),
                count,
                cached: self.cache.load(key),
            })
            .collect();
        all.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.key.formula.cmp(&b.key.formula))
                .then_with(|| a.key.env.cmp(&b.key.env))
        });
        all
    }

    /// Write the image of every formula into the book.
    ///
    /// Formulas without a cached image take the next page from `pages`.
    fn emit(
        &self,
        book: &mut Book,
        all: Vec<FormulaInfo>,
        mut pages: Option<&mut Pages<'_>>,
    ) -> Result<Images> {
        let expected = all.iter().filter(|info| info.needs_rendering()).count();
        let mut rendered = 0;
        let mut images = Images::with_capacity(all.len());

        for (n, info) in all.into_iter().enumerate() {
            let img = match info.cached {
                Some(img) => img,
                None => {
                    let page = pages
                        .as_mut()
                        .and_then(|pages| pages.next())
                        .ok_or(Error::MissingImage { rendered, expected })??;
                    rendered += 1;
                    let img = self.crop(&info.key, &page.to_rgba8())?;
                    self.cache.store(&info.key, &img)?;
                    img
                }
            };

            let file = book.register_file(&format!("{IMAGE_DIR}{n}"), MediaType::Png, false);
            let mut out = book.create_file(&file)?;
            PngEncoder::new(&mut out).write_image(
                img.as_raw(),
                img.width(),
                img.height(),
                ExtendedColorType::Rgba8,
            )?;
            out.close()?;

            let fragment = img_fragment(&info.key, &file.path, img.width());
            images.insert(info.key, fragment);
        }

        if pages.is_some_and(|pages| pages.next().is_some()) {
            log::warn!("typesetter returned more pages than formulas");
        }
        Ok(images)
    }

    fn crop(&self, key: &FormulaKey, page: &RgbaImage) -> Result<RgbaImage> {
        let bounds = if key.is_inline() {
            crop_inline(page)
        } else {
            crop_displayed(page)
        };
        let bounds = bounds.ok_or_else(|| Error::BlankImage(key.formula.clone()))?;
        Ok(bounds.view(page).to_image())
    }
}

/// Width of a formula image in `ex` of the surrounding text.
pub fn ex_width(pixels: u32) -> f64 {
    f64::from(pixels) / f64::from(RENDER_RESOLUTION) * POINTS_PER_INCH / X_HEIGHT
}

fn img_fragment(key: &FormulaKey, path: &str, pixels: u32) -> String {
    let class = if key.is_inline() { "imath" } else { "dmath" };
    format!(
        r#"<img alt="{}" src="{}" class="{class}" style="width: {:.2}ex"/>"#,
        escape_xml(&key.formula),
        escape_xml(&encode_href(path)),
        ex_width(pixels)
    )
}

//! Formula rendering against a fake typesetter.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;

use epubtex::math::{
    CALIBRATION_MARK, CacheConfig, FormulaKey, Pages, RENDER_RESOLUTION, Renderer, TypesetSession,
    Typesetter,
};
use epubtex::{Book, Error, Result};
use image::{DynamicImage, Rgba, RgbaImage};
use tempfile::TempDir;

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// A page as the real typesetter would produce it.
///
/// Inline formulas are 50 pixels wide after cropping, displayed ones 80.
fn page(inline: bool) -> RgbaImage {
    let mut img = RgbaImage::new(200, 100);
    let mut fill = |xs: std::ops::Range<u32>, ys: std::ops::Range<u32>| {
        for x in xs {
            for y in ys.clone() {
                img.put_pixel(x, y, INK);
            }
        }
    };
    if inline {
        fill(0..6, 40..51);
        fill(20..70, 35..56);
    } else {
        fill(60..140, 10..30);
    }
    img
}

#[derive(Default)]
struct FakeTypesetter {
    sessions: Rc<Cell<usize>>,
    sources: Rc<RefCell<Vec<String>>>,
    missing_pages: usize,
    fail_submit: bool,
    fail_finish: bool,
}

struct FakeSession {
    sources: Rc<RefCell<Vec<String>>>,
    missing_pages: usize,
    fail_submit: bool,
    fail_finish: bool,
}

impl Typesetter for FakeTypesetter {
    fn open(&self, resolution: u32) -> Result<Box<dyn TypesetSession>> {
        assert_eq!(resolution, RENDER_RESOLUTION);
        self.sessions.set(self.sessions.get() + 1);
        Ok(Box::new(FakeSession {
            sources: self.sources.clone(),
            missing_pages: self.missing_pages,
            fail_submit: self.fail_submit,
            fail_finish: self.fail_finish,
        }))
    }
}

impl TypesetSession for FakeSession {
    fn submit(&mut self, source: &str) -> Result<Pages<'_>> {
        self.sources.borrow_mut().push(source.to_string());
        if self.fail_submit {
            return Err(Error::Typesetting("submit failed".to_string()));
        }

        let count = source.matches("\\newpage").count();
        let pages: Vec<_> = source
            .split("\\newpage")
            .take(count.saturating_sub(self.missing_pages))
            .map(|chunk| Ok(DynamicImage::ImageRgba8(page(chunk.contains(CALIBRATION_MARK)))))
            .collect();
        Ok(Box::new(pages.into_iter()))
    }

    fn finish(self: Box<Self>) -> Result<()> {
        if self.fail_finish {
            return Err(Error::Typesetting("cleanup failed".to_string()));
        }
        Ok(())
    }
}

impl FakeTypesetter {
    fn formulas_submitted(&self) -> Vec<usize> {
        self.sources
            .borrow()
            .iter()
            .map(|source| source.matches("\\newpage").count())
            .collect()
    }
}

fn renderer(cache: &Path) -> Renderer {
    Renderer::new(&CacheConfig::default().with_dir(cache)).unwrap()
}

fn book(dir: &TempDir) -> Book {
    Book::directory(dir.path().join("book"), "maths").unwrap()
}

fn second_book(dir: &TempDir) -> Book {
    Book::directory(dir.path().join("again"), "maths").unwrap()
}

#[test]
fn test_repeated_formula_renders_once() {
    let dir = TempDir::new().unwrap();
    let mut book = book(&dir);
    let typesetter = FakeTypesetter::default();

    let mut maths = renderer(&dir.path().join("cache"));
    for _ in 0..5 {
        maths.add_formula("$", "x").unwrap();
    }
    let images = maths.finish(&mut book, &typesetter).unwrap();

    assert_eq!(typesetter.sessions.get(), 1);
    assert_eq!(typesetter.formulas_submitted(), vec![1]);
    assert_eq!(images.len(), 1);
    assert_eq!(
        images[&FormulaKey::new("$", "x")],
        r#"<img alt="x" src="img/m/0.png" class="imath" style="width: 2.91ex"/>"#
    );

    book.close().unwrap();
    let png = image::open(dir.path().join("book/OEBPS/img/m/0.png")).unwrap();
    assert_eq!((png.width(), png.height()), (50, 21));
    let opf = std::fs::read_to_string(dir.path().join("book/OEBPS/content.opf")).unwrap();
    assert!(opf.contains("href=\"img/m/0.png\" media-type=\"image/png\""));
}

#[test]
fn test_no_formulas_no_session() {
    let dir = TempDir::new().unwrap();
    let mut book = book(&dir);
    let typesetter = FakeTypesetter::default();

    let images = renderer(&dir.path().join("cache"))
        .finish(&mut book, &typesetter)
        .unwrap();
    assert!(images.is_empty());
    assert_eq!(typesetter.sessions.get(), 0);
}

#[test]
fn test_cached_formulas_skip_typesetting() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("cache");

    let first = FakeTypesetter::default();
    let mut maths = renderer(&cache);
    maths.add_formula("$", "a").unwrap();
    maths.add_formula("equation*", "b").unwrap();
    let before = maths.finish(&mut book(&dir), &first).unwrap();
    assert_eq!(first.formulas_submitted(), vec![2]);

    let second = FakeTypesetter::default();
    let mut maths = renderer(&cache);
    maths.add_formula("$", "a").unwrap();
    maths.add_formula("equation*", "b").unwrap();
    let after = maths.finish(&mut second_book(&dir), &second).unwrap();
    assert_eq!(second.sessions.get(), 0);
    assert_eq!(before, after);
}

#[test]
fn test_only_misses_are_submitted() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("cache");

    let mut maths = renderer(&cache);
    maths.add_formula("$", "old").unwrap();
    maths
        .finish(&mut book(&dir), &FakeTypesetter::default())
        .unwrap();

    let typesetter = FakeTypesetter::default();
    let mut maths = renderer(&cache);
    maths.add_formula("$", "old").unwrap();
    maths.add_formula("equation*", "new").unwrap();
    let images = maths.finish(&mut second_book(&dir), &typesetter).unwrap();

    assert_eq!(typesetter.formulas_submitted(), vec![1]);
    let source = &typesetter.sources.borrow()[0];
    assert!(source.contains("\\begin{equation*}\n  new\n\\end{equation*}"));
    assert!(!source.contains("old"));

    // equal counts: ordered by formula text
    assert!(images[&FormulaKey::new("equation*", "new")].contains("src=\"img/m/0.png\""));
    assert!(images[&FormulaKey::new("$", "old")].contains("src=\"img/m/1.png\""));
    assert!(images[&FormulaKey::new("equation*", "new")].contains("width: 4.66ex"));
}

#[test]
fn test_file_names_follow_frequency() {
    let dir = TempDir::new().unwrap();
    let mut book = book(&dir);
    let typesetter = FakeTypesetter::default();

    let mut maths = Renderer::new(&CacheConfig::disabled()).unwrap();
    maths.add_formula("$", "rare").unwrap();
    for _ in 0..3 {
        maths.add_formula("$", "common").unwrap();
    }
    maths.add_formula("equation", "b").unwrap();
    maths.add_formula("$", "b").unwrap();
    let images = maths.finish(&mut book, &typesetter).unwrap();

    let src = |env: &str, formula: &str| {
        let html = &images[&FormulaKey::new(env, formula)];
        let start = html.find("src=\"").unwrap() + 5;
        html[start..start + html[start..].find('"').unwrap()].to_string()
    };
    assert_eq!(src("$", "common"), "img/m/0.png");
    assert_eq!(src("$", "b"), "img/m/1.png");
    assert_eq!(src("equation", "b"), "img/m/2.png");
    assert_eq!(src("$", "rare"), "img/m/3.png");

    // pages are submitted in the same order
    let source = &typesetter.sources.borrow()[0];
    let common = source.find("$common$").unwrap();
    let rare = source.find("$rare$").unwrap();
    assert!(common < rare);
}

#[test]
fn test_short_page_sequence_fails() {
    let dir = TempDir::new().unwrap();
    let mut book = book(&dir);
    let typesetter = FakeTypesetter {
        missing_pages: 1,
        ..Default::default()
    };

    let mut maths = Renderer::new(&CacheConfig::disabled()).unwrap();
    maths.add_formula("$", "x").unwrap();
    maths.add_formula("$", "y").unwrap();
    let err = maths.finish(&mut book, &typesetter).unwrap_err();
    assert!(matches!(
        err,
        Error::MissingImage {
            rendered: 1,
            expected: 2
        }
    ));
}

#[test]
fn test_first_error_wins() {
    let dir = TempDir::new().unwrap();
    let typesetter = FakeTypesetter {
        fail_submit: true,
        fail_finish: true,
        ..Default::default()
    };
    let mut maths = Renderer::new(&CacheConfig::disabled()).unwrap();
    maths.add_formula("$", "x").unwrap();
    let err = maths.finish(&mut book(&dir), &typesetter).unwrap_err();
    assert!(matches!(err, Error::Typesetting(msg) if msg == "submit failed"));

    // a cleanup failure alone is still reported
    let typesetter = FakeTypesetter {
        fail_finish: true,
        ..Default::default()
    };
    let mut maths = Renderer::new(&CacheConfig::disabled()).unwrap();
    maths.add_formula("$", "x").unwrap();
    let err = maths
        .finish(&mut second_book(&dir), &typesetter)
        .unwrap_err();
    assert!(matches!(err, Error::Typesetting(msg) if msg == "cleanup failed"));
}

#[test]
fn test_blank_page_is_an_error() {
    struct BlankTypesetter;
    struct BlankSession;

    impl Typesetter for BlankTypesetter {
        fn open(&self, _resolution: u32) -> Result<Box<dyn TypesetSession>> {
            Ok(Box::new(BlankSession))
        }
    }

    impl TypesetSession for BlankSession {
        fn submit(&mut self, _source: &str) -> Result<Pages<'_>> {
            Ok(Box::new(std::iter::once(Ok(DynamicImage::ImageRgba8(
                RgbaImage::new(10, 10),
            )))))
        }

        fn finish(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    let dir = TempDir::new().unwrap();
    let mut maths = Renderer::new(&CacheConfig::disabled()).unwrap();
    maths.add_formula("equation*", "\\quad").unwrap();
    let err = maths.finish(&mut book(&dir), &BlankTypesetter).unwrap_err();
    assert!(matches!(err, Error::BlankImage(formula) if formula == "\\quad"));
}

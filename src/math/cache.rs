//! On-disk cache of cropped formula images.
//!
//! Every cropped formula is stored as a PNG named after a content address
//! derived from the render resolution, the environment and the formula
//! text. A formula that has been rendered once never needs the
//! typesetter again.

use std::env;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use image::{ImageFormat, RgbaImage};
use sha3::Shake128;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use tempfile::NamedTempFile;

use super::FormulaKey;
use crate::error::Result;

/// Environment variable overriding the cache root.
pub const CACHE_ENV: &str = "EPUBTEX_CACHE";

const APP_DIR: &str = "epubtex";

/// Where and whether to cache rendered formulas.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cache root; `None` falls back to [`CACHE_ENV`], then to the
    /// platform cache directory.
    pub dir: Option<PathBuf>,
    pub enabled: bool,
    /// Subdirectory of the root. Changing it starts with an empty cache,
    /// e.g. after a TeX upgrade changed the rendering.
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            enabled: true,
            namespace: "maths".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Bypass the cache completely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// The cache root, if one can be determined.
    pub fn root(&self) -> Option<PathBuf> {
        self.dir
            .clone()
            .or_else(|| {
                env::var_os(CACHE_ENV)
                    .filter(|dir| !dir.is_empty())
                    .map(PathBuf::from)
            })
            .or_else(|| dirs::cache_dir().map(|dir| dir.join(APP_DIR)))
    }
}

/// Content address of a formula rendered at `resolution`.
///
/// The first 128 bits of SHAKE128 over `"<resolution>%<env>%<formula>"`,
/// hex encoded.
pub fn content_address(resolution: u32, env: &str, formula: &str) -> String {
    let mut hasher = Shake128::default();
    hasher.update(resolution.to_string().as_bytes());
    hasher.update(b"%");
    hasher.update(env.as_bytes());
    hasher.update(b"%");
    hasher.update(formula.as_bytes());

    let mut digest = [0u8; 16];
    hasher.finalize_xof().read(&mut digest);
    hex::encode(digest)
}

/// Cropped formula images, one PNG file per content address.
#[derive(Debug, Clone)]
pub struct RenderCache {
    dir: Option<PathBuf>,
    resolution: u32,
}

impl RenderCache {
    /// Open the cache described by `config`, creating its directory.
    ///
    /// If no cache root can be found, caching is switched off.
    pub fn open(config: &CacheConfig, resolution: u32) -> Result<Self> {
        if !config.enabled {
            return Ok(Self::disabled(resolution));
        }
        let Some(root) = config.root() else {
            log::warn!("no cache directory available, formula cache disabled");
            return Ok(Self::disabled(resolution));
        };

        let dir = root.join(&config.namespace);
        fs::create_dir_all(&dir)?;
        log::debug!("formula cache in {}", dir.display());
        Ok(Self {
            dir: Some(dir),
            resolution,
        })
    }

    pub fn disabled(resolution: u32) -> Self {
        Self {
            dir: None,
            resolution,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn address(&self, key: &FormulaKey) -> String {
        content_address(self.resolution, &key.env, &key.formula)
    }

    /// Path of the cache file for `key`.
    pub fn path(&self, key: &FormulaKey) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        Some(dir.join(format!("{}.png", self.address(key))))
    }

    pub fn contains(&self, key: &FormulaKey) -> bool {
        self.path(key).is_some_and(|path| path.is_file())
    }

    /// Load the cached crop for `key`.
    ///
    /// Missing and unreadable entries both give `None`.
    pub fn load(&self, key: &FormulaKey) -> Option<RgbaImage> {
        let path = self.path(key)?;
        if !path.is_file() {
            return None;
        }
        match image::open(&path) {
            Ok(img) => {
                log::debug!("cache hit for {}", path.display());
                Some(img.to_rgba8())
            }
            Err(e) => {
                log::warn!("ignoring unreadable cache entry {}: {e}", path.display());
                None
            }
        }
    }

    /// Store the crop for `key`.
    ///
    /// The image is written to a temporary file in the cache directory and
    /// renamed into place, so readers never see a partial file.
    pub fn store(&self, key: &FormulaKey, img: &RgbaImage) -> Result<()> {
        let (Some(dir), Some(path)) = (self.dir.as_ref(), self.path(key)) else {
            return Ok(());
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            img.write_to(&mut out, ImageFormat::Png)?;
            out.flush()?;
        }
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}

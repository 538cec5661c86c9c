//! Title page image lookup
//!
//! The image is optional. Failing to find or decode it only downgrades the
//! title page to text.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::report::{Degradation, Outcome};

/// File names tried in each search directory, in order
pub const DEFAULT_IMAGE_NAMES: [&str; 5] = ["title.png", "title.jpg", "title.jpeg", "logo.png", "logo.jpg"];

/// Where to look for the title image
#[derive(Debug, Clone, Default)]
pub struct AssetSearch {
    /// Image given explicitly by the caller; takes precedence
    pub explicit: Option<PathBuf>,
    /// Directories searched for [`DEFAULT_IMAGE_NAMES`]
    pub dirs: Vec<PathBuf>,
}

impl AssetSearch {
    pub fn with_image(path: impl Into<PathBuf>) -> Self {
        Self { explicit: Some(path.into()), dirs: Vec::new() }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }

    /// True when no image was asked for at all
    pub fn is_empty(&self) -> bool {
        self.explicit.is_none() && self.dirs.is_empty()
    }

    /// Every path that [`AssetSearch::resolve`] will try, in order
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = self.explicit.iter().cloned().collect();
        for dir in &self.dirs {
            candidates.extend(DEFAULT_IMAGE_NAMES.iter().map(|name| dir.join(name)));
        }
        candidates
    }

    /// Find the title image
    ///
    /// Returns `Complete(None)` when nothing was configured, and a degraded
    /// `None` when something was configured but nothing exists.
    pub fn resolve(&self) -> Outcome<Option<PathBuf>> {
        if self.is_empty() {
            return Outcome::Complete(None);
        }

        let candidates = self.candidates();
        match candidates.iter().find(|path| path.is_file()) {
            Some(found) => {
                log::debug!("Using title image {}", found.display());
                Outcome::Complete(Some(found.clone()))
            }
            None => Outcome::Degraded {
                value: None,
                reason: Degradation::TitleImageMissing { searched: candidates },
            },
        }
    }
}

/// Decoded title image, 8-bit RGB with an optional 8-bit alpha plane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    /// One byte per pixel; `None` when the image is fully opaque
    pub alpha: Option<Vec<u8>>,
}

impl TitleImage {
    /// Decode a PNG or JPEG file
    pub fn open(path: &Path) -> Result<Self> {
        let decoded = image::open(path)?;
        let (width, height) = (decoded.width(), decoded.height());
        let alpha = if decoded.color().has_alpha() {
            let plane: Vec<u8> = decoded.to_rgba8().pixels().map(|pixel| pixel[3]).collect();
            plane.iter().any(|&a| a != u8::MAX).then_some(plane)
        } else {
            None
        };
        Ok(Self { width, height, rgb: decoded.to_rgb8().into_raw(), alpha })
    }
}

/// Resolve and decode the title image, recording anything that went wrong
pub fn load_title_image(search: &AssetSearch, degradations: &mut Vec<Degradation>) -> Option<TitleImage> {
    let path = search.resolve().record(degradations)?;
    match TitleImage::open(&path) {
        Ok(image) => Some(image),
        Err(e) => {
            let reason = Degradation::TitleImageUnreadable { path, reason: e.to_string() };
            log::warn!("{}", reason);
            degradations.push(reason);
            None
        }
    }
}

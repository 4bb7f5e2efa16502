use std::path::{Path, PathBuf};

use image::RgbaImage;

/// Input formats the pipeline accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// Still image, one frame.
    Png,
    /// Animated container, zero or more frames.
    Gif,
}

impl ImageKind {
    /// Classify a filename by its extension. Case-insensitive.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".png") {
            Some(Self::Png)
        } else if lower.ends_with(".gif") {
            Some(Self::Gif)
        } else {
            None
        }
    }

    /// Whether decoding can yield more than one frame.
    pub fn is_animated(self) -> bool {
        matches!(self, Self::Gif)
    }
}

/// A selected input. Immutable once built by [`crate::select_inputs`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct InputFile {
    path: PathBuf,
    kind: ImageKind,
}

impl InputFile {
    /// Build an input if `path` names a supported format.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let kind = ImageKind::from_file_name(&file_name_lossy(&path))?;
        Some(Self { path, kind })
    }

    /// Full path as submitted.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Detected format.
    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    /// Final path component; empty if the path has none.
    pub fn file_name(&self) -> String {
        file_name_lossy(&self.path)
    }
}

pub(crate) fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// One decoded still image or one frame of an animation.
///
/// Pixels are straight (non-premultiplied) RGBA8, row-major, origin top-left.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterFrame {
    image: RgbaImage,
}

impl RasterFrame {
    /// Wrap an already decoded RGBA buffer.
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Solid-colour frame, handy for tests and placeholders.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::new(RgbaImage::from_pixel(width, height, image::Rgba(rgba)))
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the pixel buffer.
    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// Take the pixel buffer.
    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl From<RgbaImage> for RasterFrame {
    fn from(image: RgbaImage) -> Self {
        Self::new(image)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;

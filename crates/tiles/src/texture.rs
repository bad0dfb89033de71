//! Normalization of decoded tile images before they are handed to an atlas.

use crate::error::{TileError, TileResult};
use image::{DynamicImage, RgbaImage, imageops::FilterType};
use serde::{Deserialize, Serialize};

/// The smallest edge length produced by [`ImageResizePolicy::ScaleDown`].
const MIN_SCALED_SIZE: u32 = 4;

/// How decoded images are resized before they are packed.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageResizePolicy {
    /// Images are used as decoded.
    #[default]
    None,
    /// Square images with an edge of the largest power of two not exceeding the
    /// dominant dimension, at least four texels.
    ScaleDown,
    /// Each dimension is rounded up to the next power of two.
    ScaleUp,
    /// Square images of a fixed edge length.
    Fixed(u32),
}

impl ImageResizePolicy {
    /// The dimensions an image of `width` x `height` is resized to.
    pub fn target_size(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Self::None => (width, height),
            Self::ScaleDown => {
                let dominant = width.max(height);
                let size = if dominant.is_power_of_two() {
                    dominant
                } else {
                    dominant.next_power_of_two() / 2
                };
                let size = size.max(MIN_SCALED_SIZE);
                (size, size)
            }
            Self::ScaleUp => (width.next_power_of_two(), height.next_power_of_two()),
            Self::Fixed(size) => (size, size),
        }
    }
}

/// An image delivered by the loader for one animation frame of a tile.
#[derive(Clone, Debug)]
pub enum TileImage {
    /// Marks an address that is reserved but never drawn, e.g. below the
    /// minimum zoom level of a source.
    Placeholder,
    Image(DynamicImage),
}

impl TileImage {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }
}

impl From<DynamicImage> for TileImage {
    fn from(image: DynamicImage) -> Self {
        Self::Image(image)
    }
}

impl From<RgbaImage> for TileImage {
    fn from(image: RgbaImage) -> Self {
        Self::Image(DynamicImage::ImageRgba8(image))
    }
}

/// Converts `image` to RGBA and resizes it according to `policy`.
pub fn normalize(image: &DynamicImage, policy: ImageResizePolicy) -> TileResult<RgbaImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(TileError::EmptyImage);
    }

    let (width, height) = policy.target_size(image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(TileError::EmptyImage);
    }

    let rgba = image.to_rgba8();
    if (width, height) == rgba.dimensions() {
        Ok(rgba)
    } else {
        Ok(image::imageops::resize(&rgba, width, height, FilterType::Triangle))
    }
}

//! Filter selection and the catalog that renders filters into rasters.

use image::{imageops, Rgba, RgbaImage};
use imageproc::map::map_colors;
use serde::Deserialize;

const DEFAULT_BLUR_SIGMA: f32 = 6.0;
const DEFAULT_BLOOM_SIGMA: f32 = 10.0;
const DEFAULT_SHARPEN_SIGMA: f32 = 1.5;
const DEFAULT_SHARPEN_THRESHOLD: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterSelection {
    #[default]
    None,
    Mono,
    Sepia,
    Invert,
    Blur,
    Bloom,
    Sharpen,
}

impl FilterSelection {
    pub const ALL: [FilterSelection; 7] = [
        Self::None,
        Self::Mono,
        Self::Sepia,
        Self::Invert,
        Self::Blur,
        Self::Bloom,
        Self::Sharpen,
    ];

    /// Name looked up in a [`FilterCatalog`]; `None` is the identity filter.
    pub const fn catalog_name(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Mono => Some("mono"),
            Self::Sepia => Some("sepia"),
            Self::Invert => Some("invert"),
            Self::Blur => Some("blur"),
            Self::Bloom => Some("bloom"),
            Self::Sharpen => Some("sharpen"),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "Original",
            Self::Mono => "Mono",
            Self::Sepia => "Sepia",
            Self::Invert => "Invert",
            Self::Blur => "Blur",
            Self::Bloom => "Bloom",
            Self::Sharpen => "Sharpen",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        if name == "none" || name == "original" {
            return Some(Self::None);
        }
        Self::ALL
            .into_iter()
            .find(|filter| filter.catalog_name() == Some(name.as_str()))
    }
}

/// Name-keyed filter capability. Filters may change the output extent;
/// `None` means the filter produced nothing.
pub trait FilterCatalog {
    fn apply(&self, name: &str, image: &RgbaImage) -> Option<RgbaImage>;
}

/// Built-in catalog backed by `image::imageops` and `imageproc`.
///
/// `blur` and `bloom` grow the canvas by `ceil(3 * sigma)` on every side so
/// the soft edge is not cut off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageFilterCatalog {
    pub blur_sigma: f32,
    pub bloom_sigma: f32,
    pub sharpen_sigma: f32,
    pub sharpen_threshold: i32,
}

impl Default for ImageFilterCatalog {
    fn default() -> Self {
        Self {
            blur_sigma: DEFAULT_BLUR_SIGMA,
            bloom_sigma: DEFAULT_BLOOM_SIGMA,
            sharpen_sigma: DEFAULT_SHARPEN_SIGMA,
            sharpen_threshold: DEFAULT_SHARPEN_THRESHOLD,
        }
    }
}

impl FilterCatalog for ImageFilterCatalog {
    fn apply(&self, name: &str, image: &RgbaImage) -> Option<RgbaImage> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }
        match name {
            "mono" => Some(map_colors(image, mono_pixel)),
            "sepia" => Some(map_colors(image, sepia_pixel)),
            "invert" => {
                let mut inverted = image.clone();
                imageops::invert(&mut inverted);
                Some(inverted)
            }
            "blur" => blur_with_growth(image, self.blur_sigma),
            "bloom" => bloom(image, self.bloom_sigma),
            "sharpen" => Some(imageops::unsharpen(
                image,
                self.sharpen_sigma,
                self.sharpen_threshold,
            )),
            _ => {
                tracing::warn!(name, "unknown filter requested");
                None
            }
        }
    }
}

pub fn growth_margin(sigma: f32) -> u32 {
    if sigma.is_finite() && sigma > 0.0 {
        (3.0 * sigma).ceil() as u32
    } else {
        0
    }
}

fn channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn mono_pixel(Rgba([r, g, b, a]): Rgba<u8>) -> Rgba<u8> {
    let luma = channel(0.2126 * f32::from(r) + 0.7152 * f32::from(g) + 0.0722 * f32::from(b));
    Rgba([luma, luma, luma, a])
}

fn sepia_pixel(Rgba([r, g, b, a]): Rgba<u8>) -> Rgba<u8> {
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    Rgba([
        channel(0.393 * r + 0.769 * g + 0.189 * b),
        channel(0.349 * r + 0.686 * g + 0.168 * b),
        channel(0.272 * r + 0.534 * g + 0.131 * b),
        a,
    ])
}

fn grown_canvas(image: &RgbaImage, margin: u32) -> Option<RgbaImage> {
    let padding = margin.checked_mul(2)?;
    let width = image.width().checked_add(padding)?;
    let height = image.height().checked_add(padding)?;
    let mut canvas = RgbaImage::new(width, height);
    imageops::replace(&mut canvas, image, i64::from(margin), i64::from(margin));
    Some(canvas)
}

fn blur_with_growth(image: &RgbaImage, sigma: f32) -> Option<RgbaImage> {
    let canvas = grown_canvas(image, growth_margin(sigma))?;
    Some(imageops::blur(&canvas, sigma))
}

fn bloom(image: &RgbaImage, sigma: f32) -> Option<RgbaImage> {
    let base = grown_canvas(image, growth_margin(sigma))?;
    let glow = imageops::blur(&base, sigma);
    let mut output = base;
    for (pixel, glow) in output.pixels_mut().zip(glow.pixels()) {
        for index in 0..3 {
            let base = f32::from(pixel[index]) / 255.0;
            let light = f32::from(glow[index]) / 255.0;
            pixel[index] = channel((1.0 - (1.0 - base) * (1.0 - light)) * 255.0);
        }
        pixel[3] = pixel[3].max(glow[3]);
    }
    Some(output)
}

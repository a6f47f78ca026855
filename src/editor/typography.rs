use std::fmt;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::RgbaImage;
use imageproc::drawing::draw_text_mut;

use super::tools::TextFontFamily;
use crate::geometry::{Color, Size};

const FALLBACK_CHAR_WIDTH_RATIO: f64 = 0.62;
const FALLBACK_LINE_HEIGHT_RATIO: f64 = 1.3;

const SANS_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const SERIF_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSerif.ttf",
    "/usr/share/fonts/TTF/DejaVuSerif.ttf",
    "/usr/share/fonts/dejavu/DejaVuSerif.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSerif-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSerif-Regular.ttf",
    "/usr/share/fonts/noto/NotoSerif-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Times New Roman.ttf",
    "C:\\Windows\\Fonts\\times.ttf",
];

const MONOSPACE_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationMono-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Courier New.ttf",
    "C:\\Windows\\Fonts\\cour.ttf",
];

/// Font used both to estimate overlay boxes and to burn text into pixels, so
/// the preview box and the saved output agree.
///
/// Without a loadable font, measurement falls back to fixed per-character
/// metrics and drawing only paints the background box.
#[derive(Clone)]
pub struct Typeface {
    family: TextFontFamily,
    preferred: Option<PathBuf>,
    source: Option<PathBuf>,
    font: Option<FontArc>,
}

impl fmt::Debug for Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Typeface")
            .field("family", &self.family)
            .field("source", &self.source)
            .field("loaded", &self.font.is_some())
            .finish()
    }
}

impl Typeface {
    pub fn fallback(family: TextFontFamily) -> Self {
        Self {
            family,
            preferred: None,
            source: None,
            font: None,
        }
    }

    /// Loads `preferred` when given, otherwise the first system font found
    /// for `family`.
    pub fn load(family: TextFontFamily, preferred: Option<&Path>) -> Self {
        let candidates = preferred
            .map(Path::to_path_buf)
            .into_iter()
            .chain(family_candidates(family).iter().map(PathBuf::from));

        for path in candidates {
            if !path.is_file() {
                continue;
            }
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(path = %path.display(), ?err, "failed to read font file");
                    continue;
                }
            };
            match FontArc::try_from_vec(bytes) {
                Ok(font) => {
                    tracing::debug!(path = %path.display(), ?family, "loaded overlay font");
                    return Self {
                        family,
                        preferred: preferred.map(Path::to_path_buf),
                        source: Some(path),
                        font: Some(font),
                    };
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "font file is not usable");
                }
            }
        }

        tracing::warn!(?family, "no overlay font found; text will use fallback metrics");
        Self {
            preferred: preferred.map(Path::to_path_buf),
            ..Self::fallback(family)
        }
    }

    /// Reloads for another family, keeping the configured font override.
    pub fn with_family(&self, family: TextFontFamily) -> Self {
        Self::load(family, self.preferred.as_deref())
    }

    pub fn family(&self) -> TextFontFamily {
        self.family
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn line_height(&self, size: f64) -> f64 {
        let size = size.max(1.0);
        match &self.font {
            Some(font) => {
                let scaled = font.as_scaled(PxScale::from(size as f32));
                f64::from(scaled.height() + scaled.line_gap())
            }
            None => size * FALLBACK_LINE_HEIGHT_RATIO,
        }
    }

    /// Extent of the rendered string without padding.
    pub fn measure(&self, content: &str, size: f64) -> Size {
        let size = size.max(1.0);
        let lines = content.split('\n').collect::<Vec<_>>();
        let width = lines
            .iter()
            .map(|line| self.line_width(line, size))
            .fold(0.0, f64::max);
        Size::new(width, lines.len() as f64 * self.line_height(size))
    }

    fn line_width(&self, line: &str, size: f64) -> f64 {
        let Some(font) = &self.font else {
            return line.chars().count() as f64 * size * FALLBACK_CHAR_WIDTH_RATIO;
        };
        let scaled = font.as_scaled(PxScale::from(size as f32));
        let mut width = 0.0_f32;
        let mut previous: Option<GlyphId> = None;
        for ch in line.chars() {
            let glyph = font.glyph_id(ch);
            if let Some(previous) = previous {
                width += scaled.kern(previous, glyph);
            }
            width += scaled.h_advance(glyph);
            previous = Some(glyph);
        }
        f64::from(width)
    }

    /// Draws `content` with its first line's top edge at `(x, y)` in raster
    /// coordinates. Returns false when no font is loaded.
    pub fn draw(&self, canvas: &mut RgbaImage, content: &str, x: i32, y: i32, size: f64, color: Color) -> bool {
        let Some(font) = &self.font else {
            return false;
        };
        let size = size.max(1.0);
        let scale = PxScale::from(size as f32);
        let line_height = self.line_height(size);
        for (index, line) in content.split('\n').enumerate() {
            if line.is_empty() {
                continue;
            }
            let line_y = f64::from(y) + index as f64 * line_height;
            draw_text_mut(canvas, color.to_rgba(), x, line_y.round() as i32, scale, font, line);
        }
        true
    }
}

fn family_candidates(family: TextFontFamily) -> &'static [&'static str] {
    match family {
        TextFontFamily::Sans => SANS_CANDIDATES,
        TextFontFamily::Serif => SERIF_CANDIDATES,
        TextFontFamily::Monospace => MONOSPACE_CANDIDATES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_metrics_scale_with_characters_and_lines() {
        let typeface = Typeface::fallback(TextFontFamily::Sans);
        let size = typeface.measure("abcd", 10.0);
        assert!((size.width - 24.8).abs() < 1e-9);
        assert!((size.height - 13.0).abs() < 1e-9);

        let two_lines = typeface.measure("ab\nabcdef", 10.0);
        assert!((two_lines.width - 37.2).abs() < 1e-9);
        assert!((two_lines.height - 26.0).abs() < 1e-9);
    }

    #[test]
    fn empty_content_still_has_one_line() {
        let typeface = Typeface::fallback(TextFontFamily::Serif);
        let size = typeface.measure("", 20.0);
        assert_eq!(size.width, 0.0);
        assert!((size.height - 26.0).abs() < 1e-9);
    }

    #[test]
    fn fallback_typeface_does_not_draw() {
        let typeface = Typeface::fallback(TextFontFamily::Sans);
        let mut canvas = RgbaImage::new(16, 16);
        assert!(!typeface.draw(&mut canvas, "hi", 0, 0, 12.0, Color::WHITE));
        assert!(canvas.pixels().all(|pixel| pixel.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn missing_preferred_font_falls_through_to_candidates_or_fallback() {
        let typeface = Typeface::load(
            TextFontFamily::Monospace,
            Some(Path::new("/nonexistent/folio/font.ttf")),
        );
        assert_ne!(typeface.source(), Some(Path::new("/nonexistent/folio/font.ttf")));
        assert_eq!(typeface.has_font(), typeface.source().is_some());
    }
}

//! Bakes the selected filter and the text overlay into a new raster.

use image::{GrayImage, Luma, Pixel, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect as FillRect;

use super::mapping::{self, Scale};
use super::tools::{padded_box, TextOverlayState, TEXT_BACKGROUND_RADIUS, TEXT_BOX_PADDING};
use super::typography::Typeface;
use crate::filters::{FilterCatalog, FilterSelection};
use crate::geometry::{Color, RasterBounds, Size};

/// Text overlay together with the display container it was placed in.
#[derive(Debug, Clone, Copy)]
pub struct TextPlacement<'a> {
    pub overlay: &'a TextOverlayState,
    pub container: Size,
    pub typeface: &'a Typeface,
}

pub fn bake(
    image: &RgbaImage,
    filter: FilterSelection,
    catalog: &dyn FilterCatalog,
    text: Option<TextPlacement<'_>>,
) -> RgbaImage {
    let mut output = apply_filter(image, filter, catalog);
    if let Some(placement) = text {
        burn_text(&mut output, placement);
    }
    output
}

/// Runs `filter` through the catalog, keeping the input when the catalog
/// produces nothing.
pub fn apply_filter(image: &RgbaImage, filter: FilterSelection, catalog: &dyn FilterCatalog) -> RgbaImage {
    let Some(name) = filter.catalog_name() else {
        return image.clone();
    };
    match catalog.apply(name, image) {
        Some(output) if output.width() > 0 && output.height() > 0 => {
            tracing::debug!(
                filter = name,
                input = ?image.dimensions(),
                output = ?output.dimensions(),
                "filter applied"
            );
            output
        }
        _ => {
            tracing::warn!(filter = name, "filter produced no output; keeping original image");
            image.clone()
        }
    }
}

/// Paints the overlay's background box and text onto `canvas`, mapping it
/// through the display rect of the canvas's current size. Returns false when
/// the mapping is degenerate and nothing was drawn.
pub fn burn_text(canvas: &mut RgbaImage, placement: TextPlacement<'_>) -> bool {
    let TextPlacement {
        overlay,
        container,
        typeface,
    } = placement;
    let image_size = Size::from_pixels(canvas.width(), canvas.height());
    let display = mapping::display_rect_for_image(image_size, container);
    let scale = Scale::between(image_size, display);
    if display.is_degenerate() || scale.is_degenerate() {
        tracing::warn!(?container, "text overlay skipped: degenerate display rect");
        return false;
    }

    let options = overlay.options();
    let box_size = padded_box(typeface.measure(overlay.content(), options.size));
    let display_box = overlay.display_box(box_size);
    let Some(pixel_box) = mapping::display_rect_to_pixel(display_box, display, scale, image_size.height) else {
        return false;
    };
    let Some(bounds) = mapping::pixel_rect_to_raster(pixel_box, canvas.width(), canvas.height()) else {
        tracing::debug!(?pixel_box, "text overlay lies outside the canvas");
        return false;
    };

    let radius = (TEXT_BACKGROUND_RADIUS * scale.y).round().max(0.0) as u32;
    fill_rounded_rect(canvas, bounds, radius, options.background);

    // The padded box is centered on the anchor, so the text starts half the
    // padding in from the box's top-left corner (in raster rows).
    let inset_x = TEXT_BOX_PADDING / 2.0 * scale.x;
    let inset_y = TEXT_BOX_PADDING / 2.0 * scale.y;
    let text_x = (pixel_box.x + inset_x).round() as i32;
    let text_y = (image_size.height - pixel_box.max_y() + inset_y).round() as i32;
    if !typeface.draw(
        canvas,
        overlay.content(),
        text_x,
        text_y,
        options.size * scale.y,
        options.color,
    ) {
        tracing::warn!("no font loaded; overlay text drawn as background only");
    }
    true
}

/// Alpha-blends a rounded rectangle. Parts outside the canvas are clipped.
fn fill_rounded_rect(canvas: &mut RgbaImage, bounds: RasterBounds, radius: u32, color: Color) {
    let RasterBounds {
        x,
        y,
        width,
        height,
    } = bounds;
    if width == 0 || height == 0 {
        return;
    }
    let radius = radius.min(width / 2).min(height / 2);
    let mask = rounded_rect_mask(width, height, radius);
    let color = color.to_rgba();

    for (mask_x, mask_y, coverage) in mask.enumerate_pixels() {
        if coverage[0] == 0 {
            continue;
        }
        let (Some(canvas_x), Some(canvas_y)) = (x.checked_add(mask_x), y.checked_add(mask_y)) else {
            continue;
        };
        if canvas_x >= canvas.width() || canvas_y >= canvas.height() {
            continue;
        }
        canvas.get_pixel_mut(canvas_x, canvas_y).blend(&color);
    }
}

fn rounded_rect_mask(width: u32, height: u32, radius: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let fill = Luma([255_u8]);
    let inner_width = width - 2 * radius;
    let inner_height = height - 2 * radius;
    let r = radius as i32;

    if inner_width > 0 {
        draw_filled_rect_mut(&mut mask, FillRect::at(r, 0).of_size(inner_width, height), fill);
    }
    if inner_height > 0 {
        draw_filled_rect_mut(&mut mask, FillRect::at(0, r).of_size(width, inner_height), fill);
    }
    if radius > 0 {
        let right = (width - 1 - radius) as i32;
        let bottom = (height - 1 - radius) as i32;
        for center in [(r, r), (right, r), (r, bottom), (right, bottom)] {
            draw_filled_circle_mut(&mut mask, center, r, fill);
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::tools::{TextFontFamily, TextOptions};
    use crate::filters::ImageFilterCatalog;
    use crate::geometry::{Point, Rect};
    use image::{imageops, Rgba};

    const RED: Color = Color::rgb(255, 0, 0);

    /// Pads the canvas with opaque black, like a blur that grows its extent.
    struct GrowingCatalog {
        margin: u32,
    }

    impl FilterCatalog for GrowingCatalog {
        fn apply(&self, _name: &str, image: &RgbaImage) -> Option<RgbaImage> {
            let mut canvas = RgbaImage::from_pixel(
                image.width() + 2 * self.margin,
                image.height() + 2 * self.margin,
                Rgba([0, 0, 0, 255]),
            );
            imageops::replace(&mut canvas, image, i64::from(self.margin), i64::from(self.margin));
            Some(canvas)
        }
    }

    struct FailingCatalog;

    impl FilterCatalog for FailingCatalog {
        fn apply(&self, _name: &str, _image: &RgbaImage) -> Option<RgbaImage> {
            None
        }
    }

    fn overlay(content: &str, display: Rect) -> TextOverlayState {
        TextOverlayState::new(
            content,
            TextOptions {
                size: 10.0,
                background: RED,
                ..TextOptions::default()
            },
            display,
        )
    }

    fn red_bounds(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel.0 != [255, 0, 0, 255] {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((min_x, min_y, max_x, max_y)) => {
                    (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
                }
            });
        }
        bounds
    }

    #[test]
    fn identity_filter_returns_equal_copy() {
        let image = RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 4]));
        let output = bake(&image, FilterSelection::None, &ImageFilterCatalog::default(), None);
        assert_eq!(output, image);
    }

    #[test]
    fn failed_filter_keeps_original() {
        let image = RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 4]));
        let output = bake(&image, FilterSelection::Sepia, &FailingCatalog, None);
        assert_eq!(output, image);
    }

    #[test]
    fn text_box_is_centered_on_anchor_in_pixel_space() {
        let image = RgbaImage::from_pixel(200, 100, Rgba([255, 255, 255, 255]));
        let container = Size::new(400.0, 200.0);
        let display = mapping::display_rect_for_image(Size::new(200.0, 100.0), container);
        let overlay = overlay("Hi", display);
        let typeface = Typeface::fallback(TextFontFamily::Sans);

        let output = bake(
            &image,
            FilterSelection::None,
            &ImageFilterCatalog::default(),
            Some(TextPlacement {
                overlay: &overlay,
                container,
                typeface: &typeface,
            }),
        );

        let (min_x, min_y, max_x, max_y) = red_bounds(&output).expect("background drawn");
        let center_x = f64::from(min_x + max_x + 1) / 2.0;
        let center_y = f64::from(min_y + max_y + 1) / 2.0;
        assert!((center_x - 100.0).abs() <= 1.0, "center x {center_x}");
        assert!((center_y - 50.0).abs() <= 1.0, "center y {center_y}");
        // Display box 32.4 x 33 at half scale.
        assert!((i64::from(max_x - min_x + 1) - 16).abs() <= 1);
        assert!((i64::from(max_y - min_y + 1) - 17).abs() <= 1);
    }

    #[test]
    fn growing_filter_places_text_against_new_canvas() {
        let image = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let container = Size::new(100.0, 100.0);
        let display = mapping::display_rect_for_image(Size::new(100.0, 100.0), container);
        let overlay = overlay("Hi", display)
            .begin_drag()
            .drag(Point::new(-30.0, -30.0), Size::new(32.4, 33.0), display)
            .end_drag();
        assert_eq!(overlay.anchor(), Point::new(20.0, 20.0));
        let typeface = Typeface::fallback(TextFontFamily::Sans);

        let output = bake(
            &image,
            FilterSelection::Blur,
            &GrowingCatalog { margin: 50 },
            Some(TextPlacement {
                overlay: &overlay,
                container,
                typeface: &typeface,
            }),
        );

        assert_eq!(output.dimensions(), (200, 200));
        let (min_x, min_y, max_x, max_y) = red_bounds(&output).expect("background drawn");
        // Anchor (20, 20) of a 100pt display maps to (40, 40) on the 200px canvas.
        let center_x = f64::from(min_x + max_x + 1) / 2.0;
        let center_y = f64::from(min_y + max_y + 1) / 2.0;
        assert!((center_x - 40.0).abs() <= 1.0, "center x {center_x}");
        assert!((center_y - 40.0).abs() <= 1.0, "center y {center_y}");
        assert!((i64::from(max_x - min_x + 1) - 65).abs() <= 1);
    }

    #[test]
    fn degenerate_container_skips_text() {
        let image = RgbaImage::from_pixel(50, 50, Rgba([255, 255, 255, 255]));
        let overlay = overlay("Hi", Rect::new(0.0, 0.0, 50.0, 50.0));
        let typeface = Typeface::fallback(TextFontFamily::Sans);
        let output = bake(
            &image,
            FilterSelection::None,
            &ImageFilterCatalog::default(),
            Some(TextPlacement {
                overlay: &overlay,
                container: Size::new(0.0, 50.0),
                typeface: &typeface,
            }),
        );
        assert_eq!(output, image);
    }

    #[test]
    fn translucent_background_blends_with_image() {
        let image = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let container = Size::new(100.0, 100.0);
        let overlay = TextOverlayState::new(
            "",
            TextOptions {
                size: 10.0,
                background: Color::new(0, 0, 0, 128),
                ..TextOptions::default()
            },
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        let typeface = Typeface::fallback(TextFontFamily::Sans);
        let mut canvas = image.clone();
        assert!(burn_text(
            &mut canvas,
            TextPlacement {
                overlay: &overlay,
                container,
                typeface: &typeface,
            },
        ));
        let center = canvas.get_pixel(50, 50);
        assert!(center[0] > 100 && center[0] < 155, "blended value {}", center[0]);
        assert_eq!(canvas.get_pixel(0, 0), image.get_pixel(0, 0));
    }

    #[test]
    fn rounded_mask_trims_corners() {
        let mask = rounded_rect_mask(40, 30, 8);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert_eq!(mask.get_pixel(39, 29)[0], 0);
        assert_eq!(mask.get_pixel(20, 0)[0], 255);
        assert_eq!(mask.get_pixel(0, 15)[0], 255);
        assert_eq!(mask.get_pixel(20, 15)[0], 255);
    }
}

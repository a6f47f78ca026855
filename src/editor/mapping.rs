//! Conversions between image pixel space and a container's scale-to-fit
//! display space.
//!
//! Three coordinate conventions meet here and nowhere else:
//!
//! * display space: container points, origin top-left, y grows downward;
//! * pixel space: image pixels, origin bottom-left, y grows upward;
//! * raster space: `image` buffer rows, origin top-left, y grows downward.
//!
//! Every y-axis inversion between them lives in this module.

use crate::geometry::{Point, RasterBounds, Rect, Size};

/// Pixels per display point on each axis.
///
/// A zero scale marks a degenerate display rect; conversions return `None`
/// for it so callers skip the update instead of producing NaN.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

impl Scale {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn between(image: Size, display: Rect) -> Self {
        if image.is_degenerate() || display.is_degenerate() {
            return Self::ZERO;
        }
        let scale = Self::new(image.width / display.width, image.height / display.height);
        if scale.is_degenerate() {
            Self::ZERO
        } else {
            scale
        }
    }

    pub fn is_degenerate(self) -> bool {
        !(self.x.is_finite() && self.y.is_finite()) || self.x <= 0.0 || self.y <= 0.0
    }
}

/// Aspect-preserving rect that fits `image` inside `container`, centered on
/// both axes. Degenerate inputs produce `Rect::ZERO`.
pub fn display_rect_for_image(image: Size, container: Size) -> Rect {
    if image.is_degenerate() || container.is_degenerate() {
        return Rect::ZERO;
    }
    let factor = (container.width / image.width).min(container.height / image.height);
    let width = image.width * factor;
    let height = image.height * factor;
    Rect::new(
        (container.width - width) / 2.0,
        (container.height - height) / 2.0,
        width,
        height,
    )
}

/// Projects a pixel-space rect into display space, flipping y.
pub fn pixel_to_display(pixel: Rect, display: Rect, scale: Scale, image_height: f64) -> Option<Rect> {
    if scale.is_degenerate() {
        return None;
    }
    Some(Rect::new(
        display.x + pixel.x / scale.x,
        display.y + (image_height - pixel.max_y()) / scale.y,
        pixel.width / scale.x,
        pixel.height / scale.y,
    ))
}

/// Converts a display-space translation into a pixel-space delta. Display
/// down maps to pixel up, so y changes sign.
pub fn display_to_pixel_delta(delta: Point, scale: Scale) -> Option<Point> {
    if scale.is_degenerate() || !delta.is_finite() {
        return None;
    }
    Some(Point::new(delta.x * scale.x, -delta.y * scale.y))
}

pub fn display_point_to_pixel(
    point: Point,
    display: Rect,
    scale: Scale,
    image_height: f64,
) -> Option<Point> {
    if scale.is_degenerate() || !point.is_finite() {
        return None;
    }
    Some(Point::new(
        (point.x - display.x) * scale.x,
        image_height - (point.y - display.y) * scale.y,
    ))
}

/// Inverse of [`pixel_to_display`].
pub fn display_rect_to_pixel(
    rect: Rect,
    display: Rect,
    scale: Scale,
    image_height: f64,
) -> Option<Rect> {
    if scale.is_degenerate() || rect.is_degenerate() {
        return None;
    }
    Some(Rect::new(
        (rect.x - display.x) * scale.x,
        image_height - (rect.max_y() - display.y) * scale.y,
        rect.width * scale.x,
        rect.height * scale.y,
    ))
}

/// Rounds a pixel-space rect to raster rows and clips it to the image.
/// Returns `None` when nothing of the rect remains inside the image.
pub fn pixel_rect_to_raster(pixel: Rect, image_width: u32, image_height: u32) -> Option<RasterBounds> {
    if !(pixel.x.is_finite() && pixel.y.is_finite())
        || !(pixel.width.is_finite() && pixel.height.is_finite())
    {
        return None;
    }
    let width_limit = f64::from(image_width);
    let height_limit = f64::from(image_height);
    let left = pixel.x.round().clamp(0.0, width_limit);
    let right = pixel.max_x().round().clamp(0.0, width_limit);
    let bottom = pixel.y.round().clamp(0.0, height_limit);
    let top = pixel.max_y().round().clamp(0.0, height_limit);
    if right <= left || top <= bottom {
        return None;
    }
    Some(RasterBounds::new(
        left as u32,
        (height_limit - top) as u32,
        (right - left) as u32,
        (top - bottom) as u32,
    ))
}

pub fn raster_to_pixel_rect(bounds: RasterBounds, image_height: u32) -> Rect {
    let top = f64::from(bounds.y);
    let height = f64::from(bounds.height);
    Rect::new(
        f64::from(bounds.x),
        f64::from(image_height) - top - height,
        f64::from(bounds.width),
        height,
    )
}

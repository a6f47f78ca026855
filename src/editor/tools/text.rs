use serde::Deserialize;

use crate::geometry::{Color, Point, Rect, Size};

/// Padding added to the measured string on each dimension; the compositor
/// paints its background box over exactly this padded extent.
pub const TEXT_BOX_PADDING: f64 = 20.0;
pub const TEXT_BACKGROUND_RADIUS: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFontFamily {
    #[default]
    Sans,
    Serif,
    Monospace,
}

impl TextFontFamily {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sans => "Sans",
            Self::Serif => "Serif",
            Self::Monospace => "Monospace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextOptions {
    pub family: TextFontFamily,
    pub size: f64,
    pub color: Color,
    pub background: Color,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            family: TextFontFamily::Sans,
            size: 32.0,
            color: Color::WHITE,
            background: Color::new(0, 0, 0, 160),
        }
    }
}

impl TextOptions {
    pub fn set_size(&mut self, size: f64) {
        self.size = clamp_text_size(size);
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_background(&mut self, background: Color) {
        self.background = background;
    }

    pub fn set_family(&mut self, family: TextFontFamily) {
        self.family = family;
    }
}

fn clamp_text_size(size: f64) -> f64 {
    if size.is_finite() {
        size.max(1.0)
    } else {
        1.0
    }
}

/// Padded overlay extent for a measured string.
pub fn padded_box(measured: Size) -> Size {
    Size::new(
        measured.width + TEXT_BOX_PADDING,
        measured.height + TEXT_BOX_PADDING,
    )
}

/// Text overlay positioned by its center in display space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlayState {
    content: String,
    options: TextOptions,
    anchor: Point,
    drag_start: Option<Point>,
}

impl TextOverlayState {
    pub fn new(content: impl Into<String>, options: TextOptions, display: Rect) -> Self {
        let mut options = options;
        options.set_size(options.size);
        Self {
            content: content.into(),
            options,
            anchor: display.center(),
            drag_start: None,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn options(&self) -> TextOptions {
        self.options
    }

    pub fn anchor(&self) -> Point {
        self.anchor
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_start.is_some()
    }

    /// Overlay rect in display space for a given padded box size.
    pub fn display_box(&self, box_size: Size) -> Rect {
        Rect::from_center(self.anchor, box_size)
    }

    pub fn with_content(self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self
        }
    }

    pub fn with_options(self, options: TextOptions) -> Self {
        let mut options = options;
        options.set_size(options.size);
        Self { options, ..self }
    }

    pub fn begin_drag(self) -> Self {
        Self {
            drag_start: Some(self.anchor),
            ..self
        }
    }

    /// Moves the anchor by the gesture's cumulative `translation` and clamps
    /// it against `display`. Non-finite results are dropped.
    pub fn drag(self, translation: Point, box_size: Size, display: Rect) -> Self {
        let Some(start) = self.drag_start else {
            tracing::debug!("text drag update without an active gesture");
            return self;
        };
        self.place(start.offset(translation), box_size, display)
    }

    pub fn end_drag(self) -> Self {
        Self {
            drag_start: None,
            ..self
        }
    }

    /// Re-clamps the current anchor, e.g. after the content or size changed.
    pub fn reclamp(self, box_size: Size, display: Rect) -> Self {
        let anchor = self.anchor;
        self.place(anchor, box_size, display)
    }

    /// Keeps the anchor at the same relative position when the image display
    /// rect changes (container resize, applied crop).
    pub fn relayout(self, previous: Rect, next: Rect, box_size: Size) -> Self {
        if previous.is_degenerate() || next.is_degenerate() {
            return self;
        }
        let relative_x = (self.anchor.x - previous.x) / previous.width;
        let relative_y = (self.anchor.y - previous.y) / previous.height;
        let anchor = Point::new(
            next.x + relative_x * next.width,
            next.y + relative_y * next.height,
        );
        Self {
            drag_start: None,
            ..self
        }
        .place(anchor, box_size, next)
    }

    fn place(self, candidate: Point, box_size: Size, display: Rect) -> Self {
        let anchor = clamp_anchor(candidate, box_size, display);
        if !anchor.is_finite() {
            tracing::debug!(?candidate, "text anchor update rejected: non-finite");
            return self;
        }
        Self { anchor, ..self }
    }
}

/// Clamps a box center so the box stays on the image display rect.
///
/// Per axis, a box that fits is kept fully inside. An oversized box is kept
/// covering the rect: its center ranges over `[max - half, min + half]`.
pub fn clamp_anchor(anchor: Point, box_size: Size, display: Rect) -> Point {
    Point::new(
        clamp_axis(anchor.x, box_size.width, display.x, display.max_x()),
        clamp_axis(anchor.y, box_size.height, display.y, display.max_y()),
    )
}

fn clamp_axis(value: f64, extent: f64, min: f64, max: f64) -> f64 {
    if !(value.is_finite() && extent.is_finite() && min.is_finite() && max.is_finite()) {
        return f64::NAN;
    }
    let half = extent / 2.0;
    let (low, high) = if extent <= max - min {
        (min + half, max - half)
    } else {
        (max - half, min + half)
    };
    value.clamp(low, high)
}

use image::{imageops, RgbaImage};

use crate::editor::mapping::{self, Scale};
use crate::geometry::{Point, Rect, Size};

pub const CROP_MIN_SIZE: f64 = 50.0;
pub const CROP_DEFAULT_FRACTION: f64 = 0.8;
pub const CROP_HANDLE_TOLERANCE: f64 = 12.0;

// Absorbs rounding in `(limit - extent) + extent` when a move clamps to an edge.
const EDGE_EPSILON: f64 = 1e-9;

/// Edge of an axis a resize handle drags, in pixel space.
///
/// `Min` is the left edge horizontally and the bottom edge vertically
/// (pixel y grows upward); `Max` is right and top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisEdge {
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropHandle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl CropHandle {
    pub const ALL: [CropHandle; 8] = [
        Self::TopLeft,
        Self::Top,
        Self::TopRight,
        Self::Right,
        Self::BottomRight,
        Self::Bottom,
        Self::BottomLeft,
        Self::Left,
    ];

    pub const fn horizontal_edge(self) -> Option<AxisEdge> {
        match self {
            Self::TopLeft | Self::Left | Self::BottomLeft => Some(AxisEdge::Min),
            Self::TopRight | Self::Right | Self::BottomRight => Some(AxisEdge::Max),
            Self::Top | Self::Bottom => None,
        }
    }

    pub const fn vertical_edge(self) -> Option<AxisEdge> {
        match self {
            Self::TopLeft | Self::Top | Self::TopRight => Some(AxisEdge::Max),
            Self::BottomLeft | Self::Bottom | Self::BottomRight => Some(AxisEdge::Min),
            Self::Left | Self::Right => None,
        }
    }

    /// Where this handle sits on a crop rect drawn in display space.
    pub fn display_point(self, rect: Rect) -> Point {
        let x = match self.horizontal_edge() {
            Some(AxisEdge::Min) => rect.x,
            Some(AxisEdge::Max) => rect.max_x(),
            None => rect.x + rect.width / 2.0,
        };
        // Display y grows downward, so the pixel-space top edge is `rect.y`.
        let y = match self.vertical_edge() {
            Some(AxisEdge::Max) => rect.y,
            Some(AxisEdge::Min) => rect.max_y(),
            None => rect.y + rect.height / 2.0,
        };
        Point::new(x, y)
    }
}

/// One of the nine interaction regions of the crop overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropTarget {
    Move,
    Resize(CropHandle),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropInteraction {
    Idle,
    Dragging { target: CropTarget, start: Rect },
}

/// Crop rectangle in pixel space plus the gesture currently editing it.
///
/// Every transition consumes the state and returns the next one. Updates that
/// would break an invariant are dropped and the previous rect is returned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropState {
    image: Size,
    rect: Rect,
    interaction: CropInteraction,
}

impl CropState {
    /// Centered rect covering `CROP_DEFAULT_FRACTION` of each dimension.
    ///
    /// Images narrower than `CROP_MIN_SIZE` on an axis get the full extent on
    /// that axis; such a crop can be moved but never resized.
    pub fn centered(image: Size) -> Self {
        let width = default_extent(image.width);
        let height = default_extent(image.height);
        Self {
            image,
            rect: Rect::new(
                (image.width - width) / 2.0,
                (image.height - height) / 2.0,
                width,
                height,
            ),
            interaction: CropInteraction::Idle,
        }
    }

    pub fn with_rect(image: Size, rect: Rect) -> Option<Self> {
        rect_is_valid(rect, image).then_some(Self {
            image,
            rect,
            interaction: CropInteraction::Idle,
        })
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn image_size(&self) -> Size {
        self.image
    }

    pub fn interaction(&self) -> CropInteraction {
        self.interaction
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.interaction, CropInteraction::Dragging { .. })
    }

    pub fn is_valid(&self) -> bool {
        rect_is_valid(self.rect, self.image)
    }

    pub fn begin_drag(self, target: CropTarget) -> Self {
        tracing::debug!(?target, rect = ?self.rect, "crop drag started");
        Self {
            interaction: CropInteraction::Dragging {
                target,
                start: self.rect,
            },
            ..self
        }
    }

    /// Applies the gesture's cumulative display-space `translation`, measured
    /// from where the drag began.
    pub fn drag(self, translation: Point, scale: Scale) -> Self {
        let CropInteraction::Dragging { target, start } = self.interaction else {
            tracing::debug!("crop drag update without an active gesture");
            return self;
        };
        let Some(delta) = mapping::display_to_pixel_delta(translation, scale) else {
            tracing::debug!(?translation, "crop drag skipped: degenerate display scale");
            return self;
        };

        let rect = match target {
            CropTarget::Move => moved_rect(start, delta, self.image),
            CropTarget::Resize(handle) => resized_rect(self.rect, start, handle, delta, self.image),
        };
        Self { rect, ..self }
    }

    pub fn end_drag(self) -> Self {
        Self {
            interaction: CropInteraction::Idle,
            ..self
        }
    }

    pub fn display_rect(&self, display: Rect, scale: Scale) -> Option<Rect> {
        mapping::pixel_to_display(self.rect, display, scale, self.image.height)
    }
}

fn default_extent(limit: f64) -> f64 {
    if limit < CROP_MIN_SIZE {
        limit.max(0.0)
    } else {
        (limit * CROP_DEFAULT_FRACTION).max(CROP_MIN_SIZE)
    }
}

fn rect_is_valid(rect: Rect, image: Size) -> bool {
    axis_is_valid(rect.x, rect.width, image.width) && axis_is_valid(rect.y, rect.height, image.height)
}

fn axis_is_valid(origin: f64, extent: f64, limit: f64) -> bool {
    origin.is_finite()
        && extent.is_finite()
        && origin >= 0.0
        && origin + extent <= limit + EDGE_EPSILON
        && extent >= CROP_MIN_SIZE.min(limit)
}

fn moved_rect(start: Rect, delta: Point, image: Size) -> Rect {
    let max_x = (image.width - start.width).max(0.0);
    let max_y = (image.height - start.height).max(0.0);
    Rect::new(
        (start.x + delta.x).clamp(0.0, max_x),
        (start.y + delta.y).clamp(0.0, max_y),
        start.width,
        start.height,
    )
}

fn resized_rect(current: Rect, start: Rect, handle: CropHandle, delta: Point, image: Size) -> Rect {
    let (x, width) = match handle.horizontal_edge() {
        Some(edge) => resize_axis(
            (current.x, current.width),
            (start.x, start.width),
            edge,
            delta.x,
            image.width,
        ),
        None => (current.x, current.width),
    };
    let (y, height) = match handle.vertical_edge() {
        Some(edge) => resize_axis(
            (current.y, current.height),
            (start.y, start.height),
            edge,
            delta.y,
            image.height,
        ),
        None => (current.y, current.height),
    };
    Rect::new(x, y, width, height)
}

fn resize_axis(
    current: (f64, f64),
    start: (f64, f64),
    edge: AxisEdge,
    delta: f64,
    limit: f64,
) -> (f64, f64) {
    let (origin, extent) = match edge {
        AxisEdge::Min => (start.0 + delta, start.1 - delta),
        AxisEdge::Max => (start.0, start.1 + delta),
    };
    if origin.is_finite()
        && extent.is_finite()
        && extent >= CROP_MIN_SIZE
        && origin >= 0.0
        && origin + extent <= limit + EDGE_EPSILON
    {
        (origin, extent)
    } else {
        current
    }
}

pub fn crop_handle_points(crop_display: Rect) -> [(CropHandle, Point); 8] {
    CropHandle::ALL.map(|handle| (handle, handle.display_point(crop_display)))
}

/// Interaction region under a display-space point. Handles win over the move
/// region so that corners stay grabbable on small crops.
pub fn hit_test(point: Point, crop_display: Rect, tolerance: f64) -> Option<CropTarget> {
    if !point.is_finite() {
        return None;
    }
    crop_handle_points(crop_display)
        .into_iter()
        .find(|(_, at)| (point.x - at.x).abs() <= tolerance && (point.y - at.y).abs() <= tolerance)
        .map(|(handle, _)| CropTarget::Resize(handle))
        .or_else(|| crop_display.contains(point).then_some(CropTarget::Move))
}

/// Copies the pixels under `rect` (pixel space) into a new image.
pub fn crop_image(image: &RgbaImage, rect: Rect) -> Option<RgbaImage> {
    let bounds = mapping::pixel_rect_to_raster(rect, image.width(), image.height())?;
    Some(imageops::crop_imm(image, bounds.x, bounds.y, bounds.width, bounds.height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: Size = Size::new(1000.0, 1000.0);
    const UNIT: Scale = Scale::new(1.0, 1.0);

    fn state(x: f64, y: f64, width: f64, height: f64) -> CropState {
        CropState::with_rect(IMAGE, Rect::new(x, y, width, height)).expect("valid crop rect")
    }

    #[test]
    fn centered_covers_eighty_percent() {
        let crop = CropState::centered(Size::new(1000.0, 500.0));
        assert_eq!(crop.rect(), Rect::new(100.0, 50.0, 800.0, 400.0));
        assert!(crop.is_valid());
    }

    #[test]
    fn centered_respects_minimum_size_on_small_images() {
        let crop = CropState::centered(Size::new(60.0, 40.0));
        assert_eq!(crop.rect().width, 50.0);
        assert_eq!(crop.rect().height, 40.0);
        assert!(crop.is_valid());
    }

    #[test]
    fn with_rect_rejects_invalid_rects() {
        assert!(CropState::with_rect(IMAGE, Rect::new(-1.0, 0.0, 100.0, 100.0)).is_none());
        assert!(CropState::with_rect(IMAGE, Rect::new(0.0, 0.0, 49.0, 100.0)).is_none());
        assert!(CropState::with_rect(IMAGE, Rect::new(951.0, 0.0, 50.0, 100.0)).is_none());
        assert!(CropState::with_rect(IMAGE, Rect::new(950.0, 950.0, 50.0, 50.0)).is_some());
    }

    #[test]
    fn handles_report_their_edges() {
        assert_eq!(CropHandle::TopLeft.horizontal_edge(), Some(AxisEdge::Min));
        assert_eq!(CropHandle::TopLeft.vertical_edge(), Some(AxisEdge::Max));
        assert_eq!(CropHandle::Bottom.horizontal_edge(), None);
        assert_eq!(CropHandle::Bottom.vertical_edge(), Some(AxisEdge::Min));
        assert_eq!(CropHandle::Right.vertical_edge(), None);
    }

    #[test]
    fn move_drag_past_origin_clamps_to_zero() {
        let crop = state(300.0, 300.0, 200.0, 200.0).begin_drag(CropTarget::Move);
        let crop = crop.drag(Point::new(-120.0, 120.0), UNIT);
        assert_eq!(crop.rect().origin(), Point::new(180.0, 180.0));
        let crop = crop.drag(Point::new(-5000.0, 5000.0), UNIT);
        assert_eq!(crop.rect(), Rect::new(0.0, 0.0, 200.0, 200.0));
        assert!(!crop.end_drag().is_dragging());
    }

    #[test]
    fn move_drag_clamps_at_far_edges_without_resizing() {
        let crop = state(300.0, 300.0, 200.0, 200.0)
            .begin_drag(CropTarget::Move)
            .drag(Point::new(9000.0, -9000.0), UNIT);
        assert_eq!(crop.rect(), Rect::new(800.0, 800.0, 200.0, 200.0));
    }

    #[test]
    fn move_uses_cumulative_translation_without_drift() {
        let mut crop = state(100.0, 100.0, 200.0, 200.0).begin_drag(CropTarget::Move);
        for step in 1..=10 {
            crop = crop.drag(Point::new(f64::from(step) * 3.0, 0.0), Scale::new(2.0, 2.0));
        }
        assert_eq!(crop.rect().origin(), Point::new(160.0, 100.0));
    }

    #[test]
    fn display_translation_down_moves_pixel_rect_down() {
        let crop = state(100.0, 500.0, 200.0, 200.0)
            .begin_drag(CropTarget::Move)
            .drag(Point::new(0.0, 50.0), UNIT);
        assert_eq!(crop.rect().y, 450.0);
    }

    #[test]
    fn right_handle_grows_and_shrinks_width_only() {
        let crop = state(100.0, 100.0, 200.0, 200.0).begin_drag(CropTarget::Resize(CropHandle::Right));
        let grown = crop.drag(Point::new(100.0, 40.0), UNIT);
        assert_eq!(grown.rect(), Rect::new(100.0, 100.0, 300.0, 200.0));
        let shrunk = grown.drag(Point::new(-100.0, 0.0), UNIT);
        assert_eq!(shrunk.rect(), Rect::new(100.0, 100.0, 100.0, 200.0));
    }

    #[test]
    fn left_handle_keeps_right_edge_fixed() {
        let crop = state(100.0, 100.0, 200.0, 200.0)
            .begin_drag(CropTarget::Resize(CropHandle::Left))
            .drag(Point::new(60.0, 0.0), UNIT);
        assert_eq!(crop.rect(), Rect::new(160.0, 100.0, 140.0, 200.0));
        assert_eq!(crop.rect().max_x(), 300.0);
    }

    #[test]
    fn top_handle_dragged_down_lowers_top_edge() {
        let crop = state(100.0, 100.0, 200.0, 200.0)
            .begin_drag(CropTarget::Resize(CropHandle::Top))
            .drag(Point::new(0.0, 30.0), UNIT);
        assert_eq!(crop.rect(), Rect::new(100.0, 100.0, 200.0, 170.0));
    }

    #[test]
    fn bottom_handle_dragged_down_extends_toward_pixel_origin() {
        let crop = state(100.0, 100.0, 200.0, 200.0)
            .begin_drag(CropTarget::Resize(CropHandle::Bottom))
            .drag(Point::new(0.0, 40.0), UNIT);
        assert_eq!(crop.rect(), Rect::new(100.0, 60.0, 200.0, 240.0));
    }

    #[test]
    fn resize_below_minimum_is_rejected_not_clamped() {
        let crop = state(100.0, 100.0, 200.0, 200.0).begin_drag(CropTarget::Resize(CropHandle::Right));
        let near = crop.drag(Point::new(-140.0, 0.0), UNIT);
        assert_eq!(near.rect().width, 60.0);
        let rejected = near.drag(Point::new(-160.0, 0.0), UNIT);
        assert_eq!(rejected.rect().width, 60.0);
        let exact = rejected.drag(Point::new(-150.0, 0.0), UNIT);
        assert_eq!(exact.rect().width, CROP_MIN_SIZE);
    }

    #[test]
    fn resize_past_image_edge_holds_last_valid_extent_without_jitter() {
        let mut crop = state(100.0, 100.0, 200.0, 200.0).begin_drag(CropTarget::Resize(CropHandle::Left));
        let mut widths = Vec::new();
        for dx in (0..=20).map(|step| -f64::from(step) * 10.0) {
            crop = crop.drag(Point::new(dx, 0.0), UNIT);
            widths.push(crop.rect().width);
            assert!(crop.rect().x >= 0.0);
            assert_eq!(crop.rect().max_x(), 300.0);
        }
        assert_eq!(crop.rect().x, 0.0);
        assert!(widths.windows(2).all(|pair| pair[1] >= pair[0]));
        assert_eq!(*widths.last().expect("widths recorded"), 300.0);
    }

    #[test]
    fn corner_handle_rejects_axes_independently() {
        let crop = state(0.0, 100.0, 200.0, 200.0)
            .begin_drag(CropTarget::Resize(CropHandle::TopLeft))
            .drag(Point::new(-30.0, -50.0), UNIT);
        // Horizontal update would push x negative; vertical one is fine.
        assert_eq!(crop.rect(), Rect::new(0.0, 100.0, 200.0, 250.0));
    }

    #[test]
    fn degenerate_scale_leaves_rect_untouched() {
        let crop = state(100.0, 100.0, 200.0, 200.0).begin_drag(CropTarget::Move);
        let next = crop.drag(Point::new(10.0, 10.0), Scale::ZERO);
        assert_eq!(next.rect(), crop.rect());
        let next = crop.drag(Point::new(f64::NAN, 10.0), UNIT);
        assert_eq!(next.rect(), crop.rect());
    }

    #[test]
    fn drag_without_begin_is_ignored() {
        let crop = state(100.0, 100.0, 200.0, 200.0);
        assert_eq!(crop.drag(Point::new(50.0, 50.0), UNIT), crop);
    }

    #[test]
    fn arbitrary_gesture_sequences_preserve_invariants() {
        let mut seed = 0x2545_f491_4f6c_dd1d_u64;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };
        let image = Size::new(640.0, 480.0);
        let mut crop = CropState::centered(image);
        for _ in 0..2000 {
            let pick = (next() % 9) as usize;
            let target = if pick == 8 {
                CropTarget::Move
            } else {
                CropTarget::Resize(CropHandle::ALL[pick])
            };
            crop = crop.begin_drag(target);
            for _ in 0..5 {
                let dx = (next() % 1601) as f64 - 800.0;
                let dy = (next() % 1601) as f64 - 800.0;
                crop = crop.drag(Point::new(dx * 0.37, dy * 0.41), Scale::new(1.5, 1.5));
                assert!(crop.is_valid(), "invariant broken: {:?}", crop.rect());
            }
            crop = crop.end_drag();
        }
    }

    #[test]
    fn hit_test_prefers_handles_over_move_region() {
        let rect = Rect::new(100.0, 100.0, 200.0, 100.0);
        assert_eq!(
            hit_test(Point::new(102.0, 98.0), rect, CROP_HANDLE_TOLERANCE),
            Some(CropTarget::Resize(CropHandle::TopLeft))
        );
        assert_eq!(
            hit_test(Point::new(200.0, 201.0), rect, CROP_HANDLE_TOLERANCE),
            Some(CropTarget::Resize(CropHandle::Bottom))
        );
        assert_eq!(
            hit_test(Point::new(150.0, 150.0), rect, CROP_HANDLE_TOLERANCE),
            Some(CropTarget::Move)
        );
        assert_eq!(hit_test(Point::new(10.0, 10.0), rect, CROP_HANDLE_TOLERANCE), None);
    }

    #[test]
    fn display_rect_places_pixel_top_at_display_top() {
        let crop = CropState::with_rect(Size::new(200.0, 100.0), Rect::new(0.0, 50.0, 100.0, 50.0))
            .expect("valid crop");
        let display = Rect::new(0.0, 0.0, 400.0, 200.0);
        let shown = crop
            .display_rect(display, Scale::new(0.5, 0.5))
            .expect("valid scale");
        assert_eq!(shown, Rect::new(0.0, 0.0, 200.0, 100.0));
    }

    #[test]
    fn cropped_image_matches_rect_dimensions() {
        let image = RgbaImage::from_fn(300, 200, |x, y| image::Rgba([x as u8, y as u8, 0, 255]));
        let cropped =
            crop_image(&image, Rect::new(20.0, 30.0, 120.0, 70.0)).expect("rect inside image");
        assert_eq!(cropped.dimensions(), (120, 70));
        // Pixel-space y=30..100 maps to raster rows 100..170.
        assert_eq!(cropped.get_pixel(0, 0), &image::Rgba([20, 100, 0, 255]));
    }
}

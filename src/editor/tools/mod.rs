mod crop;
mod text;

pub use crate::geometry::{Color, Point, RasterBounds, Rect, Size};
pub use crop::{
    crop_handle_points, crop_image, hit_test, AxisEdge, CropHandle, CropInteraction, CropState, CropTarget,
    CROP_DEFAULT_FRACTION, CROP_HANDLE_TOLERANCE, CROP_MIN_SIZE,
};
pub use text::{
    clamp_anchor, padded_box, TextFontFamily, TextOptions, TextOverlayState,
    TEXT_BACKGROUND_RADIUS, TEXT_BOX_PADDING,
};


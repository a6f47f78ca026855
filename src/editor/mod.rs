//! Edit session: one image opened for filter, crop and text editing.

pub mod compositor;
pub mod mapping;
pub mod tools;
pub mod typography;

use std::path::{Path, PathBuf};

use image::RgbaImage;
use thiserror::Error;

use crate::filters::{FilterCatalog, FilterSelection};
use crate::geometry::{Point, RasterBounds, Rect, Size};
use crate::storage::{SaveFormat, SaveMode, SaveRequest};

pub use compositor::TextPlacement;
pub use mapping::Scale;
pub use tools::{CropHandle, CropState, CropTarget, TextFontFamily, TextOptions, TextOverlayState};
pub use typography::Typeface;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("no crop is being edited")]
    NoActiveCrop,
    #[error("no text overlay is placed")]
    NoTextOverlay,
    #[error("crop rect {x},{y} {width}x{height} does not fit the image or is below the minimum size")]
    InvalidCropRect {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

pub type EditorResult<T> = std::result::Result<T, EditorError>;

/// Working state of a single edit. The working image is replaced, never
/// mutated, by each applied crop; filter and text are only burned in by
/// [`EditSession::bake`].
#[derive(Debug)]
pub struct EditSession {
    source_path: PathBuf,
    working: RgbaImage,
    container: Size,
    filter: FilterSelection,
    crop: Option<CropState>,
    text: Option<TextOverlayState>,
    typeface: Typeface,
}

impl EditSession {
    pub fn new(source_path: PathBuf, image: RgbaImage, container: Size, typeface: Typeface) -> Self {
        tracing::info!(
            path = %source_path.display(),
            width = image.width(),
            height = image.height(),
            "edit session opened"
        );
        Self {
            source_path,
            working: image,
            container,
            filter: FilterSelection::None,
            crop: None,
            text: None,
            typeface,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn image(&self) -> &RgbaImage {
        &self.working
    }

    pub fn image_size(&self) -> Size {
        Size::from_pixels(self.working.width(), self.working.height())
    }

    pub fn container(&self) -> Size {
        self.container
    }

    pub fn filter(&self) -> FilterSelection {
        self.filter
    }

    pub fn crop(&self) -> Option<&CropState> {
        self.crop.as_ref()
    }

    pub fn text(&self) -> Option<&TextOverlayState> {
        self.text.as_ref()
    }

    pub fn typeface(&self) -> &Typeface {
        &self.typeface
    }

    /// Scale-to-fit rect of the working image inside the container.
    pub fn display_rect(&self) -> Rect {
        mapping::display_rect_for_image(self.image_size(), self.container)
    }

    pub fn scale(&self) -> Scale {
        Scale::between(self.image_size(), self.display_rect())
    }

    pub fn set_container(&mut self, container: Size) {
        let previous = self.display_rect();
        self.container = container;
        let next = self.display_rect();
        self.relayout_text(previous, next);
    }

    pub fn select_filter(&mut self, filter: FilterSelection) {
        tracing::debug!(?filter, "filter selected");
        self.filter = filter;
    }

    /// Working image with the selected filter, without the text overlay.
    pub fn preview(&self, catalog: &dyn FilterCatalog) -> RgbaImage {
        compositor::apply_filter(&self.working, self.filter, catalog)
    }

    pub fn open_crop(&mut self) -> &CropState {
        let image = self.image_size();
        self.crop.get_or_insert_with(|| CropState::centered(image))
    }

    pub fn crop_display_rect(&self) -> Option<Rect> {
        self.crop
            .as_ref()
            .and_then(|crop| crop.display_rect(self.display_rect(), self.scale()))
    }

    pub fn crop_hit_test(&self, point: Point) -> Option<CropTarget> {
        let rect = self.crop_display_rect()?;
        tools::hit_test(point, rect, tools::CROP_HANDLE_TOLERANCE)
    }

    pub fn crop_begin_drag(&mut self, target: CropTarget) -> EditorResult<()> {
        let crop = self.crop.ok_or(EditorError::NoActiveCrop)?;
        self.crop = Some(crop.begin_drag(target));
        Ok(())
    }

    pub fn crop_drag(&mut self, translation: Point) -> EditorResult<()> {
        let crop = self.crop.ok_or(EditorError::NoActiveCrop)?;
        self.crop = Some(crop.drag(translation, self.scale()));
        Ok(())
    }

    pub fn crop_end_drag(&mut self) -> EditorResult<()> {
        let crop = self.crop.ok_or(EditorError::NoActiveCrop)?;
        self.crop = Some(crop.end_drag());
        Ok(())
    }

    /// Replaces the pending crop with an explicit rect in raster rows.
    pub fn set_crop_bounds(&mut self, bounds: RasterBounds) -> EditorResult<()> {
        let rect = mapping::raster_to_pixel_rect(bounds, self.working.height());
        let crop = CropState::with_rect(self.image_size(), rect).ok_or(EditorError::InvalidCropRect {
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
        })?;
        self.crop = Some(crop);
        Ok(())
    }

    /// Crops the working image to the pending rect and returns the new size.
    pub fn apply_crop(&mut self) -> EditorResult<(u32, u32)> {
        let crop = self.crop.take().ok_or(EditorError::NoActiveCrop)?;
        let previous = self.display_rect();
        let Some(cropped) = tools::crop_image(&self.working, crop.rect()) else {
            tracing::warn!(rect = ?crop.rect(), "crop rect left no pixels; keeping image");
            return Err(EditorError::NoActiveCrop);
        };
        self.working = cropped;
        let next = self.display_rect();
        self.relayout_text(previous, next);
        tracing::info!(
            width = self.working.width(),
            height = self.working.height(),
            "crop applied"
        );
        Ok(self.working.dimensions())
    }

    pub fn cancel_crop(&mut self) -> bool {
        self.crop.take().is_some()
    }

    pub fn text_box_size(&self) -> Option<Size> {
        self.text.as_ref().map(|text| self.box_size_for(text))
    }

    pub fn text_display_box(&self) -> Option<Rect> {
        let text = self.text.as_ref()?;
        Some(text.display_box(self.box_size_for(text)))
    }

    pub fn place_text(&mut self, content: impl Into<String>, options: TextOptions) {
        if options.family != self.typeface.family() {
            self.typeface = self.typeface.with_family(options.family);
        }
        let display = self.display_rect();
        let overlay = TextOverlayState::new(content, options, display);
        let box_size = self.box_size_for(&overlay);
        self.text = Some(overlay.reclamp(box_size, display));
    }

    pub fn set_text_content(&mut self, content: impl Into<String>) -> EditorResult<()> {
        let overlay = self.text.take().ok_or(EditorError::NoTextOverlay)?;
        let overlay = overlay.with_content(content);
        self.text = Some(self.reclamped(overlay));
        Ok(())
    }

    pub fn set_text_options(&mut self, options: TextOptions) -> EditorResult<()> {
        let overlay = self.text.take().ok_or(EditorError::NoTextOverlay)?;
        if options.family != self.typeface.family() {
            self.typeface = self.typeface.with_family(options.family);
        }
        let overlay = overlay.with_options(options);
        self.text = Some(self.reclamped(overlay));
        Ok(())
    }

    pub fn text_begin_drag(&mut self) -> EditorResult<()> {
        let overlay = self.text.take().ok_or(EditorError::NoTextOverlay)?;
        self.text = Some(overlay.begin_drag());
        Ok(())
    }

    pub fn text_drag(&mut self, translation: Point) -> EditorResult<()> {
        let overlay = self.text.take().ok_or(EditorError::NoTextOverlay)?;
        let box_size = self.box_size_for(&overlay);
        self.text = Some(overlay.drag(translation, box_size, self.display_rect()));
        Ok(())
    }

    pub fn text_end_drag(&mut self) -> EditorResult<()> {
        let overlay = self.text.take().ok_or(EditorError::NoTextOverlay)?;
        self.text = Some(overlay.end_drag());
        Ok(())
    }

    pub fn remove_text(&mut self) -> bool {
        self.text.take().is_some()
    }

    /// Final raster: filter output with the text overlay burned in.
    pub fn bake(&self, catalog: &dyn FilterCatalog) -> RgbaImage {
        let placement = self.text.as_ref().map(|overlay| TextPlacement {
            overlay,
            container: self.container,
            typeface: &self.typeface,
        });
        compositor::bake(&self.working, self.filter, catalog, placement)
    }

    /// Bakes the edit and consumes the session into a save job.
    pub fn into_save_request(
        self,
        catalog: &dyn FilterCatalog,
        mode: SaveMode,
        format: SaveFormat,
        jpeg_quality: u8,
    ) -> SaveRequest {
        let image = self.bake(catalog);
        SaveRequest::new(image, self.source_path, mode, format, jpeg_quality)
    }

    fn box_size_for(&self, overlay: &TextOverlayState) -> Size {
        tools::padded_box(self.typeface.measure(overlay.content(), overlay.options().size))
    }

    fn reclamped(&self, overlay: TextOverlayState) -> TextOverlayState {
        let box_size = self.box_size_for(&overlay);
        overlay.reclamp(box_size, self.display_rect())
    }

    fn relayout_text(&mut self, previous: Rect, next: Rect) {
        if let Some(overlay) = self.text.take() {
            let box_size = self.box_size_for(&overlay);
            self.text = Some(overlay.relayout(previous, next, box_size));
        }
    }
}

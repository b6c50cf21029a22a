//! Collaborator interfaces for the rendering and machine-learned parts of the pipeline.
//!
//! The fusion engine never runs a model itself. It hands rendered images to
//! implementations of these traits and fuses what comes back. Every slot in a
//! [`ModelSet`] is optional; a stage whose collaborator is missing is skipped.
//!
//! # Example
//!
//! ```no_run
//! use docfuse::models::{LayoutModel, ModelSet};
//! use docfuse::model::{Layout, Resource};
//! use std::sync::Arc;
//!
//! struct NoLayout;
//!
//! impl LayoutModel for NoLayout {
//!     fn detect(&self, images: &[Resource]) -> docfuse::Result<Vec<Layout>> {
//!         Ok(images.iter().map(|_| Layout::default()).collect())
//!     }
//! }
//!
//! let models = ModelSet::new().with_layout(Arc::new(NoLayout));
//! assert!(models.layout.is_some());
//! ```

mod detection;

pub use detection::{detect_layout, detect_order, detect_text_lines, run_detection};

use crate::error::Result;
use crate::model::{BBox, Block, Layout, Order, Page, Resource, TextLines};
use std::fmt;
use std::sync::Arc;

/// Renders pages and page regions to images.
pub trait PageRenderer: Send + Sync {
    /// Render a whole page at `dpi`.
    fn render_page(&self, page: &Page, dpi: u32) -> Result<Resource>;

    /// Render the page-space `bbox` of a page at `dpi`.
    fn render_region(&self, page: &Page, bbox: &BBox, dpi: u32) -> Result<Resource>;
}

/// Predicts labeled layout regions, one [`Layout`] per image.
pub trait LayoutModel: Send + Sync {
    fn detect(&self, images: &[Resource]) -> Result<Vec<Layout>>;
}

/// Predicts reading-order positions for candidate boxes, one [`Order`] per image.
pub trait OrderModel: Send + Sync {
    /// `candidates[i]` holds the boxes for `images[i]`, in that image's space.
    fn order(&self, images: &[Resource], candidates: &[Vec<BBox>]) -> Result<Vec<Order>>;
}

/// Detects text line boxes, one [`TextLines`] per image.
pub trait TextLineDetector: Send + Sync {
    fn detect(&self, images: &[Resource]) -> Result<Vec<TextLines>>;
}

/// Page-level OCR.
pub trait OcrEngine: Send + Sync {
    /// Name recorded as the page's OCR method.
    fn name(&self) -> &str;

    /// Recognize a rendered page, returning blocks in page space.
    fn recognize(&self, page: &Page, image: &Resource, languages: &[String]) -> Result<Vec<Block>>;
}

/// Region-level equation recognition producing LaTeX.
pub trait EquationModel: Send + Sync {
    /// Absolute generation limit of the model.
    fn max_tokens(&self) -> usize;

    /// Token count of `text` under the model's tokenizer.
    ///
    /// Counts the same units as `max_length` in [`EquationModel::recognize`].
    fn count_tokens(&self, text: &str) -> usize;

    /// One prediction per image, generating at most `max_length` tokens each.
    fn recognize(&self, images: &[Resource], max_length: usize) -> Result<Vec<String>>;
}

/// The collaborators available to one conversion run.
///
/// Cheap to clone; models are shared read-only between documents.
#[derive(Clone, Default)]
pub struct ModelSet {
    pub renderer: Option<Arc<dyn PageRenderer>>,
    pub layout: Option<Arc<dyn LayoutModel>>,
    pub order: Option<Arc<dyn OrderModel>>,
    pub detector: Option<Arc<dyn TextLineDetector>>,
    pub ocr: Option<Arc<dyn OcrEngine>>,
    pub equations: Option<Arc<dyn EquationModel>>,
}

impl ModelSet {
    /// Create an empty set. Every model-driven stage will be skipped.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_layout(mut self, model: Arc<dyn LayoutModel>) -> Self {
        self.layout = Some(model);
        self
    }

    pub fn with_order(mut self, model: Arc<dyn OrderModel>) -> Self {
        self.order = Some(model);
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn TextLineDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_ocr(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    pub fn with_equations(mut self, model: Arc<dyn EquationModel>) -> Self {
        self.equations = Some(model);
        self
    }

    /// Names of the populated slots, for logging.
    pub fn available(&self) -> Vec<&'static str> {
        let slots = [
            ("renderer", self.renderer.is_some()),
            ("layout", self.layout.is_some()),
            ("order", self.order.is_some()),
            ("detector", self.detector.is_some()),
            ("ocr", self.ocr.is_some()),
            ("equations", self.equations.is_some()),
        ];
        slots
            .into_iter()
            .filter(|(_, present)| *present)
            .map(|(name, _)| name)
            .collect()
    }
}

impl fmt::Debug for ModelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSet")
            .field("available", &self.available())
            .finish()
    }
}

/// Pixel-space bounds of a page image rendered at `dpi`.
///
/// Uses the image's own dimensions when the renderer reported them.
pub fn image_bbox(page: &Page, image: &Resource, dpi: u32) -> BBox {
    match (image.width, image.height) {
        (Some(w), Some(h)) => BBox::new(0.0, 0.0, w as f32, h as f32),
        _ => {
            let scale = dpi as f32 / 72.0;
            BBox::new(
                0.0,
                0.0,
                page.bbox.width() * scale,
                page.bbox.height() * scale,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blank;

    impl PageRenderer for Blank {
        fn render_page(&self, _page: &Page, _dpi: u32) -> Result<Resource> {
            Ok(Resource::png(vec![]))
        }

        fn render_region(&self, _page: &Page, _bbox: &BBox, _dpi: u32) -> Result<Resource> {
            Ok(Resource::png(vec![]))
        }
    }

    #[test]
    fn test_model_set_slots() {
        let models = ModelSet::new();
        assert!(models.available().is_empty());

        let models = models.with_renderer(Arc::new(Blank));
        assert_eq!(models.available(), vec!["renderer"]);
        assert!(format!("{:?}", models).contains("renderer"));
    }

    #[test]
    fn test_image_bbox() {
        let page = Page::letter(0);
        let sized = Resource::png(vec![]).with_dimensions(100, 200);
        assert_eq!(image_bbox(&page, &sized, 96), BBox::new(0.0, 0.0, 100.0, 200.0));

        let r#unsized = Resource::png(vec![]);
        assert_eq!(image_bbox(&page, &r#unsized, 144), BBox::new(0.0, 0.0, 1224.0, 1584.0));
    }
}

//! Fusion options threaded through every stage.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;

/// Compute device the model collaborators run on.
///
/// Only used to pick default batch sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
    Mps,
}

impl Device {
    /// Whether this is a GPU-class accelerator.
    pub fn is_accelerator(&self) -> bool {
        matches!(self, Device::Cuda | Device::Mps)
    }
}

/// Page-level OCR engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    Surya,
    #[default]
    Tesseract,
}

impl std::fmt::Display for OcrEngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrEngineKind::Surya => write!(f, "surya"),
            OcrEngineKind::Tesseract => write!(f, "tesseract"),
        }
    }
}

/// Options for fusing one document.
///
/// Every stage receives `&FusionOptions`; nothing reads global state.
/// Deserializes from partial JSON, missing keys take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionOptions {
    /// Device the models run on
    pub device: Device,

    /// Multiplier applied to every model batch size
    pub batch_multiplier: usize,

    /// Minimum coverage for a line to belong to a layout region
    pub bbox_intersection_thresh: f32,

    // Page range
    /// First page (0-based) to fuse
    pub start_page: usize,
    /// Fuse at most this many pages; all remaining pages when unset
    pub max_pages: Option<usize>,

    // Equations
    /// Equation model's absolute token limit
    pub texify_model_max: usize,
    /// Extra generation budget above the longest input in a batch
    pub texify_token_buffer: usize,
    /// Equation batch size override
    pub texify_batch_size: Option<usize>,
    pub texify_dpi: u32,

    // Images
    pub image_dpi: u32,
    pub extract_images: bool,

    // Reading order
    /// Most layout boxes handed to the order model per page
    pub order_max_bboxes: usize,
    pub order_batch_size: Option<usize>,
    pub order_dpi: u32,
    /// Vertical bucket size for the within-position geometric sort
    pub sort_tolerance: f32,

    // Detection
    pub layout_batch_size: Option<usize>,
    pub layout_dpi: u32,
    pub detector_batch_size: Option<usize>,
    pub detector_dpi: u32,

    // OCR
    pub ocr_all_pages: bool,
    pub ocr_engine: OcrEngineKind,
    /// OCR languages, names or engine codes; the document's own list when empty
    pub languages: Vec<String>,
    pub ocr_parallel_workers: usize,
    pub ocr_dpi: u32,
    pub ocr_space_threshold: f32,
    pub ocr_newline_threshold: f32,
    pub ocr_alphanum_threshold: f32,
    pub invalid_chars: Vec<char>,
    /// Summed coverage a detected line needs to count as extracted
    pub ocr_intersect_thresh: f32,
    /// Fraction of detected lines that must be extracted to skip OCR
    pub ocr_detection_thresh: f32,

    // Code
    pub code_density_limit: f32,
    pub code_indent_ratio: f32,
    pub code_font_ratio: f32,

    // Boilerplate
    /// First/last K non-blank lines per page scanned for headers and footers
    pub header_footer_lines: usize,
    pub header_footer_ratio: f32,
    pub header_min_chars: usize,
    pub title_similarity: f32,
    pub title_min_count: usize,
    pub title_min_fraction: f32,

    /// Font weight at or above which a span is bold
    pub bold_min_weight: f32,

    // Debug
    pub debug_level: u8,
    pub debug_data_folder: Option<PathBuf>,
}

impl FusionOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compute device.
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Set the batch multiplier.
    pub fn with_batch_multiplier(mut self, multiplier: usize) -> Self {
        self.batch_multiplier = multiplier.max(1);
        self
    }

    /// Set the page OCR engine.
    pub fn with_ocr_engine(mut self, engine: OcrEngineKind) -> Self {
        self.ocr_engine = engine;
        self
    }

    /// OCR every page regardless of the heuristics.
    pub fn with_ocr_all_pages(mut self, all: bool) -> Self {
        self.ocr_all_pages = all;
        self
    }

    /// Set the OCR languages.
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Set the number of parallel OCR workers.
    pub fn with_ocr_workers(mut self, workers: usize) -> Self {
        self.ocr_parallel_workers = workers.max(1);
        self
    }

    /// Enable or disable image extraction.
    pub fn with_images(mut self, extract: bool) -> Self {
        self.extract_images = extract;
        self
    }

    /// Only fuse pages `start..start + max`, or every page from `start` on.
    pub fn with_page_range(mut self, start: usize, max: Option<usize>) -> Self {
        self.start_page = start;
        self.max_pages = max;
        self
    }

    /// The page indices to fuse in a document of `page_count` pages.
    pub fn page_range(&self, page_count: usize) -> Range<usize> {
        let start = self.start_page.min(page_count);
        let end = match self.max_pages {
            Some(max) => start.saturating_add(max).min(page_count),
            None => page_count,
        };
        start..end
    }

    /// Enable debug dumps into `folder`.
    pub fn with_debug(mut self, level: u8, folder: impl Into<PathBuf>) -> Self {
        self.debug_level = level;
        self.debug_data_folder = Some(folder.into());
        self
    }

    /// Equation batch size: explicit override, else 6 on accelerators and 2 on cpu,
    /// times the multiplier.
    pub fn texify_batch_size(&self) -> usize {
        let base = self
            .texify_batch_size
            .unwrap_or(if self.device.is_accelerator() { 6 } else { 2 });
        (base * self.batch_multiplier).max(1)
    }

    pub fn order_batch_size(&self) -> usize {
        (self.order_batch_size.unwrap_or(6) * self.batch_multiplier).max(1)
    }

    pub fn layout_batch_size(&self) -> usize {
        (self.layout_batch_size.unwrap_or(6) * self.batch_multiplier).max(1)
    }

    pub fn detector_batch_size(&self) -> usize {
        (self.detector_batch_size.unwrap_or(4) * self.batch_multiplier).max(1)
    }
}

impl Default for FusionOptions {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            batch_multiplier: 1,
            bbox_intersection_thresh: 0.5,
            start_page: 0,
            max_pages: None,
            texify_model_max: 384,
            texify_token_buffer: 256,
            texify_batch_size: None,
            texify_dpi: 96,
            image_dpi: 96,
            extract_images: true,
            order_max_bboxes: 255,
            order_batch_size: None,
            order_dpi: 96,
            sort_tolerance: 1.25,
            layout_batch_size: None,
            layout_dpi: 96,
            detector_batch_size: None,
            detector_dpi: 96,
            ocr_all_pages: false,
            ocr_engine: OcrEngineKind::Tesseract,
            languages: Vec::new(),
            ocr_parallel_workers: 4,
            ocr_dpi: 192,
            ocr_space_threshold: 0.7,
            ocr_newline_threshold: 0.6,
            ocr_alphanum_threshold: 0.3,
            invalid_chars: vec!['\u{FFFD}'],
            ocr_intersect_thresh: 0.5,
            ocr_detection_thresh: 0.4,
            code_density_limit: 80.0,
            code_indent_ratio: 0.7,
            code_font_ratio: 0.8,
            header_footer_lines: 2,
            header_footer_ratio: 0.6,
            header_min_chars: 4,
            title_similarity: 0.9,
            title_min_count: 3,
            title_min_fraction: 0.05,
            bold_min_weight: 600.0,
            debug_level: 0,
            debug_data_folder: None,
        }
    }
}

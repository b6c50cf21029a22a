//! OCR page selection, recognition and language handling.

mod heuristics;
pub mod lang;
mod recognition;

pub use heuristics::{
    alphanum_ratio, detect_bad_ocr, detected_line_coverage, no_text_found, should_ocr_page,
};
pub use recognition::{run_ocr, select_ocr_pages, OcrStats};

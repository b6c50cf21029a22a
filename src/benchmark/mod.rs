//! Scoring converted Markdown against reference Markdown.

mod report;
mod scoring;

pub use report::{BenchmarkReport, FileScore};
pub use scoring::{chunk_text, overlap_score, score_text, CHUNK_LEN, CHUNK_MIN_CHARS, SCORE_CUTOFF};

use crate::convert::batch::list_inputs;
use crate::convert::{load_document, output::output_stem, DocFuse};
use crate::detect::is_document_file;
use crate::error::Result;
use std::path::Path;
use std::time::Instant;

/// Convert every document in `in_folder` and score it against `<stem>.md` in `reference_folder`.
///
/// Documents without a reference are skipped. When `md_out` is given the
/// generated Markdown is written there as `<method>_<stem>.md`.
pub fn run_benchmark(
    in_folder: &Path,
    reference_folder: &Path,
    fuse: &DocFuse,
    md_out: Option<&Path>,
) -> Result<BenchmarkReport> {
    let mut report = BenchmarkReport::new("docfuse");

    for path in list_inputs(in_folder)? {
        if !is_document_file(&path) {
            continue;
        }
        let fname = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let stem = output_stem(fname).to_string();
        let reference_path = reference_folder.join(format!("{}.md", stem));
        let reference = match std::fs::read_to_string(&reference_path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Error reading reference file {}: {}", reference_path.display(), e);
                continue;
            }
        };

        let doc = load_document(&path)?;
        let pages = doc.page_count();
        let start = Instant::now();
        let result = fuse.convert(doc)?;
        let time = start.elapsed().as_secs_f64();

        let score = score_text(&result.markdown, &reference);
        log::info!("{}: score {:.4} in {:.2}s", stem, score, time);

        if let Some(dir) = md_out {
            std::fs::create_dir_all(dir)?;
            std::fs::write(dir.join(format!("{}_{}.md", report.method, stem)), &result.markdown)?;
        }
        report.add_file(stem, FileScore { time, score, pages });
    }

    Ok(report)
}

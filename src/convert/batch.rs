//! Converting a folder of documents on a worker pool.
//!
//! Every document is converted in isolation: an error or a panic while
//! fusing one file is reported for that file and the batch carries on.
//! Progress goes to the caller over a channel, one event per input.

use super::output::{markdown_exists, save_markdown};
use super::{convert_document, load_document, FusionStats};
use crate::detect::detect_kind_from_path;
use crate::error::{Error, Result};
use crate::models::ModelSet;
use crate::options::FusionOptions;
use crossbeam_channel::Sender;
use rayon::prelude::*;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// Options for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Worker threads
    pub workers: usize,

    /// Convert at most this many files of the chunk
    pub max: Option<usize>,

    /// Which chunk this run handles
    pub chunk_idx: usize,

    /// How many chunks the input is split into
    pub num_chunks: usize,

    /// Skip documents with fewer characters of extracted text
    pub min_length: usize,

    /// Skip documents whose Markdown already exists
    pub skip_existing: bool,
}

impl BatchOptions {
    /// Create batch options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Cap the number of files.
    pub fn with_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Handle chunk `idx` of `count`.
    pub fn with_chunk(mut self, idx: usize, count: usize) -> Self {
        self.chunk_idx = idx;
        self.num_chunks = count;
        self
    }

    /// Set the minimum text length.
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: 5,
            max: None,
            chunk_idx: 0,
            num_chunks: 1,
            min_length: 0,
            skip_existing: true,
        }
    }
}

/// Why a file was not converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a document JSON file
    UnknownKind(String),
    /// Output already on disk
    AlreadyConverted,
    /// Less extracted text than the minimum
    TooShort(usize),
    /// Fusion produced no Markdown
    Empty,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UnknownKind(kind) => write!(f, "not a document ({})", kind),
            SkipReason::AlreadyConverted => write!(f, "already converted"),
            SkipReason::TooShort(len) => write!(f, "too short ({} chars)", len),
            SkipReason::Empty => write!(f, "empty output"),
        }
    }
}

/// One finished input.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Written to the output folder
    Converted { file: PathBuf, stats: FusionStats },
    /// Left alone
    Skipped { file: PathBuf, reason: SkipReason },
    /// Failed or panicked
    Failed { file: PathBuf, error: String },
}

impl BatchEvent {
    /// The input this event is about.
    pub fn file(&self) -> &Path {
        match self {
            BatchEvent::Converted { file, .. }
            | BatchEvent::Skipped { file, .. }
            | BatchEvent::Failed { file, .. } => file,
        }
    }
}

/// Totals for a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Stage counters summed over converted documents
    pub stats: FusionStats,
}

impl BatchSummary {
    fn record(&mut self, event: &BatchEvent) {
        match event {
            BatchEvent::Converted { stats, .. } => {
                self.converted += 1;
                self.stats.merge(stats);
            }
            BatchEvent::Skipped { .. } => self.skipped += 1,
            BatchEvent::Failed { .. } => self.failed += 1,
        }
    }
}

/// Regular files directly under `folder`, sorted by name.
pub fn list_inputs(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Slice `files` to this run's chunk, then apply the cap.
pub fn plan_batch(mut files: Vec<PathBuf>, options: &BatchOptions) -> Vec<PathBuf> {
    let num_chunks = options.num_chunks.max(1);
    let chunk_size = files.len().div_ceil(num_chunks);
    let start = (options.chunk_idx * chunk_size).min(files.len());
    let end = (start + chunk_size).min(files.len());
    files.truncate(end);
    files = files.split_off(start);

    if let Some(max) = options.max {
        if max > 0 {
            files.truncate(max);
        }
    }
    files
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

fn process_file(
    path: &Path,
    out_folder: &Path,
    models: &ModelSet,
    fusion: &FusionOptions,
    options: &BatchOptions,
) -> Result<BatchEvent> {
    let fname = file_name(path);
    let skipped = |reason| BatchEvent::Skipped {
        file: path.to_path_buf(),
        reason,
    };

    if options.skip_existing && markdown_exists(out_folder, &fname) {
        return Ok(skipped(SkipReason::AlreadyConverted));
    }

    let kind = detect_kind_from_path(path)?;
    if !kind.is_convertible() {
        return Ok(skipped(SkipReason::UnknownKind(kind.to_string())));
    }

    let doc = load_document(path)?;
    if options.min_length > 0 {
        let length = doc.char_count();
        if length < options.min_length {
            return Ok(skipped(SkipReason::TooShort(length)));
        }
    }

    let result = convert_document(doc, models, fusion)?;
    if result.markdown.is_empty() {
        log::warn!("Empty file: {}. Could not convert.", path.display());
        return Ok(skipped(SkipReason::Empty));
    }

    save_markdown(out_folder, &fname, &result.markdown, &result.images, &result.stats)?;
    Ok(BatchEvent::Converted {
        file: path.to_path_buf(),
        stats: result.stats,
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Convert this run's share of `in_folder` into `out_folder`.
///
/// When `progress` is given, one [`BatchEvent`] is sent per planned file as
/// soon as it finishes.
pub fn run_batch(
    in_folder: &Path,
    out_folder: &Path,
    models: &ModelSet,
    fusion: &FusionOptions,
    options: &BatchOptions,
    progress: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary> {
    fs::create_dir_all(out_folder)?;
    let files = plan_batch(list_inputs(in_folder)?, options);
    let workers = options.workers.clamp(1, files.len().max(1));
    log::info!(
        "Converting {} files in chunk {}/{} with {} workers, storing in {}",
        files.len(),
        options.chunk_idx + 1,
        options.num_chunks.max(1),
        workers,
        out_folder.display()
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| Error::Other(format!("Failed to build worker pool: {}", e)))?;

    let events: Vec<BatchEvent> = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    process_file(path, out_folder, models, fusion, options)
                }));
                let event = match outcome {
                    Ok(Ok(event)) => event,
                    Ok(Err(e)) => BatchEvent::Failed {
                        file: path.clone(),
                        error: e.to_string(),
                    },
                    Err(payload) => BatchEvent::Failed {
                        file: path.clone(),
                        error: format!("panicked: {}", panic_message(payload.as_ref())),
                    },
                };
                if let BatchEvent::Failed { error, .. } = &event {
                    log::error!("Error converting {}: {}", path.display(), error);
                }
                if let Some(tx) = &progress {
                    // a dropped receiver only stops progress reporting
                    let _ = tx.send(event.clone());
                }
                event
            })
            .collect()
    });

    let mut summary = BatchSummary::default();
    for event in &events {
        summary.record(event);
    }
    Ok(summary)
}

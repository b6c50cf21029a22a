//! Writing a fused document to disk.

use super::FusionStats;
use crate::error::Result;
use crate::model::Resource;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Strip a trailing extension from a file name.
pub fn output_stem(fname: &str) -> &str {
    Path::new(fname)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(fname)
}

/// Folder that holds the output for `fname`.
pub fn subfolder_path(out_folder: &Path, fname: &str) -> PathBuf {
    out_folder.join(output_stem(fname))
}

fn markdown_path(out_folder: &Path, fname: &str) -> PathBuf {
    let stem = output_stem(fname);
    out_folder.join(stem).join(format!("{}.md", stem))
}

/// Whether `fname` already has a Markdown file under `out_folder`.
pub fn markdown_exists(out_folder: &Path, fname: &str) -> bool {
    markdown_path(out_folder, fname).exists()
}

/// Write `<stem>/<stem>.md`, every image and `<stem>_meta.json`.
///
/// Returns the subfolder the files were written to.
pub fn save_markdown(
    out_folder: &Path,
    fname: &str,
    markdown: &str,
    images: &BTreeMap<String, Resource>,
    stats: &FusionStats,
) -> Result<PathBuf> {
    let stem = output_stem(fname);
    let subfolder = subfolder_path(out_folder, fname);
    fs::create_dir_all(&subfolder)?;

    fs::write(markdown_path(out_folder, fname), markdown)?;

    let meta = serde_json::to_string_pretty(stats)?;
    fs::write(subfolder.join(format!("{}_meta.json", stem)), meta)?;

    for (filename, image) in images {
        fs::write(subfolder.join(filename), &image.data)?;
    }

    log::debug!(
        "Saved {} with {} images to {}",
        stem,
        images.len(),
        subfolder.display()
    );
    Ok(subfolder)
}

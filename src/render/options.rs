//! Rendering options and configuration.

use super::{CleanupOptions, CleanupPreset};

/// Options for rendering a fused document.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Wrap bold and italic spans of body text in Markdown emphasis
    pub emphasis: bool,

    /// Prefix for image paths in output (e.g., "./images/")
    pub image_path_prefix: String,

    /// Join hyphenated line breaks ("infor-" + "mation")
    pub dehyphenate: bool,

    /// Text cleanup options
    pub cleanup: Option<CleanupOptions>,

    /// Collect statistics during rendering
    pub collect_stats: bool,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable emphasis markers.
    pub fn with_emphasis(mut self, emphasis: bool) -> Self {
        self.emphasis = emphasis;
        self
    }

    /// Set the image path prefix.
    pub fn with_image_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.image_path_prefix = prefix.into();
        self
    }

    /// Enable or disable de-hyphenation.
    pub fn with_dehyphenate(mut self, dehyphenate: bool) -> Self {
        self.dehyphenate = dehyphenate;
        self
    }

    /// Set cleanup options.
    pub fn with_cleanup(mut self, cleanup: CleanupOptions) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    /// Set cleanup preset.
    pub fn with_cleanup_preset(mut self, preset: CleanupPreset) -> Self {
        self.cleanup = Some(CleanupOptions::from_preset(preset));
        self
    }

    /// Enable statistics collection.
    pub fn with_stats(mut self, collect: bool) -> Self {
        self.collect_stats = collect;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            emphasis: true,
            image_path_prefix: String::new(),
            dehyphenate: true,
            cleanup: None,
            collect_stats: false,
        }
    }
}

//! Final text cleanup applied to rendered Markdown.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static BULLETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[\n ])[•●○■▪▫–—]( )").expect("Invalid bullet regex"));
static NEWLINE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("Invalid newline regex"));
static BLANKISH_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\n\s){3,}").expect("Invalid blank line regex"));

const LIGATURES: &[(&str, &str)] = &[
    ("\u{FB00}", "ff"),
    ("\u{FB01}", "fi"),
    ("\u{FB02}", "fl"),
    ("\u{FB03}", "ffi"),
    ("\u{FB04}", "ffl"),
    ("\u{FB05}", "st"),
    ("\u{FB06}", "st"),
];

/// Cleanup preset levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPreset {
    /// Blank-line collapsing and non-breaking spaces only
    Minimal,
    /// Everything: bullets, NFC, ligatures, PUA removal
    #[default]
    Standard,
}

/// Options for text cleanup.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    /// Normalize Unicode to NFC form
    pub normalize_unicode: bool,

    /// Expand ligatures (ﬁ, ﬂ, ...)
    pub fix_ligatures: bool,

    /// Turn bullet glyphs into Markdown list dashes
    pub replace_bullets: bool,

    /// Replace non-breaking spaces with plain spaces
    pub replace_nbsp: bool,

    /// Remove Private Use Area characters
    pub remove_pua: bool,

    /// Collapse runs of blank lines to one
    pub collapse_newlines: bool,
}

impl CleanupOptions {
    /// Create options from a preset.
    pub fn from_preset(preset: CleanupPreset) -> Self {
        match preset {
            CleanupPreset::Minimal => Self::minimal(),
            CleanupPreset::Standard => Self::standard(),
        }
    }

    pub fn minimal() -> Self {
        Self {
            normalize_unicode: false,
            fix_ligatures: false,
            replace_bullets: false,
            replace_nbsp: true,
            remove_pua: false,
            collapse_newlines: true,
        }
    }

    pub fn standard() -> Self {
        Self {
            normalize_unicode: true,
            fix_ligatures: true,
            replace_bullets: true,
            replace_nbsp: true,
            remove_pua: true,
            collapse_newlines: true,
        }
    }
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self::standard()
    }
}

/// Replace bullet glyphs at the start of a line or after a space with `-`.
pub fn replace_bullets(text: &str) -> String {
    BULLETS.replace_all(text, "$1-$2").into_owned()
}

/// Collapse blank-line runs and replace non-breaking spaces.
pub fn cleanup_text(text: &str) -> String {
    let text = NEWLINE_RUNS.replace_all(text, "\n\n");
    let text = BLANKISH_RUNS.replace_all(&text, "\n\n");
    text.replace('\u{00A0}', " ")
}

fn is_pua(c: char) -> bool {
    let code = c as u32;
    (0xE000..=0xF8FF).contains(&code)
        || (0xF0000..=0xFFFFD).contains(&code)
        || (0x100000..=0x10FFFD).contains(&code)
}

/// Text cleanup pipeline.
#[derive(Debug, Clone, Default)]
pub struct CleanupPipeline {
    options: CleanupOptions,
}

impl CleanupPipeline {
    /// Create a new cleanup pipeline with the given options.
    pub fn new(options: CleanupOptions) -> Self {
        Self { options }
    }

    /// Create a pipeline from a preset.
    pub fn from_preset(preset: CleanupPreset) -> Self {
        Self::new(CleanupOptions::from_preset(preset))
    }

    /// Process text through the cleanup pipeline.
    pub fn process(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.options.normalize_unicode {
            result = result.nfc().collect();
        }

        if self.options.fix_ligatures {
            for (ligature, replacement) in LIGATURES {
                result = result.replace(ligature, replacement);
            }
        }

        if self.options.remove_pua {
            result = result.chars().filter(|c| !is_pua(*c)).collect();
        }

        if self.options.replace_bullets {
            result = replace_bullets(&result);
        }

        if self.options.collapse_newlines {
            result = NEWLINE_RUNS.replace_all(&result, "\n\n").into_owned();
            result = BLANKISH_RUNS.replace_all(&result, "\n\n").into_owned();
        }

        if self.options.replace_nbsp {
            result = result.replace('\u{00A0}', " ");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_bullets() {
        assert_eq!(replace_bullets("• first\n● second"), "- first\n- second");
        assert_eq!(replace_bullets("a – b"), "a - b");
        // no following space, not a bullet
        assert_eq!(replace_bullets("•x"), "•x");
    }

    #[test]
    fn test_cleanup_text() {
        let text = "This is a\n\n\ntest\n \n \ntext with\u{00A0}non-breaking\u{00A0}spaces.";
        assert_eq!(
            cleanup_text(text),
            "This is a\n\ntest\n \n \ntext with non-breaking spaces."
        );
        assert_eq!(cleanup_text("a\n\t\n\t\n\tb"), "a\n\nb");
    }

    #[test]
    fn test_ligature_fix() {
        let pipeline = CleanupPipeline::from_preset(CleanupPreset::Standard);
        assert_eq!(pipeline.process("ﬁnding ﬂowers"), "finding flowers");
    }

    #[test]
    fn test_unicode_normalization() {
        let pipeline = CleanupPipeline::default();
        let decomposed = "cafe\u{0301}";
        assert_eq!(pipeline.process(decomposed), "caf\u{00E9}");
    }

    #[test]
    fn test_minimal_preset_keeps_glyphs() {
        let pipeline = CleanupPipeline::from_preset(CleanupPreset::Minimal);
        assert_eq!(pipeline.process("• ﬁ\n\n\n\nend"), "• ﬁ\n\nend");
    }

    #[test]
    fn test_pua_removed() {
        let pipeline = CleanupPipeline::default();
        assert_eq!(pipeline.process("a\u{E000}b"), "ab");
    }
}

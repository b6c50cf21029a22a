//! OCR language names and engine-specific codes.

use crate::error::{Error, Result};
use crate::options::OcrEngineKind;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// `(language name, surya code, tesseract code)`
const LANGUAGES: &[(&str, &str, &str)] = &[
    ("Afrikaans", "af", "afr"),
    ("Arabic", "ar", "ara"),
    ("Bengali", "bn", "ben"),
    ("Bulgarian", "bg", "bul"),
    ("Catalan", "ca", "cat"),
    ("Chinese", "zh", "chi_sim"),
    ("Croatian", "hr", "hrv"),
    ("Czech", "cs", "ces"),
    ("Danish", "da", "dan"),
    ("Dutch", "nl", "nld"),
    ("English", "en", "eng"),
    ("Estonian", "et", "est"),
    ("Finnish", "fi", "fin"),
    ("French", "fr", "fra"),
    ("German", "de", "deu"),
    ("Greek", "el", "ell"),
    ("Hebrew", "he", "heb"),
    ("Hindi", "hi", "hin"),
    ("Hungarian", "hu", "hun"),
    ("Indonesian", "id", "ind"),
    ("Italian", "it", "ita"),
    ("Japanese", "ja", "jpn"),
    ("Korean", "ko", "kor"),
    ("Latvian", "lv", "lav"),
    ("Lithuanian", "lt", "lit"),
    ("Norwegian", "no", "nor"),
    ("Persian", "fa", "fas"),
    ("Polish", "pl", "pol"),
    ("Portuguese", "pt", "por"),
    ("Romanian", "ro", "ron"),
    ("Russian", "ru", "rus"),
    ("Serbian", "sr", "srp"),
    ("Slovak", "sk", "slk"),
    ("Slovenian", "sl", "slv"),
    ("Spanish", "es", "spa"),
    ("Swedish", "sv", "swe"),
    ("Tamil", "ta", "tam"),
    ("Thai", "th", "tha"),
    ("Turkish", "tr", "tur"),
    ("Ukrainian", "uk", "ukr"),
    ("Urdu", "ur", "urd"),
    ("Vietnamese", "vi", "vie"),
];

static NAME_TO_CODE: Lazy<HashMap<(OcrEngineKind, String), &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (name, surya, tesseract) in LANGUAGES {
        map.insert((OcrEngineKind::Surya, name.to_lowercase()), *surya);
        map.insert((OcrEngineKind::Tesseract, name.to_lowercase()), *tesseract);
    }
    map
});

fn is_known_code(code: &str, engine: OcrEngineKind) -> bool {
    LANGUAGES.iter().any(|(_, surya, tesseract)| match engine {
        OcrEngineKind::Surya => *surya == code,
        OcrEngineKind::Tesseract => *tesseract == code,
    })
}

/// Replace language names with the engine's codes; codes pass through unchanged.
pub fn replace_langs_with_codes(langs: &[String], engine: OcrEngineKind) -> Vec<String> {
    langs
        .iter()
        .map(|lang| {
            NAME_TO_CODE
                .get(&(engine, lang.trim().to_lowercase()))
                .map(|code| code.to_string())
                .unwrap_or_else(|| lang.trim().to_string())
        })
        .collect()
}

/// Check every code is known to the engine.
pub fn validate_langs(langs: &[String], engine: OcrEngineKind) -> Result<()> {
    match langs.iter().find(|code| !is_known_code(code, engine)) {
        Some(code) => Err(Error::InvalidLanguage {
            code: code.clone(),
            engine: engine.to_string(),
        }),
        None => Ok(()),
    }
}

/// Map names to codes, then validate. Duplicates are dropped, first occurrence wins.
pub fn resolve_langs(langs: &[String], engine: OcrEngineKind) -> Result<Vec<String>> {
    let mut codes = replace_langs_with_codes(langs, engine);
    let mut seen = std::collections::HashSet::new();
    codes.retain(|c| seen.insert(c.clone()));
    validate_langs(&codes, engine)?;
    Ok(codes)
}

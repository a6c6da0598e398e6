use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Providers and callers exchange ISO 639-1 (2-letter) codes where one
/// exists, falling back to ISO 639-3. These helpers validate, normalize and
/// compare codes in either form.
/// Validate that a code is a known ISO 639-1 or ISO 639-3 code
pub fn validate_language_code(code: &str) -> Result<()> {
    let normalized = code.trim().to_lowercase();
    let known = match normalized.len() {
        2 => Language::from_639_1(&normalized).is_some(),
        3 => Language::from_639_3(&normalized).is_some(),
        _ => false,
    };
    if known {
        Ok(())
    } else {
        Err(anyhow!("Invalid language code: {}", code))
    }
}

/// Normalize a code to ISO 639-1 where possible, ISO 639-3 otherwise
pub fn normalize_language_code(code: &str) -> Result<String> {
    let normalized = code.trim().to_lowercase();

    let language = match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => Language::from_639_3(&normalized),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;

    Ok(language
        .to_639_1()
        .map(|c| c.to_string())
        .unwrap_or_else(|| language.to_639_3().to_string()))
}

/// Check if two language codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_language_code(code1), normalize_language_code(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// English name of the language behind a code
pub fn language_name(code: &str) -> Result<String> {
    let normalized = code.trim().to_lowercase();
    let language = match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => Language::from_639_3(&normalized),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;

    Ok(language.to_name().to_string())
}

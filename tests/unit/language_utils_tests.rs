/*!
 * Tests for language utility functions
 */

use polyroute::language_utils::{
    language_codes_match, language_name, normalize_language_code, validate_language_code,
};

/// Validation accepts ISO 639-1 and ISO 639-3 codes in any case
#[test]
fn test_validate_language_code_withValidCodes_shouldPass() {
    assert!(validate_language_code("en").is_ok());
    assert!(validate_language_code("fr").is_ok());
    assert!(validate_language_code("eng").is_ok());
    assert!(validate_language_code("zho").is_ok());

    // Whitespace and case tests
    assert!(validate_language_code(" EN ").is_ok());
    assert!(validate_language_code("FRA").is_ok());

    // Invalid codes
    assert!(validate_language_code("xyz").is_err());
    assert!(validate_language_code("123").is_err());
    assert!(validate_language_code("e").is_err());
    assert!(validate_language_code("english").is_err());
}

/// Normalization prefers the 2-letter form when one exists
#[test]
fn test_normalize_language_code_withValidCodes_shouldPreferPart1() {
    assert_eq!(normalize_language_code("en").unwrap(), "en");
    assert_eq!(normalize_language_code("eng").unwrap(), "en");
    assert_eq!(normalize_language_code("fra").unwrap(), "fr");
    assert_eq!(normalize_language_code("deu").unwrap(), "de");

    // Case insensitivity
    assert_eq!(normalize_language_code("EN").unwrap(), "en");
    assert_eq!(normalize_language_code(" FRA ").unwrap(), "fr");
}

/// Different forms of the same language compare equal
#[test]
fn test_language_codes_match_withMatchingCodes_shouldReturnTrue() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("eng", "en"));
    assert!(language_codes_match("fr", "fra"));
    assert!(language_codes_match("ZH", "zho"));
}

/// Distinct or invalid codes never match
#[test]
fn test_language_codes_match_withDifferentCodes_shouldReturnFalse() {
    assert!(!language_codes_match("en", "fr"));
    assert!(!language_codes_match("en", "bogus"));
    assert!(!language_codes_match("", "en"));
}

/// Names come back in English
#[test]
fn test_language_name_withValidCodes_shouldReturnName() {
    assert_eq!(language_name("en").unwrap(), "English");
    assert_eq!(language_name("fr").unwrap(), "French");
    assert_eq!(language_name("zho").unwrap(), "Chinese");
    assert!(language_name("xyz").is_err());
}

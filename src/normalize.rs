//! Text normalisation for equality comparison.
//!
//! OCR and VLM extraction render the same device name in many ways:
//! "Máy chiếu", "MÁY CHIẾU", "may  chieu", "Máy-chiếu". [`normalize`] folds all
//! of these to one canonical string so the grouper can treat them as equal.
//!
//! Steps, in order:
//! 1. decompose (NFD) and drop combining marks, so every Vietnamese tone and
//!    vowel mark disappears (`ế` → `e`, `Ư` → `U`); `Đ`/`đ` have no
//!    decomposition and are mapped to `D`/`d` explicitly
//! 2. lowercase
//! 3. hyphens become spaces
//! 4. whitespace runs collapse to one space, ends trimmed
//!
//! The function is pure and idempotent.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonicalise a string for equality comparison.
///
/// ```
/// use handover_docx::normalize::normalize;
///
/// assert_eq!(normalize("  MÁY   Chiếu-Đa năng "), "may chieu da nang");
/// assert_eq!(normalize(&normalize("Bộ lưu điện")), normalize("Bộ lưu điện"));
/// ```
pub fn normalize(text: &str) -> String {
    let stripped = strip_diacritics(text).to_lowercase().replace('-', " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalise any displayable value (numbers, JSON scalars…).
pub fn normalize_value(value: impl ToString) -> String {
    normalize(&value.to_string())
}

/// Remove diacritics while keeping the letter case of the base character.
pub fn strip_diacritics(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'Đ' => 'D',
            'đ' => 'd',
            other => other,
        })
        .collect()
}

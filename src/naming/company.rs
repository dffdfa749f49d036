//! Company-name shortening.
//!
//! Vietnamese legal names carry long legal-form affixes ("CÔNG TY TNHH MỘT
//! THÀNH VIÊN …") and generic business descriptors ("THƯƠNG MẠI VÀ DỊCH VỤ").
//! Neither helps tell two suppliers apart in a file name, so both are removed.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Legal-form prefixes, longest first. Each is tried once, in order.
const LEGAL_PREFIXES: &[&str] = &[
    "CÔNG TY TNHH MỘT THÀNH VIÊN",
    "CÔNG TY TNHH MTV",
    "CÔNG TY TNHH HAI THÀNH VIÊN TRỞ LÊN",
    "CÔNG TY CỔ PHẦN",
    "CÔNG TY TNHH",
    "CÔNG TY",
    "TNHH",
    "CỔ PHẦN",
];

const LEGAL_SUFFIXES: &[&str] = &[
    "MỘT THÀNH VIÊN",
    "MTV",
    "HAI THÀNH VIÊN TRỞ LÊN",
    "CỔ PHẦN",
    "TNHH",
];

/// Generic descriptors removed as whole words.
const BUSINESS_TERMS: &[&str] = &[
    "THƯƠNG MẠI VÀ DỊCH VỤ",
    "DỊCH VỤ VÀ THƯƠNG MẠI",
    "TM VÀ DV",
    "DV VÀ TM",
    "TM & DV",
    "DV & TM",
    "TM",
    "DV",
    "CÔNG NGHỆ",
    "THƯƠNG MẠI",
    "TRANG THIẾT BỊ",
    "Y TẾ",
    "XÂY DỰNG",
    "ĐẦU TƯ",
    "PHÁT TRIỂN",
    "GIẢI PHÁP",
    "KỸ THUẬT",
    "SẢN XUẤT",
    "NHẬP KHẨU",
    "XUẤT NHẬP KHẨU",
    "KINH DOANH",
    "PHÂN PHỐI",
    "VIỆT NAM",
];

/// Residue left around a removed affix.
const AFFIX_RESIDUE: &[char] = &[' ', ',', '.', '-', '_', '&'];

static RE_PREFIXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    LEGAL_PREFIXES
        .iter()
        .map(|p| Regex::new(&format!(r"(?i)^{}\s*", regex::escape(p))).unwrap())
        .collect()
});

static RE_SUFFIXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    LEGAL_SUFFIXES
        .iter()
        .map(|s| Regex::new(&format!(r"(?i)\s*{}$", regex::escape(s))).unwrap())
        .collect()
});

static RE_TERMS: Lazy<Vec<Regex>> = Lazy::new(|| {
    BUSINESS_TERMS
        .iter()
        .map(|t| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(t))).unwrap())
        .collect()
});

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// What to return when stripping descriptors leaves nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompanyFallback {
    /// Name without legal affixes, else the trimmed input.
    #[default]
    Staged,
    /// The last `n` words of the input.
    TrailingWords(usize),
}

/// Shorten a company name with the default [`CompanyFallback::Staged`] policy.
///
/// ```
/// use handover_docx::naming::shorten_company_name;
///
/// assert_eq!(shorten_company_name("CÔNG TY TNHH THƯƠNG MẠI ABC"), "ABC");
/// ```
pub fn shorten_company_name(name: &str) -> String {
    shorten_company_name_with(name, CompanyFallback::Staged)
}

/// Shorten a company name with an explicit fallback policy.
///
/// Returns an empty string only when `name` is blank.
pub fn shorten_company_name_with(name: &str, fallback: CompanyFallback) -> String {
    let input: String = name.nfc().collect();
    let input = input.trim();

    let without_affixes = strip_legal_affixes(input);
    let without_terms = strip_business_terms(&without_affixes);
    if !without_terms.is_empty() {
        return without_terms;
    }

    match fallback {
        CompanyFallback::Staged if !without_affixes.is_empty() => without_affixes,
        CompanyFallback::Staged => input.to_string(),
        CompanyFallback::TrailingWords(n) => {
            let words: Vec<&str> = input.split_whitespace().collect();
            let tail = words[words.len().saturating_sub(n)..]
                .join(" ")
                .trim_matches(AFFIX_RESIDUE)
                .to_string();
            if tail.is_empty() {
                input.to_string()
            } else {
                tail
            }
        }
    }
}

fn strip_legal_affixes(name: &str) -> String {
    let mut out = name.trim_matches(AFFIX_RESIDUE).to_string();
    for re in RE_PREFIXES.iter().chain(RE_SUFFIXES.iter()) {
        let stripped = re.replace(&out, "").trim_matches(AFFIX_RESIDUE).to_string();
        out = stripped;
    }
    out
}

fn strip_business_terms(name: &str) -> String {
    let mut out = name.to_string();
    for re in RE_TERMS.iter() {
        let removed = re.replace_all(&out, "").into_owned();
        out = RE_WHITESPACE.replace_all(removed.trim(), " ").into_owned();
    }
    out.trim_matches(AFFIX_RESIDUE).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_and_descriptor() {
        assert_eq!(shorten_company_name("CÔNG TY TNHH THƯƠNG MẠI ABC"), "ABC");
        assert_eq!(
            shorten_company_name("Công ty Cổ phần Công nghệ Hoàng Long"),
            "Hoàng Long"
        );
        assert_eq!(
            shorten_company_name("CÔNG TY TNHH MỘT THÀNH VIÊN TM & DV MINH AN"),
            "MINH AN"
        );
    }

    #[test]
    fn strips_suffix_and_punctuation() {
        assert_eq!(shorten_company_name("Sao Việt, TNHH"), "Sao Việt");
        assert_eq!(shorten_company_name("  ABC - MTV  "), "ABC");
    }

    #[test]
    fn descriptor_only_inside_words_is_kept() {
        // "TM" is not a whole word in "ATM"
        assert_eq!(shorten_company_name("CÔNG TY ATM"), "ATM");
    }

    #[test]
    fn staged_fallback_prefers_most_stripped_non_empty() {
        // descriptors consume everything → name without legal affixes
        assert_eq!(
            shorten_company_name("CÔNG TY TNHH THƯƠNG MẠI VÀ DỊCH VỤ"),
            "THƯƠNG MẠI VÀ DỊCH VỤ"
        );
        // affixes consume everything → trimmed input
        assert_eq!(shorten_company_name("  CÔNG TY TNHH "), "CÔNG TY TNHH");
    }

    #[test]
    fn trailing_words_fallback() {
        assert_eq!(
            shorten_company_name_with(
                "CÔNG TY TNHH THƯƠNG MẠI VÀ DỊCH VỤ",
                CompanyFallback::TrailingWords(3)
            ),
            "VÀ DỊCH VỤ"
        );
        assert_eq!(
            shorten_company_name_with("CÔNG TY TNHH ABC", CompanyFallback::TrailingWords(3)),
            "ABC"
        );
    }

    #[test]
    fn decomposed_input_matches() {
        let decomposed: String = "CÔNG TY TNHH THƯƠNG MẠI ABC".nfd().collect();
        assert_eq!(shorten_company_name(&decomposed), "ABC");
    }

    #[test]
    fn empty_only_for_blank_input() {
        assert_eq!(shorten_company_name(""), "");
        assert_eq!(shorten_company_name("   "), "");
        for name in ["TNHH", "CỔ PHẦN", "VIỆT NAM", ",.", "X"] {
            assert!(!shorten_company_name(name).is_empty(), "empty for {name:?}");
        }
    }
}

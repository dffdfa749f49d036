//! File-name synthesis for the generated handover document.
//!
//! Shape: `{devices}_{company}_{identifier}` where
//!
//! - `devices` is `"02 Máy chiếu-01 Màn chiếu"` for the first
//!   [`FILENAME_DEVICE_LIMIT`] consolidated devices,
//! - `company` is the shortened supplier name,
//! - `identifier` is the reference number up to its first hyphen.
//!
//! Whitespace becomes `_`. Any empty part is replaced by a placeholder token,
//! and a result shorter than [`MIN_FILENAME_LEN`] is replaced by a marked
//! fallback name. The extension ([`DOCUMENT_EXTENSION`]) is appended by the
//! caller.

use crate::naming::company::shorten_company_name;
use crate::record::{ConsolidatedDevice, DocumentIdentity};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Devices named in the file name.
pub const FILENAME_DEVICE_LIMIT: usize = 2;
/// Maximum length, in characters, of the identifier part and of the whole name.
pub const MAX_SEGMENT_LEN: usize = 200;
/// Names shorter than this are replaced by the fallback pattern.
pub const MIN_FILENAME_LEN: usize = 3;
/// Extension of the generated document, without the dot.
pub const DOCUMENT_EXTENSION: &str = "docx";

const DEVICE_PLACEHOLDER: &str = "ThietBi";
const COMPANY_PLACEHOLDER: &str = "CongTy";
const IDENTIFIER_PLACEHOLDER: &str = "SoDinhDanh";
const FALLBACK_MARKER: &str = "BienBanBanGiaoNoiBo_Fallback";
const FALLBACK_IDENTIFIER: &str = "NoID";

static RE_DEVICE_UNSAFE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/*?":<>|{}\[\]().,_]"#).unwrap());

static RE_COMPANY_UNSAFE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/*?":<>|{}\[\]()]"#).unwrap());

static RE_PATH_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\\/*?":<>|.]"#).unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Build the document file name (without extension).
///
/// Deterministic and infallible.
///
/// ```
/// use handover_docx::naming::synthesize_file_name;
/// use handover_docx::record::DocumentIdentity;
///
/// let identity = DocumentIdentity {
///     identifier: "123-A/2024".into(),
///     company: "CÔNG TY TNHH THƯƠNG MẠI ABC".into(),
///     ..Default::default()
/// };
/// assert_eq!(synthesize_file_name(&identity, &[]), "ThietBi_ABC_123");
/// ```
pub fn synthesize_file_name(identity: &DocumentIdentity, devices: &[ConsolidatedDevice]) -> String {
    let device_part = device_segment(devices);
    let company_part = company_segment(&identity.company);
    let identifier_part = identifier_segment(&identity.identifier);

    let joined = format!(
        "{}_{}_{}",
        device_part.as_deref().unwrap_or(DEVICE_PLACEHOLDER),
        company_part.as_deref().unwrap_or(COMPANY_PLACEHOLDER),
        identifier_part.as_deref().unwrap_or(IDENTIFIER_PLACEHOLDER),
    );
    let cleaned = path_safe(&joined);
    let name = RE_WHITESPACE
        .replace_all(&cleaned, "_")
        .trim_matches('_')
        .to_string();

    if name.chars().count() < MIN_FILENAME_LEN {
        debug!("File name {:?} too short, using fallback pattern", name);
        return format!(
            "{}_{}_{}",
            FALLBACK_MARKER,
            company_part.as_deref().unwrap_or(COMPANY_PLACEHOLDER),
            identifier_part.as_deref().unwrap_or(FALLBACK_IDENTIFIER),
        );
    }
    name
}

/// `"QQ name"` pairs joined by `-`; `None` when no device has a usable name.
fn device_segment(devices: &[ConsolidatedDevice]) -> Option<String> {
    let parts: Vec<String> = devices
        .iter()
        .take(FILENAME_DEVICE_LIMIT)
        .filter_map(|d| {
            let name = RE_DEVICE_UNSAFE.replace_all(&d.name, "");
            let name = name.trim();
            (!name.is_empty()).then(|| format!("{:02} {}", d.whole_quantity(), name))
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("-"))
}

fn company_segment(company: &str) -> Option<String> {
    let short = shorten_company_name(company);
    let cleaned = RE_COMPANY_UNSAFE
        .replace_all(&short, "")
        .trim_matches(&[' ', ',', '.', '-', '_', '&'][..])
        .to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}

fn identifier_segment(identifier: &str) -> Option<String> {
    let head = identifier.split('-').next().unwrap_or_default().trim();
    let cleaned = path_safe(head);
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Remove path-unsafe characters and cap the length.
fn path_safe(text: &str) -> String {
    RE_PATH_UNSAFE
        .replace_all(text, "")
        .chars()
        .take(MAX_SEGMENT_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, IdentifierKind};
    use std::collections::BTreeSet;

    fn device(name: &str, quantity: f64) -> ConsolidatedDevice {
        ConsolidatedDevice {
            name: name.into(),
            model: String::new(),
            brand: String::new(),
            origin: String::new(),
            unit: String::new(),
            accessories: FieldValue::Absent,
            quantity,
            serials: BTreeSet::new(),
        }
    }

    fn identity(identifier: &str, company: &str) -> DocumentIdentity {
        DocumentIdentity {
            identifier: identifier.into(),
            kind: IdentifierKind::Contract,
            company: company.into(),
        }
    }

    #[test]
    fn full_name() {
        let name = synthesize_file_name(
            &identity("123-A/2024", "CÔNG TY TNHH THƯƠNG MẠI ABC"),
            &[device("Máy chiếu", 2.0), device("Màn chiếu (treo)", 1.0)],
        );
        assert_eq!(name, "02_Máy_chiếu-01_Màn_chiếu_treo_ABC_123");
    }

    #[test]
    fn only_first_two_devices_and_truncated_quantity() {
        let name = synthesize_file_name(
            &identity("PO7", "ABC"),
            &[device("A", 12.9), device("B", 3.0), device("C", 4.0)],
        );
        assert_eq!(name, "12_A-03_B_ABC_PO7");
    }

    #[test]
    fn identifier_keeps_part_before_first_hyphen() {
        assert_eq!(identifier_segment("123-A/2024").as_deref(), Some("123"));
        assert_eq!(identifier_segment("HD/01.2024").as_deref(), Some("HD012024"));
        assert_eq!(identifier_segment("-abc"), None);
        assert_eq!(identifier_segment(""), None);
    }

    #[test]
    fn placeholders_for_missing_parts() {
        let name = synthesize_file_name(&identity("", ""), &[]);
        assert_eq!(name, "ThietBi_CongTy_SoDinhDanh");

        let name = synthesize_file_name(&identity("", ""), &[device("(),", 1.0)]);
        assert_eq!(name, "ThietBi_CongTy_SoDinhDanh");
    }

    #[test]
    fn unsafe_characters_removed() {
        let name = synthesize_file_name(
            &identity("12\"3", "A/B <Co>"),
            &[device("Máy: in*", 1.0)],
        );
        assert!(!name.contains(['/', '<', '>', ':', '*', '"', ' ']), "got: {name}");
    }

    #[test]
    fn length_is_capped() {
        let long = "x".repeat(500);
        let name = synthesize_file_name(&identity(&long, "ABC"), &[device(&long, 1.0)]);
        assert!(name.chars().count() <= MAX_SEGMENT_LEN);
    }

    #[test]
    fn deterministic() {
        let id = identity("55-B", "CÔNG TY CỔ PHẦN ĐẦU TƯ SAO MAI");
        let devices = [device("Laptop", 3.0)];
        assert_eq!(
            synthesize_file_name(&id, &devices),
            synthesize_file_name(&id, &devices)
        );
    }
}

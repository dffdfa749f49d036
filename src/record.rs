//! Data model: what the extraction call returns and what the grouper produces.
//!
//! Everything the model sends back is untrusted. Each device field is resolved
//! once, at ingestion, into a [`FieldValue`] (absent / scalar / list) so the
//! rest of the pipeline never has to re-inspect JSON shapes.

use crate::normalize::normalize;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::debug;

// ── Field values ─────────────────────────────────────────────────────────────

/// A loosely-typed field as received from the extraction call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Key missing or JSON `null`.
    #[default]
    Absent,
    /// A single value; numbers and booleans are kept as their text form.
    Scalar(String),
    /// A JSON array; `null` elements are dropped.
    List(Vec<String>),
}

impl FieldValue {
    /// Resolve a JSON value into one of the three shapes.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Absent,
            Value::Array(items) => FieldValue::List(items.iter().filter_map(scalar_text).collect()),
            other => scalar_text(other).map_or(FieldValue::Absent, FieldValue::Scalar),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// Trimmed display text. Lists are joined with `", "`.
    pub fn text(&self) -> String {
        match self {
            FieldValue::Absent => String::new(),
            FieldValue::Scalar(s) => s.trim().to_string(),
            FieldValue::List(items) => self::trimmed_items(items).join(", "),
        }
    }

    /// Trimmed, non-empty entries: absent → none, scalar → one, list → each.
    pub fn items(&self) -> Vec<String> {
        match self {
            FieldValue::Absent => Vec::new(),
            FieldValue::Scalar(s) => trimmed_items(std::slice::from_ref(s)),
            FieldValue::List(items) => trimmed_items(items),
        }
    }

    /// Grouping signature: list entries trimmed, blanks dropped, joined with
    /// `'\n'` in their original order; scalars trimmed.
    ///
    /// `["Cáp", "Sạc"]` and `"Cáp\nSạc"` share a signature; `["Sạc", "Cáp"]`
    /// does not.
    pub fn signature(&self) -> String {
        match self {
            FieldValue::Absent => String::new(),
            FieldValue::Scalar(s) => s.trim().to_string(),
            FieldValue::List(items) => trimmed_items(items).join("\n"),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn trimmed_items(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a free-form quantity such as `"  3 cái "` or `"2.0"`.
///
/// Every character that is not an ASCII digit or `.` is removed first. An
/// empty remainder, an unparsable remainder (`"1.2.3"`) or a non-finite value
/// all degrade to `0.0`.
pub fn parse_quantity(raw: &str) -> f64 {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return 0.0;
    }
    match digits.parse::<f64>() {
        Ok(q) if q.is_finite() => q,
        _ => {
            debug!("Quantity {:?} is not a number, counting it as 0", raw);
            0.0
        }
    }
}

// ── Raw device records ───────────────────────────────────────────────────────

const NAME_KEYS: &[&str] = &["ttb", "name"];
const MODEL_KEYS: &[&str] = &["model"];
const BRAND_KEYS: &[&str] = &["hang", "brand"];
const ORIGIN_KEYS: &[&str] = &["nsx", "origin"];
const UNIT_KEYS: &[&str] = &["dvt", "unit"];
const QUANTITY_KEYS: &[&str] = &["sl", "quantity"];
const SERIAL_KEYS: &[&str] = &["seri", "serial"];
const ACCESSORY_KEYS: &[&str] = &["pk", "accessories"];

/// One device row exactly as the extraction call returned it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawDeviceRecord {
    pub name: FieldValue,
    pub model: FieldValue,
    pub brand: FieldValue,
    pub origin: FieldValue,
    pub unit: FieldValue,
    pub quantity: FieldValue,
    pub serial: FieldValue,
    pub accessories: FieldValue,
}

impl RawDeviceRecord {
    /// Build a record from a JSON object; anything else yields `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        Some(Self {
            name: field(map, NAME_KEYS),
            model: field(map, MODEL_KEYS),
            brand: field(map, BRAND_KEYS),
            origin: field(map, ORIGIN_KEYS),
            unit: field(map, UNIT_KEYS),
            quantity: field(map, QUANTITY_KEYS),
            serial: field(map, SERIAL_KEYS),
            accessories: field(map, ACCESSORY_KEYS),
        })
    }

    /// Parsed quantity; malformed values count as zero.
    pub fn parsed_quantity(&self) -> f64 {
        parse_quantity(&self.quantity.text())
    }

    /// Serial numbers, trimmed, blanks dropped.
    pub fn serials(&self) -> Vec<String> {
        self.serial.items()
    }

    /// The key that decides which records describe the same device type.
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            name: normalize(&self.name.text()),
            model: self.model.text(),
            brand: self.brand.text(),
            origin: self.origin.text(),
            unit: self.unit.text(),
            accessories: self.accessories.signature(),
        }
    }
}

fn field(map: &Map<String, Value>, keys: &[&str]) -> FieldValue {
    keys.iter()
        .find_map(|k| map.get(*k))
        .map(FieldValue::from_json)
        .unwrap_or_default()
}

/// Identity of a device type for consolidation.
///
/// Only the name is normalised; model, brand, origin and unit are compared on
/// their trimmed text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub name: String,
    pub model: String,
    pub brand: String,
    pub origin: String,
    pub unit: String,
    pub accessories: String,
}

// ── Document identity ────────────────────────────────────────────────────────

/// What kind of reference number heads the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    /// Hợp đồng.
    Contract,
    /// Purchase order (PO).
    PurchaseOrder,
    /// Đề nghị / đề xuất.
    Request,
    #[default]
    Other,
}

impl IdentifierKind {
    /// Classify the free-form label the model returned (`"Hợp đồng"`, `"PO"`,
    /// `"Mã đề nghị"`, …).
    pub fn classify(label: &str) -> Self {
        let label = normalize(label);
        if label.contains("hop dong") || label.contains("hd") || label.contains("contract") {
            IdentifierKind::Contract
        } else if label.contains("po") || label.contains("purchase order") {
            IdentifierKind::PurchaseOrder
        } else if label.contains("de nghi") || label.contains("denghi") || label.contains("de xuat")
        {
            IdentifierKind::Request
        } else {
            IdentifierKind::Other
        }
    }
}

/// Header fields of the source record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentIdentity {
    /// Reference number as printed, e.g. `"123-A/2024"`. May be empty.
    pub identifier: String,
    pub kind: IdentifierKind,
    /// Handing-over company (Bên giao), full legal name. May be empty.
    pub company: String,
}

// ── Extraction result ────────────────────────────────────────────────────────

const IDENTIFIER_KEYS: &[&str] = &["shd", "identifier"];
const IDENTIFIER_KIND_KEYS: &[&str] = &["shd_type", "identifier_type"];
const COMPANY_KEYS: &[&str] = &["cty", "company"];
const DEVICE_LIST_KEYS: &[&str] = &["ds", "devices"];

/// Everything one extraction call produced, resolved into typed fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedRecord {
    pub identity: DocumentIdentity,
    pub devices: Vec<RawDeviceRecord>,
    /// Entries of the device list that were not JSON objects.
    pub discarded_entries: usize,
}

impl ExtractedRecord {
    /// Resolve the JSON answer of the model.
    ///
    /// Never fails: missing header keys become empty values, a missing or
    /// non-list device list becomes an empty one, and non-object entries are
    /// counted in `discarded_entries`.
    pub fn from_json(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::default();
        };

        let identity = DocumentIdentity {
            identifier: field(map, IDENTIFIER_KEYS).text(),
            kind: IdentifierKind::classify(&field(map, IDENTIFIER_KIND_KEYS).text()),
            company: field(map, COMPANY_KEYS).text(),
        };

        let entries = DEVICE_LIST_KEYS
            .iter()
            .find_map(|k| map.get(*k))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let devices: Vec<RawDeviceRecord> =
            entries.iter().filter_map(RawDeviceRecord::from_json).collect();
        let discarded_entries = entries.len() - devices.len();
        if discarded_entries > 0 {
            debug!("Discarded {} malformed device entries", discarded_entries);
        }

        Self {
            identity,
            devices,
            discarded_entries,
        }
    }
}

// ── Consolidated devices ─────────────────────────────────────────────────────

/// One row of the output table: every raw record sharing a [`GroupKey`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedDevice {
    pub name: String,
    pub model: String,
    pub brand: String,
    pub origin: String,
    pub unit: String,
    /// Accessories of the first record of the group, shape preserved.
    pub accessories: FieldValue,
    /// Sum of the parsed quantities of all contributing records.
    pub quantity: f64,
    /// Union of all serial numbers, sorted, no blanks.
    pub serials: BTreeSet<String>,
}

impl ConsolidatedDevice {
    /// Quantity with any fractional part dropped.
    pub fn whole_quantity(&self) -> u64 {
        self.quantity.max(0.0).trunc() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_value_shapes() {
        assert_eq!(FieldValue::from_json(&json!(null)), FieldValue::Absent);
        assert_eq!(
            FieldValue::from_json(&json!("A1")),
            FieldValue::Scalar("A1".into())
        );
        assert_eq!(FieldValue::from_json(&json!(3)), FieldValue::Scalar("3".into()));
        assert_eq!(
            FieldValue::from_json(&json!(["A1", null, 7])),
            FieldValue::List(vec!["A1".into(), "7".into()])
        );
    }

    #[test]
    fn items_drop_blanks() {
        let list = FieldValue::List(vec![" A1 ".into(), "".into(), "  ".into(), "A2".into()]);
        assert_eq!(list.items(), vec!["A1", "A2"]);
        assert!(FieldValue::Scalar("   ".into()).items().is_empty());
        assert!(FieldValue::Absent.items().is_empty());
    }

    #[test]
    fn signature_merges_list_and_joined_string() {
        let list = FieldValue::List(vec!["Cáp nguồn".into(), " Remote ".into()]);
        let joined = FieldValue::Scalar("Cáp nguồn\nRemote ".into());
        assert_eq!(list.signature(), joined.signature());

        let reordered = FieldValue::List(vec!["Remote".into(), "Cáp nguồn".into()]);
        assert_ne!(list.signature(), reordered.signature());
    }

    #[test]
    fn parse_quantity_strips_noise() {
        assert_eq!(parse_quantity("  3 cái "), 3.0);
        assert_eq!(parse_quantity("2.5"), 2.5);
        assert_eq!(parse_quantity("-4"), 4.0);
        assert_eq!(parse_quantity("bộ"), 0.0);
        assert_eq!(parse_quantity(""), 0.0);
        assert_eq!(parse_quantity("1.2.3"), 0.0);
        assert_eq!(parse_quantity("."), 0.0);
    }

    #[test]
    fn group_key_normalises_name_only() {
        let a = RawDeviceRecord::from_json(&json!({"ttb": "Máy chiếu", "model": "X100"})).unwrap();
        let b = RawDeviceRecord::from_json(&json!({"ttb": "MAY-CHIEU ", "model": " X100"})).unwrap();
        let c = RawDeviceRecord::from_json(&json!({"ttb": "Máy chiếu", "model": "x100"})).unwrap();
        assert_eq!(a.group_key(), b.group_key());
        assert_ne!(a.group_key(), c.group_key());
    }

    #[test]
    fn english_aliases_are_accepted() {
        let r = RawDeviceRecord::from_json(&json!({
            "name": "Projector", "brand": "Epson", "quantity": 2, "serial": "S1"
        }))
        .unwrap();
        assert_eq!(r.name.text(), "Projector");
        assert_eq!(r.brand.text(), "Epson");
        assert_eq!(r.parsed_quantity(), 2.0);
        assert_eq!(r.serials(), vec!["S1"]);
    }

    #[test]
    fn classify_identifier_kinds() {
        assert_eq!(IdentifierKind::classify("Hợp đồng"), IdentifierKind::Contract);
        assert_eq!(IdentifierKind::classify("HĐ số"), IdentifierKind::Contract);
        assert_eq!(IdentifierKind::classify("PO"), IdentifierKind::PurchaseOrder);
        assert_eq!(IdentifierKind::classify("Mã đề nghị"), IdentifierKind::Request);
        assert_eq!(IdentifierKind::classify("Số đề xuất"), IdentifierKind::Request);
        assert_eq!(IdentifierKind::classify("Khác"), IdentifierKind::Other);
        assert_eq!(IdentifierKind::classify(""), IdentifierKind::Other);
    }

    #[test]
    fn extracted_record_defaults_and_filtering() {
        let record = ExtractedRecord::from_json(&json!({
            "shd": "123-A/2024",
            "ds": [{"ttb": "Máy in"}, "garbage", 5, null, {"ttb": "Máy quét"}]
        }));
        assert_eq!(record.identity.identifier, "123-A/2024");
        assert_eq!(record.identity.kind, IdentifierKind::Other);
        assert_eq!(record.identity.company, "");
        assert_eq!(record.devices.len(), 2);
        assert_eq!(record.discarded_entries, 3);
    }

    #[test]
    fn extracted_record_without_device_list() {
        let record = ExtractedRecord::from_json(&json!({"shd": "1", "ds": "none"}));
        assert!(record.devices.is_empty());
        assert_eq!(ExtractedRecord::from_json(&json!([1, 2])), ExtractedRecord::default());
    }

    #[test]
    fn whole_quantity_truncates() {
        let device = ConsolidatedDevice {
            name: "x".into(),
            model: String::new(),
            brand: String::new(),
            origin: String::new(),
            unit: String::new(),
            accessories: FieldValue::Absent,
            quantity: 3.9,
            serials: BTreeSet::new(),
        };
        assert_eq!(device.whole_quantity(), 3);
    }
}

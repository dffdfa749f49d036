//! Device grouping: collapse repeated extraction rows into one row per device type.
//!
//! A handover record often lists the same device several times (one line per
//! serial number, or the same item split across pages). Rows are merged when
//! their [`GroupKey`](crate::record::GroupKey) matches: quantities are summed
//! and serial numbers are unioned.
//!
//! The output keeps the first-seen order of each key, so the table in the
//! generated document follows the source record.

use crate::record::{ConsolidatedDevice, GroupKey, RawDeviceRecord};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Maximum number of serial numbers written into one table cell.
pub const SERIAL_DISPLAY_LIMIT: usize = 100;

/// Merge raw rows into consolidated devices, in first-seen key order.
///
/// Never fails. An empty input yields an empty output, which callers treat as
/// "nothing to render".
pub fn consolidate(records: &[RawDeviceRecord]) -> Vec<ConsolidatedDevice> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut devices: Vec<ConsolidatedDevice> = Vec::new();

    for record in records {
        let key = record.group_key();
        let quantity = record.parsed_quantity();
        let serials = record.serials();

        match index.get(&key) {
            Some(&slot) => {
                let device = &mut devices[slot];
                device.quantity += quantity;
                device.serials.extend(serials);
            }
            None => {
                index.insert(key, devices.len());
                devices.push(ConsolidatedDevice {
                    name: record.name.text(),
                    model: record.model.text(),
                    brand: record.brand.text(),
                    origin: record.origin.text(),
                    unit: record.unit.text(),
                    accessories: record.accessories.clone(),
                    quantity,
                    serials: serials.into_iter().collect::<BTreeSet<_>>(),
                });
            }
        }
    }

    debug!(
        "Consolidated {} device rows into {} groups",
        records.len(),
        devices.len()
    );
    devices
}

impl ConsolidatedDevice {
    /// Serial numbers for display: sorted, comma separated, capped at
    /// [`SERIAL_DISPLAY_LIMIT`]. Empty when the device has no serials.
    pub fn serial_text(&self) -> String {
        serial_text_capped(&self.serials, SERIAL_DISPLAY_LIMIT)
    }
}

fn serial_text_capped(serials: &BTreeSet<String>, limit: usize) -> String {
    if serials.is_empty() {
        return String::new();
    }
    let shown: Vec<&str> = serials.iter().take(limit).map(String::as_str).collect();
    let mut text = shown.join(", ");
    let rest = serials.len().saturating_sub(limit);
    if rest > 0 {
        text.push_str(&format!(" (và {rest} seri khác)"));
    }
    text
}

use std::collections::BTreeMap;

use crate::dataset::Device;

/// Catalog section the vendor uses for teased-but-unshipped gear. Kept in
/// the dataset but never offered by search, whatever the query.
pub const UNRELEASED_CATEGORY: &str = "Announced devices that have not yet been released";

/// One category's matches, in dataset order.
pub struct Group<'a> {
    pub category: &'a str,
    pub devices: Vec<&'a Device>,
}

/// Records matching `query`, dataset order preserved. An empty query
/// matches everything that survives the unreleased exclusion.
pub fn filter<'a>(devices: &'a [Device], query: &str) -> Vec<&'a Device> {
    let needle = query.to_lowercase();
    devices
        .iter()
        .filter(|d| d.category != UNRELEASED_CATEGORY)
        .filter(|d| needle.is_empty() || matches(d, &needle))
        .collect()
}

/// Case-insensitive substring match over name, category, and the based-on
/// reference when one exists. `needle` is already lowercased.
fn matches(device: &Device, needle: &str) -> bool {
    device.name.to_lowercase().contains(needle)
        || device.category.to_lowercase().contains(needle)
        || device
            .reference()
            .is_some_and(|r| r.to_lowercase().contains(needle))
}

/// Partition matches by category. Categories come out in ascending
/// lexicographic order; each group keeps its records' relative order.
pub fn group(matches: Vec<&Device>) -> Vec<Group<'_>> {
    let mut by_category: BTreeMap<&str, Vec<&Device>> = BTreeMap::new();
    for device in matches {
        by_category
            .entry(device.category.as_str())
            .or_default()
            .push(device);
    }
    by_category
        .into_iter()
        .map(|(category, devices)| Group { category, devices })
        .collect()
}

// ── Tests ──

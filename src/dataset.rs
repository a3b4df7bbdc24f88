use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One catalog entry: a modeled device and what it is modeled on.
///
/// Serialized with camelCase keys (`basedOn`), which is the shape the
/// search surfaces read back without any migration step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub category: String,
    pub name: String,
    pub based_on: String,
}

impl Device {
    /// The copyable real-world reference, or None when the source row left
    /// the cell blank or whitespace.
    pub fn reference(&self) -> Option<&str> {
        let r = self.based_on.trim();
        (!r.is_empty()).then_some(r)
    }
}

pub fn load(path: &Path) -> Result<Vec<Device>> {
    let raw = fs::read_to_string(path).with_context(|| {
        format!(
            "no dataset at {} (run `tonedex scrape` first)",
            path.display()
        )
    })?;
    let devices: Vec<Device> = serde_json::from_str(&raw)
        .with_context(|| format!("malformed dataset at {}", path.display()))?;
    Ok(devices)
}

/// Replace the dataset wholesale. Only called after extraction succeeded,
/// so a failed scrape never clobbers the previous file.
pub fn save(path: &Path, devices: &[Device]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let mut json = serde_json::to_string_pretty(devices)?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Per-category record counts, largest first; category name breaks ties.
pub fn category_counts(devices: &[Device]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for d in devices {
        *counts.entry(d.category.as_str()).or_default() += 1;
    }
    let mut rows: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(category, n)| (category.to_string(), n))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn device(category: &str, name: &str, based_on: &str) -> Device {
        Device {
            category: category.into(),
            name: name.into(),
            based_on: based_on.into(),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        let devices = vec![
            device("Amps", "Brit 800", "Marshall JCM800"),
            device("Drives", "Tube Drive", ""),
        ];

        save(&path, &devices).unwrap();
        assert_eq!(load(&path).unwrap(), devices);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/devices.json");

        save(&path, &[device("Amps", "Twin", "Fender Twin")]).unwrap();
        assert_eq!(load(&path).unwrap().len(), 1);
    }

    #[test]
    fn serializes_based_on_as_camel_case() {
        let json =
            serde_json::to_string(&device("Amps", "Brit 800", "Marshall JCM800")).unwrap();
        assert!(json.contains("\"basedOn\":\"Marshall JCM800\""), "{json}");
        assert!(!json.contains("based_on"), "{json}");
    }

    #[test]
    fn load_missing_file_mentions_scrape() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("tonedex scrape"), "{err}");
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn reference_is_none_for_blank_values() {
        assert_eq!(device("Amps", "Twin", "").reference(), None);
        assert_eq!(device("Amps", "Twin", "   ").reference(), None);
        assert_eq!(
            device("Amps", "Twin", " Fender Twin ").reference(),
            Some("Fender Twin")
        );
    }

    #[test]
    fn category_counts_sorts_by_count_then_name() {
        let devices = vec![
            device("Drives", "A", ""),
            device("Amps", "B", ""),
            device("Drives", "C", ""),
            device("Cabs", "D", ""),
        ];
        assert_eq!(
            category_counts(&devices),
            vec![
                ("Drives".to_string(), 2),
                ("Amps".to_string(), 1),
                ("Cabs".to_string(), 1),
            ]
        );
    }
}

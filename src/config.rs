use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_SOURCE_URL: &str =
    "https://help.positivegrid.com/hc/en-us/articles/360035738611-Spark-Amp-Effect-Models-List";
const DEFAULT_DATASET_PATH: &str = "data/devices.json";

// The article carries no semantic markup for its tables. Records hang off
// generic structural elements, so the selectors stay configurable for the
// next page redesign.
const DEFAULT_HEADING_SELECTOR: &str = "h2";
const DEFAULT_ROW_SELECTOR: &str = "li";
const DEFAULT_CELL_SELECTOR: &str = "span";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Page the catalog is scraped from; also what Ctrl+O opens.
    pub source_url: String,
    pub dataset_path: PathBuf,
    pub selectors: Selectors,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Selectors {
    pub heading: String,
    pub row: String,
    pub cell: String,
}

impl Settings {
    /// Built-in defaults, overridden by an optional `tonedex.toml` in the
    /// working directory, overridden by `TONEDEX_*` environment variables
    /// (nested keys use `__`, e.g. `TONEDEX_SELECTORS__ROW`).
    pub fn load() -> Result<Self> {
        let cfg = config::Config::builder()
            .set_default("source_url", DEFAULT_SOURCE_URL)?
            .set_default("dataset_path", DEFAULT_DATASET_PATH)?
            .set_default("selectors.heading", DEFAULT_HEADING_SELECTOR)?
            .set_default("selectors.row", DEFAULT_ROW_SELECTOR)?
            .set_default("selectors.cell", DEFAULT_CELL_SELECTOR)?
            .add_source(config::File::with_name("tonedex").required(false))
            .add_source(config::Environment::with_prefix("TONEDEX").separator("__"))
            .build()
            .context("failed to read configuration")?;
        cfg.try_deserialize().context("invalid configuration")
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let settings = Settings::load().unwrap();
        assert!(settings.source_url.starts_with("https://"));
        assert_eq!(settings.dataset_path, PathBuf::from("data/devices.json"));
        assert_eq!(settings.selectors.heading, "h2");
        assert_eq!(settings.selectors.row, "li");
        assert_eq!(settings.selectors.cell, "span");
    }
}

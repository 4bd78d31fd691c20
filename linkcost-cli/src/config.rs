//! Run configuration loaded from TOML
//!
//! ```toml
//! variant = "extended"
//! output = "reports/am_peak.json"
//!
//! [flags]
//! use_turn_penalties = true
//!
//! [defaults]
//! cycle = 120
//! gc = 0.45
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use linkcost_core::{FieldId, Variant, VdfFlags};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Overrides the variant named in the link file
    #[serde(default)]
    pub variant: Option<Variant>,
    /// Report path for `evaluate`
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub flags: VdfFlags,
    /// Default overrides keyed by field key
    #[serde(default)]
    pub defaults: BTreeMap<String, f64>,
}

impl RunConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid run configuration")
    }

    /// Load `path`, or the empty configuration when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Field-table defaults for `variant` with this config's overrides applied
    pub fn resolve_defaults(&self, variant: Variant) -> Result<Vec<Option<f64>>> {
        let mut defaults = variant.defaults();
        for (key, value) in &self.defaults {
            let index = FieldId::from_key(key)
                .and_then(|id| variant.index_of(id))
                .with_context(|| format!("Unknown default '{}' for {:?} variant", key, variant))?;
            if !value.is_finite() {
                bail!("Default '{}' must be finite", key);
            }
            defaults[index] = Some(*value);
        }
        Ok(defaults)
    }
}

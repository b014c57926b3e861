use eyre::{Result, WrapErr};
use sectkeep_common::TextSection;
use serde::Deserialize;
use std::path::Path;

/// Settings for `sectkeep verify`, readable from a TOML file:
///
/// ```toml
/// section = ".text"
/// require_root = true
/// strict_order = false
/// require_nonempty = ["hot"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyConfig {
    /// Output section every marker must lie in.
    pub section: String,
    /// At least one of the retention roots must be defined.
    pub require_root: bool,
    /// Subsections must follow each other in link order without overlapping.
    pub strict_order: bool,
    pub require_nonempty: Vec<TextSection>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            section: ".text".to_string(),
            require_root: true,
            strict_order: false,
            require_nonempty: Vec::new(),
        }
    }
}

impl VerifyConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).wrap_err_with(|| format!("in config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

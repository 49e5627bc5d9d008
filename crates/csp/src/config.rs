use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CspError, CspResult};

/// Default endpoint for CSP violation reports
pub const DEFAULT_REPORT_URI: &str = "/csp-report";

/// Origin allowed to serve scripts when a document shows no dynamic code
pub const DEFAULT_TRUSTED_SCRIPT_ORIGIN: &str = "https://trusted.cdn.com";

/// Upper bound on the size of a document handed to the scanner
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 2 * 1024 * 1024;

/// Configuration for policy synthesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Value of the trailing `report-uri` directive
    pub report_uri: String,
    /// Origins listed after `'self'` when scripts are allowed
    pub trusted_script_origins: Vec<String>,
    /// Whether an inline script also unlocks `'unsafe-inline'` for styles
    pub inline_script_unlocks_inline_style: bool,
    /// Maximum accepted document size in bytes
    pub max_content_bytes: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            report_uri: DEFAULT_REPORT_URI.to_string(),
            trusted_script_origins: vec![DEFAULT_TRUSTED_SCRIPT_ORIGIN.to_string()],
            inline_script_unlocks_inline_style: true,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
        }
    }
}

impl PolicyConfig {
    /// Parse a JSON configuration and validate it
    pub fn from_json_str(json: &str) -> CspResult<Self> {
        let config: PolicyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> CspResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded policy configuration from {}", path.as_ref().display());
        Self::from_json_str(&raw)
    }

    /// Check that every value can be emitted into a header without
    /// breaking the directive grammar.
    pub fn validate(&self) -> CspResult<()> {
        if self.report_uri.is_empty() {
            return Err(CspError::InvalidConfiguration(
                "report_uri must not be empty".to_string(),
            ));
        }
        if has_separator(&self.report_uri) {
            return Err(CspError::InvalidConfiguration(format!(
                "report_uri contains a directive separator: {:?}",
                self.report_uri
            )));
        }

        for origin in &self.trusted_script_origins {
            if has_separator(origin) || origin.contains('\'') {
                return Err(CspError::InvalidConfiguration(format!(
                    "trusted script origin contains a directive separator: {:?}",
                    origin
                )));
            }
            let parsed = Url::parse(origin).map_err(|e| {
                CspError::InvalidConfiguration(format!(
                    "trusted script origin {:?} is not a valid URL: {}",
                    origin, e
                ))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(CspError::InvalidConfiguration(format!(
                    "trusted script origin {:?} must use http or https",
                    origin
                )));
            }
        }

        if self.max_content_bytes == 0 {
            return Err(CspError::InvalidConfiguration(
                "max_content_bytes must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn has_separator(value: &str) -> bool {
    value.contains(';') || value.contains(',') || value.chars().any(char::is_whitespace)
}

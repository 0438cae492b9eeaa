//! Credential resolution for leadx-enrich
//!
//! Priority: environment → TOML. A missing key disables the tier that needs
//! it; it is never an error.

use leadx_common::config::TomlConfig;
use tracing::{info, warn};

/// Environment variables checked for the geocoding key, in priority order
pub const GOOGLE_MAPS_ENV_VARS: &[&str] = &["LEADX_GOOGLE_MAPS_API_KEY", "GOOGLE_MAPS_API_KEY"];

/// Environment variables checked for the hosted model key, in priority order
pub const OPENAI_ENV_VARS: &[&str] = &["LEADX_OPENAI_API_KEY", "OPENAI_API_KEY"];

/// Credentials resolved for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedKeys {
    pub google_maps: Option<String>,
    pub openai: Option<String>,
}

impl ResolvedKeys {
    pub fn resolve(toml_config: &TomlConfig) -> Self {
        Self {
            google_maps: resolve_api_key(
                GOOGLE_MAPS_ENV_VARS,
                toml_config.google_maps_api_key.as_ref(),
                "Google Maps",
            ),
            openai: resolve_api_key(
                OPENAI_ENV_VARS,
                toml_config.openai_api_key.as_ref(),
                "OpenAI",
            ),
        }
    }
}

/// Resolve one API key from the environment, then TOML
///
/// Blank values count as absent. Warns when more than one source holds a
/// valid key.
pub fn resolve_api_key(
    env_vars: &[&str],
    toml_value: Option<&String>,
    label: &str,
) -> Option<String> {
    let mut sources = Vec::new();

    let env_key = env_vars.iter().find_map(|var| {
        std::env::var(var)
            .ok()
            .filter(|v| is_valid_key(v))
            .map(|v| (*var, v))
    });
    if let Some((var, _)) = &env_key {
        sources.push(format!("environment ({})", var));
    }

    let toml_key = toml_value.filter(|v| is_valid_key(v));
    if toml_key.is_some() {
        sources.push("TOML".to_string());
    }

    if sources.len() > 1 {
        warn!(
            "{} API key found in multiple sources: {}. Using environment (highest priority).",
            label,
            sources.join(", ")
        );
    }

    if let Some((var, key)) = env_key {
        info!("{} API key loaded from environment variable {}", label, var);
        return Some(key.trim().to_string());
    }

    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", label);
        return Some(key.trim().to_string());
    }

    info!("{} API key not configured, tier disabled", label);
    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

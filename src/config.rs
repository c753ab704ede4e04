//! Dispatch configuration.
//!
//! Defaults reproduce the tuned behavior (registry first, heuristic fallback). Overrides
//! exist for bring-up and benchmarking and come from the environment or a JSON file.
//!
//! ## Environment Variables
//!
//! - `GLLM_FP8_GEMM_DISABLE_REGISTRY`: `1`/`true` skips the curated registry
//! - `GLLM_FP8_GEMM_FORCE_KERNEL`: kernel name every shape is sent to

use std::path::Path;

use serde::Deserialize;

use crate::error::{GemmError, Result};
use crate::kernel_types::KernelId;

pub const ENV_DISABLE_REGISTRY: &str = "GLLM_FP8_GEMM_DISABLE_REGISTRY";
pub const ENV_FORCE_KERNEL: &str = "GLLM_FP8_GEMM_FORCE_KERNEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Probe the curated registry before the heuristic.
    pub registry_enabled: bool,
    /// Send every shape to this kernel.
    pub force_kernel: Option<KernelId>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            registry_enabled: true,
            force_kernel: None,
        }
    }
}

impl DispatchConfig {
    /// Read overrides from the process environment.
    ///
    /// Malformed values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_DISABLE_REGISTRY) {
            match parse_flag(&raw) {
                Some(disabled) => config.registry_enabled = !disabled,
                None => log::warn!("Ignoring {ENV_DISABLE_REGISTRY}={raw:?}: expected a boolean"),
            }
        }

        if let Some(raw) = lookup(ENV_FORCE_KERNEL) {
            if !raw.trim().is_empty() {
                match raw.parse::<KernelId>() {
                    Ok(id) => config.force_kernel = Some(id),
                    Err(e) => log::warn!("Ignoring {ENV_FORCE_KERNEL}: {e}"),
                }
            }
        }

        config
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| GemmError::InvalidConfig(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GemmError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default() {
        let c = DispatchConfig::default();
        assert!(c.registry_enabled);
        assert_eq!(c.force_kernel, None);
        assert_eq!(DispatchConfig::from_lookup(|_| None), c);
    }

    #[test]
    fn test_env_overrides() {
        let c = DispatchConfig::from_lookup(lookup_from(&[
            (ENV_DISABLE_REGISTRY, "1"),
            (ENV_FORCE_KERNEL, KernelId::Large.name()),
        ]));
        assert!(!c.registry_enabled);
        assert_eq!(c.force_kernel, Some(KernelId::Large));
    }

    #[test]
    fn test_env_bad_values_ignored() {
        let c = DispatchConfig::from_lookup(lookup_from(&[
            (ENV_DISABLE_REGISTRY, "maybe"),
            (ENV_FORCE_KERNEL, "not_a_kernel"),
        ]));
        assert_eq!(c, DispatchConfig::default());
    }

    #[test]
    fn test_json() {
        let c = DispatchConfig::from_json_str(
            r#"{"registry_enabled": false, "force_kernel": "fp8_rowwise_64x16x16x128_16x16_1x1_interwave_v2"}"#,
        )
        .unwrap();
        assert!(!c.registry_enabled);
        assert_eq!(c.force_kernel, Some(KernelId::SmallAll));

        assert_eq!(DispatchConfig::from_json_str("{}").unwrap(), DispatchConfig::default());
        assert!(DispatchConfig::from_json_str(r#"{"force_kernel": "bogus"}"#).is_err());
        assert!(DispatchConfig::from_json_str(r#"{"unknown": 1}"#).is_err());
    }

    #[test]
    fn test_json_file_missing() {
        let err = DispatchConfig::from_json_file(Path::new("/nonexistent/fp8_gemm.json"));
        assert!(matches!(err, Err(GemmError::InvalidConfig(_))));
    }
}

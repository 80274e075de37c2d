//! Verification mode and link-exemption configuration
//!
//! ## Verification mode
//! Construction, extension and verification checks run only in verification
//! mode. It is on in debug builds and with the `verify-positions` feature, and
//! can be forced either way with `INLINE_PROVENANCE_VERIFY` (`1/true/on`,
//! `0/false/off`). The value is read once per process.
//!
//! ## Link exemptions
//! Some caller/callee pairs legitimately disagree with the bytecode: method
//! handle linkage, generated lambda forms and call-inlining trampolines. The
//! names are runtime specific, so they live in [`VerifyConfig`] with the
//! defaults below, and can be replaced from a TOML file named by
//! `INLINE_PROVENANCE_EXEMPTIONS`:
//!
//! ```toml
//! trampoline_callers = ["linkToTargetMethod"]
//! generated_type_prefixes = ["Ljava/lang/invoke/LambdaForm$"]
//! inlining_trampolines = ["callInlined"]
//! exempt_dynamic_invokes = true
//! ```

use std::path::Path;
use std::sync::LazyLock;

use serde::Deserialize;
use tracing::warn;

use crate::error::{ConfigError, ConfigResult};

/// Env var forcing verification mode on or off
pub const VERIFY_ENV: &str = "INLINE_PROVENANCE_VERIFY";

/// Env var naming a TOML exemption file
pub const EXEMPTIONS_ENV: &str = "INLINE_PROVENANCE_EXEMPTIONS";

static VERIFICATION_ENABLED: LazyLock<bool> = LazyLock::new(|| {
    let default = cfg!(debug_assertions) || cfg!(feature = "verify-positions");
    std::env::var(VERIFY_ENV)
        .ok()
        .and_then(|v| parse_switch(&v))
        .unwrap_or(default)
});

static GLOBAL_CONFIG: LazyLock<VerifyConfig> = LazyLock::new(|| {
    let Ok(path) = std::env::var(EXEMPTIONS_ENV) else {
        return VerifyConfig::default();
    };
    match VerifyConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!(target: "inline_provenance::config", path = %path, error = %e, "Falling back to default link exemptions");
            VerifyConfig::default()
        }
    }
});

fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Whether construction and verification checks run in this process
#[inline]
pub fn verification_enabled() -> bool {
    *VERIFICATION_ENABLED
}

/// Recognized exceptions to the per-link bytecode check
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyConfig {
    /// Caller methods (by name) that link to an arbitrary target method
    pub trampoline_callers: Vec<String>,
    /// Declaring-type name prefixes of generated adapter code
    pub generated_type_prefixes: Vec<String>,
    /// Callee methods (by name) that stand in for the method they inline
    pub inlining_trampolines: Vec<String>,
    /// Accept any callee under a dynamic invocation site
    pub exempt_dynamic_invokes: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            trampoline_callers: vec!["linkToTargetMethod".to_string()],
            generated_type_prefixes: vec!["Ljava/lang/invoke/LambdaForm$".to_string()],
            inlining_trampolines: vec!["callInlined".to_string()],
            exempt_dynamic_invokes: true,
        }
    }
}

impl VerifyConfig {
    /// An empty allowlist: every link must match the bytecode exactly
    pub fn strict() -> Self {
        Self {
            trampoline_callers: Vec::new(),
            generated_type_prefixes: Vec::new(),
            inlining_trampolines: Vec::new(),
            exempt_dynamic_invokes: false,
        }
    }

    /// The process-wide configuration (defaults unless `INLINE_PROVENANCE_EXEMPTIONS` is set)
    pub fn global() -> &'static VerifyConfig {
        &GLOBAL_CONFIG
    }

    /// Parse a TOML exemption table; absent keys keep their defaults
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load a TOML exemption file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn is_trampoline_caller(&self, method_name: &str) -> bool {
        self.trampoline_callers.iter().any(|n| n == method_name)
    }

    pub fn is_generated_type(&self, type_name: &str) -> bool {
        self.generated_type_prefixes
            .iter()
            .any(|prefix| type_name.starts_with(prefix.as_str()))
    }

    pub fn is_inlining_trampoline(&self, method_name: &str) -> bool {
        self.inlining_trampolines.iter().any(|n| n == method_name)
    }
}

//! Stack configuration.
//!
//! `StackConfig` deserializes from YAML or JSON and can be overridden from
//! environment variables:
//!
//! - `TREX_APPROVAL_THRESHOLD` (default: 1)
//! - `TREX_PENDING_TTL_SECS` (default: unset, executions never expire;
//!   `0` or `none` clears a file-provided value)
//! - `TREX_COMPLIANCE_MODE` (`eager` | `short_circuit`, default: `eager`)

use serde::{Deserialize, Serialize};

/// Approval and expiry policy applied to every identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityPolicy {
    /// Distinct approvals required before a pending execution dispatches.
    pub approval_threshold: u32,
    /// Age after which a pending execution can no longer be approved.
    pub pending_ttl_secs: Option<u64>,
}

impl Default for IdentityPolicy {
    fn default() -> Self {
        Self {
            approval_threshold: 1,
            pending_ttl_secs: None,
        }
    }
}

impl IdentityPolicy {
    /// Reject a zero threshold or zero TTL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.approval_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                key: "approval_threshold".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.pending_ttl_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "pending_ttl_secs".into(),
                reason: "must be positive when set".into(),
            });
        }
        Ok(())
    }
}

/// How the compliance engine walks its module chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Ask every module, then AND the answers.
    #[default]
    Eager,
    /// Stop at the first module that says no.
    ShortCircuit,
}

impl std::str::FromStr for EvaluationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eager" => Ok(Self::Eager),
            "short_circuit" | "short-circuit" => Ok(Self::ShortCircuit),
            other => Err(ConfigError::InvalidValue {
                key: "compliance.mode".into(),
                reason: format!("unknown mode {other:?}"),
            }),
        }
    }
}

/// Compliance engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// Module chain evaluation mode.
    pub mode: EvaluationMode,
}

/// Top-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Identity approval policy.
    pub identity: IdentityPolicy,
    /// Compliance engine settings.
    pub compliance: ComplianceConfig,
}

impl StackConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup` (normally the process environment) and
    /// validate the result.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup("TREX_APPROVAL_THRESHOLD") {
            self.identity.approval_threshold = parse_var("TREX_APPROVAL_THRESHOLD", &raw)?;
        }
        if let Some(raw) = lookup("TREX_PENDING_TTL_SECS") {
            let raw = raw.trim();
            self.identity.pending_ttl_secs = if raw.eq_ignore_ascii_case("none") || raw == "0" {
                None
            } else {
                Some(parse_var("TREX_PENDING_TTL_SECS", raw)?)
            };
        }
        if let Some(raw) = lookup("TREX_COMPLIANCE_MODE") {
            self.compliance.mode = raw.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.identity.validate()
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: var.to_string(),
        reason: e.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

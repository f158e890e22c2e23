//! Process-wide configuration, read once at startup.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::fs;

use crate::nlu::{NluAuth, NluSettings};
use crate::session::TtlPolicy;

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub nlu: NluConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("environment variable '{0}' is not set")]
    MissingEnvVar(String),

    #[error("unclosed variable reference '${{' (missing '}}')")]
    UnclosedVarReference,
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the defaults; `${VAR}` and `${VAR:-default}`
    /// references are expanded from the environment before parsing, so
    /// credentials never live in the file itself.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let expanded = expand_env_vars(&contents)?;
        Ok(serde_yaml::from_str(&expanded)?)
    }
}

// ============================================================================
// Private Helpers (Serde Defaults)
// ============================================================================

fn default_ttl_minutes() -> u64 {
    crate::session::DEFAULT_TTL_MINUTES as u64
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

fn default_location() -> String {
    "global".to_string()
}

fn default_language() -> String {
    crate::nlu::DEFAULT_LANGUAGE.to_string()
}

fn default_base_url() -> String {
    "https://dialogflow.googleapis.com".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

// ============================================================================
// SessionConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// Maximum gap since last access before a session is stale.
    #[serde(default = "default_ttl_minutes")]
    pub idle_ttl_minutes: u64,
    /// Maximum session age from creation, regardless of access pattern.
    #[serde(default = "default_ttl_minutes")]
    pub absolute_ttl_minutes: u64,
    /// How often the sweeper scans for stale records. Keep this well
    /// below the idle TTL so peak memory stays bounded.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_minutes: default_ttl_minutes(),
            absolute_ttl_minutes: default_ttl_minutes(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl SessionConfig {
    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy {
            idle: chrono::Duration::minutes(self.idle_ttl_minutes as i64),
            absolute: chrono::Duration::minutes(self.absolute_ttl_minutes as i64),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

// ============================================================================
// NluConfig
// ============================================================================

/// Which header carries the backend credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    Bearer,
    ApiKey,
}

#[derive(Debug, Deserialize)]
pub struct NluConfig {
    /// Tenant project identifier on the backend.
    #[serde(default)]
    pub project: String,
    /// Region/location the agent is deployed in.
    #[serde(default = "default_location")]
    pub location: String,
    /// Agent identifier within the project.
    #[serde(default)]
    pub agent: String,
    /// Default language code for queries.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Credential for the backend; typically `${NLU_AUTH_TOKEN:-}` in the
    /// file. Empty means unauthenticated (local emulator).
    #[serde(default)]
    pub auth_token: String,
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: AuthScheme,
    /// Upper bound on one backend call; a timeout surfaces as an
    /// unavailable backend.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_auth_scheme() -> AuthScheme {
    AuthScheme::Bearer
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            location: default_location(),
            agent: String::new(),
            language: default_language(),
            base_url: default_base_url(),
            auth_token: String::new(),
            auth_scheme: default_auth_scheme(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl NluConfig {
    pub fn settings(&self) -> NluSettings {
        NluSettings {
            project: self.project.clone(),
            location: self.location.clone(),
            agent: self.agent.clone(),
            default_language: self.language.clone(),
            base_url: self.base_url.clone(),
        }
    }

    pub fn auth(&self) -> Option<NluAuth> {
        if self.auth_token.is_empty() {
            return None;
        }
        Some(match self.auth_scheme {
            AuthScheme::Bearer => NluAuth::Bearer(self.auth_token.clone()),
            AuthScheme::ApiKey => NluAuth::ApiKey(self.auth_token.clone()),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` references from the environment.
///
/// A `${VAR}` without a default errors when the variable is unset; an
/// unclosed `${` is always an error. No nested expansion.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(ConfigError::UnclosedVarReference)?;
        let reference = &after[..end];

        let (name, default) = match reference.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (reference, None),
        };

        match std::env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => match default {
                Some(default) => out.push_str(default),
                None => return Err(ConfigError::MissingEnvVar(name.to_string())),
            },
        }

        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

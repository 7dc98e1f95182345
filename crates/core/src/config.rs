//! TOML-based configuration for trackmigrate.
//!
//! API tokens are never stored in the file. Each workspace names the
//! environment variable holding its token in `token_env`; the value is
//! resolved at runtime via [`MigrateConfig::resolve_env_vars`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;
use crate::models::ResourceId;

/// Default Shortcut (formerly Clubhouse) REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.app.shortcut.com/api/v3";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Workspace entities are read from.
    pub source: WorkspaceConfig,

    /// Workspace entities are created in.
    pub target: WorkspaceConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub migration: MigrationOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Workspaces
// ---------------------------------------------------------------------------

/// Connection and scope settings for one workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Name of the environment variable holding the API token.
    pub token_env: String,

    /// Project stories are read from (source) or created in (target).
    #[serde(default)]
    pub project_id: Option<ResourceId>,

    /// Target epic new stories are attached to.
    #[serde(default)]
    pub epic_id: Option<ResourceId>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Resolved token (not serialized).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}
fn default_request_timeout() -> u64 {
    30
}

impl WorkspaceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

/// Request quota shared by every outbound call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_quota")]
    pub quota: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Log a warning once the remaining slots in the window drop to this.
    #[serde(default = "default_warn_remaining")]
    pub warn_remaining: u32,
}

fn default_quota() -> u32 {
    200
}
fn default_window_secs() -> u64 {
    60
}
fn default_warn_remaining() -> u32 {
    10
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            quota: default_quota(),
            window_secs: default_window_secs(),
            warn_remaining: default_warn_remaining(),
        }
    }
}

// ---------------------------------------------------------------------------
// Migration behaviour
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Rename migrated source entities with the `[Migrated:<id>]` marker.
    #[serde(default = "default_true")]
    pub mark_source: bool,

    /// Append the source URL to target descriptions.
    #[serde(default = "default_true")]
    pub annotate_description: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            mark_source: true,
            annotate_description: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl MigrateConfig {
    /// Load a [`MigrateConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: MigrateConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve both workspace tokens from the environment.
    ///
    /// Missing variables only log a warning; commands that talk to the API
    /// call [`require_tokens`](Self::require_tokens).
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");
        self.source.token = resolve_optional_env(&self.source.token_env, "source.token_env");
        self.target.token = resolve_optional_env(&self.target.token_env, "target.token_env");
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, workspace) in [("source", &self.source), ("target", &self.target)] {
            if !(workspace.api_url.starts_with("https://")
                || workspace.api_url.starts_with("http://"))
            {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.api_url", name),
                    detail: "API URL must be an http(s) URL".into(),
                });
            }
            if workspace.token_env.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.token_env", name),
                    detail: "token environment variable name must not be empty".into(),
                });
            }
            if workspace.request_timeout_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.request_timeout_secs", name),
                    detail: "request timeout must be > 0".into(),
                });
            }
        }
        if self.rate_limit.quota == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.quota".into(),
                detail: "quota must be > 0".into(),
            });
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.window_secs".into(),
                detail: "window must be > 0".into(),
            });
        }
        if self.rate_limit.warn_remaining >= self.rate_limit.quota {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.warn_remaining".into(),
                detail: "warning threshold must be below the quota".into(),
            });
        }

        Ok(())
    }

    /// Fail unless both tokens were resolved.
    pub fn require_tokens(&self) -> Result<(&str, &str), ConfigError> {
        let source = self
            .source
            .token
            .as_deref()
            .ok_or_else(|| ConfigError::EnvVarMissing {
                var: self.source.token_env.clone(),
                field: "source.token_env".into(),
            })?;
        let target = self
            .target
            .token
            .as_deref()
            .ok_or_else(|| ConfigError::EnvVarMissing {
                var: self.target.token_env.clone(),
                field: "target.token_env".into(),
            })?;
        Ok((source, target))
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Starter configuration written by `trackmigrate init`.
    pub fn sample() -> &'static str {
        SAMPLE_CONFIG
    }
}

const SAMPLE_CONFIG: &str = r#"[general]
log_level = "info"

[source]
api_url = "https://api.app.shortcut.com/api/v3"
token_env = "CLUBHOUSE_API_TOKEN_SOURCE"
# project_id = 12584

[target]
api_url = "https://api.app.shortcut.com/api/v3"
token_env = "CLUBHOUSE_API_TOKEN_TARGET"
# project_id = 12683
# epic_id = 14924
request_timeout_secs = 30

[rate_limit]
quota = 200
window_secs = 60
warn_remaining = 10

[migration]
mark_source = true
annotate_description = true
"#;

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}

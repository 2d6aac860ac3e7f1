//! Configuration document materialization.
//!
//! The gateway reads one JSON document describing its network binding, token
//! auth, default model, and channel integrations. The document is written at
//! most once per volume lifetime: an existing file is never touched, so
//! operator hand-edits survive redeploys. The document is built as a single
//! in-memory value and serialized in one pass; channel entries appear if and
//! only if their full credential set is present in the environment.

use crate::env::{BootEnv, non_empty};
use crate::write;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Default model written into fresh documents when no override is supplied.
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4-20250514";

const TOKEN_FILE: &str = "gateway.token";
const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "gateway.json";

/// Upper bound on the migration hook; a hung hook must not wedge the boot.
const MIGRATION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to serialize configuration document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write configuration document to {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Fixed file locations under the durable volume.
#[derive(Debug, Clone)]
pub struct StateLayout {
    state_dir: PathBuf,
    config_override: Option<PathBuf>,
}

impl StateLayout {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            config_override: None,
        }
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_override = path;
        self
    }

    pub fn token_path(&self) -> PathBuf {
        self.state_dir.join(TOKEN_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        match &self.config_override {
            Some(path) => path.clone(),
            None => self.state_dir.join(CONFIG_DIR).join(CONFIG_FILE),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub gateway: GatewaySection,
    pub agent: AgentSection,
    #[serde(default, skip_serializing_if = "ChannelsSection::is_empty")]
    pub channels: ChannelsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySection {
    pub host: String,
    pub port: u16,
    pub auth: AuthSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    pub mode: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    pub model: String,
}

/// Channel integrations keyed by provider. Each entry is present exactly
/// when its required credentials were found at materialization time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramChannel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordChannel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackChannel>,
}

impl ChannelsSection {
    pub fn is_empty(&self) -> bool {
        self.telegram.is_none() && self.discord.is_none() && self.slack.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChannel {
    pub bot_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordChannel {
    pub bot_token: String,
}

/// Slack needs both the bot token and the socket-mode app token; with only
/// one of the pair the channel cannot connect, so the entry is omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackChannel {
    pub bot_token: String,
    pub app_token: String,
}

/// Outcome of [`materialize`], so the caller can gate the migration hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialized {
    Written,
    Existing,
}

pub fn build_document(
    env: &BootEnv,
    token: &SecretString,
    host: IpAddr,
    port: u16,
) -> ConfigDocument {
    ConfigDocument {
        gateway: GatewaySection {
            host: host.to_string(),
            port,
            auth: AuthSection {
                mode: "token".to_string(),
                token: token.expose_secret().to_owned(),
            },
        },
        agent: AgentSection {
            model: env
                .model
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        },
        channels: channels_from(env),
    }
}

fn channels_from(env: &BootEnv) -> ChannelsSection {
    let expose = |s: &SecretString| s.expose_secret().to_owned();
    ChannelsSection {
        telegram: non_empty(env.telegram_bot_token.as_ref()).map(|t| TelegramChannel {
            bot_token: expose(t),
        }),
        discord: non_empty(env.discord_bot_token.as_ref()).map(|t| DiscordChannel {
            bot_token: expose(t),
        }),
        slack: match (
            non_empty(env.slack_bot_token.as_ref()),
            non_empty(env.slack_app_token.as_ref()),
        ) {
            (Some(bot), Some(app)) => Some(SlackChannel {
                bot_token: expose(bot),
                app_token: expose(app),
            }),
            _ => None,
        },
    }
}

/// Write the configuration document unless one already exists.
///
/// The existing-file check is what makes redeploys safe: environment changes
/// on later boots never rewrite a document an operator may have edited.
pub fn materialize(layout: &StateLayout, doc: &ConfigDocument) -> Result<Materialized, ConfigError> {
    let path = layout.config_path();
    if path.exists() {
        info!(path = %path.display(), "configuration document exists; leaving untouched");
        return Ok(Materialized::Existing);
    }

    let mut bytes = serde_json::to_vec_pretty(doc)?;
    bytes.push(b'\n');
    write::atomic_write(&path, &bytes).map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), "configuration document materialized");
    Ok(Materialized::Written)
}

/// Run the target service's own config-migration hook once after a fresh
/// materialization. Failures are logged and ignored; this step never aborts
/// the boot sequence.
pub async fn run_migration(hook: &str, exports: &[(String, SecretString)]) {
    let mut parts = hook.split_whitespace();
    let Some(program) = parts.next() else {
        warn!("migration hook configured but empty; skipping");
        return;
    };

    info!(hook, "running config migration hook");
    let mut command = tokio::process::Command::new(program);
    command.args(parts);
    command.envs(exports.iter().map(|(k, v)| (k, v.expose_secret())));
    command.stdin(std::process::Stdio::null());

    match tokio::time::timeout(MIGRATION_TIMEOUT, command.status()).await {
        Ok(Ok(status)) if status.success() => info!("migration hook completed"),
        Ok(Ok(status)) => warn!(%status, "migration hook failed; continuing"),
        Ok(Err(e)) => warn!(error = %e, "migration hook could not run; continuing"),
        Err(_) => warn!("migration hook timed out; continuing"),
    }
}

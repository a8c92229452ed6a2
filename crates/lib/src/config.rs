//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.pulsebot/config.json`) and
//! environment. Env always wins for the bot credential, the upstream endpoint,
//! and the listen port, so deploy platforms can inject them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Health/webhook listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Channel settings (Telegram).
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Remote processing endpoint.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Long-running action settings.
    #[serde(default)]
    pub actions: ActionsConfig,
}

/// Listener bind and port for the health endpoint (and Telegram webhook when
/// enabled).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for the HTTP listener (default 8080). Overridden by PORT env.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0" so deployment probes can reach it).
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_port() -> u16 {
    8080
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

/// Per-channel config (Telegram bot token, webhook mode).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramChannelConfig,
}

/// Telegram channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramChannelConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
    /// When set, use webhook mode: Telegram POSTs updates to this URL. If
    /// unset, long-poll getUpdates is used.
    pub webhook_url: Option<String>,
    /// Optional secret for webhook verification
    /// (X-Telegram-Bot-Api-Secret-Token). Used only when webhook_url is set.
    pub webhook_secret: Option<String>,
}

/// Remote processing endpoint config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamConfig {
    /// Base URL the completion and search calls POST to. Overridden by
    /// UPSTREAM_BASE_URL env when set.
    pub base_url: Option<String>,
}

/// Long-running action config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionsConfig {
    /// Period between progress updates, in milliseconds (default 1500).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_tick_ms() -> u64 {
    1500
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_telegram_token(config: &Config) -> Option<String> {
    env_nonempty("TELEGRAM_BOT_TOKEN").or_else(|| {
        config
            .channels
            .telegram
            .bot_token
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Resolve the upstream base URL: env UPSTREAM_BASE_URL overrides config.
pub fn resolve_upstream_base_url(config: &Config) -> Option<String> {
    env_nonempty("UPSTREAM_BASE_URL").or_else(|| {
        config
            .upstream
            .base_url
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Listen port from the PORT env (deploy platforms set it), if valid.
pub fn resolve_port_env() -> Option<u16> {
    env_nonempty("PORT").and_then(|s| s.parse().ok())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("PULSEBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".pulsebot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or PULSEBOT_CONFIG_PATH). Missing file
/// => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_port_and_bind() {
        let s = ServerConfig::default();
        assert_eq!(s.port, 8080);
        assert_eq!(s.bind, "0.0.0.0");
    }

    #[test]
    fn default_action_tick() {
        let a = ActionsConfig::default();
        assert_eq!(a.tick_ms, 1500);
    }

    #[test]
    fn parses_camel_case_config() {
        let json = r#"{
            "server": { "port": 9090, "bind": "127.0.0.1" },
            "channels": { "telegram": { "botToken": "t0k", "webhookUrl": "https://example.com/hook" } },
            "upstream": { "baseUrl": "https://script.example.com/exec" },
            "actions": { "tickMs": 250 }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.channels.telegram.bot_token.as_deref(), Some("t0k"));
        assert_eq!(
            config.channels.telegram.webhook_url.as_deref(),
            Some("https://example.com/hook")
        );
        assert_eq!(
            config.upstream.base_url.as_deref(),
            Some("https://script.example.com/exec")
        );
        assert_eq!(config.actions.tick_ms, 250);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.actions.tick_ms, 1500);
        assert!(config.upstream.base_url.is_none());
        assert!(config.channels.telegram.bot_token.is_none());
    }
}

use serde::Deserialize;

/// Top-level client configuration.
/// Loaded from environment variables (prefix `MV`, e.g. `MV__API__URL`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Event channel settings
    #[serde(default)]
    pub ws: WsEndpointConfig,
    /// Log level (default: info)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the versioned REST API
    #[serde(default = "default_api_url")]
    pub url: String,
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WsEndpointConfig {
    /// Explicit WebSocket endpoint. When unset, the endpoint is derived
    /// from the API URL by mirroring its scheme (`http`→`ws`, `https`→`wss`)
    /// and appending `/ws`.
    #[serde(default)]
    pub url: Option<String>,
}

impl AppConfig {
    /// Load config from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("MV")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        cfg.try_deserialize()
    }

    /// Resolve the WebSocket endpoint for the event channel.
    pub fn ws_url(&self) -> String {
        if let Some(url) = &self.ws.url {
            return url.clone();
        }
        let base = self.api.url.trim_end_matches('/');
        let derived = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{derived}/ws")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            ws: WsEndpointConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_mirrors_api_scheme() {
        let mut cfg = AppConfig::default();
        cfg.api.url = "http://archive.example/api/v1".to_string();
        assert_eq!(cfg.ws_url(), "ws://archive.example/api/v1/ws");

        cfg.api.url = "https://archive.example/api/v1/".to_string();
        assert_eq!(cfg.ws_url(), "wss://archive.example/api/v1/ws");
    }

    #[test]
    fn explicit_ws_url_wins() {
        let mut cfg = AppConfig::default();
        cfg.ws.url = Some("wss://push.example/events".to_string());
        assert_eq!(cfg.ws_url(), "wss://push.example/events");
    }
}

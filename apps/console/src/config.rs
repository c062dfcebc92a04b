use std::{collections::HashMap, fs};

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_url: String,
    pub session_name: String,
    pub host_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            session_name: "Auction".into(),
            host_name: "host".into(),
        }
    }
}

/// Defaults, overridden by an optional `session.toml`, overridden by
/// environment variables. CLI flags win over all of these in `main`.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("session.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("server_url") {
                settings.server_url = v.clone();
            }
            if let Some(v) = file_cfg.get("session_name") {
                settings.session_name = v.clone();
            }
            if let Some(v) = file_cfg.get("host_name") {
                settings.host_name = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("AUCTION_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("AUCTION_SESSION_NAME") {
        settings.session_name = v;
    }
    if let Ok(v) = std::env::var("AUCTION_HOST_NAME") {
        settings.host_name = v;
    }

    settings
}

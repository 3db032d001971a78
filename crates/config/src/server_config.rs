//! Media server connection section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Where the media server lives and how to authenticate with it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL, e.g. `https://abs.example.org`
    pub host: Option<String>,

    pub username: Option<String>,

    /// API token issued at login
    pub token: Option<String>,
}

impl ServerConfig {
    /// True when a host and a token are both present
    pub fn is_configured(&self) -> bool {
        self.host.is_some() && self.token.is_some()
    }

    /// Host without a trailing slash
    pub fn base_url(&self) -> Option<&str> {
        self.host.as_deref().map(|host| host.trim_end_matches('/'))
    }
}

impl ConfigSection for ServerConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = Vec::new();

        if let Some(host) = &self.host {
            results.push(Validator::http_url(host, "server.host"));
        }
        results.push(Validator::optional_not_empty(self.username.as_deref(), "server.username"));
        results.push(Validator::optional_not_empty(self.token.as_deref(), "server.token"));

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.username.is_some() {
            self.username = other.username;
        }
        if other.token.is_some() {
            self.token = other.token;
        }
    }

    fn section_name(&self) -> &'static str {
        "server"
    }
}

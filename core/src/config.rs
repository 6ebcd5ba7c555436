//! Client configuration.
//!
//! A config names the project, carries the API token, and decides where the
//! projects endpoint lives. It derives serde traits so callers can keep it in
//! whatever file format they already use; `from_env` covers the common case.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

const DEFAULT_HOST: &str = "www.pivotaltracker.com";
const PROJECTS_PATH: &str = "/services/v3/projects";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub project_id: String,
    pub token: String,
    #[serde(default = "default_ssl")]
    pub ssl: bool,
    /// Scheme and host (and optionally port) to use instead of the public
    /// service, e.g. `http://127.0.0.1:3000`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_ssl() -> bool {
    true
}

impl TrackerConfig {
    pub fn new(project_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            token: token.into(),
            ssl: true,
            base_url: None,
        }
    }

    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Read `TRACKER_PROJECT_ID`, `TRACKER_TOKEN`, and optionally
    /// `TRACKER_SSL` and `TRACKER_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |name: &str| lookup(name).ok_or_else(|| TrackerError::MissingField(name.to_string()));
        let mut config = Self::new(require("TRACKER_PROJECT_ID")?, require("TRACKER_TOKEN")?);
        if let Some(ssl) = lookup("TRACKER_SSL") {
            config.ssl = match ssl.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(TrackerError::Parse {
                        hint: "boolean",
                        value: ssl,
                    })
                }
            };
        }
        config.base_url = lookup("TRACKER_BASE_URL").filter(|url| !url.trim().is_empty());
        Ok(config)
    }

    /// URL of the projects collection, without a trailing slash.
    pub fn projects_url(&self) -> String {
        match &self.base_url {
            Some(base) => format!("{}{PROJECTS_PATH}", base.trim_end_matches('/')),
            None if self.ssl => format!("https://{DEFAULT_HOST}:443{PROJECTS_PATH}"),
            None => format!("http://{DEFAULT_HOST}:80{PROJECTS_PATH}"),
        }
    }

    /// URL of this config's project.
    pub fn project_url(&self) -> String {
        format!("{}/{}", self.projects_url(), self.project_id)
    }
}

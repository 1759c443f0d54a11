use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FlowdeckError, Result};
use crate::settings::SettingsSchema;
use crate::types::TemplateSummary;

/// Top-level Flowdeck configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Entries offered by the template gallery overlay.
    #[serde(default)]
    pub templates: Vec<TemplateSummary>,
    /// Per-category settings layouts for agent nodes.
    #[serde(default)]
    pub settings_schemas: Vec<SettingsSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "default_workspace")]
    pub workspace: String,
    /// Name given to new workflow documents.
    #[serde(default = "default_workflow_name")]
    pub default_name: String,
    /// Directory receiving saved and exported files. Default: <workspace>/downloads
    #[serde(default)]
    pub downloads_dir: Option<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            default_name: default_workflow_name(),
            downloads_dir: None,
        }
    }
}

/// Where the agent catalog is fetched from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_agents_path")]
    pub agents_path: String,
    #[serde(default = "default_categories_path")]
    pub categories_path: String,
    /// Per-request timeout. The fetch is never retried.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Optional bearer token sent with catalog requests.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            agents_path: default_agents_path(),
            categories_path: default_categories_path(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

impl CatalogConfig {
    pub fn agents_url(&self) -> String {
        join_url(&self.base_url, &self.agents_path)
    }

    pub fn categories_url(&self) -> String {
        join_url(&self.base_url, &self.categories_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn default_workspace() -> String { "~/.flowdeck".to_string() }
fn default_workflow_name() -> String { "Untitled Workflow".to_string() }
fn default_base_url() -> String { "http://127.0.0.1:8000/api".to_string() }
fn default_agents_path() -> String { "/agents".to_string() }
fn default_categories_path() -> String { "/categories".to_string() }
fn default_timeout_secs() -> u64 { 10 }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| FlowdeckError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| FlowdeckError::Config(e.to_string()))
    }

    /// Resolve the workspace directory (expand ~).
    pub fn workspace_dir(&self) -> PathBuf {
        expand_home(&self.editor.workspace)
    }

    /// Resolve the downloads directory.
    pub fn downloads_dir(&self) -> PathBuf {
        match &self.editor.downloads_dir {
            Some(dir) => expand_home(dir),
            None => self.workspace_dir().join("downloads"),
        }
    }

    /// Path of the workflow database.
    pub fn store_path(&self) -> PathBuf {
        self.workspace_dir().join("workflows.db")
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

pub fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

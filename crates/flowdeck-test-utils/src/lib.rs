//! Shared fixtures and in-memory collaborators for Flowdeck tests.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Mutex;

use futures::future::BoxFuture;

use flowdeck_core::error::{FlowdeckError, Result};
use flowdeck_core::traits::{CatalogSource, DownloadSink, WorkflowStore};
use flowdeck_core::types::{Agent, Catalog, Category};
use flowdeck_core::AppConfig;

/// Two categories, three agents. `a3` is the only communication agent.
pub fn sample_catalog() -> Catalog {
    let agent = |id: &str, name: &str, category_id: &str, category_name: &str, caps: &[&str]| {
        Agent {
            agent_id: id.to_string(),
            agent_name: name.to_string(),
            category_id: category_id.to_string(),
            category_name: category_name.to_string(),
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
        }
    };
    Catalog {
        agents: vec![
            agent("a1", "Analyzer", "analysis", "Analysis", &["sql", "charts"]),
            agent("a2", "Summarizer", "analysis", "Analysis", &["text"]),
            agent("a3", "Mailer", "comms", "Communication", &["email"]),
        ],
        categories: vec![
            Category {
                category_id: "analysis".into(),
                category_name: "Analysis".into(),
            },
            Category {
                category_id: "comms".into(),
                category_name: "Communication".into(),
            },
        ],
    }
}

/// Catalog source that always answers with the same lists.
pub struct StaticCatalog {
    catalog: Catalog,
}

impl StaticCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl CatalogSource for StaticCatalog {
    fn agents(&self) -> BoxFuture<'_, Result<Vec<Agent>>> {
        Box::pin(async move { Ok(self.catalog.agents.clone()) })
    }

    fn categories(&self) -> BoxFuture<'_, Result<Vec<Category>>> {
        Box::pin(async move { Ok(self.catalog.categories.clone()) })
    }
}

/// Catalog source whose every request fails.
pub struct FailingCatalog;

impl CatalogSource for FailingCatalog {
    fn agents(&self) -> BoxFuture<'_, Result<Vec<Agent>>> {
        Box::pin(async {
            Err(FlowdeckError::Catalog {
                endpoint: "agents".into(),
                message: "connection refused".into(),
            })
        })
    }

    fn categories(&self) -> BoxFuture<'_, Result<Vec<Category>>> {
        Box::pin(async {
            Err(FlowdeckError::Catalog {
                endpoint: "categories".into(),
                message: "connection refused".into(),
            })
        })
    }
}

/// In-memory key-value store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> FlowdeckError {
    FlowdeckError::Database("lock poisoned".into())
}

impl WorkflowStore for MemoryStore {
    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries.remove(key).is_some())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Store that rejects every write.
pub struct FailingStore;

impl WorkflowStore for FailingStore {
    fn put(&self, _key: &str, _value: &str) -> Result<()> {
        Err(FlowdeckError::Database("disk full".into()))
    }

    fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn remove(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    fn keys(&self, _prefix: &str) -> Result<Vec<String>> {
        Ok(vec![])
    }
}

/// Download sink that keeps delivered files in memory.
#[derive(Default)]
pub struct MemoryDownloads {
    files: Mutex<BTreeMap<String, String>>,
}

impl MemoryDownloads {
    /// Contents of the last delivery under `name`.
    pub fn file(&self, name: &str) -> Option<String> {
        self.files.lock().ok()?.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.files
            .lock()
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl DownloadSink for MemoryDownloads {
    fn deliver(&self, file_name: &str, contents: &str) -> Result<()> {
        let mut files = self.files.lock().map_err(|_| poisoned())?;
        files.insert(file_name.to_string(), contents.to_string());
        Ok(())
    }
}

/// Download sink that rejects every delivery.
pub struct FailingDownloads;

impl DownloadSink for FailingDownloads {
    fn deliver(&self, file_name: &str, _contents: &str) -> Result<()> {
        Err(FlowdeckError::Download {
            file: file_name.to_string(),
            message: "permission denied".into(),
        })
    }
}

/// Write `toml_text` to a temp file and load it as config.
pub fn config_from_toml(toml_text: &str) -> Result<(AppConfig, tempfile::NamedTempFile)> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(toml_text.as_bytes())?;
    let config = AppConfig::load(file.path())?;
    Ok((config, file))
}

/// Render a catalog section of a config file.
pub fn catalog_toml(base_url: &str) -> String {
    let mut table = toml::map::Map::new();
    table.insert("base_url".into(), toml::Value::String(base_url.into()));
    let mut root = toml::map::Map::new();
    root.insert("catalog".into(), toml::Value::Table(table));
    toml::to_string(&root).unwrap_or_default()
}

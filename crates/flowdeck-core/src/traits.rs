use futures::future::BoxFuture;

use crate::error::Result;
use crate::settings::SettingsSchema;
use crate::types::*;

/// Catalog source: agent and category listings.
pub trait CatalogSource: Send + Sync + 'static {
    /// Fetch all agents.
    fn agents(&self) -> BoxFuture<'_, Result<Vec<Agent>>>;

    /// Fetch all categories.
    fn categories(&self) -> BoxFuture<'_, Result<Vec<Category>>>;
}

/// Workflow store: durable key-value persistence.
pub trait WorkflowStore: Send + Sync + 'static {
    /// Insert or replace the value under `key`.
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Read the value under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`. Returns whether it existed.
    fn remove(&self, key: &str) -> Result<bool>;

    /// All keys starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Download sink: where saved and exported files are delivered.
pub trait DownloadSink: Send + Sync + 'static {
    /// Deliver `contents` as a file named `file_name`.
    fn deliver(&self, file_name: &str, contents: &str) -> Result<()>;
}

/// Agent-config collaborator: per-category settings layouts.
pub trait SettingsSchemaSource: Send + Sync + 'static {
    fn schema_for(&self, category_id: &str) -> Option<SettingsSchema>;
}

/// Template gallery: lists templates and receives the user's pick.
///
/// The editor toggles the gallery and forwards the selection; applying the
/// template to the document is the gallery's business.
pub trait TemplateGallery: Send + Sync + 'static {
    fn templates(&self) -> Vec<TemplateSummary>;

    fn on_select(&self, template: &TemplateSummary);
}

/// Schemas held in memory, typically loaded from configuration.
impl SettingsSchemaSource for Vec<SettingsSchema> {
    fn schema_for(&self, category_id: &str) -> Option<SettingsSchema> {
        self.iter().find(|s| s.category_id == category_id).cloned()
    }
}

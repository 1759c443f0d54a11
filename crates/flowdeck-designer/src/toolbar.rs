//! Workflow-level commands and their persistence side effects.

use std::path::Path;

use tracing::info;

use flowdeck_core::error::{FlowdeckError, Result};
use flowdeck_core::traits::{DownloadSink, WorkflowStore};
use flowdeck_core::types::{store_key, WorkflowDocument};

use crate::designer::Intent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarCommand {
    Save,
    Export,
    Load,
    Test,
    Clear,
    ShowTemplates,
}

impl ToolbarCommand {
    pub const ALL: [Self; 6] = [
        Self::Save,
        Self::Export,
        Self::Load,
        Self::Test,
        Self::Clear,
        Self::ShowTemplates,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Save => "Save",
            Self::Export => "Export",
            Self::Load => "Load",
            Self::Test => "Test",
            Self::Clear => "Clear",
            Self::ShowTemplates => "Templates",
        }
    }

    /// Intent this command maps to. `Load` needs a document from a
    /// collaborator first, so it has none.
    pub fn intent(self) -> Option<Intent> {
        match self {
            Self::Save => Some(Intent::Save),
            Self::Export => Some(Intent::Export),
            Self::Load => None,
            Self::Test => Some(Intent::Test),
            Self::Clear => Some(Intent::Clear),
            Self::ShowTemplates => Some(Intent::ToggleTemplates),
        }
    }
}

pub fn dirty_indicator(dirty: bool) -> &'static str {
    if dirty {
        "● unsaved changes"
    } else {
        "saved"
    }
}

fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    if stem.is_empty() {
        "workflow".to_string()
    } else {
        stem
    }
}

/// Download name used by save: spaces become underscores.
pub fn file_name(name: &str) -> String {
    format!("{}.json", file_stem(name))
}

/// Download name used by export.
pub fn export_file_name(name: &str) -> String {
    format!("{}_export.json", file_stem(name))
}

/// Pretty-printed (2-space) JSON of the whole document.
pub fn to_json(doc: &WorkflowDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Where a save went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub key: String,
    pub file: String,
}

/// Persist under `workflow_<id>` and download the identical JSON.
pub fn save(
    doc: &WorkflowDocument,
    store: &dyn WorkflowStore,
    downloads: &dyn DownloadSink,
) -> Result<SaveReceipt> {
    let json = to_json(doc)?;
    let key = doc.store_key();
    let file = file_name(&doc.name);

    // Not atomic: a failed download leaves the new JSON in the store.
    store.put(&key, &json)?;
    downloads.deliver(&file, &json)?;

    info!(key = %key, file = %file, nodes = doc.nodes.len(), "Workflow saved");
    Ok(SaveReceipt { key, file })
}

/// Download only. Returns the file name.
pub fn export(doc: &WorkflowDocument, downloads: &dyn DownloadSink) -> Result<String> {
    let json = to_json(doc)?;
    let file = export_file_name(&doc.name);
    downloads.deliver(&file, &json)?;
    info!(file = %file, "Workflow exported");
    Ok(file)
}

/// Parse and validate a document from JSON text.
pub fn parse_document(json: &str) -> Result<WorkflowDocument> {
    let doc: WorkflowDocument = serde_json::from_str(json)
        .map_err(|e| FlowdeckError::InvalidDocument(e.to_string()))?;
    doc.validate()?;
    Ok(doc)
}

/// Load a document from a JSON file.
pub fn load_from_file(path: &Path) -> Result<WorkflowDocument> {
    let json = std::fs::read_to_string(path)?;
    parse_document(&json)
}

/// Load a document previously saved under `workflow_<id>`.
pub fn load_from_store(store: &dyn WorkflowStore, workflow_id: &str) -> Result<WorkflowDocument> {
    let key = store_key(workflow_id);
    let json = store
        .get(&key)?
        .ok_or(FlowdeckError::WorkflowNotFound(key))?;
    parse_document(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdeck_core::types::{EdgeRecord, NodeRecord, NodeType, Position};
    use flowdeck_test_utils::{MemoryDownloads, MemoryStore};

    fn sample_doc(name: &str) -> WorkflowDocument {
        let mut doc = WorkflowDocument::new(name);
        doc.nodes
            .push(NodeRecord::new("n1", NodeType::Trigger, "Start", Position::new(0.0, 0.0)));
        doc.nodes
            .push(NodeRecord::new("n2", NodeType::Output, "End", Position::new(300.0, 0.0)));
        doc.edges.push(EdgeRecord::new("n1", "n2"));
        doc
    }

    #[test]
    fn test_file_names() {
        assert_eq!(file_name("My Flow"), "My_Flow.json");
        assert_eq!(export_file_name("My Flow"), "My_Flow_export.json");
        assert_eq!(file_name("a/b"), "a_b.json");
        assert_eq!(file_name(""), "workflow.json");
    }

    #[test]
    fn test_json_uses_two_space_indent() {
        let json = to_json(&sample_doc("x")).unwrap();
        assert!(json.contains("\n  \"id\""));
        assert!(!json.contains('\t'));
    }

    #[test]
    fn test_save_writes_identical_bytes_to_both() {
        let store = MemoryStore::default();
        let downloads = MemoryDownloads::default();
        let doc = sample_doc("My Flow");

        let receipt = save(&doc, &store, &downloads).unwrap();
        assert_eq!(receipt.file, "My_Flow.json");
        assert_eq!(receipt.key, format!("workflow_{}", doc.id));

        let stored = store.get(&receipt.key).unwrap().unwrap();
        assert_eq!(downloads.file("My_Flow.json").unwrap(), stored);
    }

    #[test]
    fn test_export_does_not_persist() {
        let store = MemoryStore::default();
        let downloads = MemoryDownloads::default();
        let doc = sample_doc("My Flow");
        assert_eq!(export(&doc, &downloads).unwrap(), "My_Flow_export.json");
        assert!(store.keys("workflow_").unwrap().is_empty());
    }

    #[test]
    fn test_store_round_trip_is_deep_equal() {
        let store = MemoryStore::default();
        let downloads = MemoryDownloads::default();
        let doc = sample_doc("Round trip");
        save(&doc, &store, &downloads).unwrap();
        assert_eq!(load_from_store(&store, &doc.id).unwrap(), doc);
    }

    #[test]
    fn test_load_rejects_invalid_documents() {
        let store = MemoryStore::default();
        assert!(matches!(
            load_from_store(&store, "missing"),
            Err(FlowdeckError::WorkflowNotFound(_))
        ));

        let mut doc = sample_doc("Broken");
        doc.edges.push(EdgeRecord::new("n2", "ghost"));
        let json = serde_json::to_string(&doc).unwrap();
        assert!(matches!(parse_document(&json), Err(FlowdeckError::InvalidDocument(_))));
        assert!(parse_document("[]").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.json");
        let doc = sample_doc("On disk");
        std::fs::write(&path, to_json(&doc).unwrap()).unwrap();
        assert_eq!(load_from_file(&path).unwrap(), doc);
    }

    #[test]
    fn test_load_has_no_direct_intent() {
        assert!(ToolbarCommand::Load.intent().is_none());
        assert!(matches!(ToolbarCommand::Save.intent(), Some(Intent::Save)));
    }
}

use std::collections::BTreeMap;

use flowdeck_core::error::{FlowdeckError, Result};
use flowdeck_core::types::Agent;

/// Mime type under which the dragged agent travels.
pub const MIME_JSON: &str = "application/json";

/// Data carried by a drag gesture, keyed by mime type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragTransfer {
    data: BTreeMap<String, String>,
}

impl DragTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_data(&mut self, mime: impl Into<String>, data: impl Into<String>) {
        self.data.insert(mime.into(), data.into());
    }

    pub fn get_data(&self, mime: &str) -> Option<&str> {
        self.data.get(mime).map(String::as_str)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Package an agent as a drag payload.
    pub fn for_agent(agent: &Agent) -> Result<Self> {
        let mut transfer = Self::new();
        transfer.set_data(MIME_JSON, serde_json::to_string(agent)?);
        Ok(transfer)
    }

    /// Read the agent back out of the payload.
    pub fn agent(&self) -> Result<Agent> {
        let raw = self.get_data(MIME_JSON).ok_or_else(|| {
            FlowdeckError::InvalidPayload(format!("no {} data in drag transfer", MIME_JSON))
        })?;
        serde_json::from_str(raw).map_err(|e| FlowdeckError::InvalidPayload(e.to_string()))
    }
}

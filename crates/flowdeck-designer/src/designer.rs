//! The designer: canonical workflow state and its single update path.
//!
//! All changes arrive as an [`Intent`] through [`Designer::dispatch`] and run
//! synchronously. The only asynchronous step is the one-shot catalog fetch in
//! [`Designer::init`], after which the designer is [`Phase::Ready`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use flowdeck_core::error::Result;
use flowdeck_core::event::EventBus;
use flowdeck_core::traits::{CatalogSource, DownloadSink, SettingsSchemaSource, WorkflowStore};
use flowdeck_core::types::{
    Catalog, DesignerEvent, EdgeRecord, NodeRecord, Position, WorkflowDocument,
};

use crate::canvas::{Canvas, CanvasAction, EdgePath};
use crate::node::NodeView;
use crate::palette::{Palette, PaletteState};
use crate::property_panel::PropertyPanel;
use crate::toolbar;
use crate::transfer::DragTransfer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the catalog.
    Init,
    Ready,
}

/// A request to change designer state.
#[derive(Debug, Clone)]
pub enum Intent {
    /// The catalog fetch finished (possibly empty).
    CatalogLoaded(Catalog),
    SetSearch(String),
    ToggleCategory(String),
    /// A drag payload was released over the canvas at a client position.
    Drop {
        transfer: DragTransfer,
        client: Position,
    },
    SelectNode(String),
    ClickPane,
    /// Replace the node with the same id.
    UpdateNode(NodeRecord),
    /// Ask to delete a node. Needs confirmation.
    DeleteNode(String),
    ConnectNodes {
        source: String,
        target: String,
    },
    DeleteEdge(String),
    PointerDown(Position),
    PointerMove(Position),
    PointerUp(Position),
    /// One wheel tick; positive scrolls down.
    Wheel {
        delta_y: f64,
    },
    ZoomIn,
    ZoomOut,
    ResetView,
    Save,
    Export,
    /// Replace the document with one supplied by a load collaborator.
    Load(WorkflowDocument),
    Test,
    /// Ask to clear the document. Needs confirmation.
    Clear,
    ToggleTemplates,
    /// Carry out the pending destructive action.
    Confirm,
    /// Drop the pending destructive action.
    Cancel,
}

/// A destructive action waiting for the user's confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    DeleteNode(String),
    Clear,
}

impl PendingAction {
    pub fn prompt(&self) -> String {
        match self {
            Self::DeleteNode(_) => "Delete this node and its connections?".to_string(),
            Self::Clear => "Clear the whole workflow? This cannot be undone.".to_string(),
        }
    }
}

/// Result of a dispatched intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Changed,
    Unchanged,
    /// The intent was dropped; the reason is logged.
    Ignored(String),
    ConfirmationRequired(PendingAction),
    Saved { key: String, file: String },
    Exported { file: String },
    Notice(String),
}

/// Fetch agents and categories once. Failures degrade to empty lists.
pub async fn load_catalog(source: &dyn CatalogSource) -> Catalog {
    let (agents, categories) = futures::join!(source.agents(), source.categories());
    let agents = agents.unwrap_or_else(|e| {
        warn!(error = %e, "Agent listing unavailable, using empty catalog");
        vec![]
    });
    let categories = categories.unwrap_or_else(|e| {
        warn!(error = %e, "Category listing unavailable, using empty catalog");
        vec![]
    });
    Catalog { agents, categories }
}

pub struct Designer {
    phase: Phase,
    document: WorkflowDocument,
    selection: Option<String>,
    dirty: bool,
    search_term: String,
    templates_visible: bool,
    catalog: Catalog,
    palette: PaletteState,
    canvas: Canvas,
    pending: Option<PendingAction>,
    store: Arc<dyn WorkflowStore>,
    downloads: Arc<dyn DownloadSink>,
    schemas: Option<Arc<dyn SettingsSchemaSource>>,
    events: Option<Arc<EventBus>>,
}

impl Designer {
    /// A designer with a fresh, empty document named `name`.
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn WorkflowStore>,
        downloads: Arc<dyn DownloadSink>,
    ) -> Self {
        Self {
            phase: Phase::Init,
            document: WorkflowDocument::new(name),
            selection: None,
            dirty: false,
            search_term: String::new(),
            templates_visible: false,
            catalog: Catalog::default(),
            palette: PaletteState::default(),
            canvas: Canvas::new(),
            pending: None,
            store,
            downloads,
            schemas: None,
            events: None,
        }
    }

    /// Publish state changes on an event bus.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Use an agent-config collaborator for node settings.
    pub fn with_schemas(mut self, schemas: Arc<dyn SettingsSchemaSource>) -> Self {
        self.schemas = Some(schemas);
        self
    }

    /// Start from an existing document instead of an empty one.
    pub fn with_document(mut self, document: WorkflowDocument) -> Result<Self> {
        document.validate()?;
        self.document = document;
        Ok(self)
    }

    /// Fetch the catalog and become ready.
    pub async fn init(&mut self, source: &dyn CatalogSource) -> Result<Outcome> {
        let catalog = load_catalog(source).await;
        self.dispatch(Intent::CatalogLoaded(catalog))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn document(&self) -> &WorkflowDocument {
        &self.document
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn selected_node(&self) -> Option<&NodeRecord> {
        self.selection.as_deref().and_then(|id| self.document.node(id))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn templates_visible(&self) -> bool {
        self.templates_visible
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn palette(&self) -> Palette<'_> {
        Palette::new(&self.catalog, &self.palette)
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// For layout only (bounds); state changes go through `dispatch`.
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn store(&self) -> &dyn WorkflowStore {
        self.store.as_ref()
    }

    pub fn node_views(&self) -> Vec<NodeView> {
        self.canvas.node_views(&self.document, self.selection())
    }

    pub fn edge_paths(&self) -> Vec<EdgePath> {
        self.canvas.edge_paths(&self.document)
    }

    /// Form for the selected node, if any.
    pub fn property_panel(&self) -> Option<PropertyPanel<'_>> {
        let node = self.selected_node()?;
        let schema = match (&self.schemas, &node.category_id) {
            (Some(source), Some(category)) => source.schema_for(category),
            _ => None,
        };
        Some(PropertyPanel::new(node, schema))
    }

    fn publish(&self, event: DesignerEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }

    fn ignored(reason: impl Into<String>) -> Outcome {
        let reason = reason.into();
        debug!(reason = %reason, "Intent ignored");
        Outcome::Ignored(reason)
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Apply one intent.
    pub fn dispatch(&mut self, intent: Intent) -> Result<Outcome> {
        if self.phase == Phase::Init {
            return match intent {
                Intent::CatalogLoaded(catalog) => Ok(self.catalog_loaded(catalog)),
                _ => Ok(Self::ignored("designer is still loading the catalog")),
            };
        }

        match intent {
            Intent::CatalogLoaded(_) => Ok(Self::ignored("catalog is fetched only once")),
            Intent::SetSearch(term) => {
                self.search_term = term;
                Ok(Outcome::Changed)
            }
            Intent::ToggleCategory(category_id) => {
                self.palette.toggle(&category_id);
                Ok(Outcome::Changed)
            }
            Intent::Drop { transfer, client } => Ok(self.drop_agent(&transfer, client)),
            Intent::SelectNode(node_id) => Ok(self.select(node_id)),
            Intent::ClickPane => Ok(self.deselect()),
            Intent::UpdateNode(node) => Ok(self.update_node(node)),
            Intent::DeleteNode(node_id) => {
                if !self.document.contains_node(&node_id) {
                    return Ok(Self::ignored(format!("no node '{}' to delete", node_id)));
                }
                Ok(self.request_confirmation(PendingAction::DeleteNode(node_id)))
            }
            Intent::ConnectNodes { source, target } => Ok(self.connect(source, target)),
            Intent::DeleteEdge(edge_id) => Ok(self.delete_edge(&edge_id)),
            Intent::PointerDown(client) => {
                let action = self.canvas.pointer_down(&self.document, client);
                Ok(self.apply_canvas_action(action))
            }
            Intent::PointerMove(client) => {
                let action = self.canvas.pointer_move(client);
                Ok(self.apply_canvas_action(action))
            }
            Intent::PointerUp(client) => {
                let action = self.canvas.pointer_up(&self.document, client);
                Ok(self.apply_canvas_action(action))
            }
            Intent::Wheel { delta_y } => {
                self.canvas.viewport.wheel(delta_y);
                Ok(Outcome::Changed)
            }
            Intent::ZoomIn => {
                self.canvas.viewport.zoom_in();
                Ok(Outcome::Changed)
            }
            Intent::ZoomOut => {
                self.canvas.viewport.zoom_out();
                Ok(Outcome::Changed)
            }
            Intent::ResetView => {
                self.canvas.viewport.reset();
                Ok(Outcome::Changed)
            }
            Intent::Save => self.save(),
            Intent::Export => {
                let file = toolbar::export(&self.document, self.downloads.as_ref())?;
                self.publish(DesignerEvent::Exported { file: file.clone() });
                Ok(Outcome::Exported { file })
            }
            Intent::Load(document) => self.load(document),
            Intent::Test => {
                let message = "Test runs are not available in the editor yet".to_string();
                info!(workflow = %self.document.id, "Test run requested");
                self.publish(DesignerEvent::Notice {
                    message: message.clone(),
                });
                Ok(Outcome::Notice(message))
            }
            Intent::Clear => Ok(self.request_confirmation(PendingAction::Clear)),
            Intent::ToggleTemplates => {
                self.templates_visible = !self.templates_visible;
                Ok(Outcome::Changed)
            }
            Intent::Confirm => Ok(self.confirm()),
            Intent::Cancel => match self.pending.take() {
                Some(_) => Ok(Outcome::Changed),
                None => Ok(Self::ignored("nothing to cancel")),
            },
        }
    }

    fn catalog_loaded(&mut self, catalog: Catalog) -> Outcome {
        info!(
            agents = catalog.agents.len(),
            categories = catalog.categories.len(),
            "Designer ready"
        );
        self.publish(DesignerEvent::CatalogLoaded {
            agents: catalog.agents.len(),
            categories: catalog.categories.len(),
        });
        self.catalog = catalog;
        self.phase = Phase::Ready;
        Outcome::Changed
    }

    fn drop_agent(&mut self, transfer: &DragTransfer, client: Position) -> Outcome {
        let agent = match transfer.agent() {
            Ok(agent) => agent,
            Err(e) => {
                warn!(error = %e, "Drop ignored");
                return Outcome::Ignored(e.to_string());
            }
        };

        let position = self.canvas.drop_position(client);
        if !position.is_finite() {
            return Self::ignored("drop position is not finite");
        }

        let node = NodeRecord::from_agent(&agent, position);
        debug!(node_id = %node.id, agent_id = %agent.agent_id, "Node added from drop");
        self.publish(DesignerEvent::NodeAdded {
            node_id: node.id.clone(),
        });
        self.document.nodes.push(node);
        self.mark_dirty();
        Outcome::Changed
    }

    fn select(&mut self, node_id: String) -> Outcome {
        if !self.document.contains_node(&node_id) {
            return Self::ignored(format!("no node '{}' to select", node_id));
        }
        if self.selection.as_deref() == Some(node_id.as_str()) {
            return Outcome::Unchanged;
        }
        self.publish(DesignerEvent::SelectionChanged {
            node_id: Some(node_id.clone()),
        });
        self.selection = Some(node_id);
        Outcome::Changed
    }

    fn deselect(&mut self) -> Outcome {
        if self.selection.take().is_none() {
            return Outcome::Unchanged;
        }
        self.publish(DesignerEvent::SelectionChanged { node_id: None });
        Outcome::Changed
    }

    fn update_node(&mut self, node: NodeRecord) -> Outcome {
        if !node.position.is_finite() {
            return Self::ignored(format!("node '{}' has a non-finite position", node.id));
        }
        let Some(slot) = self.document.nodes.iter_mut().find(|n| n.id == node.id) else {
            return Self::ignored(format!("no node '{}' to update", node.id));
        };
        if *slot == node {
            return Outcome::Unchanged;
        }
        let node_id = node.id.clone();
        *slot = node;
        self.publish(DesignerEvent::NodeUpdated { node_id });
        self.mark_dirty();
        Outcome::Changed
    }

    fn move_node(&mut self, node_id: &str, position: Position) -> Outcome {
        let Some(node) = self.document.node(node_id) else {
            return Self::ignored(format!("no node '{}' to move", node_id));
        };
        let mut moved = node.clone();
        moved.position = position;
        self.update_node(moved)
    }

    fn connect(&mut self, source: String, target: String) -> Outcome {
        if source == target {
            return Self::ignored("a node cannot connect to itself");
        }
        for endpoint in [&source, &target] {
            if !self.document.contains_node(endpoint) {
                return Self::ignored(format!("no node '{}' to connect", endpoint));
            }
        }
        if self.document.has_edge(&source, &target) {
            return Self::ignored(format!("'{}' is already connected to '{}'", source, target));
        }

        let edge = EdgeRecord::new(source, target);
        debug!(edge_id = %edge.id, "Edge added");
        self.publish(DesignerEvent::EdgeAdded {
            edge_id: edge.id.clone(),
        });
        self.document.edges.push(edge);
        self.mark_dirty();
        Outcome::Changed
    }

    fn delete_edge(&mut self, edge_id: &str) -> Outcome {
        let before = self.document.edges.len();
        self.document.edges.retain(|e| e.id != edge_id);
        if self.document.edges.len() == before {
            return Self::ignored(format!("no edge '{}' to delete", edge_id));
        }
        self.publish(DesignerEvent::EdgeDeleted {
            edge_id: edge_id.to_string(),
        });
        self.mark_dirty();
        Outcome::Changed
    }

    fn apply_canvas_action(&mut self, action: CanvasAction) -> Outcome {
        match action {
            CanvasAction::None => Outcome::Unchanged,
            CanvasAction::Select(node_id) => self.select(node_id),
            CanvasAction::ClickPane => self.deselect(),
            CanvasAction::MoveNode { node_id, position } => self.move_node(&node_id, position),
            CanvasAction::Connect { source, target } => self.connect(source, target),
        }
    }

    fn request_confirmation(&mut self, action: PendingAction) -> Outcome {
        debug!(action = ?action, "Confirmation requested");
        self.pending = Some(action.clone());
        Outcome::ConfirmationRequired(action)
    }

    fn confirm(&mut self) -> Outcome {
        match self.pending.take() {
            None => Self::ignored("nothing to confirm"),
            Some(PendingAction::DeleteNode(node_id)) => self.delete_node(&node_id),
            Some(PendingAction::Clear) => {
                self.document.clear();
                self.selection = None;
                self.dirty = false;
                self.canvas.cancel_gesture();
                info!(workflow = %self.document.id, "Workflow cleared");
                self.publish(DesignerEvent::Cleared);
                Outcome::Changed
            }
        }
    }

    fn delete_node(&mut self, node_id: &str) -> Outcome {
        let edges_before = self.document.edges.len();
        if self.document.remove_node(node_id).is_none() {
            return Self::ignored(format!("node '{}' no longer exists", node_id));
        }
        let edges_removed = edges_before - self.document.edges.len();

        self.selection = None;
        self.canvas.cancel_gesture();
        self.mark_dirty();
        info!(node_id, edges_removed, "Node deleted");
        self.publish(DesignerEvent::NodeDeleted {
            node_id: node_id.to_string(),
            edges_removed,
        });
        Outcome::Changed
    }

    fn save(&mut self) -> Result<Outcome> {
        let receipt = toolbar::save(&self.document, self.store.as_ref(), self.downloads.as_ref())?;
        self.dirty = false;
        self.publish(DesignerEvent::Saved {
            key: receipt.key.clone(),
            file: receipt.file.clone(),
        });
        Ok(Outcome::Saved {
            key: receipt.key,
            file: receipt.file,
        })
    }

    fn load(&mut self, document: WorkflowDocument) -> Result<Outcome> {
        document.validate()?;
        info!(workflow = %document.id, nodes = document.nodes.len(), "Workflow loaded");
        self.publish(DesignerEvent::Loaded {
            workflow_id: document.id.clone(),
        });
        self.document = document;
        self.selection = None;
        self.pending = None;
        self.dirty = false;
        self.canvas.cancel_gesture();
        Ok(Outcome::Changed)
    }
}

impl std::fmt::Debug for Designer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Designer")
            .field("phase", &self.phase)
            .field("workflow", &self.document.id)
            .field("nodes", &self.document.nodes.len())
            .field("edges", &self.document.edges.len())
            .field("selection", &self.selection)
            .field("dirty", &self.dirty)
            .finish()
    }
}

//! Canvas: viewport, pointer gestures, drops, and edge geometry.
//!
//! Pointer positions handed to the canvas are client coordinates; the canvas
//! subtracts its own bounds before doing anything else. A gesture exists only
//! between pointer-down and pointer-up, and moves outside a gesture are ignored.

use tracing::debug;

use flowdeck_core::types::{Position, WorkflowDocument};

use crate::node::{self, NodeView, NODE_HEIGHT, NODE_WIDTH};
use crate::viewport::Viewport;

/// Half-size of the square hit area around a port, in screen units.
pub const PORT_HIT_SLOP: f64 = 12.0;
/// Pointer travel below which a background press still counts as a click.
pub const CLICK_SLOP: f64 = 3.0;

/// Screen rectangle occupied by the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// What lies under a canvas-local point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    OutputPort(String),
    InputPort(String),
    Node(String),
    Background,
}

/// Document-level consequence of a pointer event.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasAction {
    None,
    Select(String),
    ClickPane,
    MoveNode { node_id: String, position: Position },
    Connect { source: String, target: String },
}

#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Pan {
        start: Position,
        start_offset: Position,
        moved: bool,
    },
    Move {
        node_id: String,
        start: Position,
        start_position: Position,
    },
    Connect {
        source: String,
        pointer: Position,
    },
}

/// A connector in canvas-local screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePath {
    pub edge_id: String,
    pub from: Position,
    pub to: Position,
}

#[derive(Debug, Clone, Default)]
pub struct Canvas {
    pub viewport: Viewport,
    bounds: Rect,
    gesture: Option<Gesture>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    /// Whether a pointer gesture is in progress.
    pub fn gesture_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Source node and pointer of an in-progress connect drag.
    pub fn pending_connection(&self) -> Option<(&str, Position)> {
        match &self.gesture {
            Some(Gesture::Connect { source, pointer }) => Some((source.as_str(), *pointer)),
            _ => None,
        }
    }

    fn local(&self, client: Position) -> Position {
        Position::new(client.x - self.bounds.x, client.y - self.bounds.y)
    }

    pub fn node_views(&self, doc: &WorkflowDocument, selection: Option<&str>) -> Vec<NodeView> {
        doc.nodes
            .iter()
            .map(|n| NodeView::new(n, &self.viewport, selection))
            .collect()
    }

    /// Hit test at a canvas-local point. Later nodes are on top.
    pub fn hit_test(&self, doc: &WorkflowDocument, local: Position) -> Hit {
        let near = |a: Position, b: Position| {
            (a.x - b.x).abs() <= PORT_HIT_SLOP && (a.y - b.y).abs() <= PORT_HIT_SLOP
        };

        for node in doc.nodes.iter().rev() {
            let view = NodeView::new(node, &self.viewport, None);
            if near(local, view.output_port()) {
                return Hit::OutputPort(node.id.clone());
            }
            if near(local, view.input_port()) {
                return Hit::InputPort(node.id.clone());
            }
            if view.contains(local) {
                return Hit::Node(node.id.clone());
            }
        }
        Hit::Background
    }

    pub fn pointer_down(&mut self, doc: &WorkflowDocument, client: Position) -> CanvasAction {
        let local = self.local(client);
        match self.hit_test(doc, local) {
            Hit::OutputPort(source) => {
                debug!(source = %source, "Connect gesture started");
                self.gesture = Some(Gesture::Connect {
                    source,
                    pointer: local,
                });
                CanvasAction::None
            }
            Hit::InputPort(node_id) | Hit::Node(node_id) => {
                let start_position = doc
                    .node(&node_id)
                    .map(|n| n.position)
                    .unwrap_or_default();
                self.gesture = Some(Gesture::Move {
                    node_id: node_id.clone(),
                    start: local,
                    start_position,
                });
                // Handled by the node; the pane never sees this press.
                CanvasAction::Select(node_id)
            }
            Hit::Background => {
                self.gesture = Some(Gesture::Pan {
                    start: local,
                    start_offset: self.viewport.offset,
                    moved: false,
                });
                CanvasAction::None
            }
        }
    }

    pub fn pointer_move(&mut self, client: Position) -> CanvasAction {
        let local = self.local(client);
        let zoom = self.viewport.zoom();
        match &mut self.gesture {
            None => CanvasAction::None,
            Some(Gesture::Pan {
                start,
                start_offset,
                moved,
            }) => {
                let dx = local.x - start.x;
                let dy = local.y - start.y;
                if dx.abs() > CLICK_SLOP || dy.abs() > CLICK_SLOP {
                    *moved = true;
                }
                self.viewport.offset = Position::new(start_offset.x + dx, start_offset.y + dy);
                CanvasAction::None
            }
            Some(Gesture::Move {
                node_id,
                start,
                start_position,
            }) => {
                let position = Position::new(
                    start_position.x + (local.x - start.x) / zoom,
                    start_position.y + (local.y - start.y) / zoom,
                );
                CanvasAction::MoveNode {
                    node_id: node_id.clone(),
                    position,
                }
            }
            Some(Gesture::Connect { pointer, .. }) => {
                *pointer = local;
                CanvasAction::None
            }
        }
    }

    pub fn pointer_up(&mut self, doc: &WorkflowDocument, client: Position) -> CanvasAction {
        let local = self.local(client);
        match self.gesture.take() {
            None | Some(Gesture::Move { .. }) => CanvasAction::None,
            Some(Gesture::Pan { moved, .. }) => {
                if moved {
                    CanvasAction::None
                } else {
                    CanvasAction::ClickPane
                }
            }
            Some(Gesture::Connect { source, .. }) => match self.hit_test(doc, local) {
                Hit::InputPort(target) | Hit::Node(target) | Hit::OutputPort(target)
                    if target != source =>
                {
                    CanvasAction::Connect { source, target }
                }
                _ => {
                    debug!(source = %source, "Connect gesture dropped on nothing");
                    CanvasAction::None
                }
            },
        }
    }

    /// Abandon any in-progress gesture.
    pub fn cancel_gesture(&mut self) {
        self.gesture = None;
    }

    /// Document position for a node dropped at `client`, centered under the pointer.
    pub fn drop_position(&self, client: Position) -> Position {
        let local = self.local(client);
        let centered = Position::new(local.x - NODE_WIDTH / 2.0, local.y - NODE_HEIGHT / 2.0);
        self.viewport.screen_to_doc(centered)
    }

    /// Connector geometry for every edge whose endpoints both exist.
    pub fn edge_paths(&self, doc: &WorkflowDocument) -> Vec<EdgePath> {
        doc.edges
            .iter()
            .filter_map(|edge| {
                let source = doc.node(&edge.source)?;
                let target = doc.node(&edge.target)?;
                Some(EdgePath {
                    edge_id: edge.id.clone(),
                    from: self.viewport.doc_to_screen(node::output_anchor(source)),
                    to: self.viewport.doc_to_screen(node::input_anchor(target)),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdeck_core::types::{EdgeRecord, NodeRecord, NodeType};

    fn two_nodes() -> WorkflowDocument {
        let mut doc = WorkflowDocument::new("Canvas");
        doc.nodes
            .push(NodeRecord::new("n1", NodeType::Agent, "One", Position::new(0.0, 0.0)));
        doc.nodes
            .push(NodeRecord::new("n2", NodeType::Agent, "Two", Position::new(400.0, 0.0)));
        doc
    }

    #[test]
    fn test_pan_applies_cumulative_delta() {
        let doc = two_nodes();
        let mut canvas = Canvas::new();
        canvas.set_bounds(Rect::new(100.0, 100.0, 800.0, 600.0));

        let down = Position::new(200.0, 400.0);
        assert_eq!(canvas.pointer_down(&doc, down), CanvasAction::None);
        assert!(canvas.gesture_active());
        canvas.pointer_move(Position::new(210.0, 405.0));
        canvas.pointer_move(Position::new(250.0, 430.0));
        assert_eq!(canvas.viewport.offset, Position::new(50.0, 30.0));

        assert_eq!(canvas.pointer_up(&doc, Position::new(250.0, 430.0)), CanvasAction::None);
        assert!(!canvas.gesture_active());

        // No gesture, no effect.
        canvas.pointer_move(Position::new(900.0, 900.0));
        assert_eq!(canvas.viewport.offset, Position::new(50.0, 30.0));
    }

    #[test]
    fn test_background_click_deselects() {
        let doc = two_nodes();
        let mut canvas = Canvas::new();
        let p = Position::new(300.0, 500.0);
        canvas.pointer_down(&doc, p);
        assert_eq!(canvas.pointer_up(&doc, p), CanvasAction::ClickPane);
    }

    #[test]
    fn test_node_press_selects_and_drags_in_doc_space() {
        let doc = two_nodes();
        let mut canvas = Canvas::new();
        canvas.viewport.set_zoom(2.0);

        let action = canvas.pointer_down(&doc, Position::new(100.0, 40.0));
        assert_eq!(action, CanvasAction::Select("n1".into()));

        let action = canvas.pointer_move(Position::new(140.0, 60.0));
        assert_eq!(
            action,
            CanvasAction::MoveNode {
                node_id: "n1".into(),
                position: Position::new(20.0, 10.0),
            }
        );
        assert_eq!(canvas.pointer_up(&doc, Position::new(140.0, 60.0)), CanvasAction::None);
    }

    #[test]
    fn test_port_drag_connects_nodes() {
        let doc = two_nodes();
        let mut canvas = Canvas::new();
        // n1 output port sits at (250, 40).
        assert_eq!(
            canvas.hit_test(&doc, Position::new(248.0, 44.0)),
            Hit::OutputPort("n1".into())
        );
        canvas.pointer_down(&doc, Position::new(248.0, 44.0));
        assert!(canvas.pending_connection().is_some());
        canvas.pointer_move(Position::new(390.0, 40.0));

        let action = canvas.pointer_up(&doc, Position::new(402.0, 40.0));
        assert_eq!(
            action,
            CanvasAction::Connect {
                source: "n1".into(),
                target: "n2".into(),
            }
        );
    }

    #[test]
    fn test_connect_released_on_self_or_background_does_nothing() {
        let doc = two_nodes();
        let mut canvas = Canvas::new();
        canvas.pointer_down(&doc, Position::new(250.0, 40.0));
        assert_eq!(canvas.pointer_up(&doc, Position::new(120.0, 40.0)), CanvasAction::None);

        canvas.pointer_down(&doc, Position::new(250.0, 40.0));
        assert_eq!(canvas.pointer_up(&doc, Position::new(800.0, 700.0)), CanvasAction::None);
    }

    #[test]
    fn test_drop_position_is_document_space() {
        let mut canvas = Canvas::new();
        canvas.set_bounds(Rect::new(50.0, 20.0, 800.0, 600.0));
        canvas.viewport = Viewport::new(Position::new(-100.0, 40.0), 0.5);

        // local (300, 200) -> centered (175, 160) -> doc ((175+100)/0.5, (160-40)/0.5)
        let dropped = canvas.drop_position(Position::new(350.0, 220.0));
        assert_eq!(dropped, Position::new(550.0, 240.0));
    }

    #[test]
    fn test_edge_paths_use_anchors_and_skip_stale_edges() {
        let mut doc = two_nodes();
        doc.edges.push(EdgeRecord::new("n1", "n2"));
        doc.edges.push(EdgeRecord::new("n1", "ghost"));

        let mut canvas = Canvas::new();
        canvas.viewport = Viewport::new(Position::new(10.0, 0.0), 1.0);
        let paths = canvas.edge_paths(&doc);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].from, Position::new(260.0, 40.0));
        assert_eq!(paths[0].to, Position::new(410.0, 40.0));
    }

    #[test]
    fn test_topmost_node_wins() {
        let mut doc = WorkflowDocument::new("Stack");
        doc.nodes
            .push(NodeRecord::new("below", NodeType::Agent, "B", Position::new(0.0, 0.0)));
        doc.nodes
            .push(NodeRecord::new("above", NodeType::Agent, "A", Position::new(50.0, 10.0)));
        let canvas = Canvas::new();
        assert_eq!(canvas.hit_test(&doc, Position::new(100.0, 30.0)), Hit::Node("above".into()));
    }
}

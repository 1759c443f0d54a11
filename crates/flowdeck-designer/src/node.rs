use flowdeck_core::types::{NodeRecord, NodeType, Position};

use crate::viewport::Viewport;

/// Document-space width of a node.
pub const NODE_WIDTH: f64 = 250.0;
/// Document-space height of a node.
pub const NODE_HEIGHT: f64 = 80.0;

/// Presentation of a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStyle {
    /// RGB accent color.
    pub color: (u8, u8, u8),
    pub icon: &'static str,
    pub title: &'static str,
}

const AGENT_STYLE: NodeStyle = NodeStyle {
    color: (59, 130, 246),
    icon: "◆",
    title: "Agent",
};

impl NodeStyle {
    /// Style keyed by node type; unrecognized types look like agents.
    pub fn for_type(node_type: &NodeType) -> Self {
        match node_type {
            NodeType::Agent | NodeType::Other(_) => AGENT_STYLE,
            NodeType::Trigger => Self {
                color: (34, 197, 94),
                icon: "▶",
                title: "Trigger",
            },
            NodeType::Condition => Self {
                color: (234, 179, 8),
                icon: "◇",
                title: "Condition",
            },
            NodeType::Aggregator => Self {
                color: (168, 85, 247),
                icon: "Σ",
                title: "Aggregator",
            },
            NodeType::Transformer => Self {
                color: (249, 115, 22),
                icon: "⇄",
                title: "Transformer",
            },
            NodeType::Output => Self {
                color: (239, 68, 68),
                icon: "■",
                title: "Output",
            },
        }
    }
}

/// A node positioned on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub id: String,
    pub label: String,
    pub subtitle: Option<String>,
    pub style: NodeStyle,
    /// Screen-space top-left corner.
    pub origin: Position,
    pub width: f64,
    pub height: f64,
    pub selected: bool,
}

impl NodeView {
    pub fn new(node: &NodeRecord, viewport: &Viewport, selection: Option<&str>) -> Self {
        let zoom = viewport.zoom();
        Self {
            id: node.id.clone(),
            label: node.label.clone(),
            subtitle: node.category_name.clone(),
            style: NodeStyle::for_type(&node.node_type),
            origin: viewport.doc_to_screen(node.position),
            width: NODE_WIDTH * zoom,
            height: NODE_HEIGHT * zoom,
            selected: selection == Some(node.id.as_str()),
        }
    }

    pub fn contains(&self, p: Position) -> bool {
        p.x >= self.origin.x
            && p.x <= self.origin.x + self.width
            && p.y >= self.origin.y
            && p.y <= self.origin.y + self.height
    }

    /// Screen position of the incoming-edge port (left-center).
    pub fn input_port(&self) -> Position {
        Position::new(self.origin.x, self.origin.y + self.height / 2.0)
    }

    /// Screen position of the outgoing-edge port (right-center).
    pub fn output_port(&self) -> Position {
        Position::new(self.origin.x + self.width, self.origin.y + self.height / 2.0)
    }
}

/// Document-space right-center anchor, where outgoing edges start.
pub fn output_anchor(node: &NodeRecord) -> Position {
    Position::new(
        node.position.x + NODE_WIDTH,
        node.position.y + NODE_HEIGHT / 2.0,
    )
}

/// Document-space left-center anchor, where incoming edges end.
pub fn input_anchor(node: &NodeRecord) -> Position {
    Position::new(node.position.x, node.position.y + NODE_HEIGHT / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_falls_back_to_agent() {
        let style = NodeStyle::for_type(&NodeType::Other("webhook".into()));
        assert_eq!(style, NodeStyle::for_type(&NodeType::Agent));
        assert_ne!(style, NodeStyle::for_type(&NodeType::Trigger));
    }

    #[test]
    fn test_view_is_placed_through_viewport() {
        let node = NodeRecord::new("n1", NodeType::Output, "Out", Position::new(100.0, 50.0));
        let vp = Viewport::new(Position::new(10.0, 20.0), 0.5);
        let view = NodeView::new(&node, &vp, None);
        assert_eq!(view.origin, Position::new(60.0, 45.0));
        assert_eq!(view.width, 125.0);
        assert_eq!(view.height, 40.0);
        assert_eq!(view.output_port(), Position::new(185.0, 65.0));
        assert_eq!(view.input_port(), Position::new(60.0, 65.0));
        assert!(!view.selected);
    }

    #[test]
    fn test_selection_only_compares_ids() {
        let node = NodeRecord::new("n1", NodeType::Agent, "A", Position::default());
        let vp = Viewport::default();
        assert!(NodeView::new(&node, &vp, Some("n1")).selected);
        assert!(!NodeView::new(&node, &vp, Some("n2")).selected);
    }
}

//! Workflow designer: the interactive graph editor.
//!
//! The [`Designer`] owns the workflow document and accepts every change as an
//! [`Intent`] through [`Designer::dispatch`]. The other modules are the parts
//! it wires together:
//!
//! - [`palette`] groups and searches the agent catalog and starts drags.
//! - [`canvas`] owns the pan/zoom viewport, pointer gestures and drops.
//! - [`node`] turns node records into positioned, styled views.
//! - [`property_panel`] binds form fields to the selected node.
//! - [`toolbar`] implements save, export and load.
//! - [`viewport`] holds the screen/document coordinate math.

pub mod canvas;
pub mod designer;
pub mod node;
pub mod palette;
pub mod property_panel;
pub mod toolbar;
pub mod transfer;
pub mod viewport;

pub use canvas::{Canvas, CanvasAction, EdgePath, Hit, Rect};
pub use designer::{load_catalog, Designer, Intent, Outcome, PendingAction, Phase};
pub use node::{NodeStyle, NodeView};
pub use palette::{Palette, PaletteState, PaletteView};
pub use property_panel::{Field, FieldView, PropertyPanel};
pub use toolbar::ToolbarCommand;
pub use transfer::DragTransfer;
pub use viewport::{Transform, Viewport};

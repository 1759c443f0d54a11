//! Agent palette: grouped catalog view, search, and drag sources.
//!
//! The catalog itself is owned by the [`crate::Designer`]; a [`Palette`] is a
//! borrowed view over it plus the per-category expand state.

use std::collections::HashSet;

use flowdeck_core::error::Result;
use flowdeck_core::types::{Agent, Catalog};

use crate::transfer::DragTransfer;

/// Expand/collapse state per category. Categories start expanded.
#[derive(Debug, Clone, Default)]
pub struct PaletteState {
    collapsed: HashSet<String>,
}

impl PaletteState {
    /// Flip one category. Returns whether it is now expanded.
    pub fn toggle(&mut self, category_id: &str) -> bool {
        if self.collapsed.remove(category_id) {
            true
        } else {
            self.collapsed.insert(category_id.to_string());
            false
        }
    }

    pub fn is_expanded(&self, category_id: &str) -> bool {
        !self.collapsed.contains(category_id)
    }
}

/// One category with its agents.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGroup<'a> {
    pub category_id: &'a str,
    pub category_name: &'a str,
    pub agents: Vec<&'a Agent>,
    pub expanded: bool,
}

/// What the palette shows for the current search term.
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteView<'a> {
    /// No agents or no categories to show.
    Empty,
    Grouped(Vec<CategoryGroup<'a>>),
    Results(Vec<&'a Agent>),
}

pub struct Palette<'a> {
    catalog: &'a Catalog,
    state: &'a PaletteState,
}

impl<'a> Palette<'a> {
    pub fn new(catalog: &'a Catalog, state: &'a PaletteState) -> Self {
        Self { catalog, state }
    }

    /// Agents grouped by category, in catalog category order.
    ///
    /// Agents whose category is not listed are left out; search still finds them.
    pub fn list(&self) -> Vec<CategoryGroup<'a>> {
        self.catalog
            .categories
            .iter()
            .filter_map(|category| {
                let agents: Vec<&Agent> = self
                    .catalog
                    .agents
                    .iter()
                    .filter(|a| a.category_id == category.category_id)
                    .collect();
                if agents.is_empty() {
                    return None;
                }
                Some(CategoryGroup {
                    category_id: &category.category_id,
                    category_name: &category.category_name,
                    agents,
                    expanded: self.state.is_expanded(&category.category_id),
                })
            })
            .collect()
    }

    /// Case-insensitive match on agent name, category name, or any capability.
    pub fn search(&self, term: &str) -> Vec<&'a Agent> {
        let term = term.trim().to_lowercase();
        self.catalog
            .agents
            .iter()
            .filter(|a| {
                a.agent_name.to_lowercase().contains(&term)
                    || a.category_name.to_lowercase().contains(&term)
                    || a
                        .capabilities
                        .iter()
                        .any(|c| c.to_lowercase().contains(&term))
            })
            .collect()
    }

    /// Grouped view for an empty term, flat results otherwise.
    pub fn view(&self, term: &str) -> PaletteView<'a> {
        if self.catalog.agents.is_empty() {
            return PaletteView::Empty;
        }
        if term.trim().is_empty() {
            if self.catalog.categories.is_empty() {
                return PaletteView::Empty;
            }
            PaletteView::Grouped(self.list())
        } else {
            PaletteView::Results(self.search(term))
        }
    }
}

/// Begin dragging an agent: the whole record becomes the payload.
pub fn drag_start(agent: &Agent) -> Result<DragTransfer> {
    DragTransfer::for_agent(agent)
}

use std::path::Path;
use std::sync::Arc;

use crossterm::event::{KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use tokio::sync::oneshot;
use tracing::{info, warn};

use flowdeck_core::event::EventBus;
use flowdeck_core::traits::{CatalogSource, TemplateGallery};
use flowdeck_core::types::{Agent, DesignerEvent, Position};
use flowdeck_designer::palette::drag_start;
use flowdeck_designer::{
    load_catalog, toolbar, Designer, DragTransfer, Field, Intent, Outcome, PaletteView, Phase,
    Rect as CanvasRect, ToolbarCommand,
};

use crate::event::{EventLoop, TuiEvent};
use crate::input::{command_for_key, InputAction, InputHandler, KeyCommand};
use crate::ui::{self, Panes};

/// Screen units covered by one terminal column.
pub const CELL_WIDTH: f64 = 10.0;
/// Screen units covered by one terminal row.
pub const CELL_HEIGHT: f64 = 20.0;

/// Screen position of a terminal cell's top-left corner.
pub fn cell_to_screen(column: u16, row: u16) -> Position {
    Position::new(column as f64 * CELL_WIDTH, row as f64 * CELL_HEIGHT)
}

pub(crate) fn hit(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.x + area.width && row >= area.y && row < area.y + area.height
}

/// What the bottom input line is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Search,
    Edit(Field),
    OpenPath,
}

/// One line of the palette pane.
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteRow {
    Header {
        category_id: String,
        name: String,
        count: usize,
        expanded: bool,
    },
    Agent(Agent),
    Notice(String),
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    ticks_left: usize,
}

const STATUS_TICKS: usize = 50;

/// Application state.
pub struct App {
    pub designer: Designer,
    pub gallery: Arc<dyn TemplateGallery>,
    pub input: InputHandler,
    pub mode: Mode,
    pub panes: Panes,
    /// Index into the editable rows of the property pane.
    pub field_cursor: usize,
    pub template_cursor: usize,
    /// Palette drag in flight, with the last pointer cell.
    pub drag: Option<(DragTransfer, u16, u16)>,
    pub status: Option<StatusMessage>,
    pub should_quit: bool,
}

impl App {
    pub fn new(designer: Designer, gallery: Arc<dyn TemplateGallery>) -> Self {
        Self {
            designer,
            gallery,
            input: InputHandler::new(),
            mode: Mode::Normal,
            panes: Panes::default(),
            field_cursor: 0,
            template_cursor: 0,
            drag: None,
            status: None,
            should_quit: false,
        }
    }

    /// Recompute pane geometry and tell the canvas where it sits.
    pub fn resize(&mut self, area: Rect) {
        self.panes = ui::layout(area);
        let canvas = self.panes.canvas;
        let origin = cell_to_screen(canvas.x, canvas.y);
        self.designer.canvas_mut().set_bounds(CanvasRect::new(
            origin.x,
            origin.y,
            canvas.width as f64 * CELL_WIDTH,
            canvas.height as f64 * CELL_HEIGHT,
        ));
    }

    pub fn notify(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
            ticks_left: STATUS_TICKS,
        });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: true,
            ticks_left: STATUS_TICKS,
        });
    }

    pub fn tick(&mut self) {
        if let Some(status) = &mut self.status {
            status.ticks_left = status.ticks_left.saturating_sub(1);
            if status.ticks_left == 0 {
                self.status = None;
            }
        }
    }

    /// Dispatch an intent and surface failures. Successes are reported
    /// through the event bus.
    pub fn apply(&mut self, intent: Intent) -> Option<Outcome> {
        let selection_before = self.designer.selection().map(str::to_string);
        let result = self.designer.dispatch(intent);
        if self.designer.selection() != selection_before.as_deref() {
            self.field_cursor = 0;
        }
        match result {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "Designer command failed");
                self.error(e.to_string());
                None
            }
        }
    }

    pub fn palette_rows(&self) -> Vec<PaletteRow> {
        let palette = self.designer.palette();
        match palette.view(self.designer.search_term()) {
            PaletteView::Empty => {
                let text = if self.designer.phase() == Phase::Init {
                    "Loading catalog..."
                } else {
                    "No agents available"
                };
                vec![PaletteRow::Notice(text.to_string())]
            }
            PaletteView::Results(agents) if agents.is_empty() => {
                vec![PaletteRow::Notice("No matching agents".to_string())]
            }
            PaletteView::Results(agents) => {
                agents.into_iter().cloned().map(PaletteRow::Agent).collect()
            }
            PaletteView::Grouped(groups) => {
                let mut rows = Vec::new();
                for group in groups {
                    rows.push(PaletteRow::Header {
                        category_id: group.category_id.to_string(),
                        name: group.category_name.to_string(),
                        count: group.agents.len(),
                        expanded: group.expanded,
                    });
                    if group.expanded {
                        rows.extend(group.agents.into_iter().cloned().map(PaletteRow::Agent));
                    }
                }
                rows
            }
        }
    }

    /// Editable fields of the selected node, in display order.
    pub fn editable_fields(&self) -> Vec<Field> {
        self.designer
            .property_panel()
            .map(|panel| panel.fields().into_iter().filter_map(|row| row.field).collect())
            .unwrap_or_default()
    }

    fn begin_edit(&mut self, field: Field) {
        let Some(value) = self
            .designer
            .property_panel()
            .map(|panel| panel.value_of(&field))
        else {
            return;
        };
        self.input.set(value);
        self.mode = Mode::Edit(field);
    }

    fn commit_edit(&mut self, field: &Field, raw: &str) {
        let intent = match self.designer.property_panel() {
            Some(panel) => panel.edit(field, raw),
            None => return,
        };
        self.apply(intent);
    }

    fn delete_selected(&mut self) {
        let intent = match self.designer.property_panel() {
            Some(panel) => panel.delete_request(),
            None => return,
        };
        self.apply(intent);
    }

    pub fn run_toolbar(&mut self, command: ToolbarCommand) {
        match command.intent() {
            Some(intent) => {
                self.template_cursor = 0;
                self.apply(intent);
            }
            None => {
                self.input.clear();
                self.mode = Mode::OpenPath;
            }
        }
    }

    fn open_file(&mut self, path: &str) {
        let path = path.trim();
        if path.is_empty() {
            return;
        }
        match toolbar::load_from_file(Path::new(path)) {
            Ok(doc) => {
                self.apply(Intent::Load(doc));
            }
            Err(e) => {
                warn!(path, error = %e, "Could not open workflow");
                self.error(format!("Could not open {}: {}", path, e));
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.designer.pending().is_some() {
            self.handle_confirmation_key(key);
            return;
        }
        if self.designer.templates_visible() {
            self.handle_gallery_key(key);
            return;
        }

        match self.mode.clone() {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Search => match self.input.handle_key(key) {
                InputAction::Edited => {
                    let term = self.input.buffer.clone();
                    self.apply(Intent::SetSearch(term));
                }
                InputAction::Cancel => {
                    self.apply(Intent::SetSearch(String::new()));
                    self.mode = Mode::Normal;
                }
                InputAction::Submit(term) => {
                    self.apply(Intent::SetSearch(term));
                    self.mode = Mode::Normal;
                }
                InputAction::Quit => self.should_quit = true,
                InputAction::None => {}
            },
            Mode::Edit(field) => match self.input.handle_key(key) {
                InputAction::Submit(raw) => {
                    self.commit_edit(&field, &raw);
                    self.mode = Mode::Normal;
                }
                InputAction::Cancel => self.mode = Mode::Normal,
                InputAction::Quit => self.should_quit = true,
                InputAction::Edited | InputAction::None => {}
            },
            Mode::OpenPath => match self.input.handle_key(key) {
                InputAction::Submit(path) => {
                    self.mode = Mode::Normal;
                    self.open_file(&path);
                }
                InputAction::Cancel => self.mode = Mode::Normal,
                InputAction::Quit => self.should_quit = true,
                InputAction::Edited | InputAction::None => {}
            },
        }
    }

    fn handle_confirmation_key(&mut self, key: KeyEvent) {
        use crossterm::event::KeyCode;
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.apply(Intent::Confirm);
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.apply(Intent::Cancel);
            }
            _ => {}
        }
    }

    fn handle_gallery_key(&mut self, key: KeyEvent) {
        use crossterm::event::KeyCode;
        let count = self.gallery.templates().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.template_cursor = self.template_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.template_cursor + 1 < count {
                    self.template_cursor += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(template) = self.gallery.templates().get(self.template_cursor) {
                    self.gallery.on_select(template);
                }
                self.apply(Intent::ToggleTemplates);
            }
            KeyCode::Esc | KeyCode::Char('g') => {
                self.apply(Intent::ToggleTemplates);
            }
            _ => {}
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        let Some(command) = command_for_key(key) else {
            return;
        };
        match command {
            KeyCommand::Quit => self.should_quit = true,
            KeyCommand::Toolbar(cmd) => self.run_toolbar(cmd),
            KeyCommand::ZoomIn => {
                self.apply(Intent::ZoomIn);
            }
            KeyCommand::ZoomOut => {
                self.apply(Intent::ZoomOut);
            }
            KeyCommand::ResetView => {
                self.apply(Intent::ResetView);
            }
            KeyCommand::Search => {
                self.input.set(self.designer.search_term().to_string());
                self.mode = Mode::Search;
            }
            KeyCommand::DeleteSelected => self.delete_selected(),
            KeyCommand::Deselect => {
                self.apply(Intent::ClickPane);
            }
            KeyCommand::FieldUp => {
                self.field_cursor = self.field_cursor.saturating_sub(1);
            }
            KeyCommand::FieldDown => {
                let count = self.editable_fields().len();
                if self.field_cursor + 1 < count {
                    self.field_cursor += 1;
                }
            }
            KeyCommand::EditField => {
                if let Some(field) = self.editable_fields().get(self.field_cursor).cloned() {
                    self.begin_edit(field);
                }
            }
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.designer.pending().is_some() || self.designer.templates_visible() {
            return;
        }
        let (column, row) = (mouse.column, mouse.row);
        let client = cell_to_screen(column, row);

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if hit(self.panes.toolbar, column, row) {
                    if let Some(command) = ui::toolbar_hit(self.panes.toolbar, column) {
                        self.run_toolbar(command);
                    }
                } else if hit(self.panes.palette, column, row) {
                    self.press_palette(row - self.panes.palette.y);
                } else if hit(self.panes.canvas, column, row) {
                    self.apply(Intent::PointerDown(client));
                } else if hit(self.panes.properties, column, row) {
                    self.press_property(row - self.panes.properties.y);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some((_, c, r)) = &mut self.drag {
                    *c = column;
                    *r = row;
                } else if self.designer.canvas().gesture_active() {
                    self.apply(Intent::PointerMove(client));
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some((transfer, _, _)) = self.drag.take() {
                    if hit(self.panes.canvas, column, row) {
                        self.apply(Intent::Drop { transfer, client });
                    }
                } else if self.designer.canvas().gesture_active() {
                    self.apply(Intent::PointerUp(client));
                }
            }
            MouseEventKind::ScrollDown if hit(self.panes.canvas, column, row) => {
                self.apply(Intent::Wheel { delta_y: 1.0 });
            }
            MouseEventKind::ScrollUp if hit(self.panes.canvas, column, row) => {
                self.apply(Intent::Wheel { delta_y: -1.0 });
            }
            _ => {}
        }
    }

    fn press_palette(&mut self, index: u16) {
        let Some(row) = self.palette_rows().into_iter().nth(index as usize) else {
            return;
        };
        match row {
            PaletteRow::Header { category_id, .. } => {
                self.apply(Intent::ToggleCategory(category_id));
            }
            PaletteRow::Agent(agent) => match drag_start(&agent) {
                Ok(transfer) => self.drag = Some((transfer, 0, 0)),
                Err(e) => self.error(e.to_string()),
            },
            PaletteRow::Notice(_) => {}
        }
    }

    fn press_property(&mut self, index: u16) {
        let Some(panel) = self.designer.property_panel() else {
            return;
        };
        let rows = panel.fields();
        let Some(field) = rows.get(index as usize).and_then(|r| r.field.clone()) else {
            return;
        };
        let editable: Vec<Field> = rows.into_iter().filter_map(|r| r.field).collect();
        self.field_cursor = editable.iter().position(|f| *f == field).unwrap_or(0);
        self.begin_edit(field);
    }

    /// Status line text for a designer event.
    pub fn handle_designer_event(&mut self, event: DesignerEvent) {
        match event {
            DesignerEvent::CatalogLoaded { agents, categories } => {
                if agents == 0 {
                    self.error("Agent catalog unavailable");
                } else {
                    self.notify(format!("{} agents in {} categories", agents, categories));
                }
            }
            DesignerEvent::Saved { file, .. } => self.notify(format!("Saved {}", file)),
            DesignerEvent::Exported { file } => self.notify(format!("Exported {}", file)),
            DesignerEvent::Loaded { workflow_id } => {
                self.notify(format!("Loaded workflow {}", workflow_id))
            }
            DesignerEvent::Cleared => self.notify("Workflow cleared"),
            DesignerEvent::NodeDeleted { edges_removed, .. } => {
                self.notify(format!("Node deleted ({} connections removed)", edges_removed))
            }
            DesignerEvent::Notice { message } => self.notify(message),
            DesignerEvent::NodeAdded { .. }
            | DesignerEvent::NodeUpdated { .. }
            | DesignerEvent::EdgeAdded { .. }
            | DesignerEvent::EdgeDeleted { .. }
            | DesignerEvent::SelectionChanged { .. } => {}
        }
    }
}

/// Main app loop.
pub async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    designer: Designer,
    catalog: Arc<dyn CatalogSource>,
    event_bus: Arc<EventBus>,
    gallery: Arc<dyn TemplateGallery>,
) -> anyhow::Result<()> {
    let mut app = App::new(designer, gallery);
    let mut events = EventLoop::new(event_bus.subscribe());

    let (catalog_tx, mut catalog_rx) = oneshot::channel();
    tokio::spawn(async move {
        let loaded = load_catalog(catalog.as_ref()).await;
        let _ = catalog_tx.send(loaded);
    });

    let size = terminal.size()?;
    app.resize(Rect::new(0, 0, size.width, size.height));

    while !app.should_quit {
        terminal.draw(|f| ui::draw(f, &app))?;

        if app.designer.phase() == Phase::Init {
            if let Ok(loaded) = catalog_rx.try_recv() {
                app.apply(Intent::CatalogLoaded(loaded));
            }
        }

        match events.next().await {
            Some(TuiEvent::Key(key)) => app.handle_key(key),
            Some(TuiEvent::Mouse(mouse)) => app.handle_mouse(mouse),
            Some(TuiEvent::Resize(w, h)) => app.resize(Rect::new(0, 0, w, h)),
            Some(TuiEvent::Designer(event)) => app.handle_designer_event(event),
            Some(TuiEvent::Tick) => app.tick(),
            None => break,
        }
    }

    if app.designer.is_dirty() {
        info!(workflow = %app.designer.document().id, "Exiting with unsaved changes");
    }
    Ok(())
}

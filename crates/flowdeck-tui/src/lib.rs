mod app;
mod event;
mod input;
mod ui;

use std::sync::Arc;

use tracing::info;

use flowdeck_core::event::EventBus;
use flowdeck_core::traits::{CatalogSource, TemplateGallery};
use flowdeck_core::types::{DesignerEvent, TemplateSummary};
use flowdeck_designer::Designer;

/// Template gallery backed by the `[[templates]]` config list.
///
/// Picking a template only announces it; nothing is applied to the document.
pub struct ConfigGallery {
    templates: Vec<TemplateSummary>,
    events: Option<Arc<EventBus>>,
}

impl ConfigGallery {
    pub fn new(templates: Vec<TemplateSummary>) -> Self {
        Self {
            templates,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }
}

impl TemplateGallery for ConfigGallery {
    fn templates(&self) -> Vec<TemplateSummary> {
        self.templates.clone()
    }

    fn on_select(&self, template: &TemplateSummary) {
        info!(template = %template.name, "Template selected");
        if let Some(bus) = &self.events {
            bus.publish(DesignerEvent::Notice {
                message: format!("Template '{}' selected", template.name),
            });
        }
    }
}

/// Launch the terminal UI. The catalog is fetched in the background while
/// the editor is already drawn.
pub async fn run_tui(
    designer: Designer,
    catalog: Arc<dyn CatalogSource>,
    event_bus: Arc<EventBus>,
    gallery: Arc<dyn TemplateGallery>,
) -> anyhow::Result<()> {
    // Enter raw mode
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(
        stdout,
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;

    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let result = app::run_app(&mut terminal, designer, catalog, event_bus, gallery).await;

    // Restore terminal
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::event::DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

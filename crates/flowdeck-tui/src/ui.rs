use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use flowdeck_core::types::Position;
use flowdeck_designer::toolbar::dirty_indicator;
use flowdeck_designer::{NodeView, Phase, ToolbarCommand};

use crate::app::{App, Mode, PaletteRow, CELL_HEIGHT, CELL_WIDTH};
use crate::input::toolbar_key;

const PALETTE_WIDTH: u16 = 30;
const PROPERTIES_WIDTH: u16 = 38;

/// Screen areas the app routes mouse input to. Pane areas are the insides
/// of their borders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Panes {
    pub toolbar: Rect,
    pub palette: Rect,
    pub canvas: Rect,
    pub properties: Rect,
    pub status: Rect,
    pub input: Rect,
    palette_frame: Rect,
    canvas_frame: Rect,
    properties_frame: Rect,
}

fn bordered(title: impl Into<String>) -> Block<'static> {
    Block::default().borders(Borders::ALL).title(title.into())
}

pub fn layout(area: Rect) -> Panes {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(PALETTE_WIDTH),
            Constraint::Min(10),
            Constraint::Length(PROPERTIES_WIDTH),
        ])
        .split(rows[1]);

    let frame = Block::default().borders(Borders::ALL);
    Panes {
        toolbar: rows[0],
        palette: frame.inner(columns[0]),
        canvas: frame.inner(columns[1]),
        properties: frame.inner(columns[2]),
        status: rows[2],
        input: rows[3],
        palette_frame: columns[0],
        canvas_frame: columns[1],
        properties_frame: columns[2],
    }
}

fn toolbar_segments() -> Vec<(ToolbarCommand, String)> {
    ToolbarCommand::ALL
        .into_iter()
        .map(|cmd| (cmd, format!(" [{}] {} ", toolbar_key(cmd), cmd.label())))
        .collect()
}

/// Toolbar button under a column, if any.
pub fn toolbar_hit(toolbar: Rect, column: u16) -> Option<ToolbarCommand> {
    let mut x = toolbar.x;
    for (cmd, text) in toolbar_segments() {
        let width = text.chars().count() as u16;
        if column >= x && column < x + width {
            return Some(cmd);
        }
        x += width;
    }
    None
}

/// Draw the TUI layout.
pub fn draw(f: &mut Frame, app: &App) {
    let panes = app.panes;
    draw_toolbar(f, app, panes.toolbar);
    draw_palette(f, app, &panes);
    draw_canvas(f, app, &panes);
    draw_properties(f, app, &panes);
    draw_status_bar(f, app, panes.status);
    draw_input(f, app, panes.input);

    if let Some(pending) = app.designer.pending() {
        draw_confirmation(f, &pending.prompt());
    } else if app.designer.templates_visible() {
        draw_gallery(f, app);
    }
}

fn draw_toolbar(f: &mut Frame, app: &App, area: Rect) {
    let mut spans: Vec<Span> = toolbar_segments()
        .into_iter()
        .map(|(_, text)| Span::styled(text, Style::default().fg(Color::Black).bg(Color::Gray)))
        .collect();

    let doc = app.designer.document();
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        doc.name.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::raw("  "));
    let dirty_style = if app.designer.is_dirty() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    spans.push(Span::styled(
        dirty_indicator(app.designer.is_dirty()),
        dirty_style,
    ));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_palette(f: &mut Frame, app: &App, panes: &Panes) {
    let term = app.designer.search_term();
    let title = if term.is_empty() {
        " Agents ".to_string()
    } else {
        format!(" Agents: \"{}\" ", term)
    };

    let width = panes.palette.width as usize;
    let lines: Vec<Line> = app
        .palette_rows()
        .into_iter()
        .map(|row| match row {
            PaletteRow::Header {
                name,
                count,
                expanded,
                ..
            } => {
                let marker = if expanded { "▾" } else { "▸" };
                Line::from(Span::styled(
                    format!("{} {} ({})", marker, name, count),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
            }
            PaletteRow::Agent(agent) => {
                let caps = agent.capabilities.join(", ");
                let mut text = format!("  {}", agent.agent_name);
                if !caps.is_empty() && text.chars().count() + caps.chars().count() + 3 <= width {
                    text = format!("{} · {}", text, caps);
                }
                Line::from(Span::raw(text))
            }
            PaletteRow::Notice(text) => {
                Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
            }
        })
        .collect();

    f.render_widget(
        Paragraph::new(lines).block(bordered(title)),
        panes.palette_frame,
    );
}

/// Canvas-local screen position to an absolute terminal cell.
fn to_cell(area: Rect, p: Position) -> Option<(u16, u16)> {
    let col = (p.x / CELL_WIDTH).floor();
    let row = (p.y / CELL_HEIGHT).floor();
    if col < 0.0 || row < 0.0 || col >= area.width as f64 || row >= area.height as f64 {
        return None;
    }
    Some((area.x + col as u16, area.y + row as u16))
}

/// Liang-Barsky clip of a screen-space segment to the canvas extent.
fn clip_segment(area: Rect, from: Position, to: Position) -> Option<(Position, Position)> {
    let (max_x, max_y) = (area.width as f64 * CELL_WIDTH, area.height as f64 * CELL_HEIGHT);
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [
        (-dx, from.x),
        (dx, max_x - from.x),
        (-dy, from.y),
        (dy, max_y - from.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    let at = |t: f64| Position::new(from.x + dx * t, from.y + dy * t);
    Some((at(t0), at(t1)))
}

fn draw_segment(buf: &mut Buffer, area: Rect, from: Position, to: Position, color: Color) {
    if !from.is_finite() || !to.is_finite() {
        return;
    }
    let Some((from, to)) = clip_segment(area, from, to) else {
        return;
    };
    let dx = (to.x - from.x) / CELL_WIDTH;
    let dy = (to.y - from.y) / CELL_HEIGHT;
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let p = Position::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
        if let Some(cell) = to_cell(area, p).and_then(|c| buf.cell_mut(c)) {
            cell.set_symbol("·").set_fg(color);
        }
    }
}

/// Terminal rectangle of a node view, clipped to the canvas.
fn node_rect(area: Rect, view: &NodeView) -> Option<Rect> {
    let left = (view.origin.x / CELL_WIDTH).floor();
    let top = (view.origin.y / CELL_HEIGHT).floor();
    let right = ((view.origin.x + view.width) / CELL_WIDTH).ceil().max(left + 3.0);
    let bottom = ((view.origin.y + view.height) / CELL_HEIGHT).ceil().max(top + 2.0);

    let clip = |v: f64, max: u16| v.clamp(0.0, max as f64) as u16;
    let x0 = clip(left, area.width);
    let y0 = clip(top, area.height);
    let x1 = clip(right, area.width);
    let y1 = clip(bottom, area.height);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(Rect::new(area.x + x0, area.y + y0, x1 - x0, y1 - y0))
}

fn draw_canvas(f: &mut Frame, app: &App, panes: &Panes) {
    let area = panes.canvas;
    let zoom = app.designer.canvas().viewport.zoom();
    let doc = app.designer.document();
    let title = format!(
        " Canvas  {} nodes · {} edges · {:.0}% ",
        doc.nodes.len(),
        doc.edges.len(),
        zoom * 100.0
    );
    f.render_widget(bordered(title), panes.canvas_frame);

    if doc.nodes.is_empty() && app.designer.phase() == Phase::Ready {
        let hint = Paragraph::new("Drag an agent from the palette to start")
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(hint, area);
    }

    let views = app.designer.node_views();
    {
        let buf = f.buffer_mut();
        for path in app.designer.edge_paths() {
            draw_segment(buf, area, path.from, path.to, Color::Gray);
        }
        if let Some((source, pointer)) = app.designer.canvas().pending_connection() {
            if let Some(view) = views.iter().find(|v| v.id == source) {
                draw_segment(buf, area, view.output_port(), pointer, Color::Yellow);
            }
        }
    }

    for view in &views {
        let Some(rect) = node_rect(area, view) else {
            continue;
        };
        let (r, g, b) = view.style.color;
        let mut border = Style::default().fg(Color::Rgb(r, g, b));
        if view.selected {
            border = border.add_modifier(Modifier::BOLD | Modifier::REVERSED);
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(format!("{} {}", view.style.icon, view.label));
        let body = view
            .subtitle
            .clone()
            .unwrap_or_else(|| view.style.title.to_string());
        f.render_widget(Clear, rect);
        f.render_widget(
            Paragraph::new(Span::styled(body, Style::default().fg(Color::DarkGray))).block(block),
            rect,
        );
    }

    if let Some((_, column, row)) = app.drag {
        if let Some(cell) = f.buffer_mut().cell_mut((column, row)) {
            cell.set_symbol("◆").set_fg(Color::Cyan);
        }
    }
}

fn draw_properties(f: &mut Frame, app: &App, panes: &Panes) {
    let block = bordered(" Properties ");
    let Some(panel) = app.designer.property_panel() else {
        let hint = Paragraph::new("Select a node to edit it")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(hint, panes.properties_frame);
        return;
    };

    let editing = match &app.mode {
        Mode::Edit(field) => Some(field.clone()),
        _ => None,
    };
    let mut editable_index = 0;
    let mut lines: Vec<Line> = Vec::new();
    for row in panel.fields() {
        let label_style = Style::default().fg(Color::DarkGray);
        let mut value_style = Style::default().fg(Color::White);
        if let Some(field) = &row.field {
            if editable_index == app.field_cursor {
                value_style = value_style.add_modifier(Modifier::REVERSED);
            }
            if editing.as_ref() == Some(field) {
                value_style = value_style.fg(Color::Yellow);
            }
            editable_index += 1;
        }
        lines.push(Line::from(vec![
            Span::styled(format!("{:<12}", row.label), label_style),
            Span::styled(row.value, value_style),
        ]));
    }

    let issues = panel.issues();
    if !issues.is_empty() {
        lines.push(Line::from(""));
        for issue in issues {
            lines.push(Line::from(Span::styled(
                format!("! {}", issue),
                Style::default().fg(Color::Yellow),
            )));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "[x] delete node",
        Style::default().fg(Color::Red),
    )));

    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        panes.properties_frame,
    );
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let (text, style) = match &app.status {
        Some(status) if status.is_error => (
            format!(" {}", status.text),
            Style::default().bg(Color::Red).fg(Color::White),
        ),
        Some(status) => (
            format!(" {}", status.text),
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        None => {
            let phase = match app.designer.phase() {
                Phase::Init => "loading",
                Phase::Ready => "ready",
            };
            (
                format!(
                    " {} | +/- zoom, 0 reset, / search, Enter edit, x delete, q quit",
                    phase
                ),
                Style::default().bg(Color::DarkGray).fg(Color::White),
            )
        }
    };
    f.render_widget(Paragraph::new(text).style(style), area);
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let title = match &app.mode {
        Mode::Normal => " Input ".to_string(),
        Mode::Search => " Search agents ".to_string(),
        Mode::Edit(field) => {
            let label = app
                .designer
                .property_panel()
                .and_then(|panel| {
                    panel
                        .fields()
                        .into_iter()
                        .find(|row| row.field.as_ref() == Some(field))
                        .map(|row| row.label)
                })
                .unwrap_or_default();
            format!(" Edit {} ", label)
        }
        Mode::OpenPath => " Open workflow file ".to_string(),
    };

    let input = Paragraph::new(app.input.buffer.as_str())
        .block(bordered(title))
        .style(Style::default().fg(Color::White));
    f.render_widget(input, area);

    if app.mode != Mode::Normal && area.width > 2 {
        let cursor_x = area.x + 1 + app.input.cursor as u16;
        let cursor_y = area.y + 1;
        f.set_cursor_position((cursor_x.min(area.x + area.width - 2), cursor_y));
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn draw_confirmation(f: &mut Frame, prompt: &str) {
    let area = centered(f.area(), 50, 5);
    let lines = vec![
        Line::from(prompt.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "[y] confirm   [n] cancel",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(bordered(" Confirm ").border_style(Style::default().fg(Color::Red))),
        area,
    );
}

fn draw_gallery(f: &mut Frame, app: &App) {
    let templates = app.gallery.templates();
    let height = (templates.len() as u16).saturating_mul(2) + 4;
    let area = centered(f.area(), 60, height.max(5));

    let mut lines: Vec<Line> = Vec::new();
    if templates.is_empty() {
        lines.push(Line::from(Span::styled(
            "No templates configured",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for (i, template) in templates.iter().enumerate() {
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if i == app.template_cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::from(Span::styled(template.name.clone(), style)));
        lines.push(Line::from(Span::styled(
            format!("  {}", template.description),
            Style::default().fg(Color::DarkGray),
        )));
    }

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(bordered(" Templates  [Enter] pick  [Esc] close ")),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use flowdeck_core::types::{NodeRecord, NodeType};
    use flowdeck_designer::{Designer, Intent};
    use flowdeck_test_utils::{sample_catalog, MemoryDownloads, MemoryStore};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use crate::ConfigGallery;

    fn screen_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn ready_app() -> App {
        let mut designer = Designer::new(
            "Render",
            Arc::new(MemoryStore::default()),
            Arc::new(MemoryDownloads::default()),
        );
        designer
            .dispatch(Intent::CatalogLoaded(sample_catalog()))
            .unwrap();
        let mut app = App::new(designer, Arc::new(ConfigGallery::new(vec![])));
        app.resize(Rect::new(0, 0, 120, 40));
        app
    }

    #[test]
    fn test_layout_insets_panes() {
        let panes = layout(Rect::new(0, 0, 120, 40));
        assert_eq!(panes.toolbar, Rect::new(0, 0, 120, 1));
        assert_eq!(panes.palette, Rect::new(1, 2, 28, 33));
        assert_eq!(panes.canvas.x, 31);
        assert_eq!(panes.input, Rect::new(0, 37, 120, 3));
    }

    #[test]
    fn test_toolbar_hit_matches_rendered_buttons() {
        let toolbar = Rect::new(0, 0, 120, 1);
        assert_eq!(toolbar_hit(toolbar, 0), Some(ToolbarCommand::Save));
        let save_width = " [s] Save ".chars().count() as u16;
        assert_eq!(toolbar_hit(toolbar, save_width), Some(ToolbarCommand::Export));
        assert_eq!(toolbar_hit(toolbar, 119), None);
    }

    #[test]
    fn test_renders_palette_and_nodes() {
        let mut app = ready_app();
        let mut doc = app.designer.document().clone();
        doc.nodes
            .push(NodeRecord::new("n1", NodeType::Trigger, "Kickoff", Position::new(20.0, 20.0)));
        app.apply(Intent::Load(doc));

        let text = screen_text(&app);
        assert!(text.contains("Analysis (2)"));
        assert!(text.contains("Mailer"));
        assert!(text.contains("Kickoff"));
        assert!(text.contains("saved"));
    }

    #[test]
    fn test_confirmation_overlay_is_drawn() {
        let mut app = ready_app();
        app.apply(Intent::Clear);
        assert!(screen_text(&app).contains("[y] confirm"));
    }

    #[test]
    fn test_far_edge_is_clipped_to_canvas() {
        let area = Rect::new(0, 0, 40, 10);
        let (from, to) =
            clip_segment(area, Position::new(-1e12, 50.0), Position::new(1e12, 50.0)).unwrap();
        assert_eq!((from.x, to.x), (0.0, 400.0));
        let above = clip_segment(area, Position::new(-1e12, -5.0), Position::new(1e12, -5.0));
        assert!(above.is_none());

        let mut buf = Buffer::empty(area);
        let (near, far) = (Position::new(0.0, 50.0), Position::new(1e12, 50.0));
        draw_segment(&mut buf, area, near, far, Color::Gray);
        assert_eq!(buf.cell((39, 2)).map(|c| c.symbol()), Some("·"));
    }

    #[test]
    fn test_offscreen_node_is_clipped_away() {
        let area = Rect::new(10, 5, 40, 10);
        let view = NodeView::new(
            &NodeRecord::new("far", NodeType::Agent, "Far", Position::new(5000.0, 0.0)),
            &flowdeck_designer::Viewport::default(),
            None,
        );
        assert!(node_rect(area, &view).is_none());

        let near = NodeView::new(
            &NodeRecord::new("near", NodeType::Agent, "Near", Position::default()),
            &flowdeck_designer::Viewport::default(),
            None,
        );
        assert_eq!(node_rect(area, &near), Some(Rect::new(10, 5, 25, 4)));
    }
}

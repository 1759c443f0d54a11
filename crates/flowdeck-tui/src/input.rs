use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use flowdeck_designer::ToolbarCommand;

/// Actions produced by the line editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Enter pressed; carries the buffer.
    Submit(String),
    /// Esc pressed.
    Cancel,
    /// The buffer changed.
    Edited,
    /// Ctrl+C.
    Quit,
    /// No-op (key was handled internally).
    None,
}

/// Single-line editor used for search, field edits and file paths.
///
/// `cursor` counts characters, not bytes.
pub struct InputHandler {
    pub buffer: String,
    pub cursor: usize,
}

impl InputHandler {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            cursor: 0,
        }
    }

    /// Replace the buffer and put the cursor at its end.
    pub fn set(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
        self.cursor = self.buffer.chars().count();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    fn byte_index(&self) -> usize {
        self.buffer
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.buffer.len())
    }

    fn len(&self) -> usize {
        self.buffer.chars().count()
    }

    /// Handle a key event, returning an action.
    pub fn handle_key(&mut self, key: KeyEvent) -> InputAction {
        match key.code {
            KeyCode::Enter => {
                let text = std::mem::take(&mut self.buffer);
                self.cursor = 0;
                InputAction::Submit(text)
            }
            KeyCode::Esc => {
                self.clear();
                InputAction::Cancel
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                InputAction::Quit
            }
            KeyCode::Char(c) => {
                let at = self.byte_index();
                self.buffer.insert(at, c);
                self.cursor += 1;
                InputAction::Edited
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index();
                    self.buffer.remove(at);
                    InputAction::Edited
                } else {
                    InputAction::None
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.len() {
                    let at = self.byte_index();
                    self.buffer.remove(at);
                    InputAction::Edited
                } else {
                    InputAction::None
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                InputAction::None
            }
            KeyCode::Right => {
                if self.cursor < self.len() {
                    self.cursor += 1;
                }
                InputAction::None
            }
            KeyCode::Home => {
                self.cursor = 0;
                InputAction::None
            }
            KeyCode::End => {
                self.cursor = self.len();
                InputAction::None
            }
            _ => InputAction::None,
        }
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Commands bound to keys while no text input is focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Quit,
    Toolbar(ToolbarCommand),
    ZoomIn,
    ZoomOut,
    ResetView,
    Search,
    DeleteSelected,
    Deselect,
    FieldUp,
    FieldDown,
    EditField,
}

/// Single-key shortcut for a toolbar command.
pub fn toolbar_key(command: ToolbarCommand) -> char {
    match command {
        ToolbarCommand::Save => 's',
        ToolbarCommand::Export => 'e',
        ToolbarCommand::Load => 'o',
        ToolbarCommand::Test => 't',
        ToolbarCommand::Clear => 'c',
        ToolbarCommand::ShowTemplates => 'g',
    }
}

pub fn command_for_key(key: KeyEvent) -> Option<KeyCommand> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(KeyCommand::Quit),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Some(KeyCommand::Quit),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(KeyCommand::ZoomIn),
        KeyCode::Char('-') => Some(KeyCommand::ZoomOut),
        KeyCode::Char('0') => Some(KeyCommand::ResetView),
        KeyCode::Char('/') => Some(KeyCommand::Search),
        KeyCode::Char('x') | KeyCode::Delete => Some(KeyCommand::DeleteSelected),
        KeyCode::Esc => Some(KeyCommand::Deselect),
        KeyCode::Up | KeyCode::Char('k') => Some(KeyCommand::FieldUp),
        KeyCode::Down | KeyCode::Char('j') => Some(KeyCommand::FieldDown),
        KeyCode::Enter => Some(KeyCommand::EditField),
        KeyCode::Char(c) => ToolbarCommand::ALL
            .into_iter()
            .find(|cmd| toolbar_key(*cmd) == c)
            .map(KeyCommand::Toolbar),
        _ => None,
    }
}

use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEventKind, MouseEventKind};
use flowdeck_core::types::DesignerEvent;
use tokio::sync::broadcast;

const DEFAULT_TICK: Duration = Duration::from_millis(100);
const INPUT_POLL: Duration = Duration::from_millis(50);

/// Input the editor loop reacts to.
#[derive(Debug)]
pub enum TuiEvent {
    Key(crossterm::event::KeyEvent),
    /// Press, drag, release, and wheel. Bare pointer motion is dropped.
    Mouse(crossterm::event::MouseEvent),
    Resize(u16, u16),
    Designer(DesignerEvent),
    /// Expires status messages.
    Tick,
}

/// Map a terminal event to editor input, or `None` if the editor ignores it.
pub fn translate(event: CrosstermEvent) -> Option<TuiEvent> {
    match event {
        // Windows reports both press and release; act on press and repeat.
        CrosstermEvent::Key(key) if key.kind != KeyEventKind::Release => Some(TuiEvent::Key(key)),
        CrosstermEvent::Mouse(mouse) if mouse.kind != MouseEventKind::Moved => {
            Some(TuiEvent::Mouse(mouse))
        }
        CrosstermEvent::Resize(w, h) => Some(TuiEvent::Resize(w, h)),
        _ => None,
    }
}

/// Merges terminal input, designer notifications, and a tick timer.
pub struct EventLoop {
    designer_rx: broadcast::Receiver<DesignerEvent>,
    tick_interval: Duration,
}

impl EventLoop {
    pub fn new(designer_rx: broadcast::Receiver<DesignerEvent>) -> Self {
        Self {
            designer_rx,
            tick_interval: DEFAULT_TICK,
        }
    }

    /// Wait for the next event. `None` once the designer bus is closed.
    pub async fn next(&mut self) -> Option<TuiEvent> {
        let tick_sleep = tokio::time::sleep(self.tick_interval);

        // crossterm polling blocks
        let input = tokio::task::spawn_blocking(|| {
            if event::poll(INPUT_POLL).unwrap_or(false) {
                event::read().ok()
            } else {
                None
            }
        });

        tokio::select! {
            result = self.designer_rx.recv() => match result {
                Ok(evt) => Some(TuiEvent::Designer(evt)),
                // Missed notices only cost status text.
                Err(broadcast::error::RecvError::Lagged(_)) => Some(TuiEvent::Tick),
                Err(broadcast::error::RecvError::Closed) => None,
            },
            result = input => Some(
                result
                    .ok()
                    .flatten()
                    .and_then(translate)
                    .unwrap_or(TuiEvent::Tick),
            ),
            _ = tick_sleep => Some(TuiEvent::Tick),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyEventState, KeyModifiers, MouseButton, MouseEvent};
    use flowdeck_core::event::EventBus;

    fn key(kind: KeyEventKind) -> CrosstermEvent {
        CrosstermEvent::Key(KeyEvent {
            code: KeyCode::Char('s'),
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        })
    }

    fn mouse(kind: MouseEventKind) -> CrosstermEvent {
        CrosstermEvent::Mouse(MouseEvent {
            kind,
            column: 4,
            row: 2,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_key_release_is_ignored() {
        assert!(matches!(translate(key(KeyEventKind::Press)), Some(TuiEvent::Key(_))));
        assert!(matches!(translate(key(KeyEventKind::Repeat)), Some(TuiEvent::Key(_))));
        assert!(translate(key(KeyEventKind::Release)).is_none());
    }

    #[test]
    fn test_only_pointer_motion_is_dropped() {
        assert!(translate(mouse(MouseEventKind::Moved)).is_none());
        for kind in [
            MouseEventKind::Down(MouseButton::Left),
            MouseEventKind::Drag(MouseButton::Left),
            MouseEventKind::Up(MouseButton::Left),
            MouseEventKind::ScrollUp,
        ] {
            assert!(matches!(translate(mouse(kind)), Some(TuiEvent::Mouse(_))));
        }
        let resize = translate(CrosstermEvent::Resize(80, 24));
        assert!(matches!(resize, Some(TuiEvent::Resize(80, 24))));
        assert!(translate(CrosstermEvent::FocusLost).is_none());
    }

    #[tokio::test]
    async fn test_designer_events_are_forwarded() {
        let bus = EventBus::new(8);
        let mut events = EventLoop::new(bus.subscribe());
        bus.publish(DesignerEvent::Cleared);
        // Ticks and terminal polls may win a round first.
        let mut forwarded = false;
        for _ in 0..10 {
            if let Some(TuiEvent::Designer(DesignerEvent::Cleared)) = events.next().await {
                forwarded = true;
                break;
            }
        }
        assert!(forwarded);
    }
}

//! Translation of terminal events into per-frame input.

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::layout::Vector2;

/// One-shot commands triggered by a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    IncreaseFont,
    DecreaseFont,
    ResetFont,
    ToggleDebug,
    ScrollToTop,
    ScrollToBottom,
}

/// Keys that scroll while held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollKey {
    /// `j`
    Down,
    /// `k`
    Up,
    /// `h`
    Left,
    /// `l`
    Right,
    /// `d`
    HalfPageDown,
    /// `u`
    HalfPageUp,
}

impl ScrollKey {
    pub const ALL: [Self; 6] = [
        Self::Down,
        Self::Up,
        Self::Left,
        Self::Right,
        Self::HalfPageDown,
        Self::HalfPageUp,
    ];

    const fn slot(self) -> usize {
        match self {
            Self::Down => 0,
            Self::Up => 1,
            Self::Left => 2,
            Self::Right => 3,
            Self::HalfPageDown => 4,
            Self::HalfPageUp => 5,
        }
    }

    /// Direction content moves when the key fires.
    pub const fn direction(self) -> Vector2 {
        match self {
            Self::Down | Self::HalfPageDown => Vector2::new(0.0, -1.0),
            Self::Up | Self::HalfPageUp => Vector2::new(0.0, 1.0),
            Self::Left => Vector2::new(1.0, 0.0),
            Self::Right => Vector2::new(-1.0, 0.0),
        }
    }

    /// Share of the viewport height moved per trigger.
    pub const fn screen_portion(self) -> f32 {
        match self {
            Self::HalfPageDown | Self::HalfPageUp => 0.5,
            _ => 0.03,
        }
    }
}

/// Held scroll keys and the keys pressed since the last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardState {
    held: [bool; 6],
    pressed: [bool; 6],
}

impl KeyboardState {
    pub const fn is_held(&self, key: ScrollKey) -> bool {
        self.held[key.slot()]
    }

    /// Whether `key` went down since the previous frame.
    pub const fn was_pressed(&self, key: ScrollKey) -> bool {
        self.pressed[key.slot()]
    }

    pub fn any_held(&self) -> bool {
        self.held.iter().any(|held| *held)
    }

    pub const fn press(&mut self, key: ScrollKey, track_hold: bool) {
        let slot = key.slot();
        if !self.held[slot] {
            self.pressed[slot] = true;
        }
        self.held[slot] = track_hold;
    }

    pub const fn release(&mut self, key: ScrollKey) {
        self.held[key.slot()] = false;
    }

    /// Forget press edges; held keys stay held.
    pub const fn clear_edges(&mut self) {
        self.pressed = [false; 6];
    }
}

/// Everything the frame controller consumes for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameInput {
    /// Terminal size in cells
    pub window: (u16, u16),
    pub pointer: Option<(f32, f32)>,
    pub pointer_down: bool,
    /// Wheel notches since the last frame; positive moves content down/right
    pub wheel: Vector2,
    pub keys: KeyboardState,
    pub actions: Vec<Action>,
    /// Seconds since the previous frame
    pub dt: f32,
}

impl FrameInput {
    pub const fn new(window: (u16, u16)) -> Self {
        Self {
            window,
            pointer: None,
            pointer_down: false,
            wheel: Vector2::ZERO,
            keys: KeyboardState {
                held: [false; 6],
                pressed: [false; 6],
            },
            actions: Vec::new(),
            dt: 0.0,
        }
    }

    /// Record a terminal event. Returns whether it changes the next frame.
    ///
    /// `release_events` tells whether the terminal reports key releases; when
    /// it does not, scroll keys only fire on press and hold is driven by the
    /// terminal's own key repeat.
    pub fn handle_event(&mut self, event: &Event, release_events: bool) -> bool {
        match event {
            Event::Key(key) => self.handle_key(*key, release_events),
            Event::Mouse(mouse) => self.handle_mouse(*mouse),
            Event::Resize(width, height) => {
                self.window = (*width, *height);
                true
            }
            _ => false,
        }
    }

    /// Reset per-frame fields after a frame has consumed them.
    pub fn end_frame(&mut self) {
        self.wheel = Vector2::ZERO;
        self.actions.clear();
        self.keys.clear_edges();
    }

    fn handle_key(&mut self, key: KeyEvent, release_events: bool) -> bool {
        match key.kind {
            KeyEventKind::Press => {}
            KeyEventKind::Release => {
                if let Some(scroll) = scroll_key(key.code) {
                    self.keys.release(scroll);
                    return true;
                }
                return false;
            }
            KeyEventKind::Repeat => {
                // Hold repeat is timed by the scroller.
                return false;
            }
        }

        if let Some(scroll) = scroll_key(key.code) {
            self.keys.press(scroll, release_events);
            return true;
        }
        match translate_key(key) {
            Some(action) => {
                self.actions.push(action);
                true
            }
            None => false,
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        self.pointer = Some((f32::from(mouse.column), f32::from(mouse.row)));
        match mouse.kind {
            MouseEventKind::ScrollDown => self.wheel.y -= 1.0,
            MouseEventKind::ScrollUp => self.wheel.y += 1.0,
            MouseEventKind::ScrollLeft => self.wheel.x += 1.0,
            MouseEventKind::ScrollRight => self.wheel.x -= 1.0,
            MouseEventKind::Down(MouseButton::Left) => self.pointer_down = true,
            MouseEventKind::Up(MouseButton::Left) => self.pointer_down = false,
            _ => {}
        }
        true
    }
}

/// Map a key press to a one-shot action.
pub fn translate_key(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('=' | '+') => Some(Action::IncreaseFont),
        KeyCode::Char('-') => Some(Action::DecreaseFont),
        KeyCode::Char('0') => Some(Action::ResetFont),
        KeyCode::Backspace => Some(Action::ToggleDebug),
        KeyCode::Char('g') => Some(Action::ScrollToTop),
        KeyCode::Char('G') => Some(Action::ScrollToBottom),
        _ => None,
    }
}

fn scroll_key(code: KeyCode) -> Option<ScrollKey> {
    match code {
        KeyCode::Char('j') => Some(ScrollKey::Down),
        KeyCode::Char('k') => Some(ScrollKey::Up),
        KeyCode::Char('h') => Some(ScrollKey::Left),
        KeyCode::Char('l') => Some(ScrollKey::Right),
        KeyCode::Char('d') => Some(ScrollKey::HalfPageDown),
        KeyCode::Char('u') => Some(ScrollKey::HalfPageUp),
        _ => None,
    }
}

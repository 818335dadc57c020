use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Pixels per wheel line, so line and pixel deltas land on the same scale
const PIXELS_PER_LINE: f32 = 100.0;

/// Toolkit-independent input the visualization reacts to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewInput {
    /// Pointer moved by `(dx, dy)` pixels with the primary button held
    Drag { dx: f32, dy: f32 },
    /// Wheel, positive `delta_y` means zoom out
    Scroll { delta_y: f32 },
    /// Key pressed (repeats excluded)
    Key(KeyCode),
}

/// Turns raw cursor and button events into drag deltas
#[derive(Debug, Default)]
pub struct PointerTracker {
    dragging: bool,
    last: Option<(f64, f64)>,
}

impl PointerTracker {
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn press(&mut self) {
        self.dragging = true;
    }

    pub fn release(&mut self) {
        self.dragging = false;
    }

    /// Cursor left the window: forget the last position as well
    pub fn leave(&mut self) {
        self.dragging = false;
        self.last = None;
    }

    /// Record a cursor position, returning a drag if the button is held
    pub fn moved(&mut self, x: f64, y: f64) -> Option<ViewInput> {
        let previous = self.last.replace((x, y));
        if !self.dragging {
            return None;
        }
        let (px, py) = previous?;
        let (dx, dy) = ((x - px) as f32, (y - py) as f32);
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        Some(ViewInput::Drag { dx, dy })
    }

    pub fn translate(&mut self, event: &WindowEvent) -> Option<ViewInput> {
        match event {
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                match state {
                    ElementState::Pressed => self.press(),
                    ElementState::Released => self.release(),
                }
                None
            }
            WindowEvent::CursorMoved { position, .. } => self.moved(position.x, position.y),
            WindowEvent::CursorLeft { .. } => {
                self.leave();
                None
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta_y = scroll_delta(delta);
                (delta_y != 0.0).then_some(ViewInput::Scroll { delta_y })
            }
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) if event.state == ElementState::Pressed && !event.repeat => {
                    Some(ViewInput::Key(code))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

/// Wheel delta in browser convention. winit reports scrolling up (away from
/// the user) as positive, which should zoom in, so the sign flips.
pub fn scroll_delta(delta: &MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * PIXELS_PER_LINE,
        MouseScrollDelta::PixelDelta(position) => -position.y as f32,
    }
}

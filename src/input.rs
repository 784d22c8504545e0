// input.rs: 将 winit 鼠标/触摸/滚轮事件转换为平移与缩放手势

use std::collections::BTreeMap;

use glam::Vec2;
use panorama_vr::{GesturePhase, PanEvent, PinchEvent, ViewInputState};
use winit::event::TouchPhase;

// one wheel line zooms by 10%
const WHEEL_ZOOM_STEP: f32 = 1.1;
const PIXELS_PER_WHEEL_LINE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Pan(PanEvent),
    Pinch(PinchEvent),
}

fn pan(location: Vec2, phase: GesturePhase) -> Gesture {
    Gesture::Pan(PanEvent { location, phase })
}

fn pinch(scale: f32, phase: GesturePhase) -> Gesture {
    Gesture::Pinch(PinchEvent { scale, phase })
}

/// Tracks the pointer and touch points of one window.
///
/// A single finger (or the left mouse button) pans; two fingers pinch and
/// suspend the pan until one of them lifts.
#[derive(Debug, Default)]
pub struct TouchTracker {
    touches: BTreeMap<u64, Vec2>,
    cursor: Vec2,
    mouse_down: bool,
    pinch_distance: Option<f32>,
}

impl TouchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current touch points for drawing and hit-testing.
    pub fn input_state(&self) -> ViewInputState {
        let mut touches: Vec<Vec2> = self.touches.values().copied().collect();
        if self.mouse_down {
            touches.push(self.cursor);
        }
        ViewInputState { touches }
    }

    pub fn is_dragging(&self) -> bool {
        self.mouse_down || !self.touches.is_empty()
    }

    pub fn mouse_button(&mut self, pressed: bool) -> Option<Gesture> {
        if pressed == self.mouse_down {
            return None;
        }
        self.mouse_down = pressed;
        let phase = if pressed {
            GesturePhase::Began
        } else {
            GesturePhase::Ended
        };
        Some(pan(self.cursor, phase))
    }

    pub fn cursor_moved(&mut self, position: Vec2) -> Option<Gesture> {
        self.cursor = position;
        self.mouse_down
            .then(|| pan(position, GesturePhase::Changed))
    }

    /// Cursor left the window mid-drag.
    pub fn cancel(&mut self) -> Vec<Gesture> {
        let mut out = Vec::new();
        if self.pinch_distance.take().is_some() {
            out.push(pinch(1.0, GesturePhase::Cancelled));
        }
        if self.mouse_down || !self.touches.is_empty() {
            out.push(pan(self.cursor, GesturePhase::Cancelled));
        }
        self.mouse_down = false;
        self.touches.clear();
        out
    }

    /// Each wheel notch is a complete pinch relative to the current field
    /// of view. Positive `lines` zoom in.
    pub fn wheel_lines(&mut self, lines: f32) -> Vec<Gesture> {
        if lines == 0.0 || !lines.is_finite() {
            return Vec::new();
        }
        vec![
            pinch(1.0, GesturePhase::Began),
            pinch(WHEEL_ZOOM_STEP.powf(lines), GesturePhase::Changed),
            pinch(1.0, GesturePhase::Ended),
        ]
    }

    pub fn wheel_pixels(&mut self, pixels: f32) -> Vec<Gesture> {
        self.wheel_lines(pixels / PIXELS_PER_WHEEL_LINE)
    }

    pub fn touch(&mut self, id: u64, phase: TouchPhase, location: Vec2) -> Vec<Gesture> {
        match phase {
            TouchPhase::Started => self.touch_started(id, location),
            TouchPhase::Moved => self.touch_moved(id, location),
            TouchPhase::Ended => self.touch_lifted(id, GesturePhase::Ended),
            TouchPhase::Cancelled => self.touch_lifted(id, GesturePhase::Cancelled),
        }
    }

    fn touch_started(&mut self, id: u64, location: Vec2) -> Vec<Gesture> {
        self.touches.insert(id, location);
        match self.touches.len() {
            1 => vec![pan(location, GesturePhase::Began)],
            2 => {
                let Some(distance) = self.finger_distance() else {
                    return Vec::new();
                };
                self.pinch_distance = Some(distance);
                vec![
                    pan(location, GesturePhase::Cancelled),
                    pinch(1.0, GesturePhase::Began),
                ]
            }
            _ => Vec::new(),
        }
    }

    fn touch_moved(&mut self, id: u64, location: Vec2) -> Vec<Gesture> {
        let Some(slot) = self.touches.get_mut(&id) else {
            return Vec::new();
        };
        *slot = location;

        if let Some(start) = self.pinch_distance {
            return match self.finger_distance() {
                Some(d) if start > 0.0 => vec![pinch(d / start, GesturePhase::Changed)],
                _ => Vec::new(),
            };
        }
        if self.touches.len() == 1 {
            vec![pan(location, GesturePhase::Changed)]
        } else {
            Vec::new()
        }
    }

    fn touch_lifted(&mut self, id: u64, phase: GesturePhase) -> Vec<Gesture> {
        let Some(location) = self.touches.remove(&id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        if self.touches.len() < 2 && self.pinch_distance.take().is_some() {
            out.push(pinch(1.0, phase));
            // the remaining finger picks the pan back up
            if let Some(rest) = self.touches.values().next() {
                out.push(pan(*rest, GesturePhase::Began));
            }
        } else if self.touches.is_empty() {
            out.push(pan(location, phase));
        }
        out
    }

    fn finger_distance(&self) -> Option<f32> {
        let mut points = self.touches.values();
        let a = points.next()?;
        let b = points.next()?;
        Some(a.distance(*b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mouse_drag_is_a_pan() {
        let mut t = TouchTracker::new();
        assert_eq!(t.cursor_moved(Vec2::new(10.0, 20.0)), None);
        assert_eq!(
            t.mouse_button(true),
            Some(pan(Vec2::new(10.0, 20.0), GesturePhase::Began))
        );
        assert_eq!(t.input_state().touches, vec![Vec2::new(10.0, 20.0)]);
        assert_eq!(
            t.cursor_moved(Vec2::new(15.0, 20.0)),
            Some(pan(Vec2::new(15.0, 20.0), GesturePhase::Changed))
        );
        assert_eq!(
            t.mouse_button(false),
            Some(pan(Vec2::new(15.0, 20.0), GesturePhase::Ended))
        );
        assert!(t.input_state().touches.is_empty());
        assert_eq!(t.mouse_button(false), None);
    }

    #[test]
    fn test_wheel_notch_is_a_full_pinch() {
        let mut t = TouchTracker::new();
        let events = t.wheel_lines(1.0);
        assert_eq!(events.len(), 3);
        match events[1] {
            Gesture::Pinch(p) => {
                assert_eq!(p.phase, GesturePhase::Changed);
                assert!((p.scale - 1.1).abs() < 1e-6);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(t.wheel_lines(0.0).is_empty());
        assert_eq!(t.wheel_pixels(-20.0).len(), 3);
    }

    #[test]
    fn test_two_fingers_pinch() {
        let mut t = TouchTracker::new();
        let a = t.touch(1, TouchPhase::Started, Vec2::new(100.0, 100.0));
        assert_eq!(a, vec![pan(Vec2::new(100.0, 100.0), GesturePhase::Began)]);

        let b = t.touch(2, TouchPhase::Started, Vec2::new(200.0, 100.0));
        assert_eq!(b[0], pan(Vec2::new(200.0, 100.0), GesturePhase::Cancelled));
        assert_eq!(b[1], pinch(1.0, GesturePhase::Began));

        let moved = t.touch(2, TouchPhase::Moved, Vec2::new(300.0, 100.0));
        assert_eq!(moved, vec![pinch(2.0, GesturePhase::Changed)]);
        assert_eq!(t.input_state().touches.len(), 2);

        let lifted = t.touch(2, TouchPhase::Ended, Vec2::new(300.0, 100.0));
        assert_eq!(lifted[0], pinch(1.0, GesturePhase::Ended));
        assert_eq!(lifted[1], pan(Vec2::new(100.0, 100.0), GesturePhase::Began));

        let last = t.touch(1, TouchPhase::Ended, Vec2::new(100.0, 100.0));
        assert_eq!(last, vec![pan(Vec2::new(100.0, 100.0), GesturePhase::Ended)]);
        assert!(!t.is_dragging());
    }

    #[test]
    fn test_unknown_touch_is_ignored() {
        let mut t = TouchTracker::new();
        assert!(t.touch(9, TouchPhase::Moved, Vec2::ZERO).is_empty());
        assert!(t.touch(9, TouchPhase::Ended, Vec2::ZERO).is_empty());
    }

    #[test]
    fn test_cancel_clears_state() {
        let mut t = TouchTracker::new();
        t.mouse_button(true);
        let events = t.cancel();
        assert_eq!(events.len(), 1);
        assert!(!t.is_dragging());
    }
}

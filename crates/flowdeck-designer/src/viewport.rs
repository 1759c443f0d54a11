//! Screen/document coordinate math.
//!
//! `screen = doc * zoom + offset`, `doc = (screen - offset) / zoom`.
//! Zoom is anchored at the viewport origin: changing it leaves the offset alone.

use flowdeck_core::types::Position;

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 2.0;
/// Zoom change of one +/- button press.
pub const ZOOM_STEP: f64 = 0.1;
/// Zoom factor of one wheel tick towards the user (scroll down).
pub const WHEEL_OUT_FACTOR: f64 = 0.9;
/// Zoom factor of one wheel tick away from the user (scroll up).
pub const WHEEL_IN_FACTOR: f64 = 1.1;

pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        return 1.0;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// A 2D affine transform in the `{a, b, c, d, e, f}` matrix layout:
///
/// ```text
/// | a c e |
/// | b d f |
/// | 0 0 1 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// Document-to-screen transform for a pan offset and zoom.
    pub fn from_viewport(offset: Position, zoom: f64) -> Self {
        Self {
            a: zoom,
            b: 0.0,
            c: 0.0,
            d: zoom,
            e: offset.x,
            f: offset.y,
        }
    }

    pub fn apply(&self, p: Position) -> Position {
        Position::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// The inverse transform, or `None` when the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Self {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }
}

/// Pan offset and zoom of the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub offset: Position,
    zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Position::default(),
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(offset: Position, zoom: f64) -> Self {
        Self {
            offset,
            zoom: clamp_zoom(zoom),
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = clamp_zoom(zoom);
    }

    pub fn transform(&self) -> Transform {
        Transform::from_viewport(self.offset, self.zoom)
    }

    pub fn doc_to_screen(&self, p: Position) -> Position {
        Position::new(
            p.x * self.zoom + self.offset.x,
            p.y * self.zoom + self.offset.y,
        )
    }

    pub fn screen_to_doc(&self, p: Position) -> Position {
        Position::new(
            (p.x - self.offset.x) / self.zoom,
            (p.y - self.offset.y) / self.zoom,
        )
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset.x += dx;
        self.offset.y += dy;
    }

    /// One wheel tick. Positive `delta_y` scrolls down and zooms out.
    pub fn wheel(&mut self, delta_y: f64) {
        if delta_y > 0.0 {
            self.set_zoom(self.zoom * WHEEL_OUT_FACTOR);
        } else if delta_y < 0.0 {
            self.set_zoom(self.zoom * WHEEL_IN_FACTOR);
        }
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(round_to_step(self.zoom + ZOOM_STEP));
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(round_to_step(self.zoom - ZOOM_STEP));
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// Keeps repeated button steps on the 0.1 grid (0.7 instead of 0.7000000000000001).
fn round_to_step(zoom: f64) -> f64 {
    (zoom / ZOOM_STEP).round() * ZOOM_STEP
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: Position, b: Position) -> bool {
        (a.x - b.x).abs() < EPS * (1.0 + b.x.abs()) && (a.y - b.y).abs() < EPS * (1.0 + b.y.abs())
    }

    #[test]
    fn test_round_trip_over_grid() {
        let points = [
            Position::new(0.0, 0.0),
            Position::new(123.5, -40.25),
            Position::new(-9_999.0, 1e6),
        ];
        let offsets = [
            Position::new(0.0, 0.0),
            Position::new(-300.0, 75.5),
            Position::new(1e4, -1e4),
        ];
        for zoom in [0.1, 0.37, 1.0, 1.9, 2.0] {
            for offset in offsets {
                let vp = Viewport::new(offset, zoom);
                for p in points {
                    assert!(close(vp.screen_to_doc(vp.doc_to_screen(p)), p));
                    assert!(close(vp.doc_to_screen(vp.screen_to_doc(p)), p));
                }
            }
        }
    }

    #[test]
    fn test_transform_matches_viewport() {
        let vp = Viewport::new(Position::new(40.0, -12.0), 1.5);
        let t = vp.transform();
        let p = Position::new(10.0, 20.0);
        assert_eq!(t.apply(p), vp.doc_to_screen(p));
        let inv = t.inverse().unwrap();
        assert!(close(inv.apply(t.apply(p)), p));
    }

    #[test]
    fn test_singular_transform_has_no_inverse() {
        let t = Transform::from_viewport(Position::default(), 0.0);
        assert!(t.inverse().is_none());
        assert_eq!(Transform::IDENTITY.inverse(), Some(Transform::IDENTITY));
    }

    #[test]
    fn test_wheel_ticks_stay_clamped() {
        let mut vp = Viewport::default();
        for i in 0..200 {
            let delta = if (i / 37) % 2 == 0 { 1.0 } else { -1.0 };
            vp.wheel(delta);
            assert!(vp.zoom() >= MIN_ZOOM && vp.zoom() <= MAX_ZOOM);
        }
    }

    #[test]
    fn test_wheel_direction_and_anchor() {
        let mut vp = Viewport::new(Position::new(5.0, 6.0), 1.0);
        vp.wheel(3.0);
        assert!((vp.zoom() - 0.9).abs() < EPS);
        vp.wheel(-3.0);
        assert!((vp.zoom() - 0.99).abs() < EPS);
        vp.wheel(0.0);
        assert!((vp.zoom() - 0.99).abs() < EPS);
        assert_eq!(vp.offset, Position::new(5.0, 6.0));
    }

    #[test]
    fn test_zoom_out_floor_is_exact() {
        let mut vp = Viewport::default();
        for _ in 0..25 {
            vp.zoom_out();
        }
        assert_eq!(vp.zoom(), MIN_ZOOM);
    }

    #[test]
    fn test_zoom_in_ceiling_and_reset() {
        let mut vp = Viewport::default();
        for _ in 0..30 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom(), MAX_ZOOM);
        vp.pan_by(10.0, 10.0);
        vp.reset();
        assert_eq!(vp, Viewport::default());
    }

    #[test]
    fn test_nan_zoom_resets() {
        let mut vp = Viewport::default();
        vp.set_zoom(f64::NAN);
        assert_eq!(vp.zoom(), 1.0);
    }
}

//! Axis-aligned rectangles in frame or view space

use serde::{Deserialize, Serialize};

/// Integer rectangle, typically in frame-pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Square of `size` pixels centered on (`x`, `y`)
    pub fn centered(x: i32, y: i32, size: i32) -> Self {
        let radius = size / 2;
        Self::new(x - radius, y - radius, x + radius, y + radius)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center_x(&self) -> f32 {
        (self.left + self.right) as f32 * 0.5
    }

    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) as f32 * 0.5
    }

    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// Strict containment: a point on the border is outside.
    pub fn strictly_contains(&self, x: f32, y: f32) -> bool {
        x > self.left as f32 && y > self.top as f32 && x < self.right as f32 && y < self.bottom as f32
    }

    /// Clamp into `0..width` x `0..height`
    pub fn clamp_to(&self, width: u32, height: u32) -> Rect {
        let w = width as i32;
        let h = height as i32;
        Rect::new(
            self.left.clamp(0, w),
            self.top.clamp(0, h),
            self.right.clamp(0, w),
            self.bottom.clamp(0, h),
        )
    }
}

/// Floating point rectangle, typically in overlay view space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RectF {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl RectF {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Rectangle of `width` x `height` centered on (`cx`, `cy`)
    pub fn centered(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width * 0.5, cy - height * 0.5, cx + width * 0.5, cy + height * 0.5)
    }

    pub fn center_x(&self) -> f32 {
        (self.left + self.right) * 0.5
    }

    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) * 0.5
    }

    pub fn round(&self) -> Rect {
        Rect::new(
            self.left.round() as i32,
            self.top.round() as i32,
            self.right.round() as i32,
            self.bottom.round() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_containment() {
        let rect = Rect::new(10, 10, 20, 20);
        assert!(rect.strictly_contains(15.0, 15.0));
        assert!(!rect.strictly_contains(10.0, 15.0));
        assert!(!rect.strictly_contains(15.0, 20.0));
    }

    #[test]
    fn test_centered() {
        let rect = Rect::centered(320, 240, 100);
        assert_eq!(rect, Rect::new(270, 190, 370, 290));
        assert_eq!(rect.center_x(), 320.0);
    }

    #[test]
    fn test_clamp() {
        let rect = Rect::new(-5, 10, 700, 500).clamp_to(640, 480);
        assert_eq!(rect, Rect::new(0, 10, 640, 480));
    }
}

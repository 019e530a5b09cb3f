//! Cursor geometry and the cursor/element hit-test

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use wordlens_capture::{Rect, RectF};

use crate::engine::TextElement;

/// Side of the square overlay cursor, in view pixels
pub const CURSOR_SIZE: f32 = 90.0;

/// Recognition area as a fraction of the view width
pub const RECOGNITION_WIDTH_RATIO: f32 = 0.6;

/// Recognition area as a fraction of the view height
pub const RECOGNITION_HEIGHT_RATIO: f32 = 0.25;

/// Overlay layout parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorLayout {
    pub cursor_size: f32,
    pub recognition_width_ratio: f32,
    pub recognition_height_ratio: f32,
}

impl Default for CursorLayout {
    fn default() -> Self {
        Self {
            cursor_size: CURSOR_SIZE,
            recognition_width_ratio: RECOGNITION_WIDTH_RATIO,
            recognition_height_ratio: RECOGNITION_HEIGHT_RATIO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Scale {
    /// view -> frame factors
    sx: f32,
    sy: f32,
}

/// Maps the fixed overlay cursor into frame space and picks the text element under it.
///
/// Frame space here is the upright frame (rotation already applied), which
/// is the space recognizers report boxes in.
#[derive(Debug, Clone)]
pub struct CursorSelector {
    view_cursor: RectF,
    view_area: Option<RectF>,
    scale: Option<Scale>,
    frame_cursor: Option<Rect>,
    frame_area: Option<Rect>,
}

impl CursorSelector {
    pub fn new(view_cursor: RectF) -> Self {
        Self {
            view_cursor,
            view_area: None,
            scale: None,
            frame_cursor: None,
            frame_area: None,
        }
    }

    /// Selector with the cursor and recognition area centered in a `view_width` x `view_height` overlay
    pub fn for_view(view_width: f32, view_height: f32, layout: &CursorLayout) -> Self {
        let mut selector = Self::new(RectF::default());
        selector.set_view_size(view_width, view_height, layout);
        selector
    }

    /// Recompute the overlay rectangles for a resized view.
    ///
    /// Invalidates the frame-space rectangles until the next [`set_scale`](Self::set_scale).
    pub fn set_view_size(&mut self, view_width: f32, view_height: f32, layout: &CursorLayout) {
        let cx = view_width * 0.5;
        let cy = view_height * 0.5;

        self.view_cursor = RectF::centered(cx, cy, layout.cursor_size, layout.cursor_size);
        self.view_area = Some(RectF::centered(
            cx,
            cy,
            view_width * layout.recognition_width_ratio,
            view_height * layout.recognition_height_ratio,
        ));
        self.reset_scale();
    }

    /// Forget the camera scale, e.g. when the camera session ends.
    ///
    /// Hit-testing finds nothing until the next [`set_scale`](Self::set_scale).
    pub fn reset_scale(&mut self) {
        self.scale = None;
        self.frame_cursor = None;
        self.frame_area = None;
    }

    pub fn set_recognition_area(&mut self, area: Option<RectF>) {
        self.view_area = area;
        self.frame_area = match (area, self.scale) {
            (Some(area), Some(scale)) => Some(Self::to_frame(area, scale)),
            _ => None,
        };
    }

    /// Recompute the scale factors and the frame-space rectangles.
    ///
    /// `camera_width`/`camera_height` are the upright frame dimensions. A zero
    /// dimension leaves the selector unscaled and returns `false`.
    pub fn set_scale(&mut self, camera_width: u32, camera_height: u32, view_width: u32, view_height: u32) -> bool {
        if camera_width == 0 || camera_height == 0 || view_width == 0 || view_height == 0 {
            debug!(
                "ignoring degenerate cursor scale {}x{} -> {}x{}",
                camera_width, camera_height, view_width, view_height
            );
            self.reset_scale();
            return false;
        }

        let scale = Scale {
            sx: camera_width as f32 / view_width as f32,
            sy: camera_height as f32 / view_height as f32,
        };
        self.scale = Some(scale);
        self.frame_cursor = Some(Self::to_frame(self.view_cursor, scale));
        self.frame_area = self.view_area.map(|area| Self::to_frame(area, scale));

        debug!(
            "cursor scale {:.3}x{:.3}, frame cursor {:?}",
            scale.sx, scale.sy, self.frame_cursor
        );
        true
    }

    fn to_frame(rect: RectF, scale: Scale) -> Rect {
        RectF::new(
            rect.left * scale.sx,
            rect.top * scale.sy,
            rect.right * scale.sx,
            rect.bottom * scale.sy,
        )
        .round()
    }

    /// Map a frame-space rectangle back into overlay space
    pub fn frame_to_view(&self, rect: Rect) -> Option<RectF> {
        let scale = self.scale?;
        Some(RectF::new(
            rect.left as f32 / scale.sx,
            rect.top as f32 / scale.sy,
            rect.right as f32 / scale.sx,
            rect.bottom as f32 / scale.sy,
        ))
    }

    pub fn view_cursor(&self) -> RectF {
        self.view_cursor
    }

    pub fn view_recognition_area(&self) -> Option<RectF> {
        self.view_area
    }

    /// Cursor rectangle in frame space, once scaled
    pub fn cursor_frame_rect(&self) -> Option<Rect> {
        self.frame_cursor
    }

    /// Recognition area in frame space, once scaled
    pub fn recognition_frame_rect(&self) -> Option<Rect> {
        self.frame_area
    }

    pub fn is_scaled(&self) -> bool {
        self.scale.is_some()
    }

    /// Element whose box strictly contains the cursor center.
    /// If several do, the last one in traversal order wins.
    pub fn hit_test<'a, I>(&self, elements: I) -> Option<&'a TextElement>
    where
        I: IntoIterator<Item = &'a TextElement>,
    {
        let cursor = self.frame_cursor?;
        let (x, y) = (cursor.center_x(), cursor.center_y());

        let hit = elements
            .into_iter()
            .filter(|element| element.bounds.strictly_contains(x, y))
            .last();

        trace!("hit test at ({}, {}): {:?}", x, y, hit.map(|e| &e.text));
        hit
    }
}

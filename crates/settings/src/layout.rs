use std::fmt;

use serde::{Deserialize, Serialize};

/// Which divider a drag gesture grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Divider {
    /// Between explorer and editor.
    Left,
    /// Between editor and preview.
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DragState {
    #[default]
    Idle,
    DraggingLeft,
    DraggingRight,
}

impl DragState {
    pub fn is_dragging(self) -> bool {
        !matches!(self, DragState::Idle)
    }
}

/// Pointer input, with `x` measured from the left edge of the layout region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Divider),
    Move { x: f32 },
    Up,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaneBounds {
    pub left_default: f32,
    pub left_min: f32,
    pub left_max: f32,
    pub right_min: f32,
    /// Space kept free for explorer and editor when the preview grows.
    pub right_reserve: f32,
    /// Initial preview width as a share of the viewport.
    pub right_ratio: f32,
    pub divider_width: f32,
    pub editor_min: f32,
}

impl Default for PaneBounds {
    fn default() -> Self {
        Self {
            left_default: 280.0,
            left_min: 200.0,
            left_max: 500.0,
            right_min: 300.0,
            right_reserve: 500.0,
            right_ratio: 0.4,
            divider_width: 4.0,
            editor_min: 120.0,
        }
    }
}

impl PaneBounds {
    pub fn validate(&self) -> Result<(), LayoutError> {
        let values = [
            ("left_default", self.left_default),
            ("left_min", self.left_min),
            ("left_max", self.left_max),
            ("right_min", self.right_min),
            ("right_reserve", self.right_reserve),
            ("divider_width", self.divider_width),
            ("editor_min", self.editor_min),
        ];
        for (field, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(LayoutError::InvalidBound { field, value });
            }
        }
        if self.left_min > self.left_max {
            return Err(LayoutError::InvertedRange {
                min: self.left_min,
                max: self.left_max,
            });
        }
        if !(0.0..=1.0).contains(&self.right_ratio) {
            return Err(LayoutError::InvalidRatio(self.right_ratio));
        }
        Ok(())
    }

    /// Replaces invalid fields with defaults.
    pub fn sanitize(&mut self) {
        if self.validate().is_ok() {
            return;
        }
        let defaults = Self::default();
        let fix = |value: &mut f32, fallback: f32| {
            if !value.is_finite() || *value < 0.0 {
                *value = fallback;
            }
        };
        fix(&mut self.left_default, defaults.left_default);
        fix(&mut self.left_min, defaults.left_min);
        fix(&mut self.left_max, defaults.left_max);
        fix(&mut self.right_min, defaults.right_min);
        fix(&mut self.right_reserve, defaults.right_reserve);
        fix(&mut self.divider_width, defaults.divider_width);
        fix(&mut self.editor_min, defaults.editor_min);
        if self.left_min > self.left_max {
            self.left_min = defaults.left_min;
            self.left_max = defaults.left_max;
        }
        if !(0.0..=1.0).contains(&self.right_ratio) {
            self.right_ratio = defaults.right_ratio;
        }
    }
}

/// One horizontal span of the layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub start: f32,
    pub width: f32,
}

impl Span {
    pub fn end(&self) -> f32 {
        self.start + self.width
    }

    pub fn contains(&self, x: f32) -> bool {
        x >= self.start && x < self.end()
    }
}

/// Geometry of the three regions and their dividers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaneRegions {
    pub explorer: Span,
    pub left_divider: Span,
    pub editor: Span,
    pub right_divider: Option<Span>,
    pub preview: Option<Span>,
}

/// Explorer / editor / preview widths and the drag state machine.
/// 檔案總管、編輯器與預覽的寬度，以及拖曳狀態機。
///
/// Widths are clamped on every update. Pointer-up and pointer-leave always return to
/// [`DragState::Idle`]. The preview width is kept while the preview is hidden.
/// 每次更新都會限制寬度範圍；放開或離開指標必定回到閒置；預覽隱藏時保留其寬度。
#[derive(Debug, Clone, PartialEq)]
pub struct PaneLayout {
    left_width: f32,
    right_width: f32,
    drag_state: DragState,
    preview_visible: bool,
    viewport_width: f32,
    bounds: PaneBounds,
}

impl PaneLayout {
    pub fn new(bounds: PaneBounds, viewport_width: f32) -> Self {
        let viewport_width = sanitize_width(viewport_width);
        let mut layout = Self {
            left_width: bounds.left_default,
            right_width: viewport_width * bounds.right_ratio,
            drag_state: DragState::Idle,
            preview_visible: false,
            viewport_width,
            bounds,
        };
        layout.reclamp();
        layout
    }

    pub fn left_width(&self) -> f32 {
        self.left_width
    }

    /// Stored preview width, meaningful only while the preview is visible.
    pub fn right_width(&self) -> f32 {
        self.right_width
    }

    pub fn drag_state(&self) -> DragState {
        self.drag_state
    }

    pub fn preview_visible(&self) -> bool {
        self.preview_visible
    }

    pub fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    pub fn bounds(&self) -> &PaneBounds {
        &self.bounds
    }

    pub fn left_range(&self) -> (f32, f32) {
        let b = &self.bounds;
        let mut reserved = b.editor_min + b.divider_width;
        if self.preview_visible {
            reserved += self.right_width + b.divider_width;
        }
        let max = b.left_max.min(self.viewport_width - reserved);
        (b.left_min, max.max(b.left_min))
    }

    pub fn right_range(&self) -> (f32, f32) {
        let b = &self.bounds;
        let reserved = b
            .right_reserve
            .max(self.left_width + b.editor_min + 2.0 * b.divider_width);
        let max = self.viewport_width - reserved;
        (b.right_min, max.max(b.right_min))
    }

    /// Starts a drag. Grabbing the right divider while the preview is hidden is ignored.
    pub fn pointer_down(&mut self, divider: Divider) -> bool {
        self.drag_state = match divider {
            Divider::Left => DragState::DraggingLeft,
            Divider::Right if self.preview_visible => DragState::DraggingRight,
            Divider::Right => return false,
        };
        true
    }

    /// Recomputes the dragged width. Returns whether a width changed.
    pub fn pointer_move(&mut self, x: f32) -> bool {
        if !x.is_finite() {
            return false;
        }
        match self.drag_state {
            DragState::Idle => false,
            DragState::DraggingLeft => {
                let (min, max) = self.left_range();
                let width = clamp_span(x, min, max);
                let changed = width != self.left_width;
                self.left_width = width;
                changed
            }
            DragState::DraggingRight => {
                let (min, max) = self.right_range();
                let width = clamp_span(self.viewport_width - x, min, max);
                let changed = width != self.right_width;
                self.right_width = width;
                changed
            }
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag_state = DragState::Idle;
    }

    pub fn pointer_leave(&mut self) {
        self.drag_state = DragState::Idle;
    }

    pub fn handle(&mut self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Down(divider) => self.pointer_down(divider),
            PointerEvent::Move { x } => self.pointer_move(x),
            PointerEvent::Up => {
                self.pointer_up();
                false
            }
            PointerEvent::Leave => {
                self.pointer_leave();
                false
            }
        }
    }

    pub fn set_viewport_width(&mut self, width: f32) {
        let width = sanitize_width(width);
        if width != self.viewport_width {
            self.viewport_width = width;
            self.reclamp();
        }
    }

    /// Shows or hides the preview region without touching the stored width.
    pub fn set_preview_visible(&mut self, visible: bool) {
        self.preview_visible = visible;
        if !visible && self.drag_state == DragState::DraggingRight {
            self.drag_state = DragState::Idle;
        }
        if visible {
            self.reclamp();
        }
    }

    pub fn toggle_preview(&mut self) -> bool {
        self.set_preview_visible(!self.preview_visible);
        self.preview_visible
    }

    /// Which divider sits under `x`, if any.
    pub fn hit_test(&self, x: f32) -> Option<Divider> {
        let regions = self.regions();
        if regions.left_divider.contains(x) {
            return Some(Divider::Left);
        }
        regions
            .right_divider
            .filter(|span| span.contains(x))
            .map(|_| Divider::Right)
    }

    pub fn regions(&self) -> PaneRegions {
        let divider = self.bounds.divider_width;
        let explorer = Span {
            start: 0.0,
            width: self.left_width,
        };
        let left_divider = Span {
            start: explorer.end(),
            width: divider,
        };
        let (right_divider, preview) = if self.preview_visible {
            let preview = Span {
                start: (self.viewport_width - self.right_width).max(left_divider.end()),
                width: self.right_width,
            };
            let right_divider = Span {
                start: (preview.start - divider).max(left_divider.end()),
                width: divider,
            };
            (Some(right_divider), Some(preview))
        } else {
            (None, None)
        };
        let editor_end = right_divider.map_or(self.viewport_width, |span| span.start);
        let editor = Span {
            start: left_divider.end(),
            width: (editor_end - left_divider.end()).max(0.0),
        };
        PaneRegions {
            explorer,
            left_divider,
            editor,
            right_divider,
            preview,
        }
    }

    fn reclamp(&mut self) {
        let (min, max) = self.right_range();
        self.right_width = clamp_span(self.right_width, min, max);
        let (min, max) = self.left_range();
        self.left_width = clamp_span(self.left_width, min, max);
    }
}

fn sanitize_width(width: f32) -> f32 {
    if width.is_finite() {
        width.max(0.0)
    } else {
        0.0
    }
}

/// Clamps to `[min, max]`, letting `min` win when the range is inverted.
fn clamp_span(value: f32, min: f32, max: f32) -> f32 {
    let max = max.max(min);
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    InvalidBound { field: &'static str, value: f32 },
    InvertedRange { min: f32, max: f32 },
    InvalidRatio(f32),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::InvalidBound { field, value } => {
                write!(f, "layout bound '{field}' must be a non-negative number, got {value}")
            }
            LayoutError::InvertedRange { min, max } => {
                write!(f, "left pane minimum {min} exceeds maximum {max}")
            }
            LayoutError::InvalidRatio(value) => {
                write!(f, "preview ratio {value} is outside the 0.0..=1.0 range")
            }
        }
    }
}

impl std::error::Error for LayoutError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> PaneLayout {
        let mut layout = PaneLayout::new(PaneBounds::default(), 1400.0);
        layout.set_preview_visible(true);
        layout
    }

    #[test]
    fn initial_widths_follow_bounds() {
        let layout = PaneLayout::new(PaneBounds::default(), 1400.0);
        assert_eq!(layout.left_width(), 280.0);
        assert_eq!(layout.right_width(), 560.0);
        assert!(!layout.preview_visible());
        assert_eq!(layout.drag_state(), DragState::Idle);
    }

    #[test]
    fn left_drag_is_clamped() {
        let mut layout = layout();
        assert!(layout.pointer_down(Divider::Left));
        assert_eq!(layout.drag_state(), DragState::DraggingLeft);
        layout.pointer_move(350.0);
        assert_eq!(layout.left_width(), 350.0);
        layout.pointer_move(10.0);
        assert_eq!(layout.left_width(), 200.0);
        layout.pointer_move(900.0);
        assert_eq!(layout.left_width(), 500.0);
        layout.pointer_up();
        assert_eq!(layout.drag_state(), DragState::Idle);
    }

    #[test]
    fn right_drag_measures_from_viewport_edge() {
        let mut layout = layout();
        layout.pointer_down(Divider::Right);
        layout.pointer_move(1000.0);
        assert_eq!(layout.right_width(), 400.0);
        layout.pointer_move(1300.0);
        assert_eq!(layout.right_width(), 300.0);
        layout.pointer_move(0.0);
        assert_eq!(layout.right_width(), 900.0);
        layout.pointer_leave();
        assert_eq!(layout.drag_state(), DragState::Idle);
    }

    #[test]
    fn moves_while_idle_change_nothing() {
        let mut layout = layout();
        let before = layout.clone();
        assert!(!layout.pointer_move(420.0));
        assert_eq!(layout, before);
    }

    #[test]
    fn right_divider_needs_visible_preview() {
        let mut layout = PaneLayout::new(PaneBounds::default(), 1400.0);
        assert!(!layout.pointer_down(Divider::Right));
        assert_eq!(layout.drag_state(), DragState::Idle);
        assert!(layout.regions().preview.is_none());
    }

    #[test]
    fn preview_width_survives_toggle() {
        let mut layout = layout();
        layout.pointer_down(Divider::Right);
        layout.pointer_move(1050.0);
        layout.pointer_up();
        assert_eq!(layout.right_width(), 350.0);
        assert!(!layout.toggle_preview());
        assert!(layout.toggle_preview());
        assert_eq!(layout.right_width(), 350.0);
    }

    #[test]
    fn hiding_preview_mid_drag_stops_drag() {
        let mut layout = layout();
        layout.pointer_down(Divider::Right);
        layout.set_preview_visible(false);
        assert_eq!(layout.drag_state(), DragState::Idle);
    }

    #[test]
    fn regions_tile_the_viewport() {
        let layout = layout();
        let regions = layout.regions();
        assert_eq!(regions.explorer.width, 280.0);
        assert_eq!(regions.editor.start, 284.0);
        let preview = regions.preview.unwrap();
        assert_eq!(preview.end(), 1400.0);
        assert_eq!(regions.right_divider.unwrap().end(), preview.start);
        assert_eq!(regions.editor.end(), regions.right_divider.unwrap().start);
        assert_eq!(layout.hit_test(281.0), Some(Divider::Left));
        assert_eq!(layout.hit_test(600.0), None);
    }

    #[test]
    fn narrow_viewport_keeps_minimums() {
        let mut layout = layout();
        layout.set_viewport_width(300.0);
        assert_eq!(layout.left_width(), 200.0);
        assert_eq!(layout.right_width(), 300.0);
        layout.pointer_down(Divider::Left);
        layout.pointer_move(f32::NAN);
        layout.pointer_move(450.0);
        assert_eq!(layout.left_width(), 200.0);
    }

    #[test]
    fn sanitize_repairs_bounds() {
        let mut bounds = PaneBounds {
            left_min: 600.0,
            right_ratio: 3.0,
            divider_width: f32::NAN,
            ..PaneBounds::default()
        };
        assert!(bounds.validate().is_err());
        bounds.sanitize();
        assert_eq!(bounds, PaneBounds::default());
    }
}

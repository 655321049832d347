//! Translates raw egui pointer input into pane layout events.
//! 將 egui 指標輸入轉換為窗格配置事件。

use cipherstudio_settings::{PaneLayout, PointerEvent};
use egui::{Pos2, Rect};

/// Extra pixels on each side of a divider that still grab it.
pub const GRAB_SLOP: f32 = 3.0;

/// Pointer input for one frame, in layout coordinates (0 = left edge of the panes).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerFrame {
    /// `None` once the pointer is outside the pane region (header, status bar, or
    /// outside the window).
    pub x: Option<f32>,
    pub pressed: bool,
    pub released: bool,
}

/// Layout x coordinate of `pos`, or `None` when it lies outside `panes`.
pub fn layout_x(pos: Option<Pos2>, panes: Rect) -> Option<f32> {
    pos.filter(|pos| panes.contains(*pos))
        .map(|pos| pos.x - panes.left())
}

/// Divider under `x`, tolerating [`GRAB_SLOP`].
pub fn grab_target(layout: &PaneLayout, x: f32) -> Option<cipherstudio_settings::Divider> {
    layout
        .hit_test(x)
        .or_else(|| layout.hit_test(x - GRAB_SLOP))
        .or_else(|| layout.hit_test(x + GRAB_SLOP))
}

/// Events for `frame`, in the order they must be applied.
pub fn events_for(layout: &PaneLayout, frame: PointerFrame) -> Vec<PointerEvent> {
    let mut events = Vec::new();
    let dragging = layout.drag_state().is_dragging();
    match frame.x {
        None if dragging => events.push(PointerEvent::Leave),
        None => {}
        Some(x) => {
            if frame.pressed && !dragging {
                if let Some(divider) = grab_target(layout, x) {
                    events.push(PointerEvent::Down(divider));
                }
            } else if dragging {
                events.push(PointerEvent::Move { x });
            }
        }
    }
    if frame.released && (dragging || !events.is_empty()) {
        events.push(PointerEvent::Up);
    }
    events
}

/// Applies `frame` to `layout`. Returns whether a width changed.
pub fn apply(layout: &mut PaneLayout, frame: PointerFrame) -> bool {
    let mut changed = false;
    for event in events_for(layout, frame) {
        changed |= layout.handle(event);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipherstudio_settings::{DragState, PaneBounds};

    fn layout() -> PaneLayout {
        let mut layout = PaneLayout::new(PaneBounds::default(), 1600.0);
        layout.set_preview_visible(true);
        layout
    }

    fn at(x: f32) -> PointerFrame {
        PointerFrame {
            x: Some(x),
            ..PointerFrame::default()
        }
    }

    #[test]
    fn press_near_divider_starts_drag() {
        let mut layout = layout();
        let divider = layout.regions().left_divider;
        let frame = PointerFrame {
            pressed: true,
            ..at(divider.end() + 2.0)
        };
        apply(&mut layout, frame);
        assert_eq!(layout.drag_state(), DragState::DraggingLeft);

        assert!(apply(&mut layout, at(350.0)));
        assert_eq!(layout.left_width(), 350.0);

        apply(
            &mut layout,
            PointerFrame {
                released: true,
                ..at(350.0)
            },
        );
        assert_eq!(layout.drag_state(), DragState::Idle);
    }

    #[test]
    fn press_elsewhere_does_nothing() {
        let mut layout = layout();
        let frame = PointerFrame {
            pressed: true,
            ..at(700.0)
        };
        assert!(events_for(&layout, frame).is_empty());
        apply(&mut layout, frame);
        assert_eq!(layout.drag_state(), DragState::Idle);
    }

    #[test]
    fn pointer_over_header_while_dragging_yields_leave() {
        let panes = Rect::from_min_max(egui::pos2(0.0, 38.0), egui::pos2(1600.0, 736.0));
        let mut layout = layout();
        layout.pointer_down(cipherstudio_settings::Divider::Left);

        let frame = PointerFrame {
            x: layout_x(Some(egui::pos2(300.0, 10.0)), panes),
            ..PointerFrame::default()
        };
        assert_eq!(frame.x, None);
        assert_eq!(events_for(&layout, frame), vec![PointerEvent::Leave]);
        let width = layout.left_width();
        apply(&mut layout, frame);
        assert_eq!(layout.drag_state(), DragState::Idle);
        assert_eq!(layout.left_width(), width);

        assert_eq!(layout_x(Some(egui::pos2(300.0, 100.0)), panes), Some(300.0));
    }

    #[test]
    fn leaving_the_window_ends_the_drag() {
        let mut layout = layout();
        layout.pointer_down(cipherstudio_settings::Divider::Right);
        assert_eq!(
            events_for(&layout, PointerFrame::default()),
            vec![PointerEvent::Leave]
        );
        apply(&mut layout, PointerFrame::default());
        assert_eq!(layout.drag_state(), DragState::Idle);
    }
}

use cipherstudio_settings::{Divider, DragState, PaneBounds, PaneLayout, PointerEvent};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Pointer(PointerEvent),
    Resize(f32),
    TogglePreview,
}

fn pointer_event() -> impl Strategy<Value = PointerEvent> {
    prop_oneof![
        Just(PointerEvent::Down(Divider::Left)),
        Just(PointerEvent::Down(Divider::Right)),
        (-500.0f32..3000.0).prop_map(|x| PointerEvent::Move { x }),
        Just(PointerEvent::Up),
        Just(PointerEvent::Leave),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => pointer_event().prop_map(Step::Pointer),
        1 => (0.0f32..2500.0).prop_map(Step::Resize),
        1 => Just(Step::TogglePreview),
    ]
}

fn apply(layout: &mut PaneLayout, step: &Step) {
    match step {
        Step::Pointer(event) => {
            layout.handle(*event);
        }
        Step::Resize(width) => layout.set_viewport_width(*width),
        Step::TogglePreview => {
            layout.toggle_preview();
        }
    }
}

proptest! {
    #[test]
    fn widths_stay_within_bounds(
        viewport in 0.0f32..2500.0,
        steps in prop::collection::vec(step(), 0..64),
    ) {
        let bounds = PaneBounds::default();
        let mut layout = PaneLayout::new(bounds, viewport);
        for step in &steps {
            apply(&mut layout, step);
            let right_max = (layout.viewport_width() - bounds.right_reserve).max(bounds.right_min);
            prop_assert!(layout.left_width() >= bounds.left_min);
            prop_assert!(layout.left_width() <= bounds.left_max);
            prop_assert!(layout.right_width() >= bounds.right_min);
            prop_assert!(layout.right_width() <= right_max);
        }
    }

    #[test]
    fn release_always_returns_to_idle(
        steps in prop::collection::vec(step(), 0..64),
        leave in any::<bool>(),
    ) {
        let mut layout = PaneLayout::new(PaneBounds::default(), 1280.0);
        for step in &steps {
            apply(&mut layout, step);
        }
        layout.handle(if leave { PointerEvent::Leave } else { PointerEvent::Up });
        prop_assert_eq!(layout.drag_state(), DragState::Idle);
    }

    #[test]
    fn hidden_preview_never_drags_right(
        steps in prop::collection::vec(pointer_event(), 0..64),
    ) {
        let mut layout = PaneLayout::new(PaneBounds::default(), 1280.0);
        let stored = layout.right_width();
        for event in &steps {
            layout.handle(*event);
            prop_assert_ne!(layout.drag_state(), DragState::DraggingRight);
        }
        prop_assert_eq!(layout.right_width(), stored);
    }
}

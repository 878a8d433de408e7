use proptest::prelude::*;
use sb_args::{ArgTypes, Args};
use sb_index::Parameters;
use sb_preview::handle::{RenderHandle, Rerender};
use sb_preview::{allowed_transitions, validate_transition, Interrupt, PreparedStory, RenderState};
use std::sync::Arc;

fn any_state() -> impl Strategy<Value = RenderState> {
    prop_oneof![
        Just(RenderState::Preparing),
        Just(RenderState::Rendering),
        Just(RenderState::Rendered),
        Just(RenderState::Errored),
        Just(RenderState::TearingDown),
        Just(RenderState::TornDown),
    ]
}

#[test]
fn test_preparing_transitions() {
    assert!(validate_transition(RenderState::Preparing, RenderState::Rendering).is_ok());
    assert!(validate_transition(RenderState::Preparing, RenderState::Errored).is_ok());
    assert!(validate_transition(RenderState::Preparing, RenderState::TearingDown).is_ok());

    // Invalid
    assert!(validate_transition(RenderState::Preparing, RenderState::Rendered).is_err());
    assert!(validate_transition(RenderState::Preparing, RenderState::TornDown).is_err());
}

#[test]
fn test_settled_states_can_rerender() {
    assert!(validate_transition(RenderState::Rendered, RenderState::Rendering).is_ok());
    assert!(validate_transition(RenderState::Errored, RenderState::Rendering).is_ok());
    assert!(validate_transition(RenderState::TornDown, RenderState::Rendering).is_err());
}

#[test]
fn test_rerender_bumps_generation() {
    let story = PreparedStory {
        id: "button--primary".into(),
        name: "Primary".into(),
        title: "Button".into(),
        import_path: "./Button.stories.ts".into(),
        export_name: "Primary".into(),
        tags: Vec::new(),
        initial_args: Args::new(),
        arg_types: ArgTypes::new(),
        parameters: Parameters::new(),
    };
    let handle = RenderHandle::new(1, "button--primary");
    {
        let mut guard = handle.guard(0).unwrap();
        guard.set_story(Arc::new(story));
        guard.transition(RenderState::Rendering).unwrap();
        guard.transition(RenderState::Rendered).unwrap();
    }

    let Rerender::Start { generation, story } = handle.request_rerender() else {
        panic!("settled handle with a story should re-render");
    };
    assert_eq!(generation, 1);
    assert_eq!(story.export_name, "Primary");
    assert_eq!(handle.state(), RenderState::Rendering);
    assert!(matches!(handle.guard(0), Err(Interrupt::Aborted)));
}

#[test]
fn test_stale_guard_after_teardown() {
    let handle = RenderHandle::new(7, "card--default");
    handle.teardown();

    assert!(matches!(handle.guard(0), Err(Interrupt::Aborted)));
    assert!(matches!(handle.request_rerender(), Rerender::Closed));
}

proptest! {
    #[test]
    fn prop_validate_agrees_with_allowed(from in any_state(), to in any_state()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);

        prop_assert_eq!(res.is_ok(), allowed.contains(&to));
    }

    #[test]
    fn prop_closing_states_never_reopen(to in any_state()) {
        prop_assert!(validate_transition(RenderState::TornDown, to).is_err());
        if to != RenderState::TornDown {
            prop_assert!(validate_transition(RenderState::TearingDown, to).is_err());
        }
    }

    #[test]
    fn prop_teardown_invalidates_every_captured_generation(captured in 0u64..4) {
        let handle = RenderHandle::new(1, "button--primary");
        handle.teardown();
        prop_assert!(handle.guard(captured).is_err());
    }
}

//! Integration tests for state-transition animation driven from
//! resolved styles.

use std::rc::Rc;
use std::time::{Duration, Instant};

use tessera_style::cascade::{PRIORITY_APPLICATION, StyleContext};
use tessera_style::{
    ElementPath, PathElement, Rgba, StateAnimator, StateFlags, StyleRegistry, TextSourceProvider,
    TransitionDescription, Value,
};

fn styled_context(css: &str) -> StyleContext {
    let registry = Rc::new(StyleRegistry::new());
    let provider = Rc::new(TextSourceProvider::new(Rc::clone(&registry)));
    let mut errors = Vec::new();
    provider.load_from_text(css, &mut errors);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");

    let mut context = StyleContext::new(registry);
    context.add_provider(PRIORITY_APPLICATION, provider);
    context
}

#[test]
fn test_transition_declared_in_the_sheet_drives_blending() {
    let context = styled_context(
        "Button { background-color: black; transition: 100ms linear; }\n\
         Button:hover { background-color: white; }",
    );
    let path = ElementPath::new().then(PathElement::new("Button"));
    let mut errors = Vec::new();

    let from = context.resolve(&path, &mut errors);
    let to = context.resolve(&path.clone().with_state(StateFlags::HOVER), &mut errors);

    let Some(Value::Transition(description)) = from.get("transition") else {
        panic!("expected a transition value");
    };
    assert_eq!(description.duration, Duration::from_millis(100));

    let mut animator = StateAnimator::new();
    animator.state_change(None, StateFlags::HOVER, &description, true);

    let start = Instant::now();
    let _ = animator.tick(start);
    let requests = animator.tick(start + Duration::from_millis(50));
    let progress = requests[0].progress;
    assert!((progress - 0.5).abs() < 0.01);

    let blended = from
        .get("background-color")
        .unwrap()
        .interpolate(&to.get("background-color").unwrap(), progress)
        .unwrap();
    let Value::Rgba(Rgba { r, .. }) = blended else {
        panic!("expected a concrete color");
    };
    assert!((120..=135).contains(&r));
}

#[test]
fn test_turning_off_mid_flight_reverses_instead_of_duplicating() {
    let description = TransitionDescription::parse("100ms linear").unwrap();
    let mut animator = StateAnimator::new();

    animator.state_change(None, StateFlags::HOVER, &description, true);
    let start = Instant::now();
    let _ = animator.tick(start);
    let _ = animator.tick(start + Duration::from_millis(70));

    animator.state_change(None, StateFlags::HOVER, &description, false);

    // Still exactly one timeline for the pair, now playing back down.
    let requests = animator.tick(start + Duration::from_millis(90));
    assert_eq!(requests.len(), 1);
    assert!((requests[0].progress - 0.5).abs() < 0.01);

    // It runs out at zero and is removed.
    let requests = animator.tick(start + Duration::from_millis(500));
    assert!(requests[0].finished);
    assert!((requests[0].progress).abs() < 1e-9);
    assert!(animator.is_idle());
}

#[test]
fn test_opposite_change_on_a_looping_timeline_disables_the_loop() {
    let description = TransitionDescription::parse("100ms linear loop").unwrap();
    let mut animator = StateAnimator::new();

    animator.state_change(None, StateFlags::SELECTED, &description, true);
    let start = Instant::now();
    let _ = animator.tick(start);

    // Without the flip the loop would wrap forever.
    animator.state_change(None, StateFlags::SELECTED, &description, false);

    let requests = animator.tick(start + Duration::from_millis(250));
    assert!(requests[0].finished);
    assert!(animator.is_idle());
}

#[test]
fn test_cancel_by_region() {
    let description = TransitionDescription::parse("1s").unwrap();
    let mut animator = StateAnimator::new();
    animator.state_change(Some("row"), StateFlags::SELECTED, &description, true);
    animator.state_change(None, StateFlags::HOVER, &description, true);

    animator.cancel(Some("row"));
    assert!(animator.progress(Some("row"), StateFlags::SELECTED).is_none());
    assert!(animator.progress(None, StateFlags::HOVER).is_some());

    animator.cancel(None);
    assert!(animator.is_idle());
}

//! Integration tests for cascade resolution and the style cache.

use std::rc::Rc;

use tessera_style::cascade::{
    PRIORITY_APPLICATION, PRIORITY_FALLBACK, PRIORITY_THEME, PRIORITY_USER, StyleContext,
};
use tessera_style::{
    ElementPath, PathElement, Rgba, StyleError, StyleRegistry, StyleSource, TextSourceProvider,
    Value,
};

fn loaded_provider(registry: &Rc<StyleRegistry>, css: &str) -> Rc<TextSourceProvider> {
    let provider = Rc::new(TextSourceProvider::new(Rc::clone(registry)));
    let mut errors = Vec::new();
    provider.load_from_text(css, &mut errors);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    provider
}

fn button_path() -> ElementPath {
    ElementPath::new()
        .then(PathElement::new("Window"))
        .then(PathElement::new("Button").with_class("primary"))
}

#[test]
fn test_specificity_selects_the_classed_rule() {
    let registry = Rc::new(StyleRegistry::new());
    let provider = loaded_provider(
        &registry,
        "* { color: red; }\nButton.primary { color: blue; }",
    );
    let mut context = StyleContext::new(registry);
    context.add_provider(PRIORITY_APPLICATION, provider);

    let mut errors = Vec::new();
    let style = context.resolve(&button_path(), &mut errors);
    assert_eq!(
        style.get("color"),
        Some(Value::Rgba(Rgba::opaque(0, 0, 255)))
    );
}

#[test]
fn test_priority_beats_specificity() {
    let registry = Rc::new(StyleRegistry::new());
    // The theme rule is more specific, but user styles outrank themes.
    let theme = loaded_provider(&registry, "Button.primary { color: red; }");
    let user = loaded_provider(&registry, "* { color: green; }");

    let mut context = StyleContext::new(registry);
    context.add_provider(PRIORITY_USER, user);
    context.add_provider(PRIORITY_THEME, theme);

    let mut errors = Vec::new();
    let style = context.resolve(&button_path(), &mut errors);
    assert_eq!(
        style.get("color"),
        Some(Value::Rgba(Rgba::opaque(0, 128, 0)))
    );
}

#[test]
fn test_shorthand_expands_to_longhands() {
    let registry = Rc::new(StyleRegistry::new());
    let provider = loaded_provider(&registry, "Button { margin: 4 8; }");
    let mut context = StyleContext::new(registry);
    context.add_provider(PRIORITY_APPLICATION, provider);

    let mut errors = Vec::new();
    let style = context.resolve(&button_path(), &mut errors);
    assert_eq!(style.get("margin-top"), Some(Value::Integer(4)));
    assert_eq!(style.get("margin-bottom"), Some(Value::Integer(4)));
    assert_eq!(style.get("margin-left"), Some(Value::Integer(8)));
    assert_eq!(style.get("margin-right"), Some(Value::Integer(8)));
}

#[test]
fn test_longhand_after_shorthand_overrides_one_side() {
    let registry = Rc::new(StyleRegistry::new());
    let provider = loaded_provider(&registry, "Button { margin: 4; margin-left: 9; }");
    let mut context = StyleContext::new(registry);
    context.add_provider(PRIORITY_APPLICATION, provider);

    let mut errors = Vec::new();
    let style = context.resolve(&button_path(), &mut errors);
    assert_eq!(style.get("margin-left"), Some(Value::Integer(9)));
    assert_eq!(style.get("margin-top"), Some(Value::Integer(4)));
}

#[test]
fn test_resolution_is_idempotent_and_cached() {
    let registry = Rc::new(StyleRegistry::new());
    let provider = loaded_provider(&registry, "Button { border-radius: 3; }");
    let mut context = StyleContext::new(registry);
    context.add_provider(PRIORITY_APPLICATION, provider);

    let mut errors = Vec::new();
    let first = context.resolve(&button_path(), &mut errors);
    let second = context.resolve(&button_path(), &mut errors);
    // Same allocation: a cache hit, not a rebuild.
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn test_reloading_a_source_invalidates_the_cache() {
    let registry = Rc::new(StyleRegistry::new());
    let provider = loaded_provider(&registry, "Button { border-radius: 3; }");
    let mut context = StyleContext::new(registry);
    context.add_provider(PRIORITY_APPLICATION, Rc::clone(&provider) as Rc<dyn StyleSource>);

    let mut errors = Vec::new();
    let before = context.resolve(&button_path(), &mut errors);
    assert_eq!(before.get("border-radius"), Some(Value::Integer(3)));

    provider.load_from_text("Button { border-radius: 7; }", &mut errors);

    let after = context.resolve(&button_path(), &mut errors);
    assert!(!Rc::ptr_eq(&before, &after));
    assert_eq!(after.get("border-radius"), Some(Value::Integer(7)));
}

#[test]
fn test_adding_a_source_invalidates_the_cache() {
    let registry = Rc::new(StyleRegistry::new());
    let base = loaded_provider(&registry, "Button { color: red; }");
    let mut context = StyleContext::new(Rc::clone(&registry));
    context.add_provider(PRIORITY_FALLBACK, base);

    let mut errors = Vec::new();
    let before = context.resolve(&button_path(), &mut errors);
    assert_eq!(
        before.get("color"),
        Some(Value::Rgba(Rgba::opaque(255, 0, 0)))
    );

    let override_provider = loaded_provider(&registry, "Button { color: white; }");
    context.add_provider(PRIORITY_APPLICATION, override_provider);

    let after = context.resolve(&button_path(), &mut errors);
    assert_eq!(after.get("color"), Some(Value::Rgba(Rgba::WHITE)));
}

#[test]
fn test_symbolic_colors_resolve_across_sources() {
    let registry = Rc::new(StyleRegistry::new());
    // The theme defines the palette and uses it; the application remaps
    // one palette entry without touching the rule.
    let theme = loaded_provider(
        &registry,
        "@accent: #ff0000;\nButton { background-color: shade(@accent, 1.0); }",
    );
    let app = loaded_provider(&registry, "@accent: #0000ff;");

    let mut context = StyleContext::new(registry);
    context.add_provider(PRIORITY_THEME, theme);
    context.add_provider(PRIORITY_APPLICATION, app);

    let mut errors = Vec::new();
    let style = context.resolve(&button_path(), &mut errors);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    assert_eq!(
        style.get("background-color"),
        Some(Value::Rgba(Rgba::opaque(0, 0, 255)))
    );
    assert_eq!(context.lookup_color("accent"), Some(Rgba::opaque(0, 0, 255)));
}

#[test]
fn test_forward_color_reference_within_a_sheet() {
    let registry = Rc::new(StyleRegistry::new());
    let provider = loaded_provider(
        &registry,
        "Button { color: @late; }\n@late: mix(@base, white, 0.5);\n@base: black;",
    );
    let mut context = StyleContext::new(registry);
    context.add_provider(PRIORITY_APPLICATION, provider);

    let mut errors = Vec::new();
    let style = context.resolve(&button_path(), &mut errors);
    assert!(errors.is_empty());
    assert_eq!(
        style.get("color"),
        Some(Value::Rgba(Rgba::opaque(128, 128, 128)))
    );
}

#[test]
fn test_color_reference_cycle_reports_and_falls_back() {
    let registry = Rc::new(StyleRegistry::new());
    let provider = loaded_provider(
        &registry,
        "@a: @b;\n@b: @a;\nButton { color: @a; }",
    );
    let mut context = StyleContext::new(registry);
    context.add_provider(PRIORITY_APPLICATION, provider);

    let mut errors = Vec::new();
    let style = context.resolve(&button_path(), &mut errors);
    assert_eq!(style.get("color"), Some(Value::Rgba(Rgba::TRANSPARENT)));
    assert!(
        errors
            .iter()
            .any(|error| matches!(error, StyleError::UnresolvedReference(_)))
    );
}

#[test]
fn test_custom_properties_survive_the_cascade() {
    let registry = Rc::new(StyleRegistry::new());
    let provider = loaded_provider(&registry, "Button { -app-glow: 3 soft; }");
    let mut context = StyleContext::new(registry);
    context.add_provider(PRIORITY_APPLICATION, provider);

    let mut errors = Vec::new();
    let style = context.resolve(&button_path(), &mut errors);
    assert_eq!(
        style.declared("-app-glow"),
        Some(&Value::Raw("3 soft".to_string()))
    );
}

#[test]
fn test_state_changes_the_signature_and_the_result() {
    let registry = Rc::new(StyleRegistry::new());
    let provider = loaded_provider(
        &registry,
        "Button { color: black; }\nButton:hover { color: white; }",
    );
    let mut context = StyleContext::new(registry);
    context.add_provider(PRIORITY_APPLICATION, provider);

    let mut errors = Vec::new();
    let plain = context.resolve(&button_path(), &mut errors);
    let hovered = context.resolve(
        &button_path().with_state(tessera_style::StateFlags::HOVER),
        &mut errors,
    );

    assert_eq!(plain.get("color"), Some(Value::Rgba(Rgba::BLACK)));
    assert_eq!(hovered.get("color"), Some(Value::Rgba(Rgba::WHITE)));
}

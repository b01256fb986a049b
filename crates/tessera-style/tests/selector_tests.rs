//! Integration tests for selector compilation and matching.

use tessera_style::{
    ElementPath, PathElement, RegionFlags, StateFlags, TypeRegistry, parse_selector,
    parse_selector_list,
};

fn toolkit_types() -> TypeRegistry {
    let types = TypeRegistry::new();
    assert!(types.register("Widget", None));
    assert!(types.register("Container", Some("Widget")));
    assert!(types.register("Window", Some("Container")));
    assert!(types.register("Box", Some("Container")));
    assert!(types.register("Button", Some("Container")));
    assert!(types.register("TreeView", Some("Container")));
    types
}

fn path_of(names: &[&str]) -> ElementPath {
    let mut path = ElementPath::new();
    for name in names {
        path = path.then(PathElement::new(*name));
    }
    path
}

#[test]
fn test_child_combinator_rejects_intermediate_ancestors() {
    let types = toolkit_types();
    let indirect = path_of(&["Window", "Box", "Button"]);

    // Window > Button: Button's parent is Box, not Window.
    let child = parse_selector("Window > Button").unwrap();
    assert_eq!(child.match_path(&indirect, &types), 0);

    // Window Button: any number of ancestors in between is fine.
    let descendant = parse_selector("Window Button").unwrap();
    assert!(descendant.match_path(&indirect, &types) > 0);
}

#[test]
fn test_class_selector_outranks_the_wildcard() {
    let types = toolkit_types();
    let path = ElementPath::new().then(PathElement::new("Button").with_class("primary"));

    let wildcard = parse_selector("*").unwrap().match_path(&path, &types);
    let classed = parse_selector("Button.primary")
        .unwrap()
        .match_path(&path, &types);

    assert!(wildcard > 0);
    assert!(classed > wildcard);
}

#[test]
fn test_type_hierarchy_distance_orders_scores() {
    let types = toolkit_types();
    let button = path_of(&["Button"]);

    let exact = parse_selector("Button").unwrap().match_path(&button, &types);
    let parent = parse_selector("Container")
        .unwrap()
        .match_path(&button, &types);
    let grandparent = parse_selector("Widget").unwrap().match_path(&button, &types);

    assert!(exact > parent);
    assert!(parent > grandparent);
    assert!(grandparent > 0);
}

#[test]
fn test_longer_chains_outrank_shorter_ones() {
    let types = toolkit_types();
    let path = path_of(&["Window", "Box", "Button"]);

    let long = parse_selector("Window Box Button")
        .unwrap()
        .match_path(&path, &types);
    let short = parse_selector("Button").unwrap().match_path(&path, &types);

    assert!(long > short);
}

#[test]
fn test_instance_name_and_region_requirements() {
    let types = toolkit_types();

    let named = ElementPath::new().then(PathElement::new("Button").with_name("ok-button"));
    assert!(parse_selector("#ok-button").unwrap().match_path(&named, &types) > 0);
    assert_eq!(
        parse_selector("#cancel-button")
            .unwrap()
            .match_path(&named, &types),
        0
    );

    let row = ElementPath::new().then(
        PathElement::new("TreeView").with_region("row", RegionFlags::EVEN | RegionFlags::FIRST),
    );
    assert!(
        parse_selector("TreeView row:nth-child(even)")
            .unwrap()
            .match_path(&row, &types)
            > 0
    );
    assert_eq!(
        parse_selector("TreeView row:nth-child(odd)")
            .unwrap()
            .match_path(&row, &types),
        0
    );
}

#[test]
fn test_state_pseudo_classes_require_a_state_subset() {
    let types = toolkit_types();
    let selector = parse_selector("Button:hover:focus").unwrap();

    let both = path_of(&["Button"]).with_state(StateFlags::HOVER | StateFlags::FOCUSED);
    let one = path_of(&["Button"]).with_state(StateFlags::HOVER);

    assert!(selector.match_path(&both, &types) > 0);
    assert_eq!(selector.match_path(&one, &types), 0);
}

#[test]
fn test_nth_child_keyword_is_closed() {
    assert!(parse_selector("row:nth-child(first)").is_ok());
    assert!(parse_selector("row:nth-child(last)").is_ok());
    assert!(parse_selector("row:nth-child(2n+1)").is_err());
    assert!(parse_selector("row:nth-child()").is_err());
}

#[test]
fn test_selector_list_shares_parsing() {
    let list = parse_selector_list("Button:active, .primary, TreeView > row").unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list[0].state, StateFlags::ACTIVE);

    // One bad chain fails the whole list, which the rule parser turns
    // into a skipped rule.
    assert!(parse_selector_list("Button, :nth-child(sometimes)").is_err());
}

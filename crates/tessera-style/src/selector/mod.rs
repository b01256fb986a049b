//! Selector compilation and matching.
//!
//! A selector chain compiles to a flat list of [`SelectorElement`]s
//! ordered leaf-first (the rightmost, most specific simple selector at
//! the head) plus a state mask collected from state pseudo-classes.
//! Matching walks the concrete element path from the leaf inward while
//! walking the compiled list forward, accumulating a 4-bit score per
//! matched element; the resulting number is the cascade's specificity
//! metric.
//!
//! Grammar notes:
//! - Type names start with an uppercase letter (`Button`), region
//!   names are lowercase (`row`). `.class`, `#name` and `*` mean what
//!   they do in CSS.
//! - `>` sets the child combinator on the element immediately
//!   preceding it; plain whitespace is the descendant combinator.
//! - State pseudo-classes (`:hover`, `:active`, `:selected`,
//!   `:insensitive`, `:focus`) apply to the whole chain. Position
//!   pseudo-classes (`:first-child`, `:last-child`, `:sorted`,
//!   `:nth-child(even|odd|first|last)`) constrain the element they
//!   follow.
//! - A bare pseudo-class selector implicitly prepends `*`.

use thiserror::Error;

use crate::path::{ElementPath, PathElement, RegionFlags, StateFlags, TypeRegistry};

/// How a selector element relates to the next element toward the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    /// Any number of intermediate ancestors may sit in between.
    #[default]
    Descendant,
    /// The next match must be at the immediately enclosing position.
    Child,
}

/// What one selector element requires of a path position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorElementKind {
    /// A widget type name, resolved against the [`TypeRegistry`] on
    /// every match attempt. Resolution failures are not cached: the
    /// type may be registered later.
    TypeName(String),
    /// An instance name requirement (`#name`).
    InstanceName(String),
    /// A style class requirement (`.class`).
    Class(String),
    /// A named region requirement with optional position flags
    /// (`row:nth-child(even)`).
    Region {
        /// The region name.
        name: String,
        /// Required position flags; empty means any.
        flags: RegionFlags,
    },
    /// `*`: matches any element, with the lowest score.
    Glob,
}

/// One step of a compiled selector.
///
/// Class, name and region elements constrain the current path position
/// without consuming it, which is how compounds like `Button.primary`
/// pile several requirements onto one element. Type and glob elements
/// consume the position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorElement {
    /// The requirement.
    pub kind: SelectorElementKind,
    /// Position flags required of the element itself, from a position
    /// pseudo-class following a non-region simple selector.
    pub position: RegionFlags,
    /// Relation to the next element toward the root.
    pub combinator: Combinator,
}

impl SelectorElement {
    fn new(kind: SelectorElementKind) -> Self {
        Self {
            kind,
            position: RegionFlags::NONE,
            combinator: Combinator::Descendant,
        }
    }

    /// Whether a successful match consumes the path position.
    const fn consumes_position(&self) -> bool {
        matches!(
            self.kind,
            SelectorElementKind::TypeName(_) | SelectorElementKind::Glob
        )
    }
}

/// A compiled selector chain: elements leaf-first, plus the state mask
/// the rule applies under.
///
/// Shared behind `Rc` by rules compiled from a comma-separated
/// selector list with one declaration block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPath {
    /// The elements, rightmost simple selector first.
    pub elements: Vec<SelectorElement>,
    /// States required by the chain's pseudo-classes. Must be a subset
    /// of the element's current state to match.
    pub state: StateFlags,
}

/// Exact match / direct hit on a secondary requirement.
const SCORE_EXACT: u64 = 0xF;
/// Score of a glob element, the loosest possible match.
const SCORE_GLOB: u64 = 0x1;

/// Outcome of matching one element against one path position.
enum ElementMatch {
    /// Matched, with a 4-bit score.
    Matched(u64),
    /// Did not match; the combinator decides whether to retry deeper.
    Failed,
    /// The required type name is unknown; the whole chain fails.
    Unresolvable,
}

impl SelectorPath {
    /// Match against a concrete element path.
    ///
    /// Returns 0 for no match. Any other value is the specificity
    /// score: 4 bits per matched element, shifted so that longer
    /// chains and closer type matches outrank shorter and looser ones,
    /// with one extra shift for chains whose head matched the leaf
    /// element directly.
    #[must_use]
    pub fn match_path(&self, path: &ElementPath, types: &TypeRegistry) -> u64 {
        if !path.state.contains(self.state) {
            return 0;
        }
        if path.elements.is_empty() {
            return 0;
        }

        let mut score = 0_u64;
        let mut element_index = 0;
        let mut path_index = path.elements.len();
        let mut first_match = false;

        while element_index < self.elements.len() && path_index > 0 {
            let element = &self.elements[element_index];
            let outcome = match_element(element, &path.elements[path_index - 1], types);

            if element_index == 0 && path_index == path.elements.len() {
                first_match = matches!(outcome, ElementMatch::Matched(_));
            }

            match outcome {
                ElementMatch::Matched(elem_score) => {
                    score = (score << 4) | elem_score;
                    element_index += 1;
                    if element.consumes_position() {
                        path_index -= 1;
                    }
                }
                ElementMatch::Unresolvable => return 0,
                ElementMatch::Failed => match element.combinator {
                    Combinator::Child => return 0,
                    // Intermediate ancestors are allowed: retry the
                    // same element one position deeper.
                    Combinator::Descendant => path_index -= 1,
                },
            }
        }

        // Elements left over means the path was exhausted first.
        if element_index < self.elements.len() {
            return 0;
        }

        if first_match {
            // Chains anchored at the element itself outrank chains
            // that only matched ancestors.
            score <<= 4;
        }

        score
    }
}

fn match_element(
    element: &SelectorElement,
    path_element: &PathElement,
    types: &TypeRegistry,
) -> ElementMatch {
    // A position requirement applies on top of the kind check.
    if !element.position.is_empty() && !path_element.position.contains(element.position) {
        return ElementMatch::Failed;
    }

    match &element.kind {
        SelectorElementKind::Glob => ElementMatch::Matched(SCORE_GLOB),

        SelectorElementKind::TypeName(name) => {
            if *name == path_element.type_name {
                return ElementMatch::Matched(SCORE_EXACT);
            }
            if !types.is_registered(name) {
                return ElementMatch::Unresolvable;
            }
            match types.distance(&path_element.type_name, name) {
                Some(levels) => {
                    ElementMatch::Matched(SCORE_EXACT - u64::from(levels).min(SCORE_EXACT - 1))
                }
                None => ElementMatch::Failed,
            }
        }

        SelectorElementKind::InstanceName(name) => {
            if path_element.instance_name.as_deref() == Some(name) {
                ElementMatch::Matched(SCORE_EXACT)
            } else {
                ElementMatch::Failed
            }
        }

        SelectorElementKind::Class(class) => {
            if path_element.has_class(class) {
                ElementMatch::Matched(SCORE_EXACT)
            } else {
                ElementMatch::Failed
            }
        }

        SelectorElementKind::Region { name, flags } => match path_element.region_flags(name) {
            Some(actual) if flags.is_empty() || actual.contains(*flags) => {
                ElementMatch::Matched(SCORE_EXACT)
            }
            _ => ElementMatch::Failed,
        },
    }
}

/// A selector the parser could not make sense of.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SelectorError(String);

impl SelectorError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Parse a comma-separated selector list.
pub fn parse_selector_list(text: &str) -> Result<Vec<SelectorPath>, SelectorError> {
    let mut selectors = Vec::new();
    let mut depth = 0_u32;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                selectors.push(parse_selector(&text[start..i])?);
                start = i + 1;
            }
            _ => {}
        }
    }
    selectors.push(parse_selector(&text[start..])?);

    Ok(selectors)
}

/// Parse one comma-free selector chain.
pub fn parse_selector(text: &str) -> Result<SelectorPath, SelectorError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SelectorError::new("empty selector"));
    }

    // Elements are collected in source order (root first) and reversed
    // at the end, which also puts the secondary elements of a compound
    // in front of its consuming type element.
    let mut elements: Vec<SelectorElement> = Vec::new();
    let mut state = StateFlags::NORMAL;

    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                // Descendant combinator, the default. Nothing to do.
            }

            '>' => match elements.last_mut() {
                Some(previous) => previous.combinator = Combinator::Child,
                None => return Err(SelectorError::new("'>' without a left-hand side")),
            },

            '*' => elements.push(SelectorElement::new(SelectorElementKind::Glob)),

            '.' => {
                let class = collect_ident(&mut chars);
                if class.is_empty() {
                    return Err(SelectorError::new("'.' without a class name"));
                }
                elements.push(SelectorElement::new(SelectorElementKind::Class(class)));
            }

            '#' => {
                let name = collect_ident(&mut chars);
                if name.is_empty() {
                    return Err(SelectorError::new("'#' without a name"));
                }
                elements.push(SelectorElement::new(SelectorElementKind::InstanceName(
                    name,
                )));
            }

            ':' => {
                let name = collect_ident(&mut chars);
                if name.is_empty() {
                    return Err(SelectorError::new("':' without a pseudo-class"));
                }
                apply_pseudo_class(&name, &mut chars, &mut elements, &mut state)?;
            }

            c if is_ident_start_char(c) => {
                let mut ident = String::new();
                ident.push(c);
                ident.push_str(&collect_ident(&mut chars));

                if c.is_uppercase() {
                    elements.push(SelectorElement::new(SelectorElementKind::TypeName(ident)));
                } else {
                    // Lowercase identifiers name regions.
                    elements.push(SelectorElement::new(SelectorElementKind::Region {
                        name: ident,
                        flags: RegionFlags::NONE,
                    }));
                }
            }

            c => {
                return Err(SelectorError::new(format!(
                    "unexpected '{c}' in selector"
                )));
            }
        }
    }

    if elements.is_empty() {
        if state.is_empty() {
            return Err(SelectorError::new("empty selector"));
        }
        // A bare pseudo-class selector implies the wildcard.
        elements.push(SelectorElement::new(SelectorElementKind::Glob));
    }

    elements.reverse();
    Ok(SelectorPath { elements, state })
}

/// Dispatch one pseudo-class.
///
/// State pseudo-classes accumulate on the chain; position
/// pseudo-classes constrain the element they follow, implicitly
/// prepending `*` when there is none.
fn apply_pseudo_class(
    name: &str,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    elements: &mut Vec<SelectorElement>,
    state: &mut StateFlags,
) -> Result<(), SelectorError> {
    if let Some(flag) = StateFlags::from_pseudo_class(name) {
        if chars.peek() == Some(&'(') {
            return Err(SelectorError::new(format!(":{name} takes no argument")));
        }
        *state |= flag;
        return Ok(());
    }

    let flags = match name {
        "first-child" => RegionFlags::FIRST,
        "last-child" => RegionFlags::LAST,
        "sorted" => RegionFlags::SORTED,
        "nth-child" => {
            if chars.next() != Some('(') {
                return Err(SelectorError::new(":nth-child requires an argument"));
            }
            let keyword = collect_ident(chars);
            if chars.next() != Some(')') {
                return Err(SelectorError::new("unclosed :nth-child argument"));
            }
            RegionFlags::from_nth_child_keyword(&keyword).ok_or_else(|| {
                SelectorError::new(format!(
                    ":nth-child argument must be even, odd, first or last, not '{keyword}'"
                ))
            })?
        }
        other => {
            return Err(SelectorError::new(format!("unknown pseudo-class ':{other}'")));
        }
    };

    if elements.is_empty() {
        elements.push(SelectorElement::new(SelectorElementKind::Glob));
    }
    if let Some(target) = elements.last_mut() {
        match &mut target.kind {
            SelectorElementKind::Region {
                flags: region_flags,
                ..
            } => *region_flags |= flags,
            _ => target.position |= flags,
        }
    }
    Ok(())
}

fn collect_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while chars.peek().is_some_and(|&c| is_ident_char(c)) {
        ident.push(chars.next().unwrap_or_default());
    }
    ident
}

const fn is_ident_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

const fn is_ident_char(c: char) -> bool {
    is_ident_start_char(c) || c.is_ascii_digit() || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathElement;

    fn types() -> TypeRegistry {
        let registry = TypeRegistry::new();
        assert!(registry.register("Widget", None));
        assert!(registry.register("Container", Some("Widget")));
        assert!(registry.register("Box", Some("Container")));
        assert!(registry.register("Button", Some("Container")));
        registry
    }

    fn path(names: &[&str]) -> ElementPath {
        let mut path = ElementPath::new();
        for name in names {
            path = path.then(PathElement::new(*name));
        }
        path
    }

    #[test]
    fn test_compound_constrains_one_element() {
        let selector = parse_selector("Button.primary").unwrap();
        let types = types();

        let with_class = ElementPath::new().then(PathElement::new("Button").with_class("primary"));
        assert!(selector.match_path(&with_class, &types) > 0);

        let without = path(&["Button"]);
        assert_eq!(selector.match_path(&without, &types), 0);
    }

    #[test]
    fn test_child_combinator_requires_direct_parent() {
        let child = parse_selector("Box > Button").unwrap();
        let descendant = parse_selector("Box Button").unwrap();
        let types = types();

        let direct = path(&["Box", "Button"]);
        let indirect = path(&["Box", "Widget", "Button"]);

        assert!(child.match_path(&direct, &types) > 0);
        assert_eq!(child.match_path(&indirect, &types), 0);
        assert!(descendant.match_path(&direct, &types) > 0);
        assert!(descendant.match_path(&indirect, &types) > 0);
    }

    #[test]
    fn test_exact_type_outranks_inherited_and_glob() {
        let types = types();
        let button = path(&["Button"]);

        let exact = parse_selector("Button").unwrap().match_path(&button, &types);
        let inherited = parse_selector("Container")
            .unwrap()
            .match_path(&button, &types);
        let glob = parse_selector("*").unwrap().match_path(&button, &types);

        assert!(exact > inherited);
        assert!(inherited > glob);
        assert!(glob > 0);
    }

    #[test]
    fn test_unregistered_type_is_unresolvable_not_permanent() {
        let types = types();
        let selector = parse_selector("Slider").unwrap();
        let slider = path(&["Slider"]);
        let button = path(&["Button"]);

        // Identity still matches even while unregistered.
        assert!(selector.match_path(&slider, &types) > 0);
        // Against anything else the chain fails outright...
        assert_eq!(selector.match_path(&button, &types), 0);

        // ...until the type becomes known.
        assert!(types.register("Slider", Some("Button")));
        assert_eq!(selector.match_path(&button, &types), 0);
        assert!(parse_selector("Button").unwrap().match_path(&slider, &types) > 0);
    }

    #[test]
    fn test_state_must_be_subset() {
        let selector = parse_selector("Button:hover").unwrap();
        let types = types();

        let plain = path(&["Button"]);
        assert_eq!(selector.match_path(&plain, &types), 0);

        let hovered = path(&["Button"]).with_state(StateFlags::HOVER | StateFlags::FOCUSED);
        assert!(selector.match_path(&hovered, &types) > 0);
    }

    #[test]
    fn test_region_with_nth_child_flags() {
        let selector = parse_selector("TreeView row:nth-child(even)").unwrap();
        let types = types();

        let even = ElementPath::new().then(
            PathElement::new("TreeView").with_region("row", RegionFlags::EVEN | RegionFlags::FIRST),
        );
        let odd = ElementPath::new()
            .then(PathElement::new("TreeView").with_region("row", RegionFlags::ODD));

        assert!(selector.match_path(&even, &types) > 0);
        assert_eq!(selector.match_path(&odd, &types), 0);
    }

    #[test]
    fn test_bare_pseudo_class_implies_wildcard() {
        let selector = parse_selector(":hover").unwrap();
        assert_eq!(selector.elements.len(), 1);
        assert_eq!(selector.elements[0].kind, SelectorElementKind::Glob);
        assert_eq!(selector.state, StateFlags::HOVER);

        let positional = parse_selector(":nth-child(odd)").unwrap();
        assert_eq!(positional.elements[0].position, RegionFlags::ODD);
    }

    #[test]
    fn test_nth_child_rejects_unknown_keyword() {
        assert!(parse_selector("row:nth-child(2n)").is_err());
        assert!(parse_selector("row:nth-child(even)").is_ok());
    }

    #[test]
    fn test_selector_list_splits_on_top_level_commas() {
        let list = parse_selector_list("Button, Entry:focus, TreeView row:nth-child(odd)").unwrap();
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_ancestor_only_match_scores_below_anchored() {
        let types = types();
        let inner = path(&["Box", "Button"]);

        // "Box" alone matches via the ancestor...
        let loose = parse_selector("Box").unwrap().match_path(&inner, &types);
        assert!(loose > 0);
        // ...but anything anchored at the leaf outranks it.
        let anchored = parse_selector("Button").unwrap().match_path(&inner, &types);
        assert!(anchored > loose);
    }
}

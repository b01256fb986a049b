//! Element paths: the hierarchical description of a styled element.
//!
//! The style engine never owns or derives this information. The widget
//! layer supplies an [`ElementPath`] — the ancestor chain from the root
//! to the element being styled — and the engine only reads it.
//! Sibling-position facts ([`RegionFlags`]) are likewise supplied by
//! the caller: the engine matches against them but never computes
//! sibling order itself.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Widget state bits a rule can require via pseudo-classes.
///
/// A selector's state requirement must be a subset of the element's
/// current state for the rule to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct StateFlags(u16);

impl StateFlags {
    /// No state bits set (the "normal" state).
    pub const NORMAL: Self = Self(0);
    /// The element is activated (`:active`).
    pub const ACTIVE: Self = Self(1);
    /// The pointer is over the element (`:hover`).
    pub const HOVER: Self = Self(1 << 1);
    /// The element is selected (`:selected`).
    pub const SELECTED: Self = Self(1 << 2);
    /// The element is insensitive (`:insensitive`).
    pub const INSENSITIVE: Self = Self(1 << 3);
    /// The element has the input focus (`:focus`).
    pub const FOCUSED: Self = Self(1 << 4);

    /// Returns true if no bits are set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if every bit of `other` is also set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// The raw bits, for cache keys and ordering.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Map a state pseudo-class name to its flag, if it is one.
    #[must_use]
    pub fn from_pseudo_class(name: &str) -> Option<Self> {
        match name {
            "active" => Some(Self::ACTIVE),
            "hover" | "prelight" => Some(Self::HOVER),
            "selected" => Some(Self::SELECTED),
            "insensitive" => Some(Self::INSENSITIVE),
            "focus" | "focused" => Some(Self::FOCUSED),
            _ => None,
        }
    }
}

impl BitOr for StateFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for StateFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for StateFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Sibling-position facts about an element or region.
///
/// These are supplied by the widget layer (a tree view knows which of
/// its rows are even, first, last...) and matched by the
/// `:nth-child()` family of pseudo-classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct RegionFlags(u16);

impl RegionFlags {
    /// No position facts.
    pub const NONE: Self = Self(0);
    /// Element is at an even sibling position.
    pub const EVEN: Self = Self(1);
    /// Element is at an odd sibling position.
    pub const ODD: Self = Self(1 << 1);
    /// Element is the first of its siblings.
    pub const FIRST: Self = Self(1 << 2);
    /// Element is the last of its siblings.
    pub const LAST: Self = Self(1 << 3);
    /// Element is the only one of its siblings.
    pub const ONLY: Self = Self(1 << 4);
    /// The siblings are currently sorted under this element.
    pub const SORTED: Self = Self(1 << 5);

    /// Returns true if no bits are set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if every bit of `other` is also set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// The raw bits, for cache keys and ordering.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Map an `nth-child(..)` keyword to its flag.
    ///
    /// Only `even`, `odd`, `first` and `last` are valid; anything else
    /// is a selector syntax error.
    #[must_use]
    pub fn from_nth_child_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "even" => Some(Self::EVEN),
            "odd" => Some(Self::ODD),
            "first" => Some(Self::FIRST),
            "last" => Some(Self::LAST),
            _ => None,
        }
    }
}

impl BitOr for RegionFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RegionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for RegionFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Sides on which an element visually joins a neighbor.
///
/// Junction sides do not take part in selector matching; they are part
/// of the cached style signature because theming engines draw joined
/// corners differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct JunctionSides(u8);

impl JunctionSides {
    /// Not joined to anything.
    pub const NONE: Self = Self(0);
    /// Joined at the top-left corner.
    pub const CORNER_TOP_LEFT: Self = Self(1);
    /// Joined at the top-right corner.
    pub const CORNER_TOP_RIGHT: Self = Self(1 << 1);
    /// Joined at the bottom-left corner.
    pub const CORNER_BOTTOM_LEFT: Self = Self(1 << 2);
    /// Joined at the bottom-right corner.
    pub const CORNER_BOTTOM_RIGHT: Self = Self(1 << 3);
    /// Joined along the whole left side.
    pub const LEFT: Self = Self(Self::CORNER_TOP_LEFT.0 | Self::CORNER_BOTTOM_LEFT.0);
    /// Joined along the whole right side.
    pub const RIGHT: Self = Self(Self::CORNER_TOP_RIGHT.0 | Self::CORNER_BOTTOM_RIGHT.0);
    /// Joined along the whole top side.
    pub const TOP: Self = Self(Self::CORNER_TOP_LEFT.0 | Self::CORNER_TOP_RIGHT.0);
    /// Joined along the whole bottom side.
    pub const BOTTOM: Self = Self(Self::CORNER_BOTTOM_LEFT.0 | Self::CORNER_BOTTOM_RIGHT.0);

    /// The raw bits, for cache keys.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for JunctionSides {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One step of an [`ElementPath`]: a single widget in the ancestor
/// chain, with everything a selector can match against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathElement {
    /// The widget type identifier, e.g. `"Button"`.
    pub type_name: String,
    /// The instance name, matched by `#name` selectors.
    pub instance_name: Option<String>,
    /// Style classes, matched by `.class` selectors. Kept sorted so the
    /// cache key is canonical.
    pub classes: BTreeSet<String>,
    /// Named sub-parts with their position flags, matched by region
    /// selectors such as `row:nth-child(even)`. Kept sorted for the
    /// cache key.
    pub regions: BTreeMap<String, RegionFlags>,
    /// Sibling-position facts about the element itself, supplied by
    /// the widget layer.
    pub position: RegionFlags,
}

impl PathElement {
    /// Create a path element of the given widget type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Set the instance name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.instance_name = Some(name.into());
        self
    }

    /// Add a style class.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        let _ = self.classes.insert(class.into());
        self
    }

    /// Add a named region with its position flags.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>, flags: RegionFlags) -> Self {
        let _ = self.regions.insert(region.into(), flags);
        self
    }

    /// Set the element's own sibling-position flags.
    #[must_use]
    pub const fn with_position(mut self, flags: RegionFlags) -> Self {
        self.position = flags;
        self
    }

    /// Returns true if the element carries the given style class.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    /// The flags of the named region, if the element has it.
    #[must_use]
    pub fn region_flags(&self, region: &str) -> Option<RegionFlags> {
        self.regions.get(region).copied()
    }
}

/// The ancestor chain of the element being styled, root first.
///
/// Owned by the widget layer and borrowed by the engine for the
/// duration of one resolve.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementPath {
    /// The chain, ordered root to leaf. Must not be empty when handed
    /// to the resolver.
    pub elements: Vec<PathElement>,
    /// Current state of the leaf element.
    pub state: StateFlags,
    /// Junction sides of the leaf element.
    pub junction: JunctionSides,
}

impl ElementPath {
    /// Create an empty path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element at the leaf end.
    #[must_use]
    pub fn then(mut self, element: PathElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Set the leaf element's state.
    #[must_use]
    pub const fn with_state(mut self, state: StateFlags) -> Self {
        self.state = state;
        self
    }

    /// Set the leaf element's junction sides.
    #[must_use]
    pub const fn with_junction(mut self, junction: JunctionSides) -> Self {
        self.junction = junction;
        self
    }

    /// The element being styled, if the path is non-empty.
    #[must_use]
    pub fn leaf(&self) -> Option<&PathElement> {
        self.elements.last()
    }
}

/// The widget type hierarchy, used to score type selectors.
///
/// Widget toolkits know their type lattice; the engine only needs to
/// ask "is `concrete` a `required`, and how many levels apart?".
/// Registration is append-only. Lookups of unregistered names are
/// never cached as permanent failures, because the widget layer may
/// register more types after style sheets are loaded.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// type name → parent type name (None for roots). Interior
    /// mutability keeps registration possible through the shared
    /// registry handle; single-threaded by design.
    parents: RefCell<HashMap<String, Option<String>>>,
}

impl TypeRegistry {
    /// Create an empty type registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a widget type with an optional parent type.
    ///
    /// Returns false if the name was already registered; the first
    /// registration wins.
    pub fn register(&self, name: &str, parent: Option<&str>) -> bool {
        let mut parents = self.parents.borrow_mut();
        if parents.contains_key(name) {
            return false;
        }
        let _ = parents.insert(name.to_string(), parent.map(ToString::to_string));
        true
    }

    /// Returns true if the type name has been registered.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.parents.borrow().contains_key(name)
    }

    /// How many hierarchy levels separate `concrete` from `required`.
    ///
    /// `Some(0)` for the exact type, `Some(n)` if `required` is an
    /// ancestor n levels up, `None` if `concrete` is not a `required`.
    #[must_use]
    pub fn distance(&self, concrete: &str, required: &str) -> Option<u32> {
        if concrete == required {
            return Some(0);
        }

        let parents = self.parents.borrow();
        let mut current = concrete;
        let mut levels = 0_u32;

        while let Some(parent) = parents.get(current).and_then(Option::as_deref) {
            levels += 1;
            if parent == required {
                return Some(levels);
            }
            current = parent;
        }

        None
    }
}

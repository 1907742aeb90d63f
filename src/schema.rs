//! Entry schema traits.
//!
//! An installable entry type declares its bindable string properties through
//! [`BindingSchema`]: a visitor that hands each property name and mutable
//! value to the session, in a fixed declaration order. The session never
//! inspects entry types directly, so adding a new entry kind means
//! implementing two small traits, no registration anywhere else.

use crate::error::BindingError;

/// Visitor callback: property name plus its mutable value.
pub type PropertyVisitor<'a> =
    dyn FnMut(&'static str, &mut String) -> Result<(), BindingError> + 'a;

/// Exposes an entry's bindable string properties.
pub trait BindingSchema {
    /// Call `visit` once per bindable property, in declaration order. The
    /// first error aborts the walk.
    fn visit_properties(&mut self, visit: &mut PropertyVisitor<'_>) -> Result<(), BindingError>;
}

/// An entry that can be written into a destination collection.
pub trait Installable {
    /// The property acting as the entry's sort key, after resolution this is
    /// usually a decimal ID.
    fn index(&self) -> &str;

    /// Numeric SortID. Non-numeric indexes take no part in ID bookkeeping.
    fn sort_id(&self) -> Option<i64> {
        self.index().trim().parse().ok()
    }

    /// Entries flagged DoLast resolve after every other entry, so their
    /// alias reads see values the main group produced.
    fn do_last(&self) -> bool {
        false
    }
}

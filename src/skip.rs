//! Skip-token pass - field inheritance from replaced entries.
//!
//! After resolution, a field holding the skip token means "keep whatever the
//! entry being replaced had here". This pass runs once over the final entry
//! list, pairing each new entry with the old entry that shares its index and
//! copying the marked fields across. Entries with no predecessor keep their
//! skip tokens untouched; the destination writer treats them as defaults.

use crate::error::BindingError;
use crate::schema::Installable;
use crate::token::{SKIP_TOKEN, SKIP_TOKEN_STR};

/// Per-field skip-token inheritance, implemented by each entry type.
pub trait SkipInherit {
    /// Replace every skip-marked field of `self` with the matching field
    /// of `old`.
    fn inherit_from(&mut self, old: &Self) -> Result<(), BindingError>;
}

/// Inherit a string field when it holds the skip token.
pub fn inherit_string(new: &mut String, old: &str) {
    if new == SKIP_TOKEN_STR {
        old.clone_into(new);
    }
}

/// Inherit a numeric field when it holds the skip token.
pub fn inherit_value(new: &mut i64, old: i64) {
    if *new == SKIP_TOKEN {
        *new = old;
    }
}

/// Inherit skip-marked elements of a list, position by position. The lists
/// must have the same length if any element is marked.
pub fn inherit_list(
    field: &'static str,
    new: &mut [String],
    old: &[String],
) -> Result<(), BindingError> {
    if !new.iter().any(|v| v == SKIP_TOKEN_STR) {
        return Ok(());
    }
    if new.len() != old.len() {
        return Err(BindingError::SkipLengthMismatch {
            field,
            new_len: new.len(),
            old_len: old.len(),
        });
    }
    for (new_item, old_item) in new.iter_mut().zip(old) {
        inherit_string(new_item, old_item);
    }
    Ok(())
}

/// Run the inheritance pass: each new entry inherits from the old entry with
/// the same index, if one exists.
pub fn process_skip_bindings<T>(new_entries: &mut [T], old_entries: &[T]) -> Result<(), BindingError>
where
    T: SkipInherit + Installable,
{
    for entry in new_entries.iter_mut() {
        if let Some(old) = old_entries.iter().find(|old| old.index() == entry.index()) {
            entry.inherit_from(old)?;
        }
    }
    Ok(())
}

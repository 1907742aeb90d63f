//! Reserved sentinel tokens and the tagged resolution result.
//!
//! The binding wire format encodes two special outcomes as reserved integers:
//! NullToken (`1280070990`, "could not be resolved, drop the entry") and the
//! Skip token (`32532`, "inherit the field from the entry being replaced").
//! Third-party mod packages depend on these exact values, so they must survive
//! on the output side. Internally a resolution outcome is a `ResolvedValue`,
//! so a sentinel can never be confused with a real ID by an equality slip; the
//! sentinel strings only reappear when a result is rendered back into a
//! property.

/// Reserved "could not be resolved" sentinel.
pub const NULL_TOKEN: i64 = 1_280_070_990;

/// String form of [`NULL_TOKEN`] as written back into properties.
pub const NULL_TOKEN_STR: &str = "1280070990";

/// Reserved "inherit from the replaced entry" sentinel.
pub const SKIP_TOKEN: i64 = 32_532;

/// String form of [`SKIP_TOKEN`].
pub const SKIP_TOKEN_STR: &str = "32532";

/// Outcome of resolving one binding expression's primary function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedValue {
    /// A numeric ID. Increment and zero-padding apply to this variant only.
    Id(i64),
    /// A textual result (paths, codes, locale strings).
    Text(String),
    /// The lookup or allocation failed; the active error policy decides next.
    NotFound,
    /// The `skip` function ran; the field inherits from the replaced entry.
    SkipRequested,
}

impl ResolvedValue {
    /// Numeric if the literal parses as an integer, textual otherwise.
    pub fn from_literal(literal: &str) -> Self {
        match literal.trim().parse::<i64>() {
            Ok(n) => ResolvedValue::Id(n),
            Err(_) => ResolvedValue::Text(literal.to_string()),
        }
    }

    /// True for the two sentinel outcomes that suppress increments.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, ResolvedValue::NotFound | ResolvedValue::SkipRequested)
    }
}

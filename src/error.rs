//! Error types with fix suggestions.
//!
//! Every error message embeds the original binding text and the property
//! ("comment") it came from, so a broken mod package can be diagnosed from the
//! message alone. Codes are stable: MB-01x syntax, MB-02x validation, MB-03x
//! resolution, MB-04x skip pass, MB-05x descriptor input.

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Machine-readable classifier recorded on the session when an
/// install-aborting resolution failure occurs. Host UIs branch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureState {
    /// A lookup (skill, character, stage, alias target, locale) failed.
    BindingFailed,
    /// An auto-ID allocation exhausted its range.
    AutoIdBindingFailed,
    /// A referenced external X2M package is not installed.
    X2mNotFound,
}

impl std::fmt::Display for FailureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureState::BindingFailed => write!(f, "BindingFailed"),
            FailureState::AutoIdBindingFailed => write!(f, "AutoIdBindingFailed"),
            FailureState::X2mNotFound => write!(f, "X2MNotFound"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BindingError {
    // ─────────────────────────────────────────────────────────────
    // Syntax errors (MB-010 to MB-016) - raised during parsing,
    // before any alias write or ID reservation.
    // ─────────────────────────────────────────────────────────────
    #[error("MB-010: missing opening brace in binding \"{text}\" (property: {comment})")]
    MissingOpeningBrace { text: String, comment: String },

    #[error("MB-011: missing closing brace in binding \"{text}\" (property: {comment})")]
    MissingClosingBrace { text: String, comment: String },

    #[error("MB-012: more than one opening brace in binding \"{text}\" (property: {comment})")]
    MultipleOpeningBraces { text: String, comment: String },

    #[error("MB-013: more than one closing brace in binding \"{text}\" (property: {comment})")]
    MultipleClosingBraces { text: String, comment: String },

    #[error("MB-014: empty clause in binding \"{text}\" (property: {comment})")]
    EmptyClause { text: String, comment: String },

    #[error("MB-015: malformed clause \"{clause}\" in binding \"{text}\" (property: {comment})")]
    MalformedClause {
        clause: String,
        text: String,
        comment: String,
    },

    #[error("MB-016: unknown binding function \"{function}\" in \"{text}\" (property: {comment})")]
    UnknownFunction {
        function: String,
        text: String,
        comment: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Validation errors (MB-020 to MB-024)
    // ─────────────────────────────────────────────────────────────
    #[error("MB-020: function \"{function}\" appears more than once in \"{text}\" (property: {comment})")]
    DuplicateFunction {
        function: String,
        text: String,
        comment: String,
    },

    #[error("MB-021: more than one value-producing function in \"{text}\" (property: {comment})")]
    MultiplePrimaries { text: String, comment: String },

    #[error("MB-022: \"{function}\" requires a value-producing function in \"{text}\" (property: {comment})")]
    MissingPrimary {
        function: String,
        text: String,
        comment: String,
    },

    #[error("MB-023: \"{function}\" expects {expected} argument(s) but got {got} in \"{text}\" (property: {comment})")]
    ArgumentCount {
        function: String,
        expected: String,
        got: usize,
        text: String,
        comment: String,
    },

    #[error("MB-024: invalid argument \"{value}\" for \"{function}\" in \"{text}\" (property: {comment})")]
    BadArgument {
        function: String,
        value: String,
        text: String,
        comment: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Resolution errors (MB-030 to MB-035)
    // ─────────────────────────────────────────────────────────────
    #[error("MB-030: alias \"{alias}\" has not been set, in \"{text}\" (property: {comment}) - did you forget DoLast=true on the entry that declares it?")]
    AliasNotFound {
        alias: String,
        text: String,
        comment: String,
    },

    #[error("MB-031: no free ID in [{min}, {max}] for \"{text}\" (property: {comment}, file: {file})")]
    AutoIdExhausted {
        min: i64,
        max: i64,
        text: String,
        comment: String,
        file: String,
    },

    #[error("MB-032: auto-ID functions cannot be used in this context, in \"{text}\" (property: {comment})")]
    AutoIdNotAllowed { text: String, comment: String },

    #[error("MB-033: \"getentry\" is only valid during deferred resolution, in \"{text}\" (property: {comment})")]
    GetEntryNotAllowed { text: String, comment: String },

    #[error("MB-034: binding could not be resolved: \"{text}\" (property: {comment}, file: {file})")]
    Unresolved {
        text: String,
        comment: String,
        file: String,
    },

    #[error("MB-035: X2M package \"{guid}\" is not installed, required by \"{text}\" (property: {comment})")]
    X2mMissing {
        guid: String,
        text: String,
        comment: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Skip pass (MB-040)
    // ─────────────────────────────────────────────────────────────
    #[error("MB-040: skip-inherit lists differ in length ({new_len} vs {old_len}) for \"{field}\"")]
    SkipLengthMismatch {
        field: &'static str,
        new_len: usize,
        old_len: usize,
    },

    // ─────────────────────────────────────────────────────────────
    // Descriptor input (MB-050)
    // ─────────────────────────────────────────────────────────────
    #[error("MB-050: invalid install descriptor: {details}")]
    Descriptor { details: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BindingError {
    /// Failure classifier for resolution errors; syntax and validation errors
    /// are always plain binding failures.
    pub fn failure_state(&self) -> FailureState {
        match self {
            BindingError::AutoIdExhausted { .. } => FailureState::AutoIdBindingFailed,
            BindingError::X2mMissing { .. } => FailureState::X2mNotFound,
            _ => FailureState::BindingFailed,
        }
    }
}

impl FixSuggestion for BindingError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            BindingError::MissingOpeningBrace { .. }
            | BindingError::MissingClosingBrace { .. }
            | BindingError::MultipleOpeningBraces { .. }
            | BindingError::MultipleClosingBraces { .. } => {
                Some("A binding is exactly one {function=(args),...} group per segment")
            }
            BindingError::EmptyClause { .. } | BindingError::MalformedClause { .. } => {
                Some("Separate functions with commas: {autoid=(0;5000),format=(3)}")
            }
            BindingError::UnknownFunction { .. } => {
                Some("Function keywords are case-insensitive; check the spelling against the binding reference")
            }
            BindingError::DuplicateFunction { .. } => {
                Some("Each auxiliary function may appear at most once per binding")
            }
            BindingError::MultiplePrimaries { .. } => {
                Some("Split the binding: only one value-producing function per {...} group")
            }
            BindingError::MissingPrimary { .. } => {
                Some("Add a value-producing function such as autoid or charaid")
            }
            BindingError::ArgumentCount { .. } | BindingError::BadArgument { .. } => {
                Some("Arguments are ;-separated inside parentheses: skillid1=(super;GOK)")
            }
            BindingError::AliasNotFound { .. } => {
                Some("Aliases resolve in document order; set DoLast=true on the entry that reads the alias")
            }
            BindingError::AutoIdExhausted { .. } => {
                Some("Widen the autoid range, or free IDs in the destination file")
            }
            BindingError::AutoIdNotAllowed { .. } | BindingError::GetEntryNotAllowed { .. } => {
                Some("autoid/getentry need the full entry list and only run in the deferred pass")
            }
            BindingError::Unresolved { .. } => {
                Some("Add error=(skip) or error=(usedefaultvalue),defaultvalue=(n) to tolerate a failed lookup")
            }
            BindingError::X2mMissing { .. } => {
                Some("Install the referenced X2M package first, or guard with x2minstalled")
            }
            BindingError::SkipLengthMismatch { .. } => {
                Some("Skip-token lists are matched by position and must have the same length as the replaced entry")
            }
            BindingError::Descriptor { .. } => {
                Some("Check the descriptor XML: root <InstallDescriptor file=\"...\"> with <Entry Index=\"...\"> children")
            }
            BindingError::Io(_) => Some("Check file path and permissions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_embeds_binding_text_and_property() {
        let err = BindingError::UnknownFunction {
            function: "autid".to_string(),
            text: "{autid=(0)}".to_string(),
            comment: "Index".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("MB-016"));
        assert!(msg.contains("{autid=(0)}"));
        assert!(msg.contains("Index"));
    }

    #[test]
    fn alias_error_carries_do_last_hint() {
        let err = BindingError::AliasNotFound {
            alias: "myskill".to_string(),
            text: "{getalias=(myskill)}".to_string(),
            comment: "Index".to_string(),
        };
        assert!(err.to_string().contains("DoLast"));
    }

    #[test]
    fn failure_state_classification() {
        let auto = BindingError::AutoIdExhausted {
            min: 0,
            max: 10,
            text: String::new(),
            comment: String::new(),
            file: String::new(),
        };
        assert_eq!(auto.failure_state(), FailureState::AutoIdBindingFailed);

        let x2m = BindingError::X2mMissing {
            guid: "abc".to_string(),
            text: String::new(),
            comment: String::new(),
        };
        assert_eq!(x2m.failure_state(), FailureState::X2mNotFound);

        let plain = BindingError::Unresolved {
            text: String::new(),
            comment: String::new(),
            file: String::new(),
        };
        assert_eq!(plain.failure_state(), FailureState::BindingFailed);
    }

    #[test]
    fn every_variant_has_a_suggestion() {
        let err = BindingError::MultiplePrimaries {
            text: String::new(),
            comment: String::new(),
        };
        assert!(err.fix_suggestion().is_some());
    }

    #[test]
    fn failure_state_display() {
        assert_eq!(FailureState::X2mNotFound.to_string(), "X2MNotFound");
        assert_eq!(
            FailureState::AutoIdBindingFailed.to_string(),
            "AutoIdBindingFailed"
        );
    }
}

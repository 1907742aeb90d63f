//! Binding validator.
//!
//! Reorders the parsed call list into resolution order and enforces every
//! structural rule before any resolution side effect (alias write, ID
//! reservation) can happen: a malformed expression never mutates session
//! state.
//!
//! Resolution order: `error` first (the policy must be known before any
//! lookup can fail), then everything else in written order, then `increment`,
//! then `setalias` (which needs the final value).

use crate::error::BindingError;
use crate::function::BindingFunction;
use crate::grammar::{self, BindingCall, BindingExpression};

/// Auxiliary functions that may appear at most once per expression.
const SINGLE_USE: [BindingFunction; 5] = [
    BindingFunction::SetAlias,
    BindingFunction::ErrorHandler,
    BindingFunction::DefaultValue,
    BindingFunction::Format,
    BindingFunction::Increment,
];

/// Auxiliary functions that are meaningless without a primary.
const NEEDS_PRIMARY: [BindingFunction; 2] =
    [BindingFunction::SetAlias, BindingFunction::ErrorHandler];

/// Reorder and type-check a parsed expression in place.
pub fn validate(expr: &mut BindingExpression, comment: &str) -> Result<(), BindingError> {
    // Stable sort: written order is preserved within each band.
    expr.calls.sort_by_key(|call| match call.function {
        BindingFunction::ErrorHandler => 0,
        BindingFunction::Increment => 2,
        BindingFunction::SetAlias => 3,
        _ => 1,
    });

    let err_text = || expr.source.clone();
    let err_comment = || comment.to_string();

    for function in SINGLE_USE {
        if expr.calls.iter().filter(|c| c.function == function).count() > 1 {
            return Err(BindingError::DuplicateFunction {
                function: function.keyword().to_string(),
                text: err_text(),
                comment: err_comment(),
            });
        }
    }

    let primaries = expr.calls.iter().filter(|c| c.function.is_primary()).count();
    if primaries > 1 {
        return Err(BindingError::MultiplePrimaries {
            text: err_text(),
            comment: err_comment(),
        });
    }
    if primaries == 0 {
        for function in NEEDS_PRIMARY {
            if expr.calls.iter().any(|c| c.function == function) {
                return Err(BindingError::MissingPrimary {
                    function: function.keyword().to_string(),
                    text: err_text(),
                    comment: err_comment(),
                });
            }
        }
    }

    for call in &expr.calls {
        let rule = call.function.arg_rule();
        if !rule.allows(call.args.len()) {
            return Err(BindingError::ArgumentCount {
                function: call.function.keyword().to_string(),
                expected: rule.describe(),
                got: call.args.len(),
                text: err_text(),
                comment: err_comment(),
            });
        }
        check_arg_values(call, &expr.source, comment)?;
    }

    Ok(())
}

/// Front-loaded argument value checks for the auxiliary functions whose
/// arguments come from closed sets. Primary-function arguments are checked
/// at resolution time where their meaning is known.
fn check_arg_values(call: &BindingCall, text: &str, comment: &str) -> Result<(), BindingError> {
    let bad = |value: &str| BindingError::BadArgument {
        function: call.function.keyword().to_string(),
        value: value.to_string(),
        text: text.to_string(),
        comment: comment.to_string(),
    };

    match call.function {
        BindingFunction::ErrorHandler => {
            let mode = call.arg(0).unwrap_or_default();
            if !matches!(mode, "skip" | "stop" | "usedefaultvalue") {
                return Err(bad(mode));
            }
        }
        BindingFunction::DefaultValue | BindingFunction::Increment => {
            let value = call.arg(0).unwrap_or_default();
            if value.parse::<i64>().is_err() {
                return Err(bad(value));
            }
        }
        BindingFunction::Format => {
            // Closed enumeration: the literal strings "0" through "10".
            let value = call.arg(0).unwrap_or_default();
            match value.parse::<usize>() {
                Ok(width) if width <= 10 => {}
                _ => return Err(bad(value)),
            }
        }
        _ => {}
    }
    Ok(())
}

/// Syntax-check every binding segment in a property value without resolving
/// anything. Returns the number of segments found. Used by the CLI's
/// `validate` command.
pub fn check_string(value: &str, comment: &str) -> Result<usize, BindingError> {
    let mut remaining = value.to_string();
    let mut count = 0;
    while let Some((open, close)) = grammar::next_segment(&remaining, comment)? {
        let segment = remaining[open..=close].to_string();
        let mut expr = grammar::parse(&segment, comment)?;
        validate(&mut expr, comment)?;
        remaining.replace_range(open..=close, "");
        count += 1;
    }
    Ok(count)
}

//! Binding grammar parser.
//!
//! A binding is a `{function=(arg;arg),function2=(arg)}` segment embedded in
//! a string property. A property may carry several segments interleaved with
//! literal text; [`next_segment`] locates them one at a time, left to right,
//! and [`parse`] turns a single segment into an ordered call list. All
//! function and argument text is lower-cased; whitespace is insignificant.

use crate::error::BindingError;
use crate::function::BindingFunction;

/// One parsed function call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingCall {
    pub function: BindingFunction,
    pub args: Vec<String>,
}

impl BindingCall {
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

/// One parsed `{...}` segment: an ordered call list plus the original text
/// for diagnostics. Created per segment, consumed immediately, never stored.
#[derive(Debug, Clone)]
pub struct BindingExpression {
    pub calls: Vec<BindingCall>,
    pub source: String,
}

/// Quick check whether a property value participates in binding resolution
/// at all. A stray `}` without `{` still counts so it fails loudly later.
pub fn contains_binding(value: &str) -> bool {
    value.contains('{') || value.contains('}')
}

/// Locate the next `{...}` segment in `value`, returning the byte range of
/// the braces (inclusive). `Ok(None)` means no braces remain. Unbalanced or
/// reversed braces fail here rather than producing a garbage segment.
pub fn next_segment(
    value: &str,
    comment: &str,
) -> Result<Option<(usize, usize)>, BindingError> {
    match (value.find('{'), value.find('}')) {
        (None, None) => Ok(None),
        (Some(open), Some(close)) if open < close => Ok(Some((open, close))),
        (Some(_), Some(_)) | (None, Some(_)) => Err(BindingError::MissingOpeningBrace {
            text: value.to_string(),
            comment: comment.to_string(),
        }),
        (Some(_), None) => Err(BindingError::MissingClosingBrace {
            text: value.to_string(),
            comment: comment.to_string(),
        }),
    }
}

/// Parse one `{...}` segment into an ordered call list.
pub fn parse(segment: &str, comment: &str) -> Result<BindingExpression, BindingError> {
    let text: String = segment.chars().filter(|c| !c.is_whitespace()).collect();

    let opens = text.matches('{').count();
    let closes = text.matches('}').count();
    let err_text = || segment.to_string();
    let err_comment = || comment.to_string();

    if opens == 0 {
        return Err(BindingError::MissingOpeningBrace {
            text: err_text(),
            comment: err_comment(),
        });
    }
    if opens > 1 {
        return Err(BindingError::MultipleOpeningBraces {
            text: err_text(),
            comment: err_comment(),
        });
    }
    if closes == 0 {
        return Err(BindingError::MissingClosingBrace {
            text: err_text(),
            comment: err_comment(),
        });
    }
    if closes > 1 {
        return Err(BindingError::MultipleClosingBraces {
            text: err_text(),
            comment: err_comment(),
        });
    }
    if !text.starts_with('{') || !text.ends_with('}') {
        return Err(BindingError::MissingOpeningBrace {
            text: err_text(),
            comment: err_comment(),
        });
    }

    let inner = &text[1..text.len() - 1];
    let mut calls = Vec::new();

    for clause in inner.split(',') {
        if clause.is_empty() {
            return Err(BindingError::EmptyClause {
                text: err_text(),
                comment: err_comment(),
            });
        }

        let parts: Vec<&str> = clause.split('=').collect();
        if parts.len() > 2 {
            return Err(BindingError::MalformedClause {
                clause: clause.to_string(),
                text: err_text(),
                comment: err_comment(),
            });
        }

        let name = parts[0].to_lowercase();
        let function =
            BindingFunction::from_keyword(&name).ok_or_else(|| BindingError::UnknownFunction {
                function: name.clone(),
                text: err_text(),
                comment: err_comment(),
            })?;

        let args = match parts.get(1) {
            Some(group) => {
                // Argument groups are always parenthesized.
                let inner = group
                    .strip_prefix('(')
                    .and_then(|g| g.strip_suffix(')'))
                    .ok_or_else(|| BindingError::MalformedClause {
                        clause: clause.to_string(),
                        text: err_text(),
                        comment: err_comment(),
                    })?;
                inner
                    .split(';')
                    .map(|a| a.trim().to_lowercase())
                    .filter(|a| !a.is_empty())
                    .collect()
            }
            None => Vec::new(),
        };

        calls.push(BindingCall { function, args });
    }

    Ok(BindingExpression {
        calls,
        source: segment.to_string(),
    })
}

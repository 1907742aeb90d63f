//! Function resolver - executes a validated call list.
//!
//! Every primary function stays simple: it produces a candidate value or
//! `NotFound`. Cross-cutting policy (error handling, padding, increment,
//! aliasing) is folded in once per expression, after the call loop, so it
//! applies uniformly no matter which primary ran.
//!
//! All ambient state is passed in explicitly: [`ResolveScope`] carries the
//! per-call context (property name, target file, entry ID lists, pass
//! capabilities), and [`Resolver`] borrows the session-owned mutable pieces
//! (alias table, auto-ID registry, failure record).

use tracing::debug;

use crate::alias::AliasTable;
use crate::autoid::AutoIdRegistry;
use crate::error::{BindingError, FailureState};
use crate::function::BindingFunction;
use crate::grammar::{self, BindingCall, BindingExpression};
use crate::provider::{GameDb, IdSpace, SkillType, X2mRepo};
use crate::token::{ResolvedValue, NULL_TOKEN_STR, SKIP_TOKEN_STR};
use crate::validate;

/// Upper bound for auto-ID scans when the binding gives no explicit maximum.
pub const DEFAULT_MAX_AUTO_ID: i64 = 0x7FFF_FFFF;

/// What to do when the primary function could not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Abort the install with a descriptive error (default).
    Stop,
    /// Let the NullToken sentinel through; the sweep drops the entry later.
    Skip,
    /// Substitute the declared `defaultvalue`.
    UseDefault,
}

/// Ambient context for resolving one property value.
#[derive(Debug, Clone, Copy)]
pub struct ResolveScope<'a> {
    /// Property name, embedded in diagnostics.
    pub comment: &'a str,
    /// Target binary file path; doubles as the auto-ID collection identity.
    pub file: &'a str,
    /// Numeric IDs statically declared by the install list so far.
    pub install_ids: &'a [i64],
    /// SortIDs of the existing destination entries.
    pub binary_ids: &'a [i64],
    /// Deferred-pass capabilities (auto-ID, getentry) available?
    pub allow_auto_id: bool,
    pub max_auto_id: i64,
    /// SortID of the entry being resolved, set during the deferred pass.
    pub current_id: Option<i64>,
}

impl<'a> ResolveScope<'a> {
    /// Scope for immediate single-string resolution: no entry lists, no
    /// auto-ID capability.
    pub fn immediate(comment: &'a str, file: &'a str) -> Self {
        Self {
            comment,
            file,
            install_ids: &[],
            binary_ids: &[],
            allow_auto_id: false,
            max_auto_id: DEFAULT_MAX_AUTO_ID,
            current_id: None,
        }
    }
}

/// Working state accumulated over one expression's call list.
#[derive(Debug)]
struct Working {
    value: ResolvedValue,
    default_value: i64,
    policy: ErrorPolicy,
    pad: usize,
    increment: i64,
    alias: Option<String>,
    /// Classifier used if `value` is still NotFound when the loop ends.
    failure_kind: FailureState,
    /// Range of the failed allocation, for MB-031.
    range: Option<(i64, i64)>,
    /// GUID of the failed X2M lookup, for MB-035.
    guid: Option<String>,
}

impl Default for Working {
    fn default() -> Self {
        Self {
            value: ResolvedValue::Id(-1),
            default_value: 0,
            policy: ErrorPolicy::Stop,
            pad: 0,
            increment: 0,
            alias: None,
            failure_kind: FailureState::BindingFailed,
            range: None,
            guid: None,
        }
    }
}

/// Borrowed view over the session state one resolution needs.
pub struct Resolver<'a> {
    pub aliases: &'a mut AliasTable,
    pub registry: &'a mut AutoIdRegistry,
    pub db: &'a dyn GameDb,
    pub x2m: &'a dyn X2mRepo,
    pub lang: &'a str,
    pub failure: &'a mut Option<FailureState>,
}

impl Resolver<'_> {
    /// Resolve every `{...}` segment of `value`, left to right, substituting
    /// results in place until no braces remain.
    pub fn resolve_string(
        &mut self,
        value: &str,
        scope: &ResolveScope<'_>,
    ) -> Result<String, BindingError> {
        let mut value = value.to_string();
        while let Some((open, close)) = grammar::next_segment(&value, scope.comment)? {
            let segment = value[open..=close].to_string();
            let mut expr = grammar::parse(&segment, scope.comment)?;
            validate::validate(&mut expr, scope.comment)?;
            let replacement = self.resolve_expression(&expr, scope)?;
            value.replace_range(open..=close, &replacement);
        }
        Ok(value)
    }

    /// Resolve one validated expression to its final string.
    pub fn resolve_expression(
        &mut self,
        expr: &BindingExpression,
        scope: &ResolveScope<'_>,
    ) -> Result<String, BindingError> {
        let mut working = Working::default();
        for call in &expr.calls {
            self.apply(call, &mut working, expr, scope)?;
        }
        self.finish(working, expr, scope)
    }

    fn apply(
        &mut self,
        call: &BindingCall,
        w: &mut Working,
        expr: &BindingExpression,
        scope: &ResolveScope<'_>,
    ) -> Result<(), BindingError> {
        match call.function {
            BindingFunction::ErrorHandler => {
                // Argument membership was checked by the validator.
                w.policy = match call.arg(0).unwrap_or_default() {
                    "skip" => ErrorPolicy::Skip,
                    "usedefaultvalue" => ErrorPolicy::UseDefault,
                    _ => ErrorPolicy::Stop,
                };
            }
            BindingFunction::DefaultValue => {
                w.default_value = int_arg(call, 0, 0, expr, scope)?;
            }
            BindingFunction::Format => {
                w.pad = int_arg(call, 0, 0, expr, scope)? as usize;
            }
            BindingFunction::Increment => {
                // Never applied to sentinel values.
                w.increment = if w.value.is_sentinel() {
                    0
                } else {
                    int_arg(call, 0, 0, expr, scope)?
                };
            }
            BindingFunction::SetAlias => {
                w.alias = call.arg(0).map(str::to_string);
            }
            BindingFunction::GetAlias => {
                let name = call.arg(0).unwrap_or_default();
                match self.aliases.get(name) {
                    Some(stored) => w.value = ResolvedValue::from_literal(stored),
                    None => {
                        return Err(BindingError::AliasNotFound {
                            alias: name.to_string(),
                            text: expr.source.clone(),
                            comment: scope.comment.to_string(),
                        })
                    }
                }
            }
            BindingFunction::Skip => {
                w.value = ResolvedValue::SkipRequested;
            }
            BindingFunction::SetValue => {
                w.value = ResolvedValue::from_literal(call.arg(0).unwrap_or_default());
            }
            BindingFunction::IsLanguage => {
                let matches = call
                    .arg(0)
                    .unwrap_or_default()
                    .eq_ignore_ascii_case(self.lang);
                w.value = ResolvedValue::Text(matches.to_string());
            }
            BindingFunction::LocalKey => {
                let key = call.arg(0).unwrap_or_default();
                w.value = match self.db.local_key(key, self.lang) {
                    Some(text) => ResolvedValue::Text(text),
                    None => ResolvedValue::NotFound,
                };
            }
            BindingFunction::CharaId => {
                let code = call.arg(0).unwrap_or_default();
                w.value = id_or_not_found(self.db.chara_id(code));
            }
            BindingFunction::StageId => {
                let code = call.arg(0).unwrap_or_default();
                w.value = id_or_not_found(self.db.stage_id(code));
            }
            BindingFunction::SkillId1 | BindingFunction::SkillId2 => {
                let kind = skill_kind_arg(call, 0, expr, scope)?;
                let code = call.arg(1).unwrap_or_default();
                w.value = match self.db.skill_ids(kind, code) {
                    Some(ids) if call.function == BindingFunction::SkillId1 => {
                        ResolvedValue::Id(ids.id1)
                    }
                    Some(ids) => ResolvedValue::Id(ids.id2),
                    None => ResolvedValue::NotFound,
                };
            }
            BindingFunction::GetEntry => {
                if !scope.allow_auto_id {
                    return Err(BindingError::GetEntryNotAllowed {
                        text: expr.source.clone(),
                        comment: scope.comment.to_string(),
                    });
                }
                // Numeric key looks up the destination directly; anything
                // else falls back to the current entry's own SortID.
                let raw = call.arg(0).unwrap_or_default();
                let key = match raw.parse::<i64>() {
                    Ok(n) => n,
                    Err(_) => match scope.current_id {
                        Some(id) => id,
                        None => {
                            return Err(BindingError::GetEntryNotAllowed {
                                text: expr.source.clone(),
                                comment: scope.comment.to_string(),
                            })
                        }
                    },
                };
                w.value = if scope.binary_ids.contains(&key) {
                    ResolvedValue::Id(key)
                } else {
                    ResolvedValue::NotFound
                };
            }
            BindingFunction::AutoId => {
                self.require_auto(expr, scope)?;
                let min = int_arg(call, 0, 0, expr, scope)?;
                let max = int_arg(call, 1, scope.max_auto_id, expr, scope)?;
                let sequence = int_arg(call, 2, 1, expr, scope)?;

                let ctx = self
                    .registry
                    .get_or_create(scope.file, || scope.binary_ids.to_vec());
                // Literal indexes already present in the install list reserve
                // their slots before anything is handed out.
                for &id in scope.install_ids {
                    ctx.mark_used(id);
                }
                w.range = Some((min, max));
                let id = ctx_allocate_logged(ctx, scope.file, min, max, sequence);
                store_allocation(w, id);
            }
            BindingFunction::AutoCharaId => {
                self.require_auto(expr, scope)?;
                let min = int_arg(call, 0, 0, expr, scope)?;
                let max = int_arg(call, 1, scope.max_auto_id, expr, scope)?;
                w.range = Some((min, max));
                let id = self.allocate_space(IdSpace::Character, min, max, 1);
                store_allocation(w, id);
            }
            BindingFunction::AutoPartSet => {
                self.require_auto(expr, scope)?;
                let min = int_arg(call, 0, 0, expr, scope)?;
                let max = int_arg(call, 1, scope.max_auto_id, expr, scope)?;
                w.range = Some((min, max));
                let id = self.allocate_space(IdSpace::PartSet, min, max, 1);
                store_allocation(w, id);
            }
            BindingFunction::AutoCostume => {
                self.require_auto(expr, scope)?;
                let min = int_arg(call, 0, 0, expr, scope)?;
                w.range = Some((min, scope.max_auto_id));
                let id = self.allocate_space(IdSpace::Costume, min, scope.max_auto_id, 1);
                store_allocation(w, id);
            }
            BindingFunction::AutoCusAura => {
                self.require_auto(expr, scope)?;
                let min = int_arg(call, 0, 0, expr, scope)?;
                w.range = Some((min, scope.max_auto_id));
                let id = self.allocate_space(IdSpace::CusAura, min, scope.max_auto_id, 1);
                store_allocation(w, id);
            }
            BindingFunction::AutoTtbEvent => {
                self.require_auto(expr, scope)?;
                w.range = Some((0, scope.max_auto_id));
                let id = self.allocate_space(IdSpace::TtbEvent, 0, scope.max_auto_id, 1);
                store_allocation(w, id);
            }
            BindingFunction::AutoSkillId => {
                self.require_auto(expr, scope)?;
                let kind = skill_kind_arg(call, 0, expr, scope)?;
                let min = int_arg(call, 1, 0, expr, scope)?;
                let max = int_arg(call, 2, scope.max_auto_id, expr, scope)?;
                w.range = Some((min, max));
                let id = self.allocate_space(IdSpace::Skill(kind), min, max, 1);
                store_allocation(w, id);
            }
            BindingFunction::X2mSkillId1 | BindingFunction::X2mSkillId2 => {
                let guid = call.arg(0).unwrap_or_default();
                let kind = skill_kind_arg(call, 1, expr, scope)?;
                w.guid = Some(guid.to_string());
                w.value = match self.x2m.skill_ids(guid, kind) {
                    Some(ids) if call.function == BindingFunction::X2mSkillId1 => {
                        ResolvedValue::Id(ids.id1)
                    }
                    Some(ids) => ResolvedValue::Id(ids.id2),
                    None => {
                        w.failure_kind = FailureState::X2mNotFound;
                        ResolvedValue::NotFound
                    }
                };
            }
            BindingFunction::X2mSkillPath => {
                let guid = call.arg(0).unwrap_or_default();
                let kind = skill_kind_arg(call, 1, expr, scope)?;
                w.guid = Some(guid.to_string());
                w.value = match self.x2m.skill_path(guid, kind) {
                    Some(path) => ResolvedValue::Text(path),
                    None => {
                        w.failure_kind = FailureState::X2mNotFound;
                        ResolvedValue::NotFound
                    }
                };
            }
            BindingFunction::X2mCharaId => {
                let guid = call.arg(0).unwrap_or_default();
                w.guid = Some(guid.to_string());
                w.value = match self.x2m.chara_id(guid) {
                    Some(id) => ResolvedValue::Id(id),
                    None => {
                        w.failure_kind = FailureState::X2mNotFound;
                        ResolvedValue::NotFound
                    }
                };
            }
            BindingFunction::X2mCharaCode => {
                let guid = call.arg(0).unwrap_or_default();
                w.guid = Some(guid.to_string());
                w.value = match self.x2m.chara_code(guid) {
                    Some(code) => ResolvedValue::Text(code),
                    None => {
                        w.failure_kind = FailureState::X2mNotFound;
                        ResolvedValue::NotFound
                    }
                };
            }
            BindingFunction::X2mInstalled => {
                let guid = call.arg(0).unwrap_or_default();
                w.value = ResolvedValue::Text(self.x2m.is_installed(guid).to_string());
            }
        }
        Ok(())
    }

    /// Apply the error policy and render the final string.
    fn finish(
        &mut self,
        mut w: Working,
        expr: &BindingExpression,
        scope: &ResolveScope<'_>,
    ) -> Result<String, BindingError> {
        if w.value == ResolvedValue::NotFound {
            match w.policy {
                ErrorPolicy::Stop => {
                    // The error variant is the source of truth for the
                    // recorded failure classification.
                    let err = self.stop_error(&w, expr, scope);
                    *self.failure = Some(err.failure_state());
                    return Err(err);
                }
                ErrorPolicy::Skip => return Ok(NULL_TOKEN_STR.to_string()),
                // Increment was suppressed while the value was NotFound, so
                // the default is used as-is.
                ErrorPolicy::UseDefault => w.value = ResolvedValue::Id(w.default_value),
            }
        }

        match w.value {
            ResolvedValue::Id(id) => {
                let final_id = id + w.increment;
                if let Some(alias) = &w.alias {
                    // Post-increment, pre-formatting: aliases store the raw ID.
                    self.aliases.set(alias, final_id.to_string());
                }
                Ok(zero_pad(final_id, w.pad))
            }
            ResolvedValue::Text(text) => {
                if let Some(alias) = &w.alias {
                    self.aliases.set(alias, text.clone());
                }
                Ok(text)
            }
            ResolvedValue::SkipRequested => {
                if let Some(alias) = &w.alias {
                    self.aliases.set(alias, SKIP_TOKEN_STR);
                }
                Ok(SKIP_TOKEN_STR.to_string())
            }
            // NotFound was replaced above; render the sentinel if it ever
            // reaches here so the sweep can still catch it.
            ResolvedValue::NotFound => Ok(NULL_TOKEN_STR.to_string()),
        }
    }

    fn stop_error(
        &self,
        w: &Working,
        expr: &BindingExpression,
        scope: &ResolveScope<'_>,
    ) -> BindingError {
        match w.failure_kind {
            FailureState::AutoIdBindingFailed => {
                let (min, max) = w.range.unwrap_or((0, scope.max_auto_id));
                BindingError::AutoIdExhausted {
                    min,
                    max,
                    text: expr.source.clone(),
                    comment: scope.comment.to_string(),
                    file: scope.file.to_string(),
                }
            }
            FailureState::X2mNotFound => BindingError::X2mMissing {
                guid: w.guid.clone().unwrap_or_default(),
                text: expr.source.clone(),
                comment: scope.comment.to_string(),
            },
            FailureState::BindingFailed => BindingError::Unresolved {
                text: expr.source.clone(),
                comment: scope.comment.to_string(),
                file: scope.file.to_string(),
            },
        }
    }

    fn require_auto(
        &self,
        expr: &BindingExpression,
        scope: &ResolveScope<'_>,
    ) -> Result<(), BindingError> {
        if scope.allow_auto_id {
            Ok(())
        } else {
            Err(BindingError::AutoIdNotAllowed {
                text: expr.source.clone(),
                comment: scope.comment.to_string(),
            })
        }
    }

    fn allocate_space(&mut self, space: IdSpace, min: i64, max: i64, sequence: i64) -> Option<i64> {
        let db = self.db;
        let ctx = self
            .registry
            .get_or_create(&space.key(), || db.used_ids(space));
        ctx_allocate_logged(ctx, &space.key(), min, max, sequence)
    }

}

fn store_allocation(w: &mut Working, id: Option<i64>) {
    w.value = match id {
        Some(id) => ResolvedValue::Id(id),
        None => {
            w.failure_kind = FailureState::AutoIdBindingFailed;
            ResolvedValue::NotFound
        }
    };
}

fn ctx_allocate_logged(
    ctx: &mut crate::autoid::AutoIdContext,
    identity: &str,
    min: i64,
    max: i64,
    sequence: i64,
) -> Option<i64> {
    let id = ctx.allocate(min, max, sequence);
    match id {
        Some(id) => debug!(identity, id, sequence, "allocated auto ID"),
        None => debug!(identity, min, max, "auto ID range exhausted"),
    }
    id
}

fn id_or_not_found(id: Option<i64>) -> ResolvedValue {
    match id {
        Some(id) => ResolvedValue::Id(id),
        None => ResolvedValue::NotFound,
    }
}

fn int_arg(
    call: &BindingCall,
    index: usize,
    default: i64,
    expr: &BindingExpression,
    scope: &ResolveScope<'_>,
) -> Result<i64, BindingError> {
    match call.arg(index) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| BindingError::BadArgument {
            function: call.function.keyword().to_string(),
            value: raw.to_string(),
            text: expr.source.clone(),
            comment: scope.comment.to_string(),
        }),
    }
}

fn skill_kind_arg(
    call: &BindingCall,
    index: usize,
    expr: &BindingExpression,
    scope: &ResolveScope<'_>,
) -> Result<SkillType, BindingError> {
    let raw = call.arg(index).unwrap_or_default();
    SkillType::parse(raw).ok_or_else(|| BindingError::BadArgument {
        function: call.function.keyword().to_string(),
        value: raw.to_string(),
        text: expr.source.clone(),
        comment: scope.comment.to_string(),
    })
}

fn zero_pad(value: i64, width: usize) -> String {
    format!("{value:0width$}")
}

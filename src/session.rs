//! Install session - two-pass orchestration over entry lists.
//!
//! A session owns the state that must survive across an entire install: the
//! alias table, the per-collection auto-ID registry and the failure record.
//! Entry lists flow through three stages:
//!
//! 1. initial pass: every binding that needs no allocation resolves, so all
//!    statically-declared indexes are known before any ID is handed out;
//! 2. deferred pass: auto-ID and getentry bindings resolve with the full
//!    picture (existing destination IDs plus the indexes pass 1 produced);
//! 3. null-token sweep: entries left holding the NullToken sentinel are
//!    dropped from the list.
//!
//! The skip-token inheritance pass is separate (see [`crate::skip`]) because
//! it needs the old entries being replaced, which the session never sees.

use tracing::debug;

use crate::alias::AliasTable;
use crate::autoid::AutoIdRegistry;
use crate::error::{BindingError, FailureState};
use crate::function;
use crate::grammar;
use crate::provider::{GameDb, X2mRepo};
use crate::resolver::{ResolveScope, Resolver, DEFAULT_MAX_AUTO_ID};
use crate::schema::{BindingSchema, Installable};
use crate::token::NULL_TOKEN_STR;

pub struct BindingSession<'a> {
    aliases: AliasTable,
    registry: AutoIdRegistry,
    db: &'a dyn GameDb,
    x2m: &'a dyn X2mRepo,
    lang: String,
    max_auto_id: i64,
    failure: Option<FailureState>,
}

impl<'a> BindingSession<'a> {
    pub fn new(db: &'a dyn GameDb, x2m: &'a dyn X2mRepo, lang: &str) -> Self {
        Self {
            aliases: AliasTable::new(),
            registry: AutoIdRegistry::new(),
            db,
            x2m,
            lang: lang.to_lowercase(),
            max_auto_id: DEFAULT_MAX_AUTO_ID,
            failure: None,
        }
    }

    /// Cap the implicit upper bound of auto-ID allocations.
    pub fn with_max_auto_id(mut self, max: i64) -> Self {
        self.max_auto_id = max;
        self
    }

    /// Pre-seed an alias, e.g. from a host-provided value.
    pub fn add_alias(&mut self, value: &str, alias: &str) {
        self.aliases.set(alias, value);
    }

    pub fn alias(&self, name: &str) -> Option<&str> {
        self.aliases.get(name)
    }

    /// Classifier of the first install-aborting failure, if any occurred.
    pub fn failure_state(&self) -> Option<FailureState> {
        self.failure
    }

    /// Allocate an ID directly, outside any binding expression. Uses the same
    /// per-file registry as `autoid` bindings, so direct and binding-driven
    /// allocations never collide.
    pub fn auto_id(
        &mut self,
        file: &str,
        existing: &[i64],
        min: i64,
        max: i64,
        sequence: i64,
    ) -> Option<i64> {
        self.registry
            .get_or_create(file, || existing.to_vec())
            .allocate(min, max, sequence)
    }

    /// Resolve one standalone string immediately. Auto-ID and getentry are
    /// rejected here since there is no entry list to allocate against.
    pub fn resolve_string(
        &mut self,
        value: &str,
        comment: &str,
        file: &str,
    ) -> Result<String, BindingError> {
        let scope = ResolveScope::immediate(comment, file);
        self.resolver().resolve_string(value, &scope)
    }

    /// Run the full pipeline over one entry list: initial pass, deferred
    /// pass, then the null-token sweep. Entries flagged DoLast go through
    /// both passes after everything else, so their alias reads see the
    /// values the main group produced. Returns the number of swept entries.
    pub fn resolve_entries<T>(
        &mut self,
        entries: &mut Vec<T>,
        existing_ids: &[i64],
        file: &str,
    ) -> Result<usize, BindingError>
    where
        T: Installable + BindingSchema,
    {
        self.resolve_initial(entries, existing_ids, file)?;
        let declared = declared_ids(entries.as_slice());
        self.resolve_deferred(entries, &declared, existing_ids, file)?;
        Ok(self.sweep_null_tokens(entries))
    }

    /// Initial pass: resolve every main-group property whose bindings need no
    /// deferred capability. Properties mentioning an allocation keyword are
    /// left untouched for the deferred pass; DoLast entries are untouched
    /// entirely, `resolve_deferred` runs them once the main group is done.
    pub fn resolve_initial<T>(
        &mut self,
        entries: &mut [T],
        existing_ids: &[i64],
        file: &str,
    ) -> Result<(), BindingError>
    where
        T: Installable + BindingSchema,
    {
        self.initial_pass(entries, existing_ids, file, false)
    }

    fn initial_pass<T>(
        &mut self,
        entries: &mut [T],
        existing_ids: &[i64],
        file: &str,
        do_last: bool,
    ) -> Result<(), BindingError>
    where
        T: Installable + BindingSchema,
    {
        for entry in entries.iter_mut().filter(|e| e.do_last() == do_last) {
            entry.visit_properties(&mut |name, value| {
                if !grammar::contains_binding(value) || function::needs_deferred_pass(value) {
                    return Ok(());
                }
                let scope = ResolveScope {
                    comment: name,
                    file,
                    install_ids: &[],
                    binary_ids: existing_ids,
                    allow_auto_id: false,
                    max_auto_id: self.max_auto_id,
                    current_id: None,
                };
                let resolved = self.resolver().resolve_string(value, &scope)?;
                *value = resolved;
                Ok(())
            })?;
        }
        debug!(file, entries = entries.len(), "initial pass complete");
        Ok(())
    }

    /// Deferred pass: resolve everything that remains, with allocation
    /// enabled. `install_ids` are the indexes already fixed by the initial
    /// pass; they reserve their slots before any allocation. DoLast entries
    /// run both of their passes here, after the main group is fully
    /// resolved, so their alias reads see the values it produced.
    pub fn resolve_deferred<T>(
        &mut self,
        entries: &mut [T],
        install_ids: &[i64],
        existing_ids: &[i64],
        file: &str,
    ) -> Result<(), BindingError>
    where
        T: Installable + BindingSchema,
    {
        self.deferred_pass(entries, install_ids, existing_ids, file, false)?;
        self.initial_pass(entries, existing_ids, file, true)?;
        let declared = declared_ids(&*entries);
        self.deferred_pass(entries, &declared, existing_ids, file, true)
    }

    fn deferred_pass<T>(
        &mut self,
        entries: &mut [T],
        install_ids: &[i64],
        existing_ids: &[i64],
        file: &str,
        do_last: bool,
    ) -> Result<(), BindingError>
    where
        T: Installable + BindingSchema,
    {
        for entry in entries.iter_mut().filter(|e| e.do_last() == do_last) {
            // Known at entry start; an index the deferred pass itself
            // resolves is not visible to getentry within the same entry.
            let current_id = entry.sort_id();
            entry.visit_properties(&mut |name, value| {
                if !grammar::contains_binding(value) {
                    return Ok(());
                }
                let scope = ResolveScope {
                    comment: name,
                    file,
                    install_ids,
                    binary_ids: existing_ids,
                    allow_auto_id: true,
                    max_auto_id: self.max_auto_id,
                    current_id,
                };
                let resolved = self.resolver().resolve_string(value, &scope)?;
                *value = resolved;
                Ok(())
            })?;
        }
        debug!(file, entries = entries.len(), "deferred pass complete");
        Ok(())
    }

    /// Drop entries where any property still holds the NullToken sentinel.
    /// Matching is exact string equality; IDs that merely embed the digits
    /// are untouched. Returns the number of dropped entries.
    pub fn sweep_null_tokens<T>(&mut self, entries: &mut Vec<T>) -> usize
    where
        T: BindingSchema,
    {
        let before = entries.len();
        entries.retain_mut(|entry| {
            let mut keep = true;
            let _ = entry.visit_properties(&mut |_, value| {
                if value == NULL_TOKEN_STR {
                    keep = false;
                }
                Ok(())
            });
            keep
        });
        let swept = before - entries.len();
        if swept > 0 {
            debug!(swept, "null-token sweep dropped entries");
        }
        swept
    }

    fn resolver(&mut self) -> Resolver<'_> {
        Resolver {
            aliases: &mut self.aliases,
            registry: &mut self.registry,
            db: self.db,
            x2m: self.x2m,
            lang: &self.lang,
            failure: &mut self.failure,
        }
    }
}

/// Numeric indexes currently declared by the entry list.
pub fn declared_ids<T: Installable>(entries: &[T]) -> Vec<i64> {
    entries.iter().filter_map(Installable::sort_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MemoryGameDb, MemoryX2m, SkillType};
    use crate::schema::PropertyVisitor;

    struct Entry {
        index: String,
        name: String,
        do_last: bool,
    }

    impl Entry {
        fn new(index: &str, name: &str) -> Self {
            Self {
                index: index.to_string(),
                name: name.to_string(),
                do_last: false,
            }
        }

        fn last(index: &str, name: &str) -> Self {
            Self {
                do_last: true,
                ..Self::new(index, name)
            }
        }
    }

    impl Installable for Entry {
        fn index(&self) -> &str {
            &self.index
        }

        fn do_last(&self) -> bool {
            self.do_last
        }
    }

    impl BindingSchema for Entry {
        fn visit_properties(
            &mut self,
            visit: &mut PropertyVisitor<'_>,
        ) -> Result<(), BindingError> {
            visit("Index", &mut self.index)?;
            visit("Name", &mut self.name)?;
            Ok(())
        }
    }

    fn db() -> MemoryGameDb {
        let mut db = MemoryGameDb::new();
        db.add_chara("gok", 0);
        db.add_skill(SkillType::Super, "gok", 1000, 100);
        db
    }

    #[test]
    fn two_pass_allocation_sees_declared_indexes() {
        // Entry 0 declares index 3 statically (via a lookup resolved in the
        // initial pass); entry 1's autoid must not collide with it.
        let db = db();
        let x2m = MemoryX2m::new();
        let mut session = BindingSession::new(&db, &x2m, "en");
        let mut entries = vec![
            Entry::new("3", "static"),
            Entry::new("{autoid=(0;10;1)}", "allocated"),
        ];
        let swept = session
            .resolve_entries(&mut entries, &[0, 1], "data/test.bin")
            .unwrap();
        assert_eq!(swept, 0);
        assert_eq!(entries[0].index, "3");
        // 0,1 existing; 2 free but 3 is declared, so 2 then would be next
        assert_eq!(entries[1].index, "2");
    }

    #[test]
    fn declared_index_reserves_its_slot() {
        let db = db();
        let x2m = MemoryX2m::new();
        let mut session = BindingSession::new(&db, &x2m, "en");
        let mut entries = vec![
            Entry::new("2", "static"),
            Entry::new("{autoid=(0;10;1)}", "a"),
            Entry::new("{autoid=(0;10;1)}", "b"),
        ];
        session
            .resolve_entries(&mut entries, &[0, 1], "data/test.bin")
            .unwrap();
        assert_eq!(entries[1].index, "3");
        assert_eq!(entries[2].index, "4");
    }

    #[test]
    fn initial_pass_skips_deferred_properties() {
        let db = db();
        let x2m = MemoryX2m::new();
        let mut session = BindingSession::new(&db, &x2m, "en");
        let mut entries = vec![Entry::new("{autoid=(0;10;1)}", "{charaid=(gok)}")];
        session
            .resolve_initial(&mut entries, &[], "f")
            .unwrap();
        assert_eq!(entries[0].index, "{autoid=(0;10;1)}");
        assert_eq!(entries[0].name, "0");
    }

    #[test]
    fn alias_flows_between_entries() {
        // set in one entry, read in a later one
        let db = db();
        let x2m = MemoryX2m::new();
        let mut session = BindingSession::new(&db, &x2m, "en");
        let mut entries = vec![
            Entry::new("{skillid1=(super;gok),setalias=(mainskill)}", "decl"),
            Entry::new("{getalias=(mainskill)}", "use"),
        ];
        session.resolve_entries(&mut entries, &[], "f").unwrap();
        assert_eq!(entries[0].index, "1000");
        assert_eq!(entries[1].index, "1000");
        assert_eq!(session.alias("MainSkill"), Some("1000"));
    }

    #[test]
    fn do_last_runs_after_main_group() {
        let db = db();
        let x2m = MemoryX2m::new();
        let mut session = BindingSession::new(&db, &x2m, "en");
        let mut entries = vec![
            Entry::new("{autoid=(100;200),setalias=(mainskill)}", "decl"),
            Entry::last("{getalias=(mainskill)}", "late"),
        ];
        session.resolve_entries(&mut entries, &[], "f").unwrap();
        assert_eq!(entries[0].index, "100");
        assert_eq!(entries[1].index, "100");
    }

    #[test]
    fn staged_passes_keep_do_last_ordering() {
        // Hosts that split the passes around deserialization must see the
        // same result: the alias written by a deferred main-group binding is
        // readable by a DoLast entry.
        let db = db();
        let x2m = MemoryX2m::new();
        let mut session = BindingSession::new(&db, &x2m, "en");
        let mut entries = vec![
            Entry::new("{autoid=(100;200),setalias=(mainskill)}", "decl"),
            Entry::last("{getalias=(mainskill)}", "late"),
        ];
        session.resolve_initial(&mut entries, &[], "f").unwrap();
        // The DoLast entry must be untouched until the main group is done.
        assert_eq!(entries[1].index, "{getalias=(mainskill)}");
        let declared = declared_ids(&entries);
        session
            .resolve_deferred(&mut entries, &declared, &[], "f")
            .unwrap();
        assert_eq!(entries[0].index, "100");
        assert_eq!(entries[1].index, "100");
    }

    #[test]
    fn pre_seeded_alias() {
        let db = db();
        let x2m = MemoryX2m::new();
        let mut session = BindingSession::new(&db, &x2m, "en");
        session.add_alias("42", "myAlias");
        let out = session
            .resolve_string("{getalias=(myalias)}", "Index", "f")
            .unwrap();
        assert_eq!(out, "42");
    }

    #[test]
    fn sweep_drops_null_token_entries() {
        // exact match drops, embedded digits survive
        let db = db();
        let x2m = MemoryX2m::new();
        let mut session = BindingSession::new(&db, &x2m, "en");
        let mut entries = vec![
            Entry::new("1", "ok"),
            Entry::new(NULL_TOKEN_STR, "dropped"),
            Entry::new("x1280070990x", "embedded digits survive"),
        ];
        let swept = session.sweep_null_tokens(&mut entries);
        assert_eq!(swept, 1);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "ok");
        assert_eq!(entries[1].name, "embedded digits survive");
    }

    #[test]
    fn skip_policy_feeds_the_sweep() {
        let db = db();
        let x2m = MemoryX2m::new();
        let mut session = BindingSession::new(&db, &x2m, "en");
        let mut entries = vec![
            Entry::new("{charaid=(vgt),error=(skip)}", "missing chara"),
            Entry::new("{charaid=(gok)}", "present chara"),
        ];
        let swept = session.resolve_entries(&mut entries, &[], "f").unwrap();
        assert_eq!(swept, 1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].index, "0");
        assert!(session.failure_state().is_none());
    }

    #[test]
    fn stop_failure_recorded_on_session() {
        let db = db();
        let x2m = MemoryX2m::new();
        let mut session = BindingSession::new(&db, &x2m, "en");
        let mut entries = vec![Entry::new("{charaid=(vgt)}", "n")];
        assert!(session.resolve_entries(&mut entries, &[], "f").is_err());
        assert_eq!(session.failure_state(), Some(FailureState::BindingFailed));
    }

    #[test]
    fn direct_auto_id_shares_the_registry() {
        let db = db();
        let x2m = MemoryX2m::new();
        let mut session = BindingSession::new(&db, &x2m, "en");
        assert_eq!(session.auto_id("f", &[0, 1], 0, 100, 1), Some(2));

        // A binding against the same file must see the direct reservation.
        let mut entries = vec![Entry::new("{autoid=(0;100;1)}", "n")];
        session.resolve_entries(&mut entries, &[0, 1], "f").unwrap();
        assert_eq!(entries[0].index, "3");
    }

    #[test]
    fn max_auto_id_caps_implicit_range() {
        let db = db();
        let x2m = MemoryX2m::new();
        let mut session = BindingSession::new(&db, &x2m, "en").with_max_auto_id(1);
        let mut entries = vec![
            Entry::new("{autoid}", "a"),
            Entry::new("{autoid}", "b"),
            Entry::new("{autoid,error=(skip)}", "c"),
        ];
        let swept = session.resolve_entries(&mut entries, &[], "f").unwrap();
        assert_eq!(entries[0].index, "0");
        assert_eq!(entries[1].index, "1");
        // Third allocation exhausts [0, 1] and is swept away.
        assert_eq!(swept, 1);
    }

    #[test]
    fn declared_ids_ignores_non_numeric() {
        let entries = vec![
            Entry::new("5", ""),
            Entry::new("GOK", ""),
            Entry::new("{autoid}", ""),
        ];
        assert_eq!(declared_ids(&entries), vec![5]);
    }

    #[test]
    fn lang_is_case_insensitive() {
        let db = db();
        let x2m = MemoryX2m::new();
        let mut session = BindingSession::new(&db, &x2m, "EN");
        let out = session.resolve_string("{islang=(En)}", "n", "f").unwrap();
        assert_eq!(out, "true");
    }
}

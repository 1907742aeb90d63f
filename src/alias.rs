//! Alias table - resolved values shared between bindings.
//!
//! `setalias` writes the final value of one expression; `getalias`/`aliaslink`
//! read it from a later one. The table lives for the whole install session
//! and is never cleared mid-session; a new session gets a fresh table.
//! Names are case-insensitive, matching the rest of the grammar.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an alias, overwriting any previous value under the same name.
    pub fn set(&mut self, alias: &str, id: impl Into<String>) {
        self.entries.insert(alias.to_lowercase(), id.into());
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries.get(&alias.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut table = AliasTable::new();
        table.set("mySkill", "5023");
        assert_eq!(table.get("myskill"), Some("5023"));
        assert_eq!(table.get("MYSKILL"), Some("5023"));
        assert_eq!(table.get("other"), None);
    }

    #[test]
    fn set_overwrites() {
        let mut table = AliasTable::new();
        table.set("a", "1");
        table.set("a", "2");
        assert_eq!(table.get("a"), Some("2"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn starts_empty() {
        assert!(AliasTable::new().is_empty());
    }
}

//! External collaborators - game database and X2M package lookups.
//!
//! The resolver treats the game's binary databases and externally-installed
//! X2M packages as black boxes behind two traits. The in-memory
//! implementations are fed from a JSON snapshot and back the CLI and the
//! test suites; a real installer would put its parsed binary files behind
//! the same traits.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

/// Skill category; each category owns its own ID conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillType {
    Super,
    Ultimate,
    Evasive,
    Blast,
    Awoken,
}

impl SkillType {
    /// Accepts the keyword or its numeric index, both appear in the wild.
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "super" | "0" => SkillType::Super,
            "ultimate" | "1" => SkillType::Ultimate,
            "evasive" | "2" => SkillType::Evasive,
            "blast" | "3" => SkillType::Blast,
            "awoken" | "4" => SkillType::Awoken,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            SkillType::Super => "super",
            SkillType::Ultimate => "ultimate",
            SkillType::Evasive => "evasive",
            SkillType::Blast => "blast",
            SkillType::Awoken => "awoken",
        }
    }
}

/// One auto-allocation ID space outside the destination file itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSpace {
    Character,
    PartSet,
    Costume,
    TtbEvent,
    CusAura,
    Skill(SkillType),
}

impl IdSpace {
    /// Stable key, used both as registry identity and in snapshots.
    pub fn key(self) -> String {
        match self {
            IdSpace::Character => "character".to_string(),
            IdSpace::PartSet => "partset".to_string(),
            IdSpace::Costume => "costume".to_string(),
            IdSpace::TtbEvent => "ttbevent".to_string(),
            IdSpace::CusAura => "cusaura".to_string(),
            IdSpace::Skill(kind) => format!("skill:{}", kind.name()),
        }
    }
}

/// The two IDs a skill occupies (CUS table ID and its battle ID).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillIds {
    pub id1: i64,
    pub id2: i64,
}

/// Query surface over the game's parsed binary databases.
pub trait GameDb {
    fn skill_ids(&self, kind: SkillType, code: &str) -> Option<SkillIds>;
    fn chara_id(&self, code: &str) -> Option<i64>;
    fn stage_id(&self, code: &str) -> Option<i64>;
    fn local_key(&self, key: &str, lang: &str) -> Option<String>;
    /// IDs currently in use within one allocation space.
    fn used_ids(&self, space: IdSpace) -> Vec<i64>;
}

/// Query surface over externally-installed X2M packages, addressed by GUID.
pub trait X2mRepo {
    fn skill_ids(&self, guid: &str, kind: SkillType) -> Option<SkillIds>;
    fn skill_path(&self, guid: &str, kind: SkillType) -> Option<String>;
    fn chara_id(&self, guid: &str) -> Option<i64>;
    fn chara_code(&self, guid: &str) -> Option<String>;
    fn is_installed(&self, guid: &str) -> bool;
}

// ─────────────────────────────────────────────────────────────
// JSON snapshot records
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SkillRecord {
    pub kind: SkillType,
    pub code: String,
    pub id1: i64,
    pub id2: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharaRecord {
    pub code: String,
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StageRecord {
    pub code: String,
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocaleRecord {
    pub key: String,
    pub lang: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct X2mSkillRecord {
    pub guid: String,
    pub kind: SkillType,
    pub id1: i64,
    pub id2: i64,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct X2mCharaRecord {
    pub guid: String,
    pub id: i64,
    pub code: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct X2mSnapshot {
    #[serde(default)]
    pub skills: Vec<X2mSkillRecord>,
    #[serde(default)]
    pub characters: Vec<X2mCharaRecord>,
}

/// Serialized database state consumed by the CLI's `resolve` command.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DbSnapshot {
    #[serde(default)]
    pub skills: Vec<SkillRecord>,
    #[serde(default)]
    pub characters: Vec<CharaRecord>,
    #[serde(default)]
    pub stages: Vec<StageRecord>,
    #[serde(default)]
    pub locales: Vec<LocaleRecord>,
    /// Used IDs per allocation space, keyed by [`IdSpace::key`].
    #[serde(default)]
    pub id_spaces: HashMap<String, Vec<i64>>,
    /// SortIDs already present in the destination file the descriptor targets.
    #[serde(default)]
    pub existing_indexes: Vec<i64>,
    #[serde(default)]
    pub x2m: X2mSnapshot,
}

// ─────────────────────────────────────────────────────────────
// In-memory implementations
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryGameDb {
    skills: HashMap<(SkillType, String), SkillIds>,
    characters: HashMap<String, i64>,
    stages: HashMap<String, i64>,
    locales: HashMap<(String, String), String>,
    spaces: HashMap<String, Vec<i64>>,
}

impl MemoryGameDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &DbSnapshot) -> Self {
        let mut db = Self::new();
        for s in &snapshot.skills {
            db.add_skill(s.kind, &s.code, s.id1, s.id2);
        }
        for c in &snapshot.characters {
            db.add_chara(&c.code, c.id);
        }
        for s in &snapshot.stages {
            db.add_stage(&s.code, s.id);
        }
        for l in &snapshot.locales {
            db.add_locale(&l.key, &l.lang, &l.value);
        }
        for (space, ids) in &snapshot.id_spaces {
            db.seed_space(space, ids.clone());
        }
        db
    }

    pub fn add_skill(&mut self, kind: SkillType, code: &str, id1: i64, id2: i64) {
        self.skills
            .insert((kind, code.to_lowercase()), SkillIds { id1, id2 });
    }

    pub fn add_chara(&mut self, code: &str, id: i64) {
        self.characters.insert(code.to_lowercase(), id);
    }

    pub fn add_stage(&mut self, code: &str, id: i64) {
        self.stages.insert(code.to_lowercase(), id);
    }

    pub fn add_locale(&mut self, key: &str, lang: &str, value: &str) {
        self.locales
            .insert((key.to_lowercase(), lang.to_lowercase()), value.to_string());
    }

    pub fn seed_space(&mut self, space_key: &str, ids: Vec<i64>) {
        self.spaces.insert(space_key.to_string(), ids);
    }
}

impl GameDb for MemoryGameDb {
    fn skill_ids(&self, kind: SkillType, code: &str) -> Option<SkillIds> {
        self.skills.get(&(kind, code.to_lowercase())).copied()
    }

    fn chara_id(&self, code: &str) -> Option<i64> {
        self.characters.get(&code.to_lowercase()).copied()
    }

    fn stage_id(&self, code: &str) -> Option<i64> {
        self.stages.get(&code.to_lowercase()).copied()
    }

    fn local_key(&self, key: &str, lang: &str) -> Option<String> {
        self.locales
            .get(&(key.to_lowercase(), lang.to_lowercase()))
            .cloned()
    }

    fn used_ids(&self, space: IdSpace) -> Vec<i64> {
        self.spaces.get(&space.key()).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct MemoryX2m {
    skills: HashMap<(String, SkillType), (SkillIds, Option<String>)>,
    characters: HashMap<String, (i64, String)>,
    guids: HashSet<String>,
}

impl MemoryX2m {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &X2mSnapshot) -> Self {
        let mut repo = Self::new();
        for s in &snapshot.skills {
            repo.add_skill(&s.guid, s.kind, s.id1, s.id2, s.path.clone());
        }
        for c in &snapshot.characters {
            repo.add_chara(&c.guid, c.id, &c.code);
        }
        repo
    }

    pub fn add_skill(&mut self, guid: &str, kind: SkillType, id1: i64, id2: i64, path: Option<String>) {
        let guid = guid.to_lowercase();
        self.guids.insert(guid.clone());
        self.skills
            .insert((guid, kind), (SkillIds { id1, id2 }, path));
    }

    pub fn add_chara(&mut self, guid: &str, id: i64, code: &str) {
        let guid = guid.to_lowercase();
        self.guids.insert(guid.clone());
        self.characters.insert(guid, (id, code.to_string()));
    }
}

impl X2mRepo for MemoryX2m {
    fn skill_ids(&self, guid: &str, kind: SkillType) -> Option<SkillIds> {
        self.skills
            .get(&(guid.to_lowercase(), kind))
            .map(|(ids, _)| *ids)
    }

    fn skill_path(&self, guid: &str, kind: SkillType) -> Option<String> {
        self.skills
            .get(&(guid.to_lowercase(), kind))
            .and_then(|(_, path)| path.clone())
    }

    fn chara_id(&self, guid: &str) -> Option<i64> {
        self.characters.get(&guid.to_lowercase()).map(|(id, _)| *id)
    }

    fn chara_code(&self, guid: &str) -> Option<String> {
        self.characters
            .get(&guid.to_lowercase())
            .map(|(_, code)| code.clone())
    }

    fn is_installed(&self, guid: &str) -> bool {
        self.guids.contains(&guid.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_type_parse() {
        assert_eq!(SkillType::parse("super"), Some(SkillType::Super));
        assert_eq!(SkillType::parse("4"), Some(SkillType::Awoken));
        assert_eq!(SkillType::parse("mega"), None);
    }

    #[test]
    fn id_space_keys() {
        assert_eq!(IdSpace::Character.key(), "character");
        assert_eq!(IdSpace::Skill(SkillType::Ultimate).key(), "skill:ultimate");
    }

    #[test]
    fn snapshot_round_trip() {
        let json = r#"{
            "skills": [{"kind": "super", "code": "GOK", "id1": 1000, "id2": 100}],
            "characters": [{"code": "gok", "id": 0}],
            "stages": [{"code": "twc", "id": 3}],
            "locales": [{"key": "name_gok", "lang": "en", "value": "Goku"}],
            "id_spaces": {"character": [0, 1, 2]},
            "existing_indexes": [0, 1, 2],
            "x2m": {
                "skills": [{"guid": "aaaa-bbbb", "kind": "ultimate", "id1": 10100, "id2": 1100, "path": "skill/ULT/aaaa"}],
                "characters": [{"guid": "cccc-dddd", "id": 145, "code": "XYZ"}]
            }
        }"#;
        let snapshot: DbSnapshot = serde_json::from_str(json).unwrap();
        let db = MemoryGameDb::from_snapshot(&snapshot);
        let x2m = MemoryX2m::from_snapshot(&snapshot.x2m);

        assert_eq!(
            db.skill_ids(SkillType::Super, "gok"),
            Some(SkillIds { id1: 1000, id2: 100 })
        );
        assert_eq!(db.chara_id("GOK"), Some(0));
        assert_eq!(db.stage_id("twc"), Some(3));
        assert_eq!(db.local_key("NAME_GOK", "EN"), Some("Goku".to_string()));
        assert_eq!(db.used_ids(IdSpace::Character), vec![0, 1, 2]);
        assert!(db.used_ids(IdSpace::PartSet).is_empty());

        assert_eq!(
            x2m.skill_ids("AAAA-BBBB", SkillType::Ultimate),
            Some(SkillIds { id1: 10100, id2: 1100 })
        );
        assert_eq!(
            x2m.skill_path("aaaa-bbbb", SkillType::Ultimate).as_deref(),
            Some("skill/ULT/aaaa")
        );
        assert_eq!(x2m.chara_id("cccc-dddd"), Some(145));
        assert_eq!(x2m.chara_code("cccc-dddd").as_deref(), Some("XYZ"));
        assert!(x2m.is_installed("cccc-dddd"));
        assert!(!x2m.is_installed("unknown"));
    }

    #[test]
    fn empty_snapshot_defaults() {
        let snapshot: DbSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.skills.is_empty());
        assert!(snapshot.existing_indexes.is_empty());
        let db = MemoryGameDb::from_snapshot(&snapshot);
        assert_eq!(db.chara_id("gok"), None);
    }
}

//! The closed catalog of binding functions.
//!
//! Keyword spellings are fixed by the wire format and matched
//! case-insensitively; `aliaslink`/`getalias` and `x2mstageid`/`stageid` are
//! alternate spellings of the same function. Exactly one "primary"
//! (value-producing) function is allowed per expression; the rest are
//! auxiliary modifiers applied to the primary result.

/// One binding function kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingFunction {
    AutoId,
    SetAlias,
    GetAlias,
    SkillId1,
    SkillId2,
    CharaId,
    ErrorHandler,
    DefaultValue,
    X2mSkillId1,
    X2mSkillId2,
    AutoPartSet,
    Format,
    Increment,
    X2mSkillPath,
    AutoCostume,
    Skip,
    AutoCharaId,
    X2mCharaId,
    X2mCharaCode,
    X2mInstalled,
    IsLanguage,
    LocalKey,
    AutoTtbEvent,
    AutoCusAura,
    GetEntry,
    SetValue,
    StageId,
    AutoSkillId,
}

/// Argument-count rule for one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgRule {
    /// No arguments allowed.
    None,
    /// Zero up to this many arguments.
    UpTo(usize),
    /// Exactly this many arguments.
    Exactly(usize),
    /// At least this many arguments.
    AtLeast(usize),
}

impl ArgRule {
    /// Human-readable form for MB-023 messages.
    pub fn describe(self) -> String {
        match self {
            ArgRule::None => "0".to_string(),
            ArgRule::UpTo(n) => format!("at most {n}"),
            ArgRule::Exactly(n) => format!("exactly {n}"),
            ArgRule::AtLeast(n) => format!("at least {n}"),
        }
    }

    pub fn allows(self, count: usize) -> bool {
        match self {
            ArgRule::None => count == 0,
            ArgRule::UpTo(n) => count <= n,
            ArgRule::Exactly(n) => count == n,
            ArgRule::AtLeast(n) => count >= n,
        }
    }
}

impl BindingFunction {
    /// Resolve a lower-cased keyword to a function kind.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "autoid" => BindingFunction::AutoId,
            "setalias" => BindingFunction::SetAlias,
            "aliaslink" | "getalias" => BindingFunction::GetAlias,
            "skillid1" => BindingFunction::SkillId1,
            "skillid2" => BindingFunction::SkillId2,
            "charaid" => BindingFunction::CharaId,
            "error" => BindingFunction::ErrorHandler,
            "defaultvalue" => BindingFunction::DefaultValue,
            "x2mskillid1" => BindingFunction::X2mSkillId1,
            "x2mskillid2" => BindingFunction::X2mSkillId2,
            "autopartset" => BindingFunction::AutoPartSet,
            "format" => BindingFunction::Format,
            "increment" => BindingFunction::Increment,
            "x2mskillpath" => BindingFunction::X2mSkillPath,
            "autocostume" => BindingFunction::AutoCostume,
            "skip" => BindingFunction::Skip,
            "autocharaid" => BindingFunction::AutoCharaId,
            "x2mcharaid" => BindingFunction::X2mCharaId,
            "x2mcharacode" => BindingFunction::X2mCharaCode,
            "x2minstalled" => BindingFunction::X2mInstalled,
            "islang" => BindingFunction::IsLanguage,
            "localkey" => BindingFunction::LocalKey,
            "autottbevent" => BindingFunction::AutoTtbEvent,
            "autocusaura" => BindingFunction::AutoCusAura,
            "getentry" => BindingFunction::GetEntry,
            "setvalue" => BindingFunction::SetValue,
            "x2mstageid" | "stageid" => BindingFunction::StageId,
            "autoskillid" => BindingFunction::AutoSkillId,
            _ => return None,
        })
    }

    /// Canonical keyword, used in error messages.
    pub fn keyword(self) -> &'static str {
        match self {
            BindingFunction::AutoId => "autoid",
            BindingFunction::SetAlias => "setalias",
            BindingFunction::GetAlias => "getalias",
            BindingFunction::SkillId1 => "skillid1",
            BindingFunction::SkillId2 => "skillid2",
            BindingFunction::CharaId => "charaid",
            BindingFunction::ErrorHandler => "error",
            BindingFunction::DefaultValue => "defaultvalue",
            BindingFunction::X2mSkillId1 => "x2mskillid1",
            BindingFunction::X2mSkillId2 => "x2mskillid2",
            BindingFunction::AutoPartSet => "autopartset",
            BindingFunction::Format => "format",
            BindingFunction::Increment => "increment",
            BindingFunction::X2mSkillPath => "x2mskillpath",
            BindingFunction::AutoCostume => "autocostume",
            BindingFunction::Skip => "skip",
            BindingFunction::AutoCharaId => "autocharaid",
            BindingFunction::X2mCharaId => "x2mcharaid",
            BindingFunction::X2mCharaCode => "x2mcharacode",
            BindingFunction::X2mInstalled => "x2minstalled",
            BindingFunction::IsLanguage => "islang",
            BindingFunction::LocalKey => "localkey",
            BindingFunction::AutoTtbEvent => "autottbevent",
            BindingFunction::AutoCusAura => "autocusaura",
            BindingFunction::GetEntry => "getentry",
            BindingFunction::SetValue => "setvalue",
            BindingFunction::StageId => "stageid",
            BindingFunction::AutoSkillId => "autoskillid",
        }
    }

    /// Value-producing functions; at most one per expression.
    pub fn is_primary(self) -> bool {
        !matches!(
            self,
            BindingFunction::ErrorHandler
                | BindingFunction::DefaultValue
                | BindingFunction::Format
                | BindingFunction::Increment
                | BindingFunction::SetAlias
        )
    }

    /// Functions that need the full entry graph and run in the deferred pass.
    pub fn is_deferred(self) -> bool {
        matches!(
            self,
            BindingFunction::AutoId
                | BindingFunction::AutoCharaId
                | BindingFunction::AutoPartSet
                | BindingFunction::AutoCostume
                | BindingFunction::AutoTtbEvent
                | BindingFunction::AutoCusAura
                | BindingFunction::AutoSkillId
                | BindingFunction::GetEntry
        )
    }

    pub fn arg_rule(self) -> ArgRule {
        match self {
            BindingFunction::Skip | BindingFunction::AutoTtbEvent => ArgRule::None,
            BindingFunction::AutoId => ArgRule::UpTo(3),
            BindingFunction::AutoCharaId | BindingFunction::AutoPartSet => ArgRule::UpTo(2),
            BindingFunction::GetAlias
            | BindingFunction::SetAlias
            | BindingFunction::CharaId
            | BindingFunction::ErrorHandler
            | BindingFunction::DefaultValue
            | BindingFunction::Format
            | BindingFunction::Increment
            | BindingFunction::AutoCostume
            | BindingFunction::X2mCharaId
            | BindingFunction::X2mCharaCode
            | BindingFunction::X2mInstalled
            | BindingFunction::IsLanguage
            | BindingFunction::LocalKey
            | BindingFunction::AutoCusAura
            | BindingFunction::GetEntry
            | BindingFunction::SetValue
            | BindingFunction::StageId => ArgRule::Exactly(1),
            BindingFunction::SkillId1
            | BindingFunction::SkillId2
            | BindingFunction::X2mSkillId1
            | BindingFunction::X2mSkillId2
            | BindingFunction::X2mSkillPath
            | BindingFunction::AutoSkillId => ArgRule::AtLeast(2),
        }
    }
}

/// Keywords whose presence anywhere in a raw property string defers that
/// string to the second pass.
const DEFERRED_KEYWORDS: [&str; 8] = [
    "autoid",
    "autocharaid",
    "autopartset",
    "autocostume",
    "autottbevent",
    "autocusaura",
    "autoskillid",
    "getentry",
];

/// Classify a raw (unparsed) property string: does it contain any function
/// that must wait for the deferred pass? A plain keyword scan on the
/// lower-cased text, deliberately cheaper than a full parse.
pub fn needs_deferred_pass(raw: &str) -> bool {
    let lower = raw.to_lowercase();
    DEFERRED_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TrainerError;

pub const WILDCARD_TOKEN: &str = "??";

/// `true` for exactly two hex digits or the `??` wildcard.
pub fn is_pattern_token(token: &str) -> bool {
    token == WILDCARD_TOKEN || (token.len() == 2 && token.chars().all(|c| c.is_ascii_hexdigit()))
}

/// A byte pattern used to locate code or data in memory.
///
/// `pattern` is space-separated hex bytes with `??` wildcards,
/// e.g. `"89 87 ?? ?? 00 00 F3 0F 11"`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AobSignature {
    pub pattern: String,
    /// Signed distance from the match to the value of interest
    #[serde(default)]
    pub offset: i64,
    /// Module to scan; empty scans everything
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub description: String,
}

impl AobSignature {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            ..Default::default()
        }
    }

    pub fn tokens(&self) -> Vec<&str> {
        self.pattern.split_whitespace().collect()
    }

    /// Tokens that are neither a hex byte nor a wildcard, in order.
    pub fn invalid_tokens(&self) -> Vec<&str> {
        self.pattern
            .split_whitespace()
            .filter(|t| !is_pattern_token(t))
            .collect()
    }

    /// Non-empty and every token is a hex byte or wildcard.
    pub fn is_valid(&self) -> bool {
        let tokens = self.tokens();
        !tokens.is_empty() && tokens.iter().all(|t| is_pattern_token(t))
    }

    /// Fraction of wildcard tokens; 0.0 for an empty pattern.
    pub fn wildcard_ratio(&self) -> f64 {
        let tokens = self.tokens();
        if tokens.is_empty() {
            return 0.0;
        }
        let wildcards = tokens.iter().filter(|t| **t == WILDCARD_TOKEN).count();
        wildcards as f64 / tokens.len() as f64
    }

    /// Short name used in check ids and messages.
    pub fn label(&self) -> String {
        if self.description.is_empty() {
            self.pattern.chars().take(16).collect()
        } else {
            self.description.clone()
        }
    }
}

impl fmt::Display for AobSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AOB({})", self.pattern)?;
        if !self.module.is_empty() {
            write!(f, " [{}]", self.module)?;
        }
        if self.offset < 0 {
            write!(f, " -{:#x}", self.offset.unsigned_abs())
        } else {
            write!(f, " +{:#x}", self.offset)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    InfiniteHealth,
    InfiniteMana,
    InfiniteAmmo,
    InfiniteStamina,
    InfiniteCurrency,
    InfiniteItems,
    Godmode,
    OneHitKill,
    NoReload,
    SpeedHack,
    FreezeTimer,
    Teleport,
    #[default]
    Custom,
}

impl FeatureType {
    pub const ALL: [FeatureType; 13] = [
        FeatureType::InfiniteHealth,
        FeatureType::InfiniteMana,
        FeatureType::InfiniteAmmo,
        FeatureType::InfiniteStamina,
        FeatureType::InfiniteCurrency,
        FeatureType::InfiniteItems,
        FeatureType::Godmode,
        FeatureType::OneHitKill,
        FeatureType::NoReload,
        FeatureType::SpeedHack,
        FeatureType::FreezeTimer,
        FeatureType::Teleport,
        FeatureType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::InfiniteHealth => "infinite_health",
            FeatureType::InfiniteMana => "infinite_mana",
            FeatureType::InfiniteAmmo => "infinite_ammo",
            FeatureType::InfiniteStamina => "infinite_stamina",
            FeatureType::InfiniteCurrency => "infinite_currency",
            FeatureType::InfiniteItems => "infinite_items",
            FeatureType::Godmode => "godmode",
            FeatureType::OneHitKill => "one_hit_kill",
            FeatureType::NoReload => "no_reload",
            FeatureType::SpeedHack => "speed_hack",
            FeatureType::FreezeTimer => "freeze_timer",
            FeatureType::Teleport => "teleport",
            FeatureType::Custom => "custom",
        }
    }
}

impl FromStr for FeatureType {
    type Err = TrainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FeatureType::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| TrainerError::InvalidArgument(format!("unknown feature type '{}'", s)))
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trainer feature as requested by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerFeature {
    pub name: String,
    pub feature_type: FeatureType,
    #[serde(default)]
    pub description: String,
    /// e.g. "F1" or "Ctrl+1"
    #[serde(default)]
    pub hotkey: String,
}

impl TrainerFeature {
    pub fn new(name: &str, feature_type: FeatureType) -> Result<Self, TrainerError> {
        if name.trim().is_empty() {
            return Err(TrainerError::InvalidArgument(
                "trainer feature name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            feature_type,
            description: String::new(),
            hotkey: String::new(),
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_hotkey(mut self, hotkey: &str) -> Self {
        self.hotkey = hotkey.to_string();
        self
    }
}

impl fmt::Display for TrainerFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.feature_type)
    }
}

/// A script produced by the generation backend, plus the patterns it declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedScript {
    pub lua_code: String,
    pub feature: TrainerFeature,
    #[serde(default)]
    pub aob_sigs: Vec<AobSignature>,
    #[serde(default)]
    pub model_id: String,
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default)]
    pub raw_response: String,
}

impl GeneratedScript {
    pub fn new(lua_code: &str, feature: TrainerFeature) -> Self {
        Self {
            lua_code: lua_code.to_string(),
            feature,
            aob_sigs: Vec::new(),
            model_id: String::new(),
            prompt_tokens: 0,
            output_tokens: 0,
            raw_response: String::new(),
        }
    }

    pub fn with_aobs(mut self, aob_sigs: Vec<AobSignature>) -> Self {
        self.aob_sigs = aob_sigs;
        self
    }
}

impl fmt::Display for GeneratedScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self.lua_code.matches('\n').count() + 1;
        write!(
            f,
            "GeneratedScript<{}> ({} lines, {} AOBs)",
            self.feature.name,
            lines,
            self.aob_sigs.len()
        )
    }
}

/// Outcome of validating a generated script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptValidation {
    /// `true` iff `errors` is empty
    pub passed: bool,
    /// Blocking issues
    pub errors: Vec<String>,
    /// Non-blocking issues
    pub warnings: Vec<String>,
    /// Ids of the checks that actually ran, in order
    pub checks_run: Vec<String>,
}

impl ScriptValidation {
    pub fn ran(&self, check: &str) -> bool {
        self.checks_run.iter().any(|c| c == check)
    }
}

impl fmt::Display for ScriptValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(
            f,
            "[{}] {} error(s), {} warning(s)",
            status,
            self.errors.len(),
            self.warnings.len()
        )
    }
}

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::{
    ACCESS_CALLS, DEFAULT_ASSEMBLY, FALLBACK_READ_CALL, FALLBACK_WRITE_CALL, IL2CPP_MODULE,
};
use crate::error::TrainerError;

/// Technique used to turn a dumped field into a runtime access expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Host reflection bridge resolves class -> field -> offset by name.
    RuntimeBridge,
    /// Static offsets applied to a root pointer found with one pattern per class.
    OffsetPointerChain,
    /// Linear walk of the global object table, matching decoded class names.
    ObjectTableWalk,
    /// Legacy: scan for the instruction that writes the field and patch it.
    InstructionPatternWrite,
}

impl ResolutionStrategy {
    pub const ALL: [ResolutionStrategy; 4] = [
        ResolutionStrategy::RuntimeBridge,
        ResolutionStrategy::OffsetPointerChain,
        ResolutionStrategy::ObjectTableWalk,
        ResolutionStrategy::InstructionPatternWrite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::RuntimeBridge => "runtime-bridge",
            ResolutionStrategy::OffsetPointerChain => "offset-pointer-chain",
            ResolutionStrategy::ObjectTableWalk => "object-table-walk",
            ResolutionStrategy::InstructionPatternWrite => "instruction-pattern-write",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = TrainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResolutionStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s.trim())
            .ok_or_else(|| TrainerError::InvalidArgument(format!("unknown resolution strategy '{}'", s)))
    }
}

/// Broad runtime/engine category of a target, as reported by fingerprinting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetFamily {
    #[serde(rename = "Unity_Mono")]
    UnityMono,
    #[serde(rename = "Unity_IL2CPP")]
    UnityIl2cpp,
    #[serde(rename = "UE4")]
    Ue4,
    #[serde(rename = "UE5")]
    Ue5,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TargetFamily {
    pub const ALL: [TargetFamily; 5] = [
        TargetFamily::UnityMono,
        TargetFamily::UnityIl2cpp,
        TargetFamily::Ue4,
        TargetFamily::Ue5,
        TargetFamily::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFamily::UnityMono => "Unity_Mono",
            TargetFamily::UnityIl2cpp => "Unity_IL2CPP",
            TargetFamily::Ue4 => "UE4",
            TargetFamily::Ue5 => "UE5",
            TargetFamily::Unknown => "Unknown",
        }
    }

    /// Never fails: anything unrecognized is `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "Unity_Mono" => TargetFamily::UnityMono,
            "Unity_IL2CPP" => TargetFamily::UnityIl2cpp,
            "UE4" => TargetFamily::Ue4,
            "UE5" => TargetFamily::Ue5,
            _ => TargetFamily::Unknown,
        }
    }

    pub fn is_unreal(&self) -> bool {
        matches!(self, TargetFamily::Ue4 | TargetFamily::Ue5)
    }
}

impl fmt::Display for TargetFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy-specific metadata carried by a resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy")]
pub enum FieldAccess {
    #[serde(rename = "runtime-bridge")]
    RuntimeBridge { assembly: String, namespace: String },
    #[serde(rename = "offset-pointer-chain")]
    PointerChain { field_offset: u64 },
    #[serde(rename = "object-table-walk")]
    ObjectTable { class_path: String, field_offset: u64 },
    #[serde(rename = "instruction-pattern-write")]
    InstructionPattern,
}

impl FieldAccess {
    pub fn strategy(&self) -> ResolutionStrategy {
        match self {
            FieldAccess::RuntimeBridge { .. } => ResolutionStrategy::RuntimeBridge,
            FieldAccess::PointerChain { .. } => ResolutionStrategy::OffsetPointerChain,
            FieldAccess::ObjectTable { .. } => ResolutionStrategy::ObjectTableWalk,
            FieldAccess::InstructionPattern => ResolutionStrategy::InstructionPatternWrite,
        }
    }
}

/// How to read and write one field of one class at runtime.
///
/// `lua_write_expr` contains the `{value}` placeholder; `lua_read_expr` never does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResolution {
    pub class_name: String,
    pub field_name: String,
    pub field_type: String,
    #[serde(flatten)]
    pub access: FieldAccess,
    pub lua_read_expr: String,
    pub lua_write_expr: String,
    /// 0.0 - 1.0, lowered when the access path involved a guess
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl FieldResolution {
    pub fn strategy(&self) -> ResolutionStrategy {
        self.access.strategy()
    }

    pub fn field_offset(&self) -> Option<u64> {
        match &self.access {
            FieldAccess::PointerChain { field_offset } => Some(*field_offset),
            FieldAccess::ObjectTable { field_offset, .. } => Some(*field_offset),
            _ => None,
        }
    }

    /// Substitutes the placeholder in the write expression.
    pub fn write_with(&self, value: &str) -> String {
        self.lua_write_expr.replace(crate::consts::VALUE_PLACEHOLDER, value)
    }
}

impl fmt::Display for FieldResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FieldResolution({}.{} [{}] via {})",
            self.class_name,
            self.field_name,
            self.field_type,
            self.strategy()
        )
    }
}

/// Memory access calls for a field type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessCalls {
    pub read: &'static str,
    pub write: &'static str,
    /// The tag was not recognized and the float pair was used instead
    pub guessed: bool,
}

impl AccessCalls {
    pub fn for_type(field_type: &str) -> Self {
        let tag = field_type.trim().to_ascii_lowercase();
        ACCESS_CALLS
            .iter()
            .find(|(name, _, _)| *name == tag)
            .map(|&(_, read, write)| AccessCalls { read, write, guessed: false })
            .unwrap_or(AccessCalls {
                read: FALLBACK_READ_CALL,
                write: FALLBACK_WRITE_CALL,
                guessed: true,
            })
    }

    pub fn read_expr(&self, address: &str) -> String {
        format!("{}({})", self.read, address)
    }

    pub fn write_expr(&self, address: &str) -> String {
        format!("{}({}, {})", self.write, address, crate::consts::VALUE_PLACEHOLDER)
    }
}

/// Fingerprinting output for one target program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineInfo {
    pub engine_type: TargetFamily,
    pub version: String,
    pub bitness: u32,
    pub exe_path: String,
    pub game_dir: String,
    /// Per-family extras: "assembly_name", "primary_module", ...
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

/// Everything the resolvers and the prompt need to know about one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineContext {
    pub engine_type: TargetFamily,
    pub engine_version: String,
    pub bitness: u32,
    pub exe_path: String,
    pub assembly_name: String,
    pub module_name: String,
    /// Filled once by a single resolver run
    #[serde(default)]
    pub resolutions: Vec<FieldResolution>,
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(TargetFamily::Unknown)
    }
}

impl EngineContext {
    pub fn new(engine_type: TargetFamily) -> Self {
        Self {
            engine_type,
            engine_version: String::new(),
            bitness: 64,
            exe_path: String::new(),
            assembly_name: DEFAULT_ASSEMBLY.to_string(),
            module_name: String::new(),
            resolutions: Vec::new(),
        }
    }

    pub fn from_engine_info(info: &EngineInfo) -> Self {
        let assembly_name = info
            .extra
            .get("assembly_name")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ASSEMBLY.to_string());
        let module_name = match info.engine_type {
            TargetFamily::UnityIl2cpp => IL2CPP_MODULE.to_string(),
            TargetFamily::Ue4 | TargetFamily::Ue5 => {
                info.extra.get("primary_module").cloned().unwrap_or_default()
            }
            _ => String::new(),
        };

        Self {
            engine_type: info.engine_type,
            engine_version: info.version.clone(),
            bitness: info.bitness,
            exe_path: info.exe_path.clone(),
            assembly_name,
            module_name,
            resolutions: Vec::new(),
        }
    }

    pub fn pointer_size(&self) -> u32 {
        if self.bitness == 32 {
            4
        } else {
            8
        }
    }

    /// Assembly name, never empty.
    pub fn assembly(&self) -> &str {
        if self.assembly_name.is_empty() {
            DEFAULT_ASSEMBLY
        } else {
            &self.assembly_name
        }
    }

    /// First 16 hex chars of SHA-256 over the executable path.
    pub fn target_hash(&self) -> String {
        let digest = Sha256::digest(self.exe_path.as_bytes());
        digest
            .iter()
            .take(8)
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

impl fmt::Display for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({}-bit)", self.engine_type, self.engine_version, self.bitness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_tags() {
        for strategy in ResolutionStrategy::ALL {
            assert_eq!(strategy.as_str().parse::<ResolutionStrategy>().unwrap(), strategy);
            let json = serde_json::to_string(&strategy).unwrap();
            assert_eq!(json, format!("\"{}\"", strategy.as_str()));
        }
        assert!("mono_api".parse::<ResolutionStrategy>().is_err());
    }

    #[test]
    fn test_target_family_from_tag() {
        assert_eq!(TargetFamily::from_tag("Unity_Mono"), TargetFamily::UnityMono);
        assert_eq!(TargetFamily::from_tag("Unity_IL2CPP"), TargetFamily::UnityIl2cpp);
        assert_eq!(TargetFamily::from_tag("UE4"), TargetFamily::Ue4);
        assert_eq!(TargetFamily::from_tag("UE5"), TargetFamily::Ue5);
        assert_eq!(TargetFamily::from_tag(""), TargetFamily::Unknown);
        assert_eq!(TargetFamily::from_tag("Godot"), TargetFamily::Unknown);

        let family: TargetFamily = serde_json::from_str("\"Source2\"").unwrap();
        assert_eq!(family, TargetFamily::Unknown);
    }

    #[test]
    fn test_access_calls() {
        let calls = AccessCalls::for_type("int32");
        assert_eq!((calls.read, calls.write, calls.guessed), ("readInteger", "writeInteger", false));
        assert_eq!(AccessCalls::for_type("Double").read, "readDouble");
        assert_eq!(AccessCalls::for_type("bool").write, "writeBytes");
        assert_eq!(AccessCalls::for_type("pointer").read, "readPointer");

        let fallback = AccessCalls::for_type("Vector3");
        assert_eq!((fallback.read, fallback.write), ("readFloat", "writeFloat"));
        assert!(fallback.guessed);

        assert_eq!(calls.read_expr("base + 0x10"), "readInteger(base + 0x10)");
        assert_eq!(calls.write_expr("base + 0x10"), "writeInteger(base + 0x10, {value})");
    }

    #[test]
    fn test_field_resolution_serialization() {
        let resolution = FieldResolution {
            class_name: "PlayerController".to_string(),
            field_name: "health".to_string(),
            field_type: "float".to_string(),
            access: FieldAccess::PointerChain { field_offset: 0x58 },
            lua_read_expr: "readFloat(_getBase_PlayerController() + 0x58)".to_string(),
            lua_write_expr: "writeFloat(_getBase_PlayerController() + 0x58, {value})".to_string(),
            confidence: 1.0,
            notes: String::new(),
        };

        let value = serde_json::to_value(&resolution).unwrap();
        assert_eq!(value["strategy"], "offset-pointer-chain");
        assert_eq!(value["field_offset"], 0x58);
        assert!(value.get("notes").is_none());

        let back: FieldResolution = serde_json::from_value(value).unwrap();
        assert_eq!(back, resolution);
        assert_eq!(back.field_offset(), Some(0x58));
        assert_eq!(back.write_with("100.0"), "writeFloat(_getBase_PlayerController() + 0x58, 100.0)");
    }

    #[test]
    fn test_context_from_engine_info() {
        let mut info = EngineInfo {
            engine_type: TargetFamily::UnityIl2cpp,
            version: "2022.3.10f1".to_string(),
            bitness: 64,
            exe_path: "C:/Games/Foo/Foo.exe".to_string(),
            game_dir: "C:/Games/Foo".to_string(),
            extra: HashMap::new(),
        };
        let ctx = EngineContext::from_engine_info(&info);
        assert_eq!(ctx.module_name, "GameAssembly.dll");
        assert_eq!(ctx.assembly_name, "Assembly-CSharp");
        assert!(ctx.resolutions.is_empty());

        info.engine_type = TargetFamily::Ue5;
        info.extra.insert("primary_module".to_string(), "Foo-Win64-Shipping.exe".to_string());
        info.extra.insert("assembly_name".to_string(), "Game".to_string());
        let ctx = EngineContext::from_engine_info(&info);
        assert_eq!(ctx.module_name, "Foo-Win64-Shipping.exe");
        assert_eq!(ctx.assembly_name, "Game");
        assert_eq!(ctx.to_string(), "UE5 2022.3.10f1 (64-bit)");
    }

    #[test]
    fn test_pointer_size_and_hash() {
        let mut ctx = EngineContext::new(TargetFamily::Ue4);
        assert_eq!(ctx.pointer_size(), 8);
        ctx.bitness = 32;
        assert_eq!(ctx.pointer_size(), 4);

        ctx.exe_path = "C:/Games/Foo/Foo.exe".to_string();
        let hash = ctx.target_hash();
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, ctx.target_hash());

        ctx.assembly_name.clear();
        assert_eq!(ctx.assembly(), "Assembly-CSharp");
    }
}

/// Read/write call names for each field type tag.
pub const ACCESS_CALLS: &[(&str, &str, &str)] = &[
    ("float", "readFloat", "writeFloat"),
    ("single", "readFloat", "writeFloat"),
    ("double", "readDouble", "writeDouble"),
    ("int32", "readInteger", "writeInteger"),
    ("int", "readInteger", "writeInteger"),
    ("uint32", "readInteger", "writeInteger"),
    ("int64", "readQword", "writeQword"),
    ("int16", "readSmallInteger", "writeSmallInteger"),
    ("byte", "readBytes", "writeBytes"),
    ("bool", "readBytes", "writeBytes"),
    ("pointer", "readPointer", "writePointer"),
];

pub const FALLBACK_READ_CALL: &str = "readFloat";
pub const FALLBACK_WRITE_CALL: &str = "writeFloat";

/// Confidence assigned when the access width had to fall back to float.
pub const GUESSED_TYPE_CONFIDENCE: f32 = 0.5;

pub const DEFAULT_ASSEMBLY: &str = "Assembly-CSharp";
pub const IL2CPP_MODULE: &str = "GameAssembly.dll";

/// Placeholder substituted with the value to store in write expressions.
pub const VALUE_PLACEHOLDER: &str = "{value}";

/// Field types that are never exposed through the runtime bridge.
pub const BRIDGE_SKIP_TYPES: &[&str] = &[
    "UnityEngine.Transform",
    "GameObject",
    "Component",
    "Animator",
    "Rigidbody",
    "Collider",
];

// mov rax, [rip + rel32]; test rax, rax; je; mov rax, [rax + ..]
pub const SINGLETON_AOB_HINT: &str = "48 8B 05 ?? ?? ?? ?? 48 85 C0 74 ?? 48 8B 40";

// mov ecx, [abs32]; test ecx, ecx; je; mov eax, [ecx + ..]
pub const SINGLETON_AOB_HINT_X86: &str = "8B 0D ?? ?? ?? ?? 85 C9 74 ?? 8B 41";

pub const OBJECT_TABLE_AOB_UE4: &str = "48 8B 05 ?? ?? ?? ?? 48 8B 0C C8 48 8B 04 D1";
pub const OBJECT_TABLE_AOB_UE5: &str = "48 89 05 ?? ?? ?? ?? E9";

// UObjectBase layout
pub const UOBJECT_CLASS_OFFSET: u64 = 0x10;
pub const UOBJECT_NAME_OFFSET: u64 = 0x18;
pub const OBJECT_TABLE_COUNT_OFFSET: u64 = 0x14;
pub const OBJECT_TABLE_ENTRIES_OFFSET: u64 = 0x18;

pub const INSUFFICIENT_DATA_MARKER: &str = "-- INSUFFICIENT_DATA";
pub const LUA_COMMENT_PREFIX: &str = "--";

pub const PRIMITIVE_API_CALLS: &[&str] = &[
    "readFloat",
    "writeFloat",
    "readInteger",
    "writeInteger",
    "readBytes",
    "writeBytes",
    "getAddress",
    "AOBScan",
    "defineByteTable",
    "createThread",
    "registerSymbol",
    "getLocalPlayer",
    "readDouble",
    "writeDouble",
    "readPointer",
    "writePointer",
    "readQword",
    "writeQword",
    "readSmallInteger",
    "writeSmallInteger",
];

pub const BRIDGE_API_CALLS: &[&str] = &[
    "mono_findClass",
    "mono_getClassField",
    "mono_getFieldOffset",
    "mono_findObject",
    "mono_enumDomain",
    "mono_enumAssemblies",
    "mono_object_get_field_address",
    "mono_getStaticFieldAddress",
];

pub const TOGGLE_NAMES: &[&str] = &["cheatEnabled", "enabled", "isActive", "toggle"];

pub const SCAN_CALL: &str = "AOBScan";

/// Bridge-mode scripts calling the scanner more often than this get a warning.
pub const MAX_BRIDGE_SCAN_CALLS: usize = 2;

/// Class-name tokens that push a class to the front of the prompt.
pub const HIGH_PRIORITY_KEYWORDS: &[&str] = &[
    "player",
    "character",
    "hero",
    "protagonist",
    "health",
    "hp",
    "stamina",
    "mana",
    "ammo",
    "gold",
    "money",
    "currency",
    "score",
    "inventory",
    "item",
    "weapon",
    "skill",
    "game",
    "manager",
    "controller",
    "singleton",
];

use log::{debug, trace};

use crate::consts::{
    OBJECT_TABLE_AOB_UE4, OBJECT_TABLE_AOB_UE5, OBJECT_TABLE_COUNT_OFFSET, OBJECT_TABLE_ENTRIES_OFFSET,
    UOBJECT_CLASS_OFFSET, UOBJECT_NAME_OFFSET,
};
use crate::models::{
    EngineContext, FieldAccess, FieldResolution, ResolutionStrategy, StructureSnapshot, TargetFamily,
};
use crate::resolvers::build_resolution;
use crate::traits::resolver::FieldResolver;
use crate::utils::{lua_str, parse_hex_offset};

/// Finds live instances by walking the global object table.
///
/// A single anchor pattern locates the table. It targets the engine's generic
/// table-registration code, so it survives game patches; only engine major
/// versions change it. Each lookup scans the table for the first object whose
/// decoded class name matches, and the static property offset is applied to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectTableResolver;

impl ObjectTableResolver {
    pub fn new() -> Self {
        Self
    }

    /// Anchor pattern for the table, picked by the context's engine version.
    pub fn anchor_pattern(context: &EngineContext) -> &'static str {
        match context.engine_type {
            TargetFamily::Ue5 => OBJECT_TABLE_AOB_UE5,
            _ => OBJECT_TABLE_AOB_UE4,
        }
    }

    pub fn actor_lookup(class_name: &str) -> String {
        format!("_findActor({})", lua_str(class_name))
    }
}

impl FieldResolver for ObjectTableResolver {
    fn name(&self) -> &'static str {
        "object_table_resolver"
    }

    fn strategy(&self) -> ResolutionStrategy {
        ResolutionStrategy::ObjectTableWalk
    }

    fn resolve(&self, structure: &StructureSnapshot, _context: &EngineContext) -> Vec<FieldResolution> {
        let mut resolutions = Vec::new();
        let mut dropped = 0usize;

        for class in &structure.classes {
            if class.fields.is_empty() {
                continue;
            }
            let lookup = Self::actor_lookup(&class.name);

            for field in &class.fields {
                let Some(offset) = parse_hex_offset(&field.offset) else {
                    trace!("{}.{}: no usable offset ({:?}), dropped", class.name, field.name, field.offset);
                    dropped += 1;
                    continue;
                };

                let address = format!("{} + {:#x}", lookup, offset);
                resolutions.push(build_resolution(
                    class,
                    field,
                    FieldAccess::ObjectTable {
                        class_path: class.name.clone(),
                        field_offset: offset,
                    },
                    &address,
                    format!("Property offset {:#x} from the static dump.", offset),
                ));
            }
        }

        debug!(
            "{}: {} resolutions, {} fields dropped",
            self.name(),
            resolutions.len(),
            dropped
        );
        resolutions
    }

    fn preamble(&self, context: &EngineContext) -> String {
        let anchor = Self::anchor_pattern(context);
        let engine_tag = if context.engine_type == TargetFamily::Ue5 { "UE5" } else { "UE4" };
        let ptr_size = context.pointer_size();

        format!(
            r#"-- Object table helpers ({engine_tag})
-- Table anchor : {anchor}
-- Object layout: class={class_off:#x}, name={name_off:#x}

local _GObjects   = nil
local _GNames     = nil  -- name pool base; assign it before the first _findActor call
local _actorCache = {{}}

local function _resolveRIP(addr)
  return addr + 7 + readInteger(addr + 3, true)
end

-- Locate the object table once; later calls are no-ops
local function _initGObjects()
  if _GObjects then return end
  local match = AOBScan("{anchor}")
  if match then
    _GObjects = _resolveRIP(match)
  end
end

-- Decode an interned name index into a string
local function _readFName(nameIndex)
  if not _GNames then return "" end
  local chunk  = readPointer(_GNames + (nameIndex >> 16) * {ptr_size})
  local entry  = chunk + (nameIndex & 0xFFFF) * 2
  local len    = readSmallInteger(entry) >> 6
  return readString(entry + 2, len)
end

local function _getClassName(obj)
  local classPtr = readPointer(obj + {class_off:#x})
  if classPtr == nil or classPtr == 0 then return "" end
  return _readFName(readInteger(classPtr + {name_off:#x}))
end

-- First live object whose class name matches, cached per class name
local function _findActor(className)
  if _actorCache[className] then return _actorCache[className] end
  _initGObjects()
  if not _GObjects then return 0 end

  local numObjs = readInteger(_GObjects + {count_off:#x})
  for i = 0, numObjs - 1 do
    local entry = readPointer(_GObjects + {entries_off:#x} + i * {ptr_size})
    if entry and entry ~= 0 then
      local obj = readPointer(entry)
      if obj and obj ~= 0 and _getClassName(obj) == className then
        _actorCache[className] = obj
        return obj
      end
    end
  end
  return 0
end

-- Drop cached objects, e.g. after a level load
local function _invalidateActors()
  _actorCache = {{}}
end
"#,
            engine_tag = engine_tag,
            anchor = anchor,
            class_off = UOBJECT_CLASS_OFFSET,
            name_off = UOBJECT_NAME_OFFSET,
            count_off = OBJECT_TABLE_COUNT_OFFSET,
            entries_off = OBJECT_TABLE_ENTRIES_OFFSET,
            ptr_size = ptr_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassInfo, FieldInfo};

    fn character_structure() -> StructureSnapshot {
        StructureSnapshot::new(
            "UE4",
            "4.27.2",
            vec![
                ClassInfo::new(
                    "BP_PlayerCharacter_C",
                    "",
                    vec![
                        FieldInfo::new("Health", "float", "0x0330"),
                        FieldInfo::new("Inventory", "TArray", ""),
                    ],
                ),
                ClassInfo::new("BP_Empty_C", "", vec![]),
            ],
        )
    }

    #[test]
    fn test_resolve_uses_table_lookup() {
        let ctx = EngineContext::new(TargetFamily::Ue4);
        let resolutions = ObjectTableResolver::new().resolve(&character_structure(), &ctx);

        assert_eq!(resolutions.len(), 1);
        let health = &resolutions[0];
        assert!(health.lua_read_expr.contains("0x330"));
        assert!(!health.lua_read_expr.contains("0x0330"));
        assert!(health.lua_read_expr.contains(r#"_findActor("BP_PlayerCharacter_C")"#));
        assert_eq!(health.lua_read_expr, r#"readFloat(_findActor("BP_PlayerCharacter_C") + 0x330)"#);
        assert_eq!(
            health.lua_write_expr,
            r#"writeFloat(_findActor("BP_PlayerCharacter_C") + 0x330, {value})"#
        );
        assert_eq!(
            health.access,
            FieldAccess::ObjectTable {
                class_path: "BP_PlayerCharacter_C".to_string(),
                field_offset: 0x330,
            }
        );
    }

    #[test]
    fn test_version_selects_anchor() {
        let resolver = ObjectTableResolver::new();

        let ue4 = resolver.preamble(&EngineContext::new(TargetFamily::Ue4));
        assert!(ue4.contains(OBJECT_TABLE_AOB_UE4));
        assert!(!ue4.contains(OBJECT_TABLE_AOB_UE5));
        assert!(ue4.contains("(UE4)"));

        let ue5 = resolver.preamble(&EngineContext::new(TargetFamily::Ue5));
        assert!(ue5.contains(OBJECT_TABLE_AOB_UE5));
        assert!(!ue5.contains(OBJECT_TABLE_AOB_UE4));
        assert!(ue5.contains("(UE5)"));
    }

    #[test]
    fn test_preamble_helpers() {
        let preamble = ObjectTableResolver::new().preamble(&EngineContext::new(TargetFamily::Ue4));
        assert!(preamble.contains("local function _initGObjects()"));
        assert!(preamble.contains("if _GObjects then return end"));
        assert!(preamble.contains("local function _readFName(nameIndex)"));
        assert!(preamble.contains("local function _findActor(className)"));
        assert!(preamble.contains("_actorCache[className] = obj"));
        assert!(preamble.contains("readPointer(obj + 0x10)"));
        assert!(preamble.contains("readInteger(_GObjects + 0x14)"));
        assert!(preamble.contains("for i = 0, numObjs - 1 do"));
        assert!(!preamble.contains("BP_Empty_C"));
    }

    #[test]
    fn test_integer_field_and_determinism() {
        let structure = StructureSnapshot::new(
            "UE5",
            "5.3",
            vec![ClassInfo::new("BP_Wallet_C", "", vec![FieldInfo::new("Coins", "int32", "0x2A8")])],
        );
        let ctx = EngineContext::new(TargetFamily::Ue5);
        let resolver = ObjectTableResolver::new();

        let first = resolver.resolve(&structure, &ctx);
        assert_eq!(first[0].lua_read_expr, r#"readInteger(_findActor("BP_Wallet_C") + 0x2a8)"#);
        assert_eq!(first, resolver.resolve(&structure, &ctx));
    }
}

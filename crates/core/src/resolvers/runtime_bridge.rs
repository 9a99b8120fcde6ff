use log::{debug, trace};

use crate::consts::BRIDGE_SKIP_TYPES;
use crate::models::{
    ClassInfo, EngineContext, FieldAccess, FieldInfo, FieldResolution, ResolutionStrategy, StructureSnapshot,
};
use crate::resolvers::{accessor_key, build_resolution};
use crate::traits::resolver::FieldResolver;
use crate::utils::{lua_ident, lua_str};

/// Name-based offset lookup through the host's reflection bridge.
///
/// Offsets are asked of the runtime itself (class -> field -> offset), so
/// nothing is scanned for and layout changes between patches are harmless.
/// Instance fields still need a live object, which the consumer supplies
/// through a per-class `_getObj_<Class>()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeBridgeResolver;

impl RuntimeBridgeResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn object_accessor(class_name: &str) -> String {
        format!("_getObj_{}", lua_ident(class_name))
    }

    fn is_skipped_type(field_type: &str) -> bool {
        BRIDGE_SKIP_TYPES.contains(&field_type)
    }

    /// `obj + offset`, with the offset looked up (and cached) by name.
    fn instance_address(accessor: &str, class: &ClassInfo, field: &FieldInfo) -> String {
        format!(
            "{}() + _monoOffset({}, {}, {})",
            accessor,
            lua_str(&class.namespace),
            lua_str(&class.name),
            lua_str(&field.name)
        )
    }

    /// Static storage needs no instance: ask the bridge for the address directly.
    fn static_address(assembly: &str, class: &ClassInfo, field: &FieldInfo) -> String {
        format!(
            "mono_getStaticFieldAddress(mono_getClassField(mono_findClass({}, {}, {}), {}))",
            lua_str(assembly),
            lua_str(&class.namespace),
            lua_str(&class.name),
            lua_str(&field.name)
        )
    }
}

impl FieldResolver for RuntimeBridgeResolver {
    fn name(&self) -> &'static str {
        "runtime_bridge_resolver"
    }

    fn strategy(&self) -> ResolutionStrategy {
        ResolutionStrategy::RuntimeBridge
    }

    fn resolve(&self, structure: &StructureSnapshot, context: &EngineContext) -> Vec<FieldResolution> {
        let assembly = context.assembly();
        let mut resolutions = Vec::new();
        let mut skipped = 0usize;

        for class in &structure.classes {
            let accessor = Self::object_accessor(&accessor_key(structure, class));
            for field in &class.fields {
                if Self::is_skipped_type(&field.field_type) {
                    trace!("{}.{}: {} is not exposed, skipped", class.name, field.name, field.field_type);
                    skipped += 1;
                    continue;
                }

                let (address, notes) = if field.is_static {
                    (
                        Self::static_address(assembly, class, field),
                        "Static field, resolved through the bridge without an instance.".to_string(),
                    )
                } else {
                    (
                        Self::instance_address(&accessor, class, field),
                        format!("Implement {}() to return a live instance.", accessor),
                    )
                };

                resolutions.push(build_resolution(
                    class,
                    field,
                    FieldAccess::RuntimeBridge {
                        assembly: assembly.to_string(),
                        namespace: class.namespace.clone(),
                    },
                    &address,
                    notes,
                ));
            }
        }

        debug!(
            "{}: {} resolutions, {} fields skipped",
            self.name(),
            resolutions.len(),
            skipped
        );
        resolutions
    }

    fn preamble(&self, context: &EngineContext) -> String {
        let assembly = lua_str(context.assembly());

        format!(
            r#"-- Runtime bridge helpers
-- Assembly: {assembly}
-- Bridge calls used: mono_findClass, mono_getClassField, mono_getFieldOffset,
--   mono_getStaticFieldAddress

local _classCache  = {{}}
local _fieldCache  = {{}}
local _offsetCache = {{}}

-- Class lookup, keyed "ns.Class"
local function _monoClass(ns, name)
  local key = ns .. "." .. name
  if not _classCache[key] then
    _classCache[key] = mono_findClass({assembly}, ns, name)
  end
  return _classCache[key]
end

-- Field lookup, keyed "ns.Class:field"
local function _monoField(ns, className, fieldName)
  local key = ns .. "." .. className .. ":" .. fieldName
  if not _fieldCache[key] then
    local cls = _monoClass(ns, className)
    if cls then
      _fieldCache[key] = mono_getClassField(cls, fieldName)
    end
  end
  return _fieldCache[key]
end

-- Byte offset of a field, keyed like _monoField
local function _monoOffset(ns, className, fieldName)
  local key = ns .. "." .. className .. ":" .. fieldName
  if _offsetCache[key] == nil then
    local f = _monoField(ns, className, fieldName)
    if f then
      _offsetCache[key] = mono_getFieldOffset(f)
    end
  end
  return _offsetCache[key]
end

-- Every _getObj_<Class>() used below returns a live instance of that class.
-- Prefer reading a static singleton field over mono_findObject, which walks
-- the whole heap. Example:
--   function _getObj_PlayerController()
--     return mono_findObject({assembly}, "Game.Player", "PlayerController")
--   end
"#,
            assembly = assembly
        )
    }
}

use log::{debug, trace};

use crate::consts::{IL2CPP_MODULE, SINGLETON_AOB_HINT, SINGLETON_AOB_HINT_X86};
use crate::models::{EngineContext, FieldAccess, FieldResolution, ResolutionStrategy, StructureSnapshot};
use crate::resolvers::{accessor_key, build_resolution};
use crate::traits::resolver::FieldResolver;
use crate::utils::{lua_ident, parse_hex_offset};

/// Static field offsets applied to a per-class root pointer.
///
/// Ahead-of-time compiled runtimes keep field offsets fixed, so the only thing
/// that has to be located at runtime is the object itself. One root pattern per
/// class serves every field of that class.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerChainResolver;

impl PointerChainResolver {
    pub fn new() -> Self {
        Self
    }

    /// Name of the consumer-implemented accessor returning the class's live instance.
    /// Namespace dots become underscores like any other non-identifier character.
    pub fn base_accessor(class_name: &str) -> String {
        format!("_getBase_{}", lua_ident(class_name))
    }
}

impl FieldResolver for PointerChainResolver {
    fn name(&self) -> &'static str {
        "pointer_chain_resolver"
    }

    fn strategy(&self) -> ResolutionStrategy {
        ResolutionStrategy::OffsetPointerChain
    }

    fn resolve(&self, structure: &StructureSnapshot, _context: &EngineContext) -> Vec<FieldResolution> {
        let mut resolutions = Vec::new();
        let mut dropped = 0usize;

        for class in &structure.classes {
            if class.fields.is_empty() {
                continue;
            }
            let accessor = Self::base_accessor(&accessor_key(structure, class));

            for field in &class.fields {
                let Some(offset) = parse_hex_offset(&field.offset) else {
                    trace!("{}.{}: no usable offset ({:?}), dropped", class.name, field.name, field.offset);
                    dropped += 1;
                    continue;
                };

                let address = format!("{}() + {:#x}", accessor, offset);
                let notes = format!(
                    "Field offset {:#x} from the static dump. Implement {}() with a root pattern.",
                    offset, accessor
                );
                resolutions.push(build_resolution(
                    class,
                    field,
                    FieldAccess::PointerChain { field_offset: offset },
                    &address,
                    notes,
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
        let module = if context.module_name.is_empty() {
            IL2CPP_MODULE
        } else {
            context.module_name.as_str()
        };
        let ptr_size = context.pointer_size();

        // x64 roots are reached through rip-relative loads, x86 through absolute ones
        let (resolver, hint) = if ptr_size == 8 {
            (
                "\
-- Resolve a RIP-relative load to the address it reads from:
--   48 8B 05 [rel32]  ->  matchAddr + 7 + rel32
local function _resolveRef(matchAddr)
  local rel = readInteger(matchAddr + 3, true)
  return matchAddr + 7 + rel
end",
                SINGLETON_AOB_HINT,
            )
        } else {
            (
                "\
-- Resolve an absolute load to the address it reads from:
--   8B 0D [abs32]  ->  abs32
local function _resolveRef(matchAddr)
  return readInteger(matchAddr + 2)
end",
                SINGLETON_AOB_HINT_X86,
            )
        };

        format!(
            r#"-- Pointer-chain helpers
-- Module : {module}
-- Target : {bitness}-bit (pointer size = {ptr_size} bytes)
--
-- One root pattern per class, then a short pointer chain, then the static
-- field offset. Fields themselves are never scanned for.

local _baseCache = {{}}

{resolver}

-- Scan for a root pattern, dereference the static slot it loads from, then
-- follow an optional chain of pointer offsets, e.g. {{0x20, 0x58}}.
local function _findRoot(aobPattern, chain)
  local match = AOBScan(aobPattern, "{module}")
  if not match then return nil end
  local addr = readPointer(_resolveRef(match))
  for _, off in ipairs(chain or {{}}) do
    if addr == nil or addr == 0 then return nil end
    addr = readPointer(addr + off)
  end
  return addr
end

-- Cached root lookup keyed by class name.
local function _cachedRoot(className, aobPattern, chain)
  if not _baseCache[className] then
    _baseCache[className] = _findRoot(aobPattern, chain)
  end
  return _baseCache[className]
end

-- Each _getBase_<Class>() used below must be written for this target: the
-- root pattern is not derivable from the dump. Typical singleton load:
--   "{hint}"
-- Example:
--   local function _getBase_PlayerController()
--     return _cachedRoot("PlayerController", "{hint}", {{0x18, 0x28}})
--   end
"#,
            module = module,
            bitness = context.bitness,
            ptr_size = ptr_size,
            resolver = resolver,
            hint = hint,
        )
    }
}

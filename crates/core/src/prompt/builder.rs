use log::debug;

use crate::consts::{INSUFFICIENT_DATA_MARKER, SINGLETON_AOB_HINT};
use crate::models::{EngineContext, FeatureType, PromptConfig, StructureSnapshot, TargetFamily, TrainerFeature};
use crate::parsing::{AOB_BEGIN, AOB_END, SCRIPT_BEGIN, SCRIPT_END};
use crate::resolvers::select_family;
use crate::traits::resolver::FieldResolver;

const ROLE: &str = "You write Cheat Engine Lua scripts for single-player PC games.";

/// Assembles the (system, user) message pair for the generation backend.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    config: PromptConfig,
}

impl PromptBuilder {
    pub fn new(config: PromptConfig) -> Self {
        Self { config }
    }

    pub fn system_prompt(&self, family: TargetFamily) -> String {
        [ROLE.to_string(), engine_addendum(family), shared_rules(), output_contract()].join("\n\n")
    }

    /// Without a context the prompt falls back to the legacy
    /// write-instruction mode.
    pub fn build(
        &self,
        structure: &StructureSnapshot,
        feature: &TrainerFeature,
        context: Option<&EngineContext>,
    ) -> (String, String) {
        let family = context.map(|c| c.engine_type).unwrap_or_default();
        let system = self.system_prompt(family);
        let user = self.user_message(structure, feature, context);
        debug!(
            "built prompt for {} ({}): {} + {} chars",
            feature,
            family,
            system.len(),
            user.len()
        );
        (system, user)
    }

    fn user_message(&self, structure: &StructureSnapshot, feature: &TrainerFeature, context: Option<&EngineContext>) -> String {
        let mut parts = vec![
            "## Game Structure".to_string(),
            structure.to_prompt_str(self.config.max_classes),
            String::new(),
        ];

        if let Some(ctx) = context {
            let version = if ctx.engine_version.is_empty() {
                "unknown version".to_string()
            } else {
                format!("v{}", ctx.engine_version)
            };
            let module = if ctx.module_name.is_empty() {
                "(auto-detect)"
            } else {
                ctx.module_name.as_str()
            };
            parts.push("## Engine Context".to_string());
            parts.push(format!("Engine : {} ({}, {}-bit)", ctx.engine_type, version, ctx.bitness));
            parts.push(format!("Module : {}", module));
            parts.push(String::new());

            // Unknown targets are generated in write-instruction mode: no expressions, no helpers
            if ctx.engine_type != TargetFamily::Unknown {
                if !ctx.resolutions.is_empty() {
                    parts.extend(self.resolution_table(ctx));
                }

                let preamble = select_family(ctx.engine_type).preamble(ctx);
                let preamble = preamble.trim();
                if !preamble.is_empty() {
                    parts.push("## Required Script Preamble".to_string());
                    parts.push("Put this at the top of the script, unchanged:".to_string());
                    parts.push("```lua".to_string());
                    parts.push(preamble.to_string());
                    parts.push("```".to_string());
                    parts.push(String::new());
                }
            }
        }

        parts.push("## Requested Feature".to_string());
        parts.push(format!("Name : {}", feature.name));
        parts.push(format!("Type : {}", feature.feature_type));
        if !feature.description.is_empty() {
            parts.push(format!("Description: {}", feature.description));
        }
        if !feature.hotkey.is_empty() {
            parts.push(format!("Hotkey: {}", feature.hotkey));
        }

        parts.push(String::new());
        parts.push("## Implementation Guidance".to_string());
        parts.push(feature_hint(feature.feature_type).to_string());
        parts.push(String::new());
        parts.push("Write the script now, in the output format given above.".to_string());

        parts.join("\n")
    }

    fn resolution_table(&self, ctx: &EngineContext) -> Vec<String> {
        let mut lines = vec![
            "## Pre-resolved Field Access (use these expressions as they are)".to_string(),
            "| Class | Field | Type | Read | Write |".to_string(),
            "|-------|-------|------|------|-------|".to_string(),
        ];
        for r in ctx.resolutions.iter().take(self.config.max_resolutions) {
            lines.push(format!(
                "| {} | {} | {} | `{}` | `{}` |",
                r.class_name, r.field_name, r.field_type, r.lua_read_expr, r.lua_write_expr
            ));
        }
        if ctx.resolutions.len() > self.config.max_resolutions {
            lines.push(format!(
                "_({} more fields not shown)_",
                ctx.resolutions.len() - self.config.max_resolutions
            ));
        }
        lines.push(String::new());
        lines
    }
}

fn engine_addendum(family: TargetFamily) -> String {
    match family {
        TargetFamily::UnityMono => "\
TARGET: Unity Mono, through Cheat Engine's built-in Mono bridge
Bridge calls:
  mono_findClass(assembly, namespace, class)  -> class handle
  mono_getClassField(class, fieldName)        -> field handle
  mono_getFieldOffset(field)                  -> byte offset
  mono_getStaticFieldAddress(field)           -> address of a static field
  mono_findObject(assembly, namespace, class) -> first live instance (slow)
Rules:
- Never AOBScan for individual fields; the bridge resolves offsets at runtime.
- The preamble provides _monoClass, _monoField and _monoOffset.
- Use the read/write expressions from the field table.
- Reach live objects through a static singleton field when one exists; mono_findObject walks the heap.
- An AOB is acceptable only to find a singleton that has no static field path."
            .to_string(),
        TargetFamily::UnityIl2cpp => format!(
            "\
TARGET: Unity IL2CPP (ahead-of-time compiled, field offsets are fixed)
Rules:
- Use the field offsets as given; do not AOBScan for field writes.
- Use one AOB per class to find its root pointer, then a short pointer chain (1-3 hops).
- The preamble provides _resolveRef, _findRoot and _cachedRoot.
- Implement _getBase_<Class>() for every class you use, on top of _cachedRoot.
- Typical singleton load in GameAssembly.dll: {}",
            SINGLETON_AOB_HINT
        ),
        TargetFamily::Ue4 => "\
TARGET: Unreal Engine 4 (global object table + static property offsets)
Rules:
- One AOB locates the object table; the preamble's _initGObjects does it once.
- Find objects with _findActor(className); results are cached.
- Property offsets from the dump are correct; apply them as given.
- Do not AOBScan for individual properties.
- Call _invalidateActors() after level loads if the script stays resident."
            .to_string(),
        TargetFamily::Ue5 => "\
TARGET: Unreal Engine 5 (global object table + static property offsets)
Same approach as UE4. The preamble already carries the UE5 table pattern.
Rules:
- Find objects with _findActor(className) and apply the dumped property offsets.
- Do not AOBScan for individual properties."
            .to_string(),
        TargetFamily::Unknown => "\
TARGET: unknown engine (write-instruction patching)
Rules:
- Locate the instruction that writes the value with an AOB, then patch or hook it.
- Every AOB needs at least 7 bytes and at most 50% wildcards.
- Scan the game's main module when it is known."
            .to_string(),
    }
}

fn shared_rules() -> String {
    format!(
        "\
Rules for every script:
1. Only Cheat Engine Lua between the delimiters, no markdown fences.
2. Provide an on/off toggle: a cheatEnabled flag bound to a hotkey.
3. Comment each section of the script.
4. If an accessor used by the field expressions (e.g. _getObj_X()) does not exist yet, write a stub for it with a comment saying what is missing.
5. If the data is not enough to write the script, emit `{}` on its own line and explain in comments.",
        INSUFFICIENT_DATA_MARKER
    )
}

fn output_contract() -> String {
    format!(
        "\
Output format, both sections required:
{}
<the complete Lua script>
{}
{}
<one AOB per line: PATTERN | OFFSET | MODULE | DESCRIPTION>
(leave empty when the script uses no AOBs)
{}",
        SCRIPT_BEGIN, SCRIPT_END, AOB_BEGIN, AOB_END
    )
}

fn feature_hint(feature_type: FeatureType) -> &'static str {
    match feature_type {
        FeatureType::InfiniteHealth => "\
Goal: health never goes down.
Likely fields: health, hp, currentHp, hitPoints.
Approach: write the maximum through the health field's write expression on a timer.",
        FeatureType::InfiniteMana => "\
Goal: mana never runs out.
Likely fields: mana, mp, currentMana, magicPoints.
Approach: same as infinite health.",
        FeatureType::InfiniteAmmo => "\
Goal: ammo count never goes down.
Likely fields: ammo, currentAmmo, magazineAmmo, clipSize.
Approach: write the maximum on a timer.",
        FeatureType::InfiniteStamina => "\
Goal: stamina never runs out.
Likely fields: stamina, currentStamina, energy.
Approach: write the maximum on a timer.",
        FeatureType::InfiniteCurrency => "\
Goal: money never goes down.
Likely fields: gold, coins, currency, money.
Approach: write a high value periodically.",
        FeatureType::InfiniteItems => "\
Goal: consumables are not used up.
Approach: find the item count field and keep it at its value from when the cheat was enabled.",
        FeatureType::Godmode => "\
Goal: the player takes no damage.
Approach: keep health at its maximum and zero any incoming damage field; two writes.",
        FeatureType::OneHitKill => "\
Goal: any hit kills an enemy.
Approach: write 0 to enemy health; check the object's class so the player is never hit by it.",
        FeatureType::NoReload => "\
Goal: the weapon never needs reloading.
Approach: keep the magazine at clip capacity.",
        FeatureType::SpeedHack => "\
Goal: movement speed multiplied by a configurable factor.
Likely fields: moveSpeed, walkSpeed, runSpeed.
Approach: save the value on enable, write value * factor, restore on disable.",
        FeatureType::FreezeTimer => "\
Goal: the game timer stops.
Likely fields: time, remainingTime, timer, countdown.
Approach: capture the value on enable and write it back on a timer.",
        FeatureType::Teleport => "\
Goal: save and restore the player position.
Likely fields: a Vector3 position or separate posX/posY/posZ.
Approach: one hotkey reads all three coordinates, another writes them back.",
        FeatureType::Custom => "\
Goal: the feature described above, using the structure data provided.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassInfo, FieldInfo};
    use crate::resolve_context;

    fn structure() -> StructureSnapshot {
        StructureSnapshot::new(
            "UE5",
            "5.3",
            vec![
                ClassInfo::new("BP_Door_C", "", vec![FieldInfo::new("Open", "bool", "0x2a0")]),
                ClassInfo::new(
                    "BP_PlayerCharacter_C",
                    "",
                    vec![
                        FieldInfo::new("Health", "float", "0x330"),
                        FieldInfo::new("Stamina", "float", "0x334"),
                    ],
                ),
            ],
        )
    }

    fn feature() -> TrainerFeature {
        TrainerFeature::new("God Mode", FeatureType::Godmode)
            .unwrap()
            .with_description("Player never dies")
            .with_hotkey("F1")
    }

    #[test]
    fn test_system_prompt_per_family() {
        let builder = PromptBuilder::default();
        for family in TargetFamily::ALL {
            let system = builder.system_prompt(family);
            assert!(system.starts_with(ROLE));
            assert!(system.contains("[SCRIPT_BEGIN]"));
            assert!(system.contains("[AOB_END]"));
            assert!(system.contains("-- INSUFFICIENT_DATA"));
            assert!(system.contains("cheatEnabled"));
        }
        assert!(builder.system_prompt(TargetFamily::UnityMono).contains("mono_getFieldOffset"));
        assert!(builder.system_prompt(TargetFamily::UnityIl2cpp).contains(SINGLETON_AOB_HINT));
        assert!(builder.system_prompt(TargetFamily::Ue4).contains("_invalidateActors"));
        assert!(builder.system_prompt(TargetFamily::Unknown).contains("at least 7 bytes"));
    }

    #[test]
    fn test_user_message_with_context() {
        let mut ctx = EngineContext::new(TargetFamily::Ue5);
        ctx.engine_version = "5.3".to_string();
        let (ctx, _) = resolve_context(&structure(), ctx);

        let (system, user) = PromptBuilder::default().build(&structure(), &feature(), Some(&ctx));
        assert!(system.contains("Unreal Engine 5"));

        let sections = [
            "## Game Structure",
            "## Engine Context",
            "## Pre-resolved Field Access",
            "## Required Script Preamble",
            "## Requested Feature",
            "## Implementation Guidance",
        ];
        let positions: Vec<usize> = sections
            .iter()
            .map(|s| user.find(s).unwrap_or_else(|| panic!("missing {}", s)))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        assert!(user.contains("Engine : UE5 (v5.3, 64-bit)"));
        assert!(user.contains(r#"`readFloat(_findActor("BP_PlayerCharacter_C") + 0x330)`"#));
        assert!(user.contains("local function _findActor(className)"));
        assert!(user.contains("Type : godmode"));
        assert!(user.contains("Description: Player never dies"));
        assert!(user.contains("Hotkey: F1"));
        // player classes are listed first
        assert!(user.find("[BP_PlayerCharacter_C]").unwrap() < user.find("[BP_Door_C]").unwrap());
    }

    #[test]
    fn test_user_message_without_context() {
        let (system, user) = PromptBuilder::default().build(&structure(), &feature(), None);
        assert!(system.contains("write-instruction patching"));
        assert!(!user.contains("## Engine Context"));
        assert!(!user.contains("## Required Script Preamble"));
        assert!(user.contains("## Implementation Guidance"));
    }

    #[test]
    fn test_unknown_context_gets_no_expressions_or_preamble() {
        let (ctx, _) = resolve_context(&structure(), EngineContext::new(TargetFamily::Unknown));
        assert!(!ctx.resolutions.is_empty());

        let (_, user) = PromptBuilder::default().build(&structure(), &feature(), Some(&ctx));
        assert!(user.contains("## Engine Context"));
        assert!(user.contains("Module : (auto-detect)"));
        assert!(!user.contains("## Pre-resolved Field Access"));
        assert!(!user.contains("## Required Script Preamble"));
        // Every expression in the prompt must have its helpers defined alongside it.
        assert!(!user.contains("_getBase_"));
        assert!(!user.contains("_findActor("));
    }

    #[test]
    fn test_resolution_table_is_capped() {
        let fields: Vec<FieldInfo> = (0..5)
            .map(|i| FieldInfo::new(&format!("f{}", i), "int32", &format!("{:#x}", 0x10 + i * 4)))
            .collect();
        let structure = StructureSnapshot::new("Unity_IL2CPP", "", vec![ClassInfo::new("Stats", "", fields)]);
        let (ctx, _) = resolve_context(&structure, EngineContext::new(TargetFamily::UnityIl2cpp));

        let builder = PromptBuilder::new(PromptConfig {
            max_classes: 60,
            max_resolutions: 3,
        });
        let (_, user) = builder.build(&structure, &feature(), Some(&ctx));
        assert!(user.contains("| Stats | f2 |"));
        assert!(!user.contains("| Stats | f3 |"));
        assert!(user.contains("_(2 more fields not shown)_"));
    }

    #[test]
    fn test_every_feature_has_a_hint() {
        for feature_type in FeatureType::ALL {
            assert!(feature_hint(feature_type).starts_with("Goal:"));
        }
    }
}

use crate::consts::GUESSED_TYPE_CONFIDENCE;
use crate::models::{
    AccessCalls, ClassInfo, EngineContext, FieldAccess, FieldInfo, FieldResolution, ResolutionStrategy,
    StructureSnapshot,
};
use crate::resolvers::{ObjectTableResolver, PointerChainResolver, RuntimeBridgeResolver};
use crate::traits::resolver::FieldResolver;

/// The closed set of resolvers, one per strategy that has one.
#[derive(Debug, Clone, Copy)]
pub enum Resolver {
    PointerChain(PointerChainResolver),
    RuntimeBridge(RuntimeBridgeResolver),
    ObjectTable(ObjectTableResolver),
}

impl Resolver {
    fn inner(&self) -> &dyn FieldResolver {
        match self {
            Resolver::PointerChain(r) => r,
            Resolver::RuntimeBridge(r) => r,
            Resolver::ObjectTable(r) => r,
        }
    }
}

impl FieldResolver for Resolver {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn strategy(&self) -> ResolutionStrategy {
        self.inner().strategy()
    }

    fn resolve(&self, structure: &StructureSnapshot, context: &EngineContext) -> Vec<FieldResolution> {
        self.inner().resolve(structure, context)
    }

    fn preamble(&self, context: &EngineContext) -> String {
        self.inner().preamble(context)
    }
}

/// Name a class's per-class accessor is derived from.
///
/// The namespace is folded in only when another class in the snapshot shares
/// the bare name, so each live instance gets an accessor of its own.
pub(crate) fn accessor_key(structure: &StructureSnapshot, class: &ClassInfo) -> String {
    let shared = structure.classes.iter().filter(|c| c.name == class.name).count() > 1;
    if shared && !class.namespace.is_empty() {
        format!("{}.{}", class.namespace, class.name)
    } else {
        class.name.clone()
    }
}

/// Builds a resolution whose read/write calls match the field's type tag.
///
/// Unrecognized tags get the float calls, a lowered confidence and a note
/// saying so.
pub(crate) fn build_resolution(
    class: &ClassInfo,
    field: &FieldInfo,
    access: FieldAccess,
    address: &str,
    mut notes: String,
) -> FieldResolution {
    let calls = AccessCalls::for_type(&field.field_type);
    let confidence = if calls.guessed {
        if !notes.is_empty() {
            notes.push(' ');
        }
        notes.push_str(&format!(
            "Type '{}' has no known access width; read/written as float.",
            field.field_type
        ));
        GUESSED_TYPE_CONFIDENCE
    } else {
        1.0
    };

    FieldResolution {
        class_name: class.name.clone(),
        field_name: field.name.clone(),
        field_type: field.field_type.clone(),
        access,
        lua_read_expr: calls.read_expr(address),
        lua_write_expr: calls.write_expr(address),
        confidence,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::VALUE_PLACEHOLDER;
    use crate::models::TargetFamily;

    fn mixed_structure() -> StructureSnapshot {
        StructureSnapshot::new(
            "Unknown",
            "",
            vec![
                ClassInfo::new(
                    "PlayerStats",
                    "Game",
                    vec![
                        FieldInfo::new("health", "float", "0x58"),
                        FieldInfo::new("gold", "int32", "0x64"),
                        FieldInfo::new("xp", "int64", "bogus"),
                        FieldInfo::new("alive", "bool", ""),
                        FieldInfo::new_static("instance", "PlayerStats"),
                        FieldInfo::new("transform", "UnityEngine.Transform", "0x10"),
                    ],
                ),
                ClassInfo::new("Nothing", "", vec![]),
                ClassInfo::new("Enemy", "Game.AI", vec![FieldInfo::new("hp", "double", "0x0100")]),
            ],
        )
    }

    fn all_resolvers() -> Vec<Resolver> {
        vec![
            Resolver::PointerChain(PointerChainResolver::new()),
            Resolver::RuntimeBridge(RuntimeBridgeResolver::new()),
            Resolver::ObjectTable(ObjectTableResolver::new()),
        ]
    }

    #[test]
    fn test_every_resolution_is_complete() {
        let structure = mixed_structure();
        let ctx = EngineContext::new(TargetFamily::Unknown);

        for resolver in all_resolvers() {
            let resolutions = resolver.resolve(&structure, &ctx);
            assert!(!resolutions.is_empty(), "{} emitted nothing", resolver.name());

            for r in &resolutions {
                assert!(!r.lua_read_expr.is_empty(), "{}", r);
                assert!(!r.lua_write_expr.is_empty(), "{}", r);
                assert!(r.lua_write_expr.contains(VALUE_PLACEHOLDER), "{}", r);
                assert!(!r.lua_read_expr.contains(VALUE_PLACEHOLDER), "{}", r);
                assert!((0.0..=1.0).contains(&r.confidence));
                assert_eq!(r.strategy(), resolver.strategy());
            }
        }
    }

    #[test]
    fn test_every_resolver_is_deterministic() {
        let structure = mixed_structure();
        let ctx = EngineContext::new(TargetFamily::Unknown);

        for resolver in all_resolvers() {
            let first = serde_json::to_string(&resolver.resolve(&structure, &ctx)).unwrap();
            let second = serde_json::to_string(&resolver.resolve(&structure, &ctx)).unwrap();
            assert_eq!(first, second, "{}", resolver.name());
            assert_eq!(resolver.preamble(&ctx), resolver.preamble(&ctx));
        }
        assert_eq!(structure, mixed_structure());
    }

    #[test]
    fn test_offset_strategies_keep_structure_order() {
        let structure = mixed_structure();
        let ctx = EngineContext::new(TargetFamily::Unknown);
        let expected = vec!["health", "gold", "transform", "hp"];

        for resolver in [
            Resolver::PointerChain(PointerChainResolver::new()),
            Resolver::ObjectTable(ObjectTableResolver::new()),
        ] {
            let names: Vec<String> = resolver
                .resolve(&structure, &ctx)
                .into_iter()
                .map(|r| r.field_name)
                .collect();
            assert_eq!(names, expected, "{}", resolver.name());
        }
    }

    #[test]
    fn test_guessed_type_lowers_confidence() {
        let class = ClassInfo::new("A", "", vec![]);
        let known = build_resolution(
            &class,
            &FieldInfo::new("hp", "int16", "0x8"),
            FieldAccess::PointerChain { field_offset: 8 },
            "base + 0x8",
            String::new(),
        );
        assert_eq!(known.confidence, 1.0);
        assert_eq!(known.lua_read_expr, "readSmallInteger(base + 0x8)");
        assert!(known.notes.is_empty());

        let guessed = build_resolution(
            &class,
            &FieldInfo::new("pos", "Vector3", "0x8"),
            FieldAccess::PointerChain { field_offset: 8 },
            "base + 0x8",
            "From dump.".to_string(),
        );
        assert_eq!(guessed.confidence, GUESSED_TYPE_CONFIDENCE);
        assert!(guessed.notes.starts_with("From dump. Type 'Vector3'"));
    }
}

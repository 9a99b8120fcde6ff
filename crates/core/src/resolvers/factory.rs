use log::debug;

use crate::models::{ResolutionStrategy, TargetFamily};
use crate::resolvers::{ObjectTableResolver, PointerChainResolver, Resolver, RuntimeBridgeResolver};
use crate::traits::resolver::FieldResolver;

/// Resolver for a target family tag such as "Unity_Mono" or "UE5".
///
/// Unknown or empty tags get the pointer-chain resolver, which assumes the
/// least about the target runtime.
pub fn select(tag: &str) -> Resolver {
    let resolver = select_family(TargetFamily::from_tag(tag));
    debug!("selected {} for target family {:?}", resolver.name(), tag);
    resolver
}

pub fn select_family(family: TargetFamily) -> Resolver {
    match family {
        TargetFamily::UnityMono => Resolver::RuntimeBridge(RuntimeBridgeResolver::new()),
        TargetFamily::UnityIl2cpp => Resolver::PointerChain(PointerChainResolver::new()),
        TargetFamily::Ue4 | TargetFamily::Ue5 => Resolver::ObjectTable(ObjectTableResolver::new()),
        TargetFamily::Unknown => Resolver::PointerChain(PointerChainResolver::new()),
    }
}

/// Strategy to validate generated scripts with. `None` means legacy mode:
/// the family has no resolver of its own, so scripts fall back to patching
/// write instructions.
pub fn validation_mode(tag: &str) -> Option<ResolutionStrategy> {
    match TargetFamily::from_tag(tag) {
        TargetFamily::Unknown => None,
        known => Some(select_family(known).strategy()),
    }
}

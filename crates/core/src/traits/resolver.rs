use crate::models::{EngineContext, FieldResolution, ResolutionStrategy, StructureSnapshot};

/// Turns a structure snapshot into per-field access expressions for one
/// resolution strategy.
///
/// Implementations hold no state between calls: the same snapshot and
/// context always yield the same resolutions in the same order, and neither
/// input is modified.
pub trait FieldResolver {
    fn name(&self) -> &'static str;
    /// The technique this resolver implements
    fn strategy(&self) -> ResolutionStrategy;
    /// One resolution per field that has a confident access path. Fields
    /// without one are dropped.
    fn resolve(&self, structure: &StructureSnapshot, context: &EngineContext) -> Vec<FieldResolution>;
    /// Helper code that must appear once at the top of every generated
    /// script using this resolver's expressions. May be empty.
    fn preamble(&self, context: &EngineContext) -> String;
}

use std::path::Path;

use log::info;

pub mod consts;
pub mod error;
pub mod models;
pub mod parsing;
pub mod prompt;
pub mod resolvers;
pub mod traits;
pub mod utils;
pub mod validation;

pub use error::TrainerError;
pub use models::{
    AobSignature, EngineContext, EngineInfo, FeatureType, FieldResolution, GeneratedScript, PromptConfig,
    ResolutionStrategy, ScriptValidation, StructureSnapshot, TargetFamily, TrainerFeature, ValidatorConfig,
};
pub use parsing::parse_response;
pub use prompt::PromptBuilder;
pub use resolvers::{select, select_family, validation_mode, Resolver};
pub use traits::FieldResolver;
pub use utils::writer::FileWriter;
pub use validation::{Sandbox, SandboxResult, ScriptValidator};

/// Reads a dumper snapshot from disk. A snapshot without classes is rejected.
pub fn load_structure(file_path: &Path) -> Result<StructureSnapshot, TrainerError> {
    let json = std::fs::read_to_string(file_path)?;
    let structure = StructureSnapshot::from_json(&json)?;
    if structure.classes.is_empty() {
        return Err(TrainerError::InvalidStructure(format!(
            "{} contains no classes",
            file_path.display()
        )));
    }
    info!(
        "loaded {} classes / {} fields from {}",
        structure.classes.len(),
        structure.field_count(),
        file_path.display()
    );
    Ok(structure)
}

/// Runs the resolver for the context's family once, storing the resolutions
/// on the context. Returns the filled context and the matching preamble.
pub fn resolve_context(structure: &StructureSnapshot, mut context: EngineContext) -> (EngineContext, String) {
    let resolver = select_family(context.engine_type);
    context.resolutions = resolver.resolve(structure, &context);
    let preamble = resolver.preamble(&context);
    info!(
        "{}: {} of {} fields resolved with {}",
        context,
        context.resolutions.len(),
        structure.field_count(),
        resolver.strategy()
    );
    (context, preamble)
}

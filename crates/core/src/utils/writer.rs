use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::error::TrainerError;
use crate::models::{AobSignature, EngineContext, FieldResolution, GeneratedScript, ScriptValidation};

/// `resolutions.json`: one resolver run over one target.
#[derive(Serialize)]
pub struct ResolutionManifest<'a> {
    pub target: String,
    pub engine_type: String,
    pub engine_version: &'a str,
    pub bitness: u32,
    pub strategy: String,
    pub resolutions: &'a [FieldResolution],
}

/// `validation.json`: the verdict on one generated script.
#[derive(Serialize)]
pub struct ValidationReport<'a> {
    pub feature: &'a str,
    pub feature_type: String,
    pub model_id: &'a str,
    pub strategy: Option<String>,
    pub aob_sigs: &'a [AobSignature],
    pub validation: &'a ScriptValidation,
}

/// Writes outputs under a base directory, each file name prefixed with the
/// target fingerprint when one is known.
pub struct FileWriter {
    prefix: String,
}

impl Default for FileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FileWriter {
    pub fn new() -> Self {
        Self { prefix: String::new() }
    }

    /// Prefix with the target hash, or none when the executable is unknown.
    pub fn for_context(context: &EngineContext) -> Self {
        let prefix = if context.exe_path.is_empty() {
            String::new()
        } else {
            format!("{}_", context.target_hash())
        };
        Self { prefix }
    }

    pub fn path(&self, base_path: &Path, name: &str) -> PathBuf {
        base_path.join(format!("{}{}", self.prefix, name))
    }

    fn write(&self, base_path: &Path, name: &str, contents: &str) -> Result<PathBuf, TrainerError> {
        fs::create_dir_all(base_path)?;
        let path = self.path(base_path, name);
        fs::write(&path, contents)?;
        info!("wrote {}", path.display());
        Ok(path)
    }

    pub fn write_resolutions(
        &self,
        context: &EngineContext,
        strategy: &str,
        preamble: &str,
        base_path: &Path,
    ) -> Result<Vec<PathBuf>, TrainerError> {
        let manifest = ResolutionManifest {
            target: context.exe_path.clone(),
            engine_type: context.engine_type.to_string(),
            engine_version: &context.engine_version,
            bitness: context.bitness,
            strategy: strategy.to_string(),
            resolutions: &context.resolutions,
        };
        let json = serde_json::to_string_pretty(&manifest)?;

        Ok(vec![
            self.write(base_path, "resolutions.json", &json)?,
            self.write(base_path, "preamble.lua", preamble)?,
        ])
    }

    pub fn write_prompt(&self, system: &str, user: &str, base_path: &Path) -> Result<Vec<PathBuf>, TrainerError> {
        Ok(vec![
            self.write(base_path, "prompt_system.md", system)?,
            self.write(base_path, "prompt_user.md", user)?,
        ])
    }

    pub fn write_validation(
        &self,
        script: &GeneratedScript,
        strategy: Option<&str>,
        validation: &ScriptValidation,
        base_path: &Path,
    ) -> Result<PathBuf, TrainerError> {
        let report = ValidationReport {
            feature: &script.feature.name,
            feature_type: script.feature.feature_type.to_string(),
            model_id: &script.model_id,
            strategy: strategy.map(str::to_string),
            aob_sigs: &script.aob_sigs,
            validation,
        };
        let json = serde_json::to_string_pretty(&report)?;
        self.write(base_path, "validation.json", &json)
    }
}

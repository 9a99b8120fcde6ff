use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;

use crate::error::TrainerError;
use crate::models::{AobSignature, GeneratedScript, TrainerFeature};

pub const SCRIPT_BEGIN: &str = "[SCRIPT_BEGIN]";
pub const SCRIPT_END: &str = "[SCRIPT_END]";
pub const AOB_BEGIN: &str = "[AOB_BEGIN]";
pub const AOB_END: &str = "[AOB_END]";

const RAW_PREVIEW_CHARS: usize = 200;

fn script_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[SCRIPT_BEGIN\](.*?)\[SCRIPT_END\]").expect("constant regex"))
}

fn aob_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[AOB_BEGIN\](.*?)\[AOB_END\]").expect("constant regex"))
}

// PATTERN | OFFSET | MODULE | DESCRIPTION
fn aob_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<pattern>[0-9A-Fa-f ?]+?)\s*\|\s*(?P<offset>-?\d+)\s*\|\s*(?P<module>[^|]*?)\s*\|\s*(?P<description>.*)$")
            .expect("constant regex")
    })
}

/// Splits a generator response into the script and its declared patterns.
///
/// The script block is required. The pattern block is optional; blank lines
/// and `#` lines in it are ignored, and lines that do not parse are skipped.
pub fn parse_response(raw: &str, feature: TrainerFeature, model_id: &str) -> Result<GeneratedScript, TrainerError> {
    let Some(script) = script_block_re().captures(raw).and_then(|c| c.get(1)) else {
        let preview: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
        return Err(TrainerError::ScriptGeneration(format!(
            "response has no {}...{} block; starts with {:?}",
            SCRIPT_BEGIN, SCRIPT_END, preview
        )));
    };

    let aob_sigs = aob_block_re()
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|block| parse_aob_block(block.as_str()))
        .unwrap_or_default();

    let mut generated = GeneratedScript::new(script.as_str().trim(), feature).with_aobs(aob_sigs);
    generated.model_id = model_id.to_string();
    generated.raw_response = raw.to_string();
    debug!("parsed {}", generated);
    Ok(generated)
}

fn parse_aob_block(block: &str) -> Vec<AobSignature> {
    let mut sigs = Vec::new();
    for line in block.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_aob_line(line) {
            Some(sig) => sigs.push(sig),
            None => warn!("skipping unparseable AOB line: {:?}", line),
        }
    }
    sigs
}

fn parse_aob_line(line: &str) -> Option<AobSignature> {
    let caps = aob_line_re().captures(line)?;
    let offset = caps["offset"].parse::<i64>().ok()?;
    Some(AobSignature {
        pattern: caps["pattern"].trim().to_string(),
        offset,
        module: caps["module"].trim().to_string(),
        description: caps["description"].trim().to_string(),
    })
}

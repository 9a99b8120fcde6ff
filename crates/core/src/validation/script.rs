use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;

use crate::consts::{
    BRIDGE_API_CALLS, INSUFFICIENT_DATA_MARKER, LUA_COMMENT_PREFIX, MAX_BRIDGE_SCAN_CALLS,
    PRIMITIVE_API_CALLS, SCAN_CALL, TOGGLE_NAMES,
};
use crate::models::{AobSignature, GeneratedScript, ResolutionStrategy, ScriptValidation, ValidatorConfig};
use crate::validation::syntax::LuacChecker;

/// Static checks over a generated script.
///
/// Which pattern checks apply depends on the resolution strategy the script
/// was generated for. Runtime-bridge scripts get no pattern length, wildcard
/// or inline checks, since they are not expected to scan at all. Every other
/// strategy, and the legacy mode used when no strategy is given, gets all of
/// them.
#[derive(Debug, Clone)]
pub struct ScriptValidator {
    config: ValidatorConfig,
    luac: Option<LuacChecker>,
}

impl Default for ScriptValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl ScriptValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        let luac = if config.use_syntax_check {
            LuacChecker::locate(config.syntax_timeout)
        } else {
            None
        };
        Self { config, luac }
    }

    pub fn without_syntax_check() -> Self {
        Self::new(ValidatorConfig {
            use_syntax_check: false,
            ..ValidatorConfig::default()
        })
    }

    /// Validator that runs `luac` as given, or no syntax check for `None`.
    pub(crate) fn with_checker(config: ValidatorConfig, luac: Option<LuacChecker>) -> Self {
        Self { config, luac }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn has_syntax_check(&self) -> bool {
        self.luac.is_some()
    }

    pub fn validate(&self, script: &GeneratedScript, strategy: Option<ResolutionStrategy>) -> ScriptValidation {
        let mode = strategy.unwrap_or(ResolutionStrategy::InstructionPatternWrite);
        let bridge = mode == ResolutionStrategy::RuntimeBridge;
        let code = script.lua_code.as_str();
        let mut report = Report::default();

        report.check("non_empty");
        if !has_code_lines(code) {
            report.error("Script is empty or contains only comments.".to_string());
        }

        if let Some(luac) = &self.luac {
            match luac.check(code) {
                Ok(None) => report.check("lua_syntax"),
                Ok(Some(message)) => {
                    report.check("lua_syntax");
                    report.error(format!("Lua syntax error: {}", message));
                }
                Err(e) => warn!("syntax check skipped: {}", e),
            }
        }

        report.check("insufficient_data");
        if code.contains(INSUFFICIENT_DATA_MARKER) {
            report.error(
                "Generator reported insufficient data to write the script; see the comments in it.".to_string(),
            );
        }

        if bridge {
            report.check("aob_skipped_runtime_bridge");
            // Patterns are optional here, but any that are declared must still be well formed.
            for aob in &script.aob_sigs {
                if !aob.is_valid() {
                    report.error(declared_format_error(aob));
                }
            }
        } else {
            for aob in &script.aob_sigs {
                self.check_declared(aob, &mut report);
            }

            report.check("inline_aob");
            for candidate in extract_inline_aobs(code) {
                let aob = AobSignature::new(candidate);
                if !aob.is_valid() {
                    report.error(format!(
                        "Inline AOB pattern in script has invalid tokens: '{}' ({}).",
                        candidate,
                        aob.invalid_tokens().join(", ")
                    ));
                }
            }
        }

        report.check("api_surface");
        if bridge {
            if !bridge_api_re().is_match(code) {
                report.warn(format!(
                    "Script does not call the runtime bridge ({}, ...).",
                    BRIDGE_API_CALLS[..2].join(", ")
                ));
            }
        } else if !primitive_api_re().is_match(code) {
            report.warn("Script does not call any read/write/scan primitive (readFloat, writeFloat, AOBScan, ...).".to_string());
        }

        report.check("toggle_present");
        if !toggle_re().is_match(code) {
            report.warn(format!(
                "No enable/disable toggle found ({}).",
                TOGGLE_NAMES.join(" / ")
            ));
        }

        if bridge {
            report.check("bridge_scan_usage");
            let scans = scan_call_re().find_iter(code).count();
            if scans > MAX_BRIDGE_SCAN_CALLS {
                report.warn(format!(
                    "Script calls {} {} times; prefer the runtime bridge, patterns break across patches.",
                    SCAN_CALL, scans
                ));
            }
        }

        let validation = report.finish();
        debug!("validated {} ({}): {}", script.feature.name, mode, validation);
        validation
    }

    /// Format, then length and wildcard ratio; a malformed pattern stops at format.
    fn check_declared(&self, aob: &AobSignature, report: &mut Report) {
        let label = aob.label();

        report.check(&format!("aob_format:{}", label));
        if !aob.is_valid() {
            report.error(declared_format_error(aob));
            return;
        }

        report.check(&format!("aob_length:{}", label));
        let count = aob.tokens().len();
        if count < self.config.min_aob_bytes {
            report.error(format!(
                "AOB pattern too short ({} bytes < {}): '{}'",
                count, self.config.min_aob_bytes, aob.pattern
            ));
        }

        report.check(&format!("aob_wildcards:{}", label));
        let ratio = aob.wildcard_ratio();
        if ratio > self.config.max_wildcard_ratio {
            report.warn(format!(
                "AOB pattern is {:.0}% wildcards (> {:.0}%): '{}' may match in more than one place.",
                ratio * 100.0,
                self.config.max_wildcard_ratio * 100.0,
                aob.pattern
            ));
        }
    }
}

#[derive(Default)]
struct Report {
    errors: Vec<String>,
    warnings: Vec<String>,
    checks_run: Vec<String>,
}

impl Report {
    fn check(&mut self, id: &str) {
        self.checks_run.push(id.to_string());
    }

    fn error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    fn finish(self) -> ScriptValidation {
        ScriptValidation {
            passed: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
            checks_run: self.checks_run,
        }
    }
}

fn declared_format_error(aob: &AobSignature) -> String {
    let invalid = aob.invalid_tokens();
    if invalid.is_empty() {
        format!("Declared AOB pattern '{}' is empty.", aob.label())
    } else {
        format!(
            "Declared AOB pattern '{}' has invalid tokens: {}. Each token must be a 2-digit hex byte or '??'.",
            aob.pattern,
            invalid.join(", ")
        )
    }
}

fn has_code_lines(code: &str) -> bool {
    code.lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with(LUA_COMMENT_PREFIX))
}

/// Quoted strings shaped like byte patterns, malformed ones included.
pub fn extract_inline_aobs(code: &str) -> Vec<&str> {
    inline_aob_re()
        .captures_iter(code)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .collect()
}

fn word_set_re(words: &[&str], case_insensitive: bool) -> Regex {
    let flags = if case_insensitive { "(?i)" } else { "" };
    let pattern = format!(r"{}\b(?:{})\b", flags, words.join("|"));
    Regex::new(&pattern).expect("constant regex")
}

fn inline_aob_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Deliberately admits non-hex tokens so malformed patterns get reported.
    RE.get_or_init(|| Regex::new(r#""([0-9A-Za-z?]{2}(?: [0-9A-Za-z?]{2}){4,})""#).expect("constant regex"))
}

fn primitive_api_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| word_set_re(PRIMITIVE_API_CALLS, false))
}

fn bridge_api_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| word_set_re(BRIDGE_API_CALLS, false))
}

fn toggle_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| word_set_re(TOGGLE_NAMES, true))
}

fn scan_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| word_set_re(&[SCAN_CALL], false))
}

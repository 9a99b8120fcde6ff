use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Minimum number of tokens a declared pattern must have
    pub min_aob_bytes: usize,
    /// Wildcard fraction above which a pattern is flagged as fragile
    pub max_wildcard_ratio: f64,
    /// Run `luac -p` over the script when it is installed
    pub use_syntax_check: bool,
    /// Kill the syntax checker after this long
    pub syntax_timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_aob_bytes: 7,
            max_wildcard_ratio: 0.50,
            use_syntax_check: true,
            syntax_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptConfig {
    /// Classes listed in the structure section
    pub max_classes: usize,
    /// Rows in the pre-resolved field table
    pub max_resolutions: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_classes: 60,
            max_resolutions: 40,
        }
    }
}

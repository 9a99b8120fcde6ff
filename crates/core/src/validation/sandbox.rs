use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{is_pattern_token, WILDCARD_TOKEN};

/// Shortest pattern worth scanning for.
pub const SANDBOX_MIN_TOKENS: usize = 4;
/// Leaves room for `48 8B 05 ?? ?? ?? ??`, four wildcards in seven bytes.
pub const SANDBOX_MAX_WILDCARD_RATIO: f64 = 0.60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxResult {
    pub passed: bool,
    pub detail: String,
}

impl fmt::Display for SandboxResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(f, "[{}] {}", status, self.detail)
    }
}

/// Cheap pre-filter run on patterns before they are scanned for or injected.
pub struct Sandbox;

impl Sandbox {
    /// Well-formed tokens, at least four of them, and at most 60% wildcards.
    pub fn validate_aob_pattern(pattern: &str) -> bool {
        let tokens: Vec<&str> = pattern.split_whitespace().collect();
        if tokens.len() < SANDBOX_MIN_TOKENS {
            return false;
        }
        if !tokens.iter().all(|t| is_pattern_token(t)) {
            return false;
        }
        let wildcards = tokens.iter().filter(|t| **t == WILDCARD_TOKEN).count();
        wildcards as f64 / tokens.len() as f64 <= SANDBOX_MAX_WILDCARD_RATIO
    }

    /// Classifies a scan's hit count: exactly one hit is safe to use.
    pub fn check_aob_unique(hit_count: usize, aob_name: &str) -> SandboxResult {
        match hit_count {
            0 => SandboxResult {
                passed: false,
                detail: format!("'{}': 0 matches, pattern not found (stale?)", aob_name),
            },
            1 => SandboxResult {
                passed: true,
                detail: format!("'{}': 1 unique match", aob_name),
            },
            n => SandboxResult {
                passed: false,
                detail: format!("'{}': {} multiple matches, pattern too generic to inject safely", aob_name, n),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rip_relative_idiom_passes() {
        assert!(Sandbox::validate_aob_pattern("48 8B 05 ?? ?? ?? ??"));
        assert!(Sandbox::validate_aob_pattern("f3 0f 11 87"));
    }

    #[test]
    fn test_rejections() {
        assert!(!Sandbox::validate_aob_pattern(""));
        assert!(!Sandbox::validate_aob_pattern("   "));
        assert!(!Sandbox::validate_aob_pattern("48 8B 05"));
        assert!(!Sandbox::validate_aob_pattern("48 8B 05 GG"));
        assert!(!Sandbox::validate_aob_pattern("48 8B 05 ?"));
        assert!(!Sandbox::validate_aob_pattern("488B 05 ?? ??"));
        assert!(!Sandbox::validate_aob_pattern("48 ?? ?? ?? ??"));
        assert!(!Sandbox::validate_aob_pattern("?? ?? ?? ??"));
    }

    #[test]
    fn test_format_rule_matches_token_shape() {
        let valid = ["00", "ff", "A9", "??"];
        let invalid = ["0", "fff", "G1", "?", "?A", "0x"];
        for a in valid {
            for b in valid {
                let pattern = format!("48 8B {} {} 89 90", a, b);
                assert!(Sandbox::validate_aob_pattern(&pattern), "{}", pattern);
            }
            for bad in invalid {
                let pattern = format!("48 8B {} {} 89 90", a, bad);
                assert!(!Sandbox::validate_aob_pattern(&pattern), "{}", pattern);
            }
        }
    }

    #[test]
    fn test_check_unique() {
        let none = Sandbox::check_aob_unique(0, "health_write");
        assert!(!none.passed);
        assert!(none.detail.contains("0 matches"));
        assert!(none.to_string().starts_with("[FAIL]"));

        let one = Sandbox::check_aob_unique(1, "health_write");
        assert!(one.passed);
        assert_eq!(one.to_string(), "[PASS] 'health_write': 1 unique match");

        for n in [2, 3, 250] {
            let many = Sandbox::check_aob_unique(n, "health_write");
            assert!(!many.passed);
            assert!(many.detail.contains(&n.to_string()));
            assert!(many.detail.contains("multiple"));
        }
    }
}

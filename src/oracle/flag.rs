use regex::Regex;
use crate::config::{OracleConfig, OraclePolicy};
use crate::errors::FlagbotError;
use crate::models::VerificationSession;
use super::Oracle;

/// Case-sensitive shape every structural-policy flag must have.
const STRUCTURAL_PATTERN: &str = r"^flag\{.*\}$";

enum CompiledPolicy {
    /// Message must equal the deployment's secret literal.
    Exact(String),
    /// Message must match `flag{...}` exactly, case-sensitive.
    Structural(Regex),
}

/// Dialog-message oracle. A session is successful when any captured signal
/// matches the active policy; later signals can never un-flag it.
pub struct FlagOracle {
    policy: CompiledPolicy,
}

impl FlagOracle {
    pub fn from_config(config: &OracleConfig) -> Result<Self, FlagbotError> {
        let policy = match config.policy {
            OraclePolicy::Exact => {
                let flag = config.flag.clone().filter(|f| !f.is_empty()).ok_or_else(|| {
                    FlagbotError::Config("Oracle policy 'exact' requires a non-empty flag literal".into())
                })?;
                CompiledPolicy::Exact(flag)
            }
            OraclePolicy::Structural => {
                let re = Regex::new(STRUCTURAL_PATTERN)
                    .map_err(|e| FlagbotError::Internal(format!("flag pattern failed to compile: {}", e)))?;
                CompiledPolicy::Structural(re)
            }
        };
        Ok(Self { policy })
    }

    fn matches(&self, message: &str) -> bool {
        match &self.policy {
            CompiledPolicy::Exact(flag) => message == flag,
            CompiledPolicy::Structural(re) => re.is_match(message),
        }
    }
}

impl Oracle for FlagOracle {
    fn classify(&self, session: &VerificationSession) -> bool {
        // Fail-closed: no signals, no success. Monotonic OR over signals.
        session.signals.iter().any(|signal| self.matches(&signal.message))
    }

    fn name(&self) -> &'static str {
        match self.policy {
            CompiledPolicy::Exact(_) => "flag-exact",
            CompiledPolicy::Structural(_) => "flag-structural",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DialogSignal;

    fn exact_oracle(flag: &str) -> FlagOracle {
        FlagOracle::from_config(&OracleConfig {
            policy: OraclePolicy::Exact,
            flag: Some(flag.to_string()),
        }).unwrap()
    }

    fn structural_oracle() -> FlagOracle {
        FlagOracle::from_config(&OracleConfig {
            policy: OraclePolicy::Structural,
            flag: None,
        }).unwrap()
    }

    fn session_with(messages: &[&str]) -> VerificationSession {
        VerificationSession {
            submission_id: 1,
            target_url: "http://localhost:3000/problems/xss-challenge.html?payload=x".to_string(),
            signals: messages.iter().map(|m| DialogSignal {
                kind: "alert".to_string(),
                message: m.to_string(),
            }).collect(),
        }
    }

    #[test]
    fn test_no_signals_is_failure() {
        let oracle = exact_oracle("FLAG{XSS_1s_Fun}");
        assert!(!oracle.classify(&session_with(&[])));
    }

    #[test]
    fn test_exact_match() {
        let oracle = exact_oracle("FLAG{XSS_1s_Fun}");
        assert!(oracle.classify(&session_with(&["FLAG{XSS_1s_Fun}"])));
    }

    #[test]
    fn test_exact_rejects_embedded_flag() {
        // Equality, not substring: surrounding text is not a proof.
        let oracle = exact_oracle("FLAG{XSS_1s_Fun}");
        assert!(!oracle.classify(&session_with(&["stole FLAG{XSS_1s_Fun} for you"])));
    }

    #[test]
    fn test_exact_rejects_unrelated_message() {
        let oracle = exact_oracle("FLAG{XSS_1s_Fun}");
        assert!(!oracle.classify(&session_with(&["hi"])));
    }

    #[test]
    fn test_structural_accepts_any_flag_shape() {
        let oracle = structural_oracle();
        assert!(oracle.classify(&session_with(&["flag{XSS_1s_Fun}"])));
        assert!(oracle.classify(&session_with(&["flag{}"])));
    }

    #[test]
    fn test_structural_is_case_sensitive() {
        let oracle = structural_oracle();
        assert!(!oracle.classify(&session_with(&["FLAG{XSS_1s_Fun}"])));
        assert!(!oracle.classify(&session_with(&["Flag{x}"])));
    }

    #[test]
    fn test_structural_rejects_partial_shape() {
        let oracle = structural_oracle();
        assert!(!oracle.classify(&session_with(&["flag{x"])));
        assert!(!oracle.classify(&session_with(&["see flag{x} here"])));
    }

    #[test]
    fn test_monotonic_or_non_matching_first() {
        let oracle = exact_oracle("FLAG{XSS_1s_Fun}");
        assert!(oracle.classify(&session_with(&["hi", "FLAG{XSS_1s_Fun}"])));
    }

    #[test]
    fn test_monotonic_or_matching_first() {
        let oracle = exact_oracle("FLAG{XSS_1s_Fun}");
        assert!(oracle.classify(&session_with(&["FLAG{XSS_1s_Fun}", "unrelated"])));
    }

    #[test]
    fn test_exact_requires_flag_literal() {
        let result = FlagOracle::from_config(&OracleConfig {
            policy: OraclePolicy::Exact,
            flag: None,
        });
        assert!(matches!(result, Err(FlagbotError::Config(_))));
    }

    #[test]
    fn test_oracle_names() {
        assert_eq!(exact_oracle("f").name(), "flag-exact");
        assert_eq!(structural_oracle().name(), "flag-structural");
    }
}

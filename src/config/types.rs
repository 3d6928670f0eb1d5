use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FlagbotConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub challenge: ChallengeConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "flagbot.db".to_string() }
    }
}

/// The fixed vulnerable page used as the execution harness. The submitted
/// payload is embedded as a URL-encoded query parameter and nothing else.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChallengeConfig {
    pub base_url: String,
    pub param: String,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/problems/xss-challenge.html".to_string(),
            param: "payload".to_string(),
        }
    }
}

/// Success-oracle policy. Deployments differ: some compare dialog messages
/// against a fixed secret literal, others accept any `flag{...}`-shaped
/// message. Neither subsumes the other, so both are configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OracleConfig {
    pub policy: OraclePolicy,
    /// Required when `policy` is `exact`; ignored for `structural`.
    pub flag: Option<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            policy: OraclePolicy::Exact,
            flag: Some("FLAG{XSS_1s_Fun}".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OraclePolicy {
    /// Dialog message must equal the configured flag literal.
    #[default]
    Exact,
    /// Dialog message must have the shape `flag{...}`, case-sensitive.
    Structural,
}

impl OraclePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Structural => "structural",
        }
    }
}

impl std::fmt::Display for OraclePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Fixed polling period. A tick always runs to completion before the
    /// next one is scheduled.
    pub poll_interval_secs: u64,
    /// Extra render attempts when the browser fails to launch.
    pub launch_retries: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { poll_interval_secs: 10, launch_retries: 2 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    /// Chromium executable to spawn.
    pub binary: String,
    /// How long to wait for network activity to settle after navigation.
    pub settle_timeout_ms: u64,
    /// Extra listening window after settle so deferred payloads can fire.
    pub dwell_ms: u64,
    /// Hard wall clock from navigation start. At expiry the session is
    /// forcibly torn down regardless of in-flight signals.
    pub hard_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary: "chromium".to_string(),
            settle_timeout_ms: 2000,
            dwell_ms: 750,
            hard_timeout_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    /// Scoring collaborator endpoint; receives `{ user_id, problem_id }`.
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000/api/problems/mark-correct".to_string(),
            request_timeout_secs: 5,
        }
    }
}

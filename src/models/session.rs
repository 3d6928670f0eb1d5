use serde::{Deserialize, Serialize};

/// One native dialog call observed inside the rendering engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogSignal {
    /// Dialog flavor as reported by the browser: alert, confirm, prompt
    /// or beforeunload.
    pub kind: String,
    pub message: String,
}

/// Observation record of one isolated browser run for one submission.
///
/// The live browser context is torn down unconditionally before this value
/// is returned; only the captured signals survive for classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSession {
    pub submission_id: i64,
    pub target_url: String,
    /// Signals in arrival order. Order does not affect the verdict.
    pub signals: Vec<DialogSignal>,
}

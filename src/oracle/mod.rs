pub mod flag;

pub use flag::FlagOracle;

use crate::models::VerificationSession;

/// Capability: decide whether a verification session proves exploitation.
///
/// Implementations must be fail-closed (a session with no signals is never
/// a success) so alternate strategies — DOM-mutation observation,
/// exfiltration-beacon detection — can replace the dialog oracle without
/// touching the scheduler or renderer.
pub trait Oracle: Send + Sync {
    fn classify(&self, session: &VerificationSession) -> bool;

    /// Oracle name for logging
    fn name(&self) -> &'static str;
}

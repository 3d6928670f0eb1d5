pub mod session;
pub mod submission;

pub use session::{DialogSignal, VerificationSession};
pub use submission::Submission;

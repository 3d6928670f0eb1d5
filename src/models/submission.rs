use serde::{Deserialize, Serialize};

/// One row of the `problem_submissions` table.
///
/// Rows are created by the platform's submission API; after creation the
/// verification bot is the only writer. `is_correct` carries no meaning
/// until `checked` is true, and the `checked` transition happens at most
/// once per row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub user_id: i64,
    pub problem_id: i64,
    /// Raw candidate payload, opaque text. Executed unmodified in the
    /// challenge page apart from URL encoding.
    pub answer: String,
    pub is_correct: bool,
    pub checked: bool,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

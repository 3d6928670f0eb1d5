use chrono::Utc;
use crate::errors::FlagbotError;
use crate::models::Submission;
use super::Database;

impl Database {
    /// All unverified submissions, ascending by id. Read-only; the order
    /// fixes the processing sequence within a tick.
    pub fn fetch_pending(&self) -> Result<Vec<Submission>, FlagbotError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, problem_id, answer, is_correct, checked, created_at FROM problem_submissions WHERE checked = 0 ORDER BY id ASC"
        ).map_err(|e| FlagbotError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map([], |row: &rusqlite::Row| {
            Ok(Submission {
                id: row.get(0)?,
                user_id: row.get(1)?,
                problem_id: row.get(2)?,
                answer: row.get(3)?,
                is_correct: row.get(4)?,
                checked: row.get(5)?,
                created_at: row.get(6)?,
            })
        }).map_err(|e| FlagbotError::Database(format!("Query error: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| FlagbotError::Database(format!("Row error: {}", e)))?);
        }
        Ok(results)
    }

    /// Commit a verdict: one combined update setting `is_correct` and
    /// `checked` together. Idempotent for identical arguments; returns
    /// whether a row with that id existed.
    pub fn mark_checked(&self, id: i64, is_correct: bool) -> Result<bool, FlagbotError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE problem_submissions SET is_correct = ?2, checked = 1 WHERE id = ?1",
            rusqlite::params![id, is_correct],
        ).map_err(|e| FlagbotError::Database(format!("Update failed: {}", e)))?;
        Ok(affected > 0)
    }

    /// Fetch one submission by id, checked or not.
    pub fn get_submission(&self, id: i64) -> Result<Option<Submission>, FlagbotError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, problem_id, answer, is_correct, checked, created_at FROM problem_submissions WHERE id = ?1"
        ).map_err(|e| FlagbotError::Database(format!("Query failed: {}", e)))?;

        let result = stmt.query_row(rusqlite::params![id], |row: &rusqlite::Row| {
            Ok(Submission {
                id: row.get(0)?,
                user_id: row.get(1)?,
                problem_id: row.get(2)?,
                answer: row.get(3)?,
                is_correct: row.get(4)?,
                checked: row.get(5)?,
                created_at: row.get(6)?,
            })
        });

        match result {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(FlagbotError::Database(format!("Query error: {}", e))),
        }
    }

    /// Insert a new unverified submission. Row creation belongs to the
    /// platform's submission API; this is its local equivalent for seeding
    /// and tests.
    pub fn create_submission(&self, user_id: i64, problem_id: i64, answer: &str) -> Result<i64, FlagbotError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO problem_submissions (user_id, problem_id, answer, is_correct, checked, created_at) VALUES (?1, ?2, ?3, 0, 0, ?4)",
            rusqlite::params![user_id, problem_id, answer, Utc::now().to_rfc3339()],
        ).map_err(|e| FlagbotError::Database(format!("Insert failed: {}", e)))?;
        Ok(conn.last_insert_rowid())
    }
}

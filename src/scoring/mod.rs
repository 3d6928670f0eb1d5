use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use crate::config::ScoringConfig;
use crate::errors::FlagbotError;

/// Best-effort notification to the scoring collaborator. Invoked only for
/// positive verdicts; the caller logs failures and never retries inline.
/// The collaborator applies crediting idempotently keyed by
/// `(user_id, problem_id)`, so a repeat call across retried ticks is safe.
#[async_trait]
pub trait ScoreNotifier: Send + Sync {
    async fn notify(&self, user_id: i64, problem_id: i64) -> Result<(), FlagbotError>;
}

pub struct HttpScoreNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpScoreNotifier {
    pub fn new(config: &ScoringConfig) -> Result<Self, FlagbotError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FlagbotError::Notify(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl ScoreNotifier for HttpScoreNotifier {
    async fn notify(&self, user_id: i64, problem_id: i64) -> Result<(), FlagbotError> {
        let response = self.client
            .post(&self.endpoint)
            .json(&json!({ "user_id": user_id, "problem_id": problem_id }))
            .send()
            .await
            .map_err(|e| FlagbotError::Notify(format!("scoring call failed: {}", e)))?;

        // Only the status matters; the body is not consumed.
        let status = response.status();
        if !status.is_success() {
            return Err(FlagbotError::Notify(format!("scoring service returned {}", status)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one connection, swallow the request, answer with `status`.
    async fn one_shot_server(status: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let response = format!("HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status);
            let _ = stream.write_all(response.as_bytes()).await;
        });
        format!("http://{}/api/problems/mark-correct", addr)
    }

    fn notifier_for(endpoint: String) -> HttpScoreNotifier {
        HttpScoreNotifier::new(&ScoringConfig {
            endpoint,
            request_timeout_secs: 2,
        }).unwrap()
    }

    #[tokio::test]
    async fn test_notify_success_on_2xx() {
        let endpoint = one_shot_server("200 OK").await;
        let notifier = notifier_for(endpoint);
        assert!(notifier.notify(1, 2).await.is_ok());
    }

    #[tokio::test]
    async fn test_notify_error_on_5xx() {
        let endpoint = one_shot_server("500 Internal Server Error").await;
        let notifier = notifier_for(endpoint);
        let result = notifier.notify(1, 2).await;
        assert!(matches!(result, Err(FlagbotError::Notify(_))));
    }

    #[tokio::test]
    async fn test_notify_error_on_unreachable_endpoint() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let notifier = notifier_for(format!("http://{}/api/problems/mark-correct", addr));
        let result = notifier.notify(1, 2).await;
        assert!(matches!(result, Err(FlagbotError::Notify(_))));
    }
}

//! DevTools protocol plumbing for Chromium's `--remote-debugging-pipe`
//! channel: NUL-terminated JSON frames, commands in on fd 3, responses and
//! events out on fd 4.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::FlagbotError;

/// Ceiling for a single protocol command. Covers a wedged browser during
/// setup; the render itself is bounded separately by the hard wall clock.
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Protocol event pushed by the browser.
#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub session_id: Option<String>,
    pub params: Value,
}

enum CdpMessage {
    Response {
        id: u64,
        result: Result<Value, String>,
    },
    Event(CdpEvent),
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, FlagbotError>>>>>;

/// One protocol connection to a spawned browser. Commands are matched to
/// responses by id; events fan in to the channel handed to `new`.
pub struct CdpConnection {
    writer: Mutex<tokio::fs::File>,
    pending: Pending,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
}

impl CdpConnection {
    pub fn new(
        writer: tokio::fs::File,
        reader: tokio::fs::File,
        events: mpsc::UnboundedSender<CdpEvent>,
    ) -> Self {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let reader_task = tokio::spawn(read_loop(reader, pending.clone(), events));
        Self {
            writer: Mutex::new(writer),
            pending,
            next_id: AtomicU64::new(0),
            reader: reader_task,
        }
    }

    /// Issue one protocol command and wait for its paired response.
    /// `session_id` scopes the command to an attached page session.
    pub async fn call(
        &self,
        session_id: Option<&str>,
        method: &str,
        params: Value,
    ) -> Result<Value, FlagbotError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let mut message = json!({ "id": id, "method": method, "params": params });
        if let Some(sid) = session_id {
            message["sessionId"] = Value::String(sid.to_string());
        }
        let mut frame = serde_json::to_vec(&message)?;
        frame.push(0);

        {
            let mut writer = self.writer.lock().await;
            writer.write_all(&frame).await?;
            writer.flush().await?;
        }

        match tokio::time::timeout(CALL_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(FlagbotError::Browser(
                "devtools pipe closed before the command completed".into(),
            )),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(FlagbotError::Browser(format!(
                    "{} got no response within {}s", method, CALL_TIMEOUT.as_secs()
                )))
            }
        }
    }

    /// Stop routing frames. Pending callers see the pipe as closed.
    pub fn shutdown(&self) {
        self.reader.abort();
    }
}

async fn read_loop(mut reader: tokio::fs::File, pending: Pending, events: mpsc::UnboundedSender<CdpEvent>) {
    let mut buf: Vec<u8> = Vec::with_capacity(16 * 1024);
    let mut chunk = [0u8; 8192];
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "devtools pipe read failed");
                break;
            }
        };
        buf.extend_from_slice(&chunk[..n]);

        for frame in drain_frames(&mut buf) {
            match parse_message(&frame) {
                Some(CdpMessage::Response { id, result }) => {
                    if let Some(tx) = pending.lock().await.remove(&id) {
                        let _ = tx.send(result.map_err(FlagbotError::Browser));
                    }
                }
                Some(CdpMessage::Event(event)) => {
                    // Consumer may already be gone during teardown.
                    let _ = events.send(event);
                }
                None => debug!("unparseable devtools frame dropped"),
            }
        }
    }

    // Pipe gone: fail every waiter instead of letting it hit the call timeout.
    let mut pending = pending.lock().await;
    for (_, tx) in pending.drain() {
        let _ = tx.send(Err(FlagbotError::Browser("browser closed the devtools pipe".into())));
    }
}

/// Split complete NUL-terminated frames off the front of `buf`, leaving any
/// partial trailing frame in place.
fn drain_frames(buf: &mut Vec<u8>) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    while let Some(pos) = buf.iter().position(|&b| b == 0) {
        let rest = buf.split_off(pos + 1);
        buf.pop(); // trailing NUL
        frames.push(std::mem::replace(buf, rest));
    }
    frames
}

fn parse_message(frame: &[u8]) -> Option<CdpMessage> {
    let mut value: Value = serde_json::from_slice(frame).ok()?;

    if let Some(id) = value["id"].as_u64() {
        let result = if value["error"].is_object() {
            let code = value["error"]["code"].as_i64().unwrap_or_default();
            let message = value["error"]["message"].as_str().unwrap_or_default();
            Err(format!("devtools error {}: {}", code, message))
        } else {
            Ok(value["result"].take())
        };
        return Some(CdpMessage::Response { id, result });
    }

    if value["method"].is_string() {
        return Some(CdpMessage::Event(CdpEvent {
            method: value["method"].as_str().unwrap_or_default().to_string(),
            session_id: value["sessionId"].as_str().map(str::to_string),
            params: value["params"].take(),
        }));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_frames_splits_on_nul() {
        let mut buf = b"{\"a\":1}\0{\"b\":2}\0{\"partial".to_vec();
        let frames = drain_frames(&mut buf);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], b"{\"a\":1}");
        assert_eq!(frames[1], b"{\"b\":2}");
        assert_eq!(buf, b"{\"partial");
    }

    #[test]
    fn test_drain_frames_empty_buffer() {
        let mut buf = Vec::new();
        assert!(drain_frames(&mut buf).is_empty());
    }

    #[test]
    fn test_parse_response_with_result() {
        let frame = br#"{"id":3,"result":{"sessionId":"abc"}}"#;
        match parse_message(frame) {
            Some(CdpMessage::Response { id, result }) => {
                assert_eq!(id, 3);
                assert_eq!(result.unwrap()["sessionId"], "abc");
            }
            _ => panic!("expected response"),
        }
    }

    #[test]
    fn test_parse_response_with_error() {
        let frame = br#"{"id":7,"error":{"code":-32601,"message":"no such method"}}"#;
        match parse_message(frame) {
            Some(CdpMessage::Response { id, result }) => {
                assert_eq!(id, 7);
                let err = result.unwrap_err();
                assert!(err.contains("-32601"));
                assert!(err.contains("no such method"));
            }
            _ => panic!("expected response"),
        }
    }

    #[test]
    fn test_parse_event_with_session() {
        let frame = br#"{"method":"Page.javascriptDialogOpening","sessionId":"s1","params":{"message":"hi","type":"alert"}}"#;
        match parse_message(frame) {
            Some(CdpMessage::Event(event)) => {
                assert_eq!(event.method, "Page.javascriptDialogOpening");
                assert_eq!(event.session_id.as_deref(), Some("s1"));
                assert_eq!(event.params["message"], "hi");
            }
            _ => panic!("expected event"),
        }
    }

    #[test]
    fn test_parse_garbage_frame() {
        assert!(parse_message(b"not json at all").is_none());
        assert!(parse_message(br#"{"neither":"id nor method"}"#).is_none());
    }
}

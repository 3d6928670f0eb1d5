use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "database": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" }
                }
            },
            "challenge": {
                "type": "object",
                "properties": {
                    "base_url": { "type": "string", "format": "uri" },
                    "param": { "type": "string" }
                }
            },
            "oracle": {
                "type": "object",
                "properties": {
                    "policy": { "type": "string", "enum": ["exact", "structural"] },
                    "flag": { "type": ["string", "null"] }
                }
            },
            "scheduler": {
                "type": "object",
                "properties": {
                    "poll_interval_secs": { "type": "integer", "minimum": 1 },
                    "launch_retries": { "type": "integer", "minimum": 0 }
                }
            },
            "browser": {
                "type": "object",
                "properties": {
                    "binary": { "type": "string" },
                    "settle_timeout_ms": { "type": "integer", "minimum": 0 },
                    "dwell_ms": { "type": "integer", "minimum": 0 },
                    "hard_timeout_ms": { "type": "integer", "minimum": 1 }
                }
            },
            "scoring": {
                "type": "object",
                "properties": {
                    "endpoint": { "type": "string", "format": "uri" },
                    "request_timeout_secs": { "type": "integer", "minimum": 1 }
                }
            }
        }
    })
});

use super::types::FlagbotError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl FlagbotError {
    /// Classify this error to determine its type and whether it can be retried.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Retryable errors
            FlagbotError::Database(_) => ErrorClassification {
                error_type: "StoreError",
                retryable: true,
            },
            FlagbotError::Browser(_) => ErrorClassification {
                error_type: "BrowserLaunchError",
                retryable: true,
            },
            FlagbotError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: true,
            },
            FlagbotError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                retryable: true,
            },

            // A render that blows the hard wall clock is a verdict, not a
            // transient fault. The scheduler commits it as incorrect.
            FlagbotError::Timeout(_) => ErrorClassification {
                error_type: "RenderTimeoutError",
                retryable: false,
            },

            // Scoring is best-effort and never retried inline.
            FlagbotError::Notify(_) => ErrorClassification {
                error_type: "NotifyError",
                retryable: false,
            },

            // Non-retryable errors
            FlagbotError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                retryable: false,
            },
            FlagbotError::InvalidTarget(_) => ErrorClassification {
                error_type: "InvalidTargetError",
                retryable: false,
            },
            FlagbotError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
            },
            FlagbotError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_retryable() {
        let err = FlagbotError::Database("connection lost".into());
        let class = err.classify();
        assert!(class.retryable);
        assert_eq!(class.error_type, "StoreError");
    }

    #[test]
    fn test_browser_launch_retryable() {
        let err = FlagbotError::Browser("spawn failed".into());
        let class = err.classify();
        assert!(class.retryable);
        assert_eq!(class.error_type, "BrowserLaunchError");
    }

    #[test]
    fn test_render_timeout_not_retryable() {
        let err = FlagbotError::Timeout("hard limit exceeded".into());
        let class = err.classify();
        assert!(!class.retryable);
        assert_eq!(class.error_type, "RenderTimeoutError");
    }

    #[test]
    fn test_notify_not_retryable() {
        let err = FlagbotError::Notify("503 from scoring service".into());
        assert!(!err.classify().retryable);
    }

    #[test]
    fn test_config_error_not_retryable() {
        let err = FlagbotError::Config("missing flag literal".into());
        assert!(!err.classify().retryable);
    }

    #[test]
    fn test_invalid_target_not_retryable() {
        let err = FlagbotError::InvalidTarget("bad base url".into());
        assert!(!err.classify().retryable);
    }
}

// tether_core/src/error.rs

use serde::Deserialize;
use thiserror::Error;

/// Failure to bring a virtual object's model into memory.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoadError {
    #[error("model file not found: {0}")]
    MissingModel(String),
    #[error("model '{name}' could not be decoded: {reason}")]
    Corrupt { name: String, reason: String },
    #[error("load worker exited without reporting a result")]
    WorkerLost,
    #[error("could not start load worker: {0}")]
    WorkerSpawn(String),
}

/// Error classes the tracking session can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum SessionErrorCode {
    UnsupportedConfiguration,
    SensorUnavailable,
    SensorFailed,
    CameraUnauthorized,
    WorldTrackingFailed,
}

/// A fatal error raised by the tracking session.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{description}")]
pub struct SessionError {
    pub code: SessionErrorCode,
    pub description: String,
    pub failure_reason: Option<String>,
    pub recovery_suggestions: Vec<String>,
}

impl SessionError {
    pub fn new(code: SessionErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            failure_reason: None,
            recovery_suggestions: Vec::new(),
        }
    }

    /// Only a world-tracking failure can be fixed by resetting the session.
    pub fn is_recoverable(&self) -> bool {
        self.code == SessionErrorCode::WorldTrackingFailed
    }

    /// The user-facing body of the failure alert.
    pub fn user_message(&self) -> String {
        let mut message = format!(
            "{} {}",
            self.description,
            self.failure_reason.as_deref().unwrap_or("")
        );
        for suggestion in &self.recovery_suggestions {
            message.push_str(suggestion);
            message.push('.');
        }
        if self.is_recoverable() {
            message.push_str("\nYou can try resetting the session or quit the application.");
        } else {
            message.push_str("\nThis is an unrecoverable error that requires to quit the application.");
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_world_tracking_failures_are_recoverable() {
        assert!(SessionError::new(SessionErrorCode::WorldTrackingFailed, "x").is_recoverable());
        for code in [
            SessionErrorCode::UnsupportedConfiguration,
            SessionErrorCode::SensorUnavailable,
            SessionErrorCode::SensorFailed,
            SessionErrorCode::CameraUnauthorized,
        ] {
            assert!(!SessionError::new(code, "x").is_recoverable());
        }
    }

    #[test]
    fn user_message_names_the_way_out() {
        let mut error = SessionError::new(SessionErrorCode::SensorFailed, "Sensor failed.");
        error.failure_reason = Some("The camera stopped.".into());
        error.recovery_suggestions = vec!["Restart the device".into()];
        let message = error.user_message();
        assert!(message.starts_with("Sensor failed. The camera stopped.Restart the device."));
        assert!(message.ends_with("requires to quit the application."));
    }
}

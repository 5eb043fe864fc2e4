//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Device Bridge Errors
    // ─────────────────────────────────────────────────────────────
    #[error("adb not found. Install Android platform-tools or set ANDROID_HOME.")]
    AdbNotFound,

    #[error("Device command failed: {message}")]
    Device { message: String },

    #[error("Failed to spawn adb process: {reason}")]
    ProcessSpawn { reason: String },

    #[error("Device command timed out after {millis}ms: {command}")]
    Timeout { command: String, millis: u64 },

    #[error("Failed to parse device output: {message}")]
    Parse { message: String },

    // ─────────────────────────────────────────────────────────────
    // Monitor Setup Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Could not find PID for package: {package}")]
    ProcessNotFound { package: String },

    #[error("Could not get IO stats for PID: {pid}")]
    IoBaseline { pid: u32 },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn device(message: impl Into<String>) -> Self {
        Self::Device {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn process_not_found(package: impl Into<String>) -> Self {
        Self::ProcessNotFound {
            package: package.into(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors degrade a single metric for one tick; the sampling
    /// loop logs them and carries on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Device { .. } | Error::Timeout { .. } | Error::Parse { .. }
        )
    }

    /// Check if this error should stop the monitor before it starts polling
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::AdbNotFound
                | Error::ProcessSpawn { .. }
                | Error::ProcessNotFound { .. }
                | Error::IoBaseline { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::device("exit status 1");
        assert_eq!(err.to_string(), "Device command failed: exit status 1");

        let err = Error::AdbNotFound;
        assert!(err.to_string().contains("adb not found"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_setup_errors_are_fatal() {
        assert!(Error::process_not_found("com.example").is_fatal());
        assert!(Error::IoBaseline { pid: 42 }.is_fatal());
        assert!(Error::AdbNotFound.is_fatal());
        assert!(!Error::device("offline").is_fatal());
    }

    #[test]
    fn test_query_errors_are_recoverable() {
        assert!(Error::device("offline").is_recoverable());
        assert!(Error::parse("bad row").is_recoverable());
        assert!(Error::Timeout {
            command: "dumpsys cpuinfo".into(),
            millis: 500
        }
        .is_recoverable());
        assert!(!Error::process_not_found("com.example").is_recoverable());
    }

    #[test]
    fn test_setup_error_messages_name_the_target() {
        let err = Error::process_not_found("com.example.app");
        assert!(err.to_string().contains("com.example.app"));

        let err = Error::IoBaseline { pid: 1234 };
        assert!(err.to_string().contains("1234"));
    }

    #[test]
    fn test_context_preserves_error_variant() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = result.context("reading config").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}

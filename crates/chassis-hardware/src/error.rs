//! Error types for platform operations.
//!
//! The variants follow the runtime failure classes of the platform layer:
//! missing capabilities, operations invalid for the current entity state,
//! missing linkage, lookup misses, bus transaction failures and fatal
//! configuration problems.

/// Result type alias for platform operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during platform operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Capability, feature or transaction width is absent.
    #[error("Unsupported operation: {operation}")]
    NotSupported { operation: String },

    /// Resource type mismatch, or operation invalid for the entity's state.
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// Required linkage is missing or an argument is malformed.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Name or handle lookup miss.
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Entity is absent but the operation needs it present.
    #[error("Device not present: {device}")]
    NotPresent { device: String },

    /// Underlying bus transaction failed.
    #[error("Bus error on {bus}: {message}")]
    Bus { bus: String, message: String },

    /// Configuration is corrupt or incomplete. Aborts start-up.
    #[error("Configuration error: {0}")]
    ConfigurationFatal(#[from] chassis_core::Error),

    /// Entity initialisation ran to completion but some resources failed.
    #[error("Initialization incomplete: {failed} of {total} resources failed")]
    PartialInit { failed: usize, total: usize },
}

impl HardwareError {
    /// Create a new unsupported operation error.
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    /// Create a new permission denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a new lookup miss error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a new not-present error.
    pub fn not_present(device: impl Into<String>) -> Self {
        Self::NotPresent {
            device: device.into(),
        }
    }

    /// Create a new bus transaction error.
    pub fn bus(bus: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Bus {
            bus: bus.into(),
            message: message.into(),
        }
    }

    /// Whether this error reports a missing capability.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported { .. })
    }

    /// Whether this error must abort start-up.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigurationFatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_supported_error() {
        let error = HardwareError::not_supported("speed_set");
        assert!(error.is_not_supported());
        assert_eq!(error.to_string(), "Unsupported operation: speed_set");
    }

    #[test]
    fn test_bus_error() {
        let error = HardwareError::bus("i2c-0", "NACK at 0x50");
        assert!(matches!(error, HardwareError::Bus { .. }));
        assert_eq!(error.to_string(), "Bus error on i2c-0: NACK at 0x50");
    }

    #[test]
    fn test_partial_init_error() {
        let error = HardwareError::PartialInit {
            failed: 1,
            total: 3,
        };
        assert_eq!(
            error.to_string(),
            "Initialization incomplete: 1 of 3 resources failed"
        );
    }

    #[test]
    fn test_configuration_error_is_fatal() {
        let error: HardwareError = chassis_core::Error::missing_attribute("psu", "instance").into();
        assert!(error.is_fatal());
        assert!(!HardwareError::not_found("fan1").is_fatal());
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            HardwareError::permission_denied("resource fan_0 is not a Led"),
            HardwareError::invalid_argument("no reset group"),
            HardwareError::not_present("fan_tray-1"),
        ];

        for error in errors {
            let _ = format!("{}", error);
            let _ = format!("{:?}", error);
        }
    }
}

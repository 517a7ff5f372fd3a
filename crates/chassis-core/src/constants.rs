//! Core constants for the chassis platform layer.
//!
//! This module collects the attribute names understood by the configuration
//! documents, the sentinel values they use, and the SMBus capability and flag
//! bits exchanged with I2C bus drivers.
//!
//! # Document Structure
//!
//! The entity topology document is a tree of nodes:
//!
//! ```text
//! root
//! ├── fan_tray   instance="1" type="SDI_ENTITY_FAN_TRAY" presence="pin_mux3_bit2"
//! │   ├── resource  reference="fan_0" name="fan1"
//! │   └── resource  reference="fan_tray_eeprom" name="info"
//! └── system_board  instance="1" type="SDI_ENTITY_SYSTEM_BOARD" presence="FIXED_SLOT"
//!     └── ...
//! ```
//!
//! # Usage
//!
//! ```
//! use chassis_core::constants::*;
//!
//! assert_eq!(FIXED_SLOT, "FIXED_SLOT");
//! assert_eq!(ATTR_PRESENCE, "presence");
//! ```

// ============================================================================
// Entity Attributes
// ============================================================================

/// Instance number of an entity, unique per entity type.
pub const ATTR_INSTANCE: &str = "instance";

/// Entity alias. Defaults to `<node-name>-<instance>` when absent.
pub const ATTR_ALIAS: &str = "alias";

/// Entity type drawn from the closed entity vocabulary.
pub const ATTR_TYPE: &str = "type";

/// Presence pin name, or [`FIXED_SLOT`] for non-removable entities.
pub const ATTR_PRESENCE: &str = "presence";

/// Fault status pin name.
pub const ATTR_FAULT: &str = "fault";

/// PSU output power status pin name.
pub const ATTR_POWER_OUTPUT_STATUS: &str = "power_output_status";

/// Power enable pin name. Its presence marks the entity power-control capable.
pub const ATTR_POWER: &str = "power";

/// Settle delay in milliseconds, applied after reset and power-on.
pub const ATTR_DELAY: &str = "delay";

/// Warm reset value (hexadecimal).
pub const ATTR_WARM_RESET: &str = "warm_reset";

/// Pin group that receives the warm reset value.
pub const ATTR_WARM_RESET_REGISTER: &str = "warm_reset_register";

/// Cold reset value (hexadecimal).
pub const ATTR_COLD_RESET: &str = "cold_reset";

/// Pin group that receives the cold reset value.
pub const ATTR_COLD_RESET_REGISTER: &str = "cold_reset_register";

// ============================================================================
// Resource Reference Attributes
// ============================================================================

/// Global name of the referenced resource.
pub const ATTR_REFERENCE: &str = "reference";

/// Entity-scoped alias given to the referenced resource.
pub const ATTR_NAME: &str = "name";

// ============================================================================
// Device Tree Attributes
// ============================================================================

/// 7-bit I2C slave address of a device.
pub const ATTR_ADDRESS: &str = "address";

/// Register offset inside a device.
pub const ATTR_REGISTER: &str = "register";

/// Bit position inside a register.
pub const ATTR_BIT: &str = "bit";

/// Bit mask inside a register.
pub const ATTR_MASK: &str = "mask";

/// Line polarity; `inverted` means active-low.
pub const ATTR_POLARITY: &str = "polarity";

// ============================================================================
// Sentinels
// ============================================================================

/// Presence value marking an entity as fixed (not hot-swappable).
pub const FIXED_SLOT: &str = "FIXED_SLOT";

/// Number of reset types an entity can support.
pub const MAX_NUM_RESET: usize = 2;

// ============================================================================
// SMBus Limits
// ============================================================================

/// Largest value carried by a byte transaction.
pub const MAX_BYTE_VAL: u32 = 0xFF;

/// Largest value carried by a word transaction.
pub const MAX_WORD_VAL: u32 = 0xFFFF;

/// Command offset used by transactions without a command byte
/// (receive byte / send byte).
pub const SMBUS_OFFSET_NON_CMD: u8 = 0;

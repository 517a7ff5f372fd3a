use crate::{Result, constants::MAX_NUM_RESET, error::Error};
use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of chassis unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityType {
    SystemBoard,
    FanTray,
    PsuTray,
}

impl EntityType {
    /// All entity types, in vocabulary order.
    pub const ALL: [EntityType; 3] = [Self::SystemBoard, Self::FanTray, Self::PsuTray];

    /// Canonical configuration token.
    #[must_use]
    pub fn token(&self) -> &'static str {
        match self {
            Self::SystemBoard => "SDI_ENTITY_SYSTEM_BOARD",
            Self::FanTray => "SDI_ENTITY_FAN_TRAY",
            Self::PsuTray => "SDI_ENTITY_PSU_TRAY",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::SystemBoard => "system-board",
            Self::FanTray => "fan-tray",
            Self::PsuTray => "psu-tray",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SDI_ENTITY_SYSTEM_BOARD" | "system-board" => Ok(Self::SystemBoard),
            "SDI_ENTITY_FAN_TRAY" | "fan-tray" => Ok(Self::FanTray),
            "SDI_ENTITY_PSU_TRAY" | "psu-tray" => Ok(Self::PsuTray),
            other => Err(Error::unknown("entity type", other)),
        }
    }
}

/// Kind of capability a resource exposes.
///
/// The type of a resource is fixed when the resource is created and selects
/// which capability surface its driver implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    Temperature,
    Fan,
    Led,
    DigitalDisplayLed,
    EntityInfo,
    UpgradablePld,
    Media,
}

impl ResourceType {
    /// Canonical configuration token.
    #[must_use]
    pub fn token(&self) -> &'static str {
        match self {
            Self::Temperature => "SDI_RESOURCE_TEMPERATURE",
            Self::Fan => "SDI_RESOURCE_FAN",
            Self::Led => "SDI_RESOURCE_LED",
            Self::DigitalDisplayLed => "SDI_RESOURCE_DIGIT_DISPLAY_LED",
            Self::EntityInfo => "SDI_RESOURCE_ENTITY_INFO",
            Self::UpgradablePld => "SDI_RESOURCE_UPGRADABLE_PLD",
            Self::Media => "SDI_RESOURCE_MEDIA",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Temperature => "temperature",
            Self::Fan => "fan",
            Self::Led => "led",
            Self::DigitalDisplayLed => "digital-display-led",
            Self::EntityInfo => "entity-info",
            Self::UpgradablePld => "upgradable-pld",
            Self::Media => "media",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SDI_RESOURCE_TEMPERATURE" | "temperature" => Ok(Self::Temperature),
            "SDI_RESOURCE_FAN" | "fan" => Ok(Self::Fan),
            "SDI_RESOURCE_LED" | "led" => Ok(Self::Led),
            "SDI_RESOURCE_DIGIT_DISPLAY_LED" | "digital-display-led" => {
                Ok(Self::DigitalDisplayLed)
            }
            "SDI_RESOURCE_ENTITY_INFO" | "entity-info" => Ok(Self::EntityInfo),
            "SDI_RESOURCE_UPGRADABLE_PLD" | "upgradable-pld" => Ok(Self::UpgradablePld),
            "SDI_RESOURCE_MEDIA" | "media" => Ok(Self::Media),
            other => Err(Error::unknown("resource type", other)),
        }
    }
}

/// Kind of bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusType {
    /// I2C / SMBus controller or mux channel.
    I2c,
    /// Single GPIO line.
    Pin,
    /// Group of GPIO lines driven as one value.
    PinGroup,
    /// Virtual bus for devices without a physical transport.
    Pseudo,
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::I2c => write!(f, "I2C"),
            Self::Pin => write!(f, "Pin"),
            Self::PinGroup => write!(f, "PinGroup"),
            Self::Pseudo => write!(f, "Pseudo"),
        }
    }
}

/// Reset flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetType {
    Warm,
    Cold,
}

impl ResetType {
    /// All reset types, indexed by [`ResetType::index`].
    pub const ALL: [ResetType; MAX_NUM_RESET] = [Self::Warm, Self::Cold];

    /// Position of this reset type in per-reset tables.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Warm => 0,
            Self::Cold => 1,
        }
    }

    /// Support flag that marks an entity capable of this reset.
    #[must_use]
    pub fn feature(&self) -> EntityFeatures {
        match self {
            Self::Warm => EntityFeatures::WARM_RESET,
            Self::Cold => EntityFeatures::COLD_RESET,
        }
    }

    /// Value attribute naming the reset value in the topology document.
    #[must_use]
    pub fn value_attribute(&self) -> &'static str {
        match self {
            Self::Warm => crate::constants::ATTR_WARM_RESET,
            Self::Cold => crate::constants::ATTR_COLD_RESET,
        }
    }

    /// Attribute naming the pin group that receives the reset value.
    #[must_use]
    pub fn register_attribute(&self) -> &'static str {
        match self {
            Self::Warm => crate::constants::ATTR_WARM_RESET_REGISTER,
            Self::Cold => crate::constants::ATTR_COLD_RESET_REGISTER,
        }
    }
}

impl TryFrom<u32> for ResetType {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(Self::Warm),
            1 => Ok(Self::Cold),
            other => Err(Error::UnknownResetType(other)),
        }
    }
}

impl fmt::Display for ResetType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Warm => write!(f, "warm"),
            Self::Cold => write!(f, "cold"),
        }
    }
}

impl std::str::FromStr for ResetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "warm" => Ok(Self::Warm),
            "cold" => Ok(Self::Cold),
            _ => Err(Error::unknown("reset type", s)),
        }
    }
}

/// Logical level of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PinLevel {
    #[default]
    Low,
    High,
}

impl PinLevel {
    #[must_use]
    pub fn is_high(&self) -> bool {
        matches!(self, Self::High)
    }
}

impl From<bool> for PinLevel {
    fn from(value: bool) -> Self {
        if value { Self::High } else { Self::Low }
    }
}

bitflags! {
    /// Operational support bits of an entity.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EntityFeatures: u32 {
        const WARM_RESET = 1 << 0;
        const COLD_RESET = 1 << 1;
        const HOTSWAPPABLE = 1 << 2;
        const POWER_CONTROL = 1 << 3;
    }
}

bitflags! {
    /// Transactions an I2C bus can execute.
    ///
    /// Bit values follow the Linux `I2C_FUNC_*` layout so that a bus backed by
    /// `i2c-dev` can report its adapter functionality unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct I2cCapability: u32 {
        const I2C = 0x0000_0001;
        const SMBUS_PEC = 0x0000_0008;
        const SMBUS_READ_BYTE = 0x0002_0000;
        const SMBUS_WRITE_BYTE = 0x0004_0000;
        const SMBUS_READ_BYTE_DATA = 0x0008_0000;
        const SMBUS_WRITE_BYTE_DATA = 0x0010_0000;
        const SMBUS_READ_WORD_DATA = 0x0020_0000;
        const SMBUS_WRITE_WORD_DATA = 0x0040_0000;
        const SMBUS_READ_BLOCK_DATA = 0x0100_0000;
        const SMBUS_WRITE_BLOCK_DATA = 0x0200_0000;

        const SMBUS_BYTE = Self::SMBUS_READ_BYTE.bits() | Self::SMBUS_WRITE_BYTE.bits();
        const SMBUS_BYTE_DATA =
            Self::SMBUS_READ_BYTE_DATA.bits() | Self::SMBUS_WRITE_BYTE_DATA.bits();
        const SMBUS_WORD_DATA =
            Self::SMBUS_READ_WORD_DATA.bits() | Self::SMBUS_WRITE_WORD_DATA.bits();
    }
}

bitflags! {
    /// Per-transaction options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct I2cFlags: u32 {
        /// SMBus packet error checking.
        const PEC = 0x0000_0002;
    }
}

/// Direction of an SMBus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmbusOperation {
    Write,
    Read,
}

/// Data size of an SMBus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmbusWidth {
    /// Receive / send byte, no command offset.
    Byte,
    /// Byte at a command offset.
    ByteData,
    /// Little-endian word at a command offset.
    WordData,
    /// Block at a command offset; needs the block capability bits.
    BlockData,
}

impl SmbusWidth {
    /// Capability bit required to run `operation` with this width.
    #[must_use]
    pub fn required_capability(&self, operation: SmbusOperation) -> I2cCapability {
        match (self, operation) {
            (Self::Byte, SmbusOperation::Read) => I2cCapability::SMBUS_READ_BYTE,
            (Self::Byte, SmbusOperation::Write) => I2cCapability::SMBUS_WRITE_BYTE,
            (Self::ByteData, SmbusOperation::Read) => I2cCapability::SMBUS_READ_BYTE_DATA,
            (Self::ByteData, SmbusOperation::Write) => I2cCapability::SMBUS_WRITE_BYTE_DATA,
            (Self::WordData, SmbusOperation::Read) => I2cCapability::SMBUS_READ_WORD_DATA,
            (Self::WordData, SmbusOperation::Write) => I2cCapability::SMBUS_WRITE_WORD_DATA,
            (Self::BlockData, SmbusOperation::Read) => I2cCapability::SMBUS_READ_BLOCK_DATA,
            (Self::BlockData, SmbusOperation::Write) => I2cCapability::SMBUS_WRITE_BLOCK_DATA,
        }
    }
}

/// Lifecycle state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    /// Not yet part of a loaded topology.
    #[default]
    Unknown,
    /// Loaded, or taken down by reset / power-off, and not re-initialised.
    NotInitialized,
    /// Initialisation ran and every contained resource came up.
    Initialized,
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::NotInitialized => write!(f, "not-initialized"),
            Self::Initialized => write!(f, "initialized"),
        }
    }
}

/// Airflow direction of a fan or PSU unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Airflow {
    #[default]
    Normal,
    Reverse,
}

/// Threshold kind of a temperature sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    Low,
    High,
    Critical,
}

/// Inventory data read from an entity's EEPROM.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityInfo {
    pub product_name: String,
    pub part_number: String,
    pub serial_number: String,
    pub hw_revision: String,
    pub vendor_name: String,
    pub base_mac: Option<String>,
    pub mac_size: u32,
    pub num_fans: u32,
    /// Maximum fan speed in RPM; seeds fan initialisation.
    pub max_speed: u32,
    pub airflow: Airflow,
    /// Power rating in watts.
    pub power_rating: u32,
}

/// Cached entity inventory with the time it was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfoSnapshot {
    pub info: EntityInfo,
    pub captured_at: DateTime<Utc>,
}

impl EntityInfoSnapshot {
    /// Capture `info` now.
    #[must_use]
    pub fn now(info: EntityInfo) -> Self {
        Self {
            info,
            captured_at: Utc::now(),
        }
    }
}

//! Platform hardware abstraction for network switch chassis.
//!
//! The crate turns two configuration documents into a live view of the
//! chassis hardware:
//!
//! ```text
//!   device tree ──► drivers ──► buses + resources
//!                                     │
//!   topology ────────────────────────►└──► entities (system board, fan trays, PSUs)
//! ```
//!
//! - The **device tree** is walked by [`driver::DeviceDriver`]s registered in
//!   a [`driver::DriverRegistry`]. Drivers create buses (I2C segments, GPIO
//!   pins and pin groups, pseudo buses) and resources (fans, sensors, LEDs,
//!   EEPROMs, optics).
//! - The **topology** groups resources into field-replaceable entities and
//!   binds each entity to its presence, fault, power and reset lines.
//!
//! The result is a [`Platform`], shared across threads by reference. Bus
//! access goes through RAII guards that serialise transactions per bus;
//! resource access goes through the capability proxies on
//! [`resource::Resource`].
//!
//! # Examples
//!
//! ```
//! use chassis_core::{ConfigNode, EntityType, ResourceType};
//! use chassis_hardware::driver::DriverRegistry;
//! use chassis_hardware::drivers::register_builtin;
//! use chassis_hardware::mock::MockBench;
//! use chassis_hardware::Platform;
//!
//! # fn main() -> chassis_hardware::Result<()> {
//! let bench = MockBench::new();
//! let mut drivers = DriverRegistry::new();
//! register_builtin(&mut drivers)?;
//! bench.install(&mut drivers)?;
//!
//! let devices = ConfigNode::new("devices").with_child(
//!     ConfigNode::new("pseudo-bus")
//!         .with_attr("name", "soft")
//!         .with_child(ConfigNode::new("mock-fan").with_attr("name", "fan_0")),
//! );
//! let entities = ConfigNode::new("entities").with_child(
//!     ConfigNode::new("fan_tray")
//!         .with_attr("instance", "1")
//!         .with_attr("type", "SDI_ENTITY_FAN_TRAY")
//!         .with_attr("presence", "FIXED_SLOT")
//!         .with_child(
//!             ConfigNode::new("resource")
//!                 .with_attr("reference", "fan_0")
//!                 .with_attr("name", "fan1"),
//!         ),
//! );
//!
//! let platform = Platform::from_documents(drivers, &devices, &entities)?;
//! let tray = platform.entity_lookup(EntityType::FanTray, 1).unwrap();
//! platform.entity_init(tray)?;
//!
//! let fan = platform.resource_lookup(tray, ResourceType::Fan, "fan1").unwrap();
//! platform.resource(fan)?.fan_speed_set(12000)?;
//! assert_eq!(bench.fan("fan_0").unwrap().with(|s| s.speed), 12000);
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Every fallible operation returns [`Result<T>`] with a [`HardwareError`].
//! Configuration problems found at start-up are reported as
//! [`HardwareError::ConfigurationFatal`]; everything else is a runtime error
//! the caller may retry or report.

pub mod bus;
pub mod capability;
pub mod driver;
pub mod drivers;
pub mod entity;
pub mod error;
pub mod mock;
pub mod platform;
pub mod resource;

mod lifecycle;
mod proxy;
mod topology;

pub use error::{HardwareError, Result};

pub use bus::{Bus, BusArena, BusId, BusKind, Device};
pub use capability::CapabilityTable;
pub use driver::{DeviceDriver, DriverRegistry};
pub use entity::{Entity, EntityId};
pub use platform::{Platform, PlatformBuilder, PlatformConfig};
pub use resource::{Resource, ResourceId, ResourceRegistry};

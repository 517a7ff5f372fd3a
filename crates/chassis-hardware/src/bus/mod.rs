//! Bus abstraction.
//!
//! Every hardware access goes through a [`Bus`]. A bus is one of four
//! variants ([`BusKind`]): an I2C/SMBus segment, a single GPIO pin, a group
//! of GPIO pins driven as one value, or a pseudo bus that only groups
//! software devices. Each bus owns the list of devices attached to it and a
//! transaction lock.
//!
//! # Locking
//!
//! Transactions are performed through guards returned by `acquire`. The
//! guard holds the bus lock and runs the driver's release hook when dropped,
//! so acquire and release stay paired on every exit path:
//!
//! ```
//! use chassis_hardware::bus::{BusArena, BusKind};
//! use chassis_hardware::mock::MockPin;
//! use chassis_core::PinLevel;
//!
//! let mut arena = BusArena::default();
//! let (pin, handle) = MockPin::new(PinLevel::High);
//! let id = arena.insert("presence", None, BusKind::Pin(Box::new(pin))).unwrap();
//!
//! let bus = arena.bus(id).unwrap();
//! {
//!     let guard = bus.as_pin().unwrap().acquire().unwrap();
//!     assert_eq!(guard.read().unwrap(), PinLevel::High);
//! }
//! assert_eq!(handle.release_count(), 1);
//! ```
//!
//! # Topology
//!
//! Buses form a tree: a pin bus may be implemented on top of an I2C GPIO
//! expander. Parents are referenced by [`BusId`] and are always registered
//! before their children, so the tree cannot contain cycles.

mod arena;
mod i2c;
mod pin;

pub use arena::BusArena;
pub use i2c::{I2cBus, I2cGuard, I2cOps, SmbusBuffer};
pub use pin::{PinBus, PinGroupBus, PinGroupGuard, PinGroupOps, PinGuard, PinOps};

use crate::{HardwareError, Result};
use chassis_core::BusType;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

/// Process-unique bus identifier. Doubles as the bus's index in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusId(pub(crate) usize);

impl BusId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus{}", self.0)
    }
}

/// A device attached to a bus.
///
/// The bus initialises its devices, in attachment order, after its own
/// bring-up.
pub trait Device: Send + Sync {
    /// Device name, for diagnostics.
    fn name(&self) -> &str;

    /// Bring the device up.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be initialised. This aborts
    /// start-up.
    fn init(&self, _bus: &Bus) -> Result<()> {
        Ok(())
    }
}

/// Bus variant with its driver.
pub enum BusKind {
    I2c(Box<dyn I2cOps>),
    Pin(Box<dyn PinOps>),
    PinGroup(Box<dyn PinGroupOps>),
    Pseudo,
}

impl BusKind {
    pub fn bus_type(&self) -> BusType {
        match self {
            Self::I2c(_) => BusType::I2c,
            Self::Pin(_) => BusType::Pin,
            Self::PinGroup(_) => BusType::PinGroup,
            Self::Pseudo => BusType::Pseudo,
        }
    }
}

impl fmt::Debug for BusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bus_type())
    }
}

/// A bus and the devices attached to it.
pub struct Bus {
    id: BusId,
    name: String,
    parent: Option<BusId>,
    kind: BusKind,
    lock: Mutex<()>,
    devices: Mutex<Vec<Arc<dyn Device>>>,
}

impl Bus {
    pub(crate) fn new(id: BusId, name: String, parent: Option<BusId>, kind: BusKind) -> Self {
        Self {
            id,
            name,
            parent,
            kind,
            lock: Mutex::new(()),
            devices: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<BusId> {
        self.parent
    }

    pub fn bus_type(&self) -> BusType {
        self.kind.bus_type()
    }

    /// I2C view of this bus.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::InvalidArgument`] if this is not an I2C bus.
    pub fn as_i2c(&self) -> Result<I2cBus<'_>> {
        match &self.kind {
            BusKind::I2c(ops) => Ok(I2cBus::new(self, ops.as_ref())),
            _ => Err(self.wrong_type(BusType::I2c)),
        }
    }

    /// Pin view of this bus.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::InvalidArgument`] if this is not a pin bus.
    pub fn as_pin(&self) -> Result<PinBus<'_>> {
        match &self.kind {
            BusKind::Pin(ops) => Ok(PinBus::new(self, ops.as_ref())),
            _ => Err(self.wrong_type(BusType::Pin)),
        }
    }

    /// Pin-group view of this bus.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::InvalidArgument`] if this is not a pin-group bus.
    pub fn as_pin_group(&self) -> Result<PinGroupBus<'_>> {
        match &self.kind {
            BusKind::PinGroup(ops) => Ok(PinGroupBus::new(self, ops.as_ref())),
            _ => Err(self.wrong_type(BusType::PinGroup)),
        }
    }

    /// Attach a device to this bus.
    pub fn attach(&self, device: Arc<dyn Device>) {
        debug!(bus = %self.name, device = device.name(), "attaching device");
        self.device_list().push(device);
    }

    /// Names of attached devices, in attachment order.
    pub fn device_names(&self) -> Vec<String> {
        self.device_list()
            .iter()
            .map(|device| device.name().to_string())
            .collect()
    }

    pub fn device_count(&self) -> usize {
        self.device_list().len()
    }

    /// Run the bus bring-up hook, then initialise every attached device.
    ///
    /// # Errors
    ///
    /// Returns the first bring-up or device initialisation failure.
    pub fn init(&self) -> Result<()> {
        let bring_up = match &self.kind {
            BusKind::I2c(ops) => ops.init(),
            BusKind::Pin(ops) => ops.init(),
            BusKind::PinGroup(ops) => ops.init(),
            BusKind::Pseudo => Ok(()),
        };
        if let Err(e) = bring_up {
            error!(bus = %self.name, error = %e, "bus bring-up failed");
            return Err(e);
        }

        // Snapshot so device init can itself run transactions on this bus.
        let devices: Vec<Arc<dyn Device>> = self.device_list().clone();
        for device in devices {
            if let Err(e) = device.init(self) {
                error!(bus = %self.name, device = device.name(), error = %e, "device init failed");
                return Err(e);
            }
        }
        Ok(())
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn device_list(&self) -> MutexGuard<'_, Vec<Arc<dyn Device>>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wrong_type(&self, expected: BusType) -> HardwareError {
        HardwareError::invalid_argument(format!(
            "bus '{}' is a {} bus, expected {}",
            self.name,
            self.bus_type(),
            expected
        ))
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("kind", &self.kind)
            .finish()
    }
}

use super::Bus;
use crate::Result;
use chassis_core::PinLevel;
use std::sync::MutexGuard;
use tracing::trace;

/// Driver of a single GPIO line.
pub trait PinOps: Send + Sync {
    fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Hook run after the bus lock is taken. On failure the lock is dropped
    /// and `release` is not called.
    fn acquire(&self) -> Result<()> {
        Ok(())
    }

    /// Hook run before the bus lock is dropped.
    fn release(&self) {}

    /// Read the logical level of the line.
    fn read(&self) -> Result<PinLevel>;

    /// Drive the line to a logical level.
    fn write(&self, level: PinLevel) -> Result<()>;
}

/// Driver of a group of GPIO lines read and written as one value.
pub trait PinGroupOps: Send + Sync {
    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn acquire(&self) -> Result<()> {
        Ok(())
    }

    fn release(&self) {}

    fn read(&self) -> Result<u32>;

    fn write(&self, value: u32) -> Result<()>;
}

/// Pin view of a [`Bus`].
#[derive(Clone, Copy)]
pub struct PinBus<'a> {
    bus: &'a Bus,
    ops: &'a dyn PinOps,
}

impl<'a> PinBus<'a> {
    pub(super) fn new(bus: &'a Bus, ops: &'a dyn PinOps) -> Self {
        Self { bus, ops }
    }

    pub fn name(&self) -> &'a str {
        self.bus.name()
    }

    /// Take the pin.
    ///
    /// # Errors
    ///
    /// Returns the acquire hook's error; the bus is left unlocked.
    pub fn acquire(&self) -> Result<PinGuard<'a>> {
        let lock = self.bus.lock();
        self.ops.acquire()?;
        Ok(PinGuard {
            bus: self.bus,
            ops: self.ops,
            _lock: lock,
        })
    }

    /// Acquire, read, release.
    pub fn read_level(&self) -> Result<PinLevel> {
        self.acquire()?.read()
    }

    /// Acquire, write, release.
    pub fn write_level(&self, level: PinLevel) -> Result<()> {
        self.acquire()?.write(level)
    }
}

/// Exclusive hold on a pin bus. Releases the bus when dropped.
pub struct PinGuard<'a> {
    bus: &'a Bus,
    ops: &'a dyn PinOps,
    _lock: MutexGuard<'a, ()>,
}

impl PinGuard<'_> {
    pub fn read(&self) -> Result<PinLevel> {
        let level = self.ops.read()?;
        trace!(pin = self.bus.name(), ?level, "pin read");
        Ok(level)
    }

    pub fn write(&self, level: PinLevel) -> Result<()> {
        trace!(pin = self.bus.name(), ?level, "pin write");
        self.ops.write(level)
    }
}

impl Drop for PinGuard<'_> {
    fn drop(&mut self) {
        self.ops.release();
    }
}

/// Pin-group view of a [`Bus`].
#[derive(Clone, Copy)]
pub struct PinGroupBus<'a> {
    bus: &'a Bus,
    ops: &'a dyn PinGroupOps,
}

impl<'a> PinGroupBus<'a> {
    pub(super) fn new(bus: &'a Bus, ops: &'a dyn PinGroupOps) -> Self {
        Self { bus, ops }
    }

    pub fn name(&self) -> &'a str {
        self.bus.name()
    }

    /// Take the pin group.
    ///
    /// # Errors
    ///
    /// Returns the acquire hook's error; the bus is left unlocked.
    pub fn acquire(&self) -> Result<PinGroupGuard<'a>> {
        let lock = self.bus.lock();
        self.ops.acquire()?;
        Ok(PinGroupGuard {
            bus: self.bus,
            ops: self.ops,
            _lock: lock,
        })
    }

    pub fn read_value(&self) -> Result<u32> {
        self.acquire()?.read()
    }

    pub fn write_value(&self, value: u32) -> Result<()> {
        self.acquire()?.write(value)
    }
}

/// Exclusive hold on a pin-group bus. Releases the bus when dropped.
pub struct PinGroupGuard<'a> {
    bus: &'a Bus,
    ops: &'a dyn PinGroupOps,
    _lock: MutexGuard<'a, ()>,
}

impl PinGroupGuard<'_> {
    pub fn read(&self) -> Result<u32> {
        self.ops.read()
    }

    pub fn write(&self, value: u32) -> Result<()> {
        trace!(group = self.bus.name(), value = format_args!("{value:#x}"), "pin group write");
        self.ops.write(value)
    }
}

impl Drop for PinGroupGuard<'_> {
    fn drop(&mut self) {
        self.ops.release();
    }
}

#[cfg(test)]
mod tests {
    use crate::bus::{BusArena, BusKind};
    use crate::mock::{MockPin, MockPinGroup};
    use chassis_core::PinLevel;

    #[test]
    fn test_read_level_pairs_acquire_release() {
        let mut arena = BusArena::default();
        let (pin, handle) = MockPin::new(PinLevel::High);
        let id = arena.insert("prs", None, BusKind::Pin(Box::new(pin))).unwrap();
        let bus = arena.bus(id).unwrap();

        assert_eq!(bus.as_pin().unwrap().read_level().unwrap(), PinLevel::High);
        handle.set_level(PinLevel::Low);
        assert_eq!(bus.as_pin().unwrap().read_level().unwrap(), PinLevel::Low);

        assert_eq!(handle.acquire_count(), 2);
        assert_eq!(handle.release_count(), 2);
    }

    #[test]
    fn test_write_failure_still_releases() {
        let mut arena = BusArena::default();
        let (group, handle) = MockPinGroup::new(0);
        handle.fail_writes(true);
        let id = arena
            .insert("rst", None, BusKind::PinGroup(Box::new(group)))
            .unwrap();

        let result = arena.bus(id).unwrap().as_pin_group().unwrap().write_value(0x3);
        assert!(result.is_err());
        assert_eq!(handle.release_count(), 1);
        assert!(handle.writes().is_empty());
    }

    #[test]
    fn test_failed_acquire_skips_release() {
        let mut arena = BusArena::default();
        let (pin, handle) = MockPin::new(PinLevel::Low);
        handle.fail_acquire(true);
        let id = arena.insert("pwr", None, BusKind::Pin(Box::new(pin))).unwrap();

        let result = arena.bus(id).unwrap().as_pin().unwrap().write_level(PinLevel::High);
        assert!(result.is_err());
        assert_eq!(handle.release_count(), 0);
        assert!(handle.writes().is_empty());
    }
}

//! Simulated GPIO pins and pin groups.

use crate::bus::{PinGroupOps, PinOps};
use crate::{HardwareError, Result};
use chassis_core::PinLevel;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct PinState {
    level: PinLevel,
    writes: Vec<PinLevel>,
    reads: usize,
    acquires: usize,
    releases: usize,
    fail_acquire: bool,
    fail_reads: bool,
    fail_writes: bool,
}

/// GPIO line whose level is set through a [`MockPinHandle`].
///
/// # Examples
///
/// ```
/// use chassis_hardware::bus::PinOps;
/// use chassis_hardware::mock::MockPin;
/// use chassis_core::PinLevel;
///
/// let (pin, handle) = MockPin::new(PinLevel::Low);
/// handle.set_level(PinLevel::High);
/// assert_eq!(pin.read().unwrap(), PinLevel::High);
/// ```
#[derive(Debug)]
pub struct MockPin {
    state: Arc<Mutex<PinState>>,
}

impl MockPin {
    pub fn new(level: PinLevel) -> (Self, MockPinHandle) {
        let state = Arc::new(Mutex::new(PinState {
            level,
            ..Default::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockPinHandle { state },
        )
    }

    fn state(&self) -> MutexGuard<'_, PinState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PinOps for MockPin {
    fn acquire(&self) -> Result<()> {
        let mut state = self.state();
        state.acquires += 1;
        if state.fail_acquire {
            return Err(HardwareError::bus("mock-pin", "acquire failed"));
        }
        Ok(())
    }

    fn release(&self) {
        self.state().releases += 1;
    }

    fn read(&self) -> Result<PinLevel> {
        let mut state = self.state();
        state.reads += 1;
        if state.fail_reads {
            return Err(HardwareError::bus("mock-pin", "read failed"));
        }
        Ok(state.level)
    }

    fn write(&self, level: PinLevel) -> Result<()> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(HardwareError::bus("mock-pin", "write failed"));
        }
        state.level = level;
        state.writes.push(level);
        Ok(())
    }
}

/// Control handle of a [`MockPin`].
#[derive(Debug, Clone)]
pub struct MockPinHandle {
    state: Arc<Mutex<PinState>>,
}

impl MockPinHandle {
    fn state(&self) -> MutexGuard<'_, PinState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Force the level the pin reads.
    pub fn set_level(&self, level: PinLevel) {
        self.state().level = level;
    }

    pub fn level(&self) -> PinLevel {
        self.state().level
    }

    /// Levels written through the bus, oldest first.
    pub fn writes(&self) -> Vec<PinLevel> {
        self.state().writes.clone()
    }

    pub fn read_count(&self) -> usize {
        self.state().reads
    }

    pub fn acquire_count(&self) -> usize {
        self.state().acquires
    }

    pub fn release_count(&self) -> usize {
        self.state().releases
    }

    pub fn fail_acquire(&self, fail: bool) {
        self.state().fail_acquire = fail;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }
}

#[derive(Debug, Default)]
struct PinGroupState {
    value: u32,
    writes: Vec<u32>,
    acquires: usize,
    releases: usize,
    fail_acquire: bool,
    fail_writes: bool,
}

/// Group of GPIO lines holding one value.
#[derive(Debug)]
pub struct MockPinGroup {
    state: Arc<Mutex<PinGroupState>>,
}

impl MockPinGroup {
    pub fn new(value: u32) -> (Self, MockPinGroupHandle) {
        let state = Arc::new(Mutex::new(PinGroupState {
            value,
            ..Default::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockPinGroupHandle { state },
        )
    }

    fn state(&self) -> MutexGuard<'_, PinGroupState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PinGroupOps for MockPinGroup {
    fn acquire(&self) -> Result<()> {
        let mut state = self.state();
        state.acquires += 1;
        if state.fail_acquire {
            return Err(HardwareError::bus("mock-pin-group", "acquire failed"));
        }
        Ok(())
    }

    fn release(&self) {
        self.state().releases += 1;
    }

    fn read(&self) -> Result<u32> {
        Ok(self.state().value)
    }

    fn write(&self, value: u32) -> Result<()> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(HardwareError::bus("mock-pin-group", "write failed"));
        }
        state.value = value;
        state.writes.push(value);
        Ok(())
    }
}

/// Control handle of a [`MockPinGroup`].
#[derive(Debug, Clone)]
pub struct MockPinGroupHandle {
    state: Arc<Mutex<PinGroupState>>,
}

impl MockPinGroupHandle {
    fn state(&self) -> MutexGuard<'_, PinGroupState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn value(&self) -> u32 {
        self.state().value
    }

    /// Values written through the bus, oldest first.
    pub fn writes(&self) -> Vec<u32> {
        self.state().writes.clone()
    }

    pub fn acquire_count(&self) -> usize {
        self.state().acquires
    }

    pub fn release_count(&self) -> usize {
        self.state().releases
    }

    pub fn fail_acquire(&self, fail: bool) {
        self.state().fail_acquire = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }
}

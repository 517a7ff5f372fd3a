//! Simulated I2C bus segment.

use crate::bus::{I2cOps, SmbusBuffer};
use crate::{HardwareError, Result};
use chassis_core::constants::SMBUS_OFFSET_NON_CMD;
use chassis_core::{I2cCapability, I2cFlags, SmbusOperation, SmbusWidth};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Capabilities of a mock bus when none are configured.
pub const DEFAULT_MOCK_CAPABILITY: I2cCapability = I2cCapability::I2C
    .union(I2cCapability::SMBUS_PEC)
    .union(I2cCapability::SMBUS_BYTE)
    .union(I2cCapability::SMBUS_BYTE_DATA)
    .union(I2cCapability::SMBUS_WORD_DATA);

/// One transaction seen by a mock bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cTransaction {
    pub address: u16,
    pub operation: SmbusOperation,
    pub width: SmbusWidth,
    pub offset: u8,
}

#[derive(Debug, Default)]
struct I2cState {
    capability: I2cCapability,
    registers: HashMap<(u16, u8), u8>,
    transactions: Vec<I2cTransaction>,
    acquires: usize,
    releases: usize,
    fail_acquire: bool,
    fail_transactions: bool,
}

/// I2C bus backed by an in-memory register map.
///
/// Every device address has 256 byte registers, all zero until written.
/// Word transactions use two consecutive registers, low byte first.
#[derive(Debug)]
pub struct MockI2cBus {
    state: Arc<Mutex<I2cState>>,
}

impl MockI2cBus {
    /// Create a mock bus and its control handle.
    pub fn new(capability: I2cCapability) -> (Self, MockI2cHandle) {
        let state = Arc::new(Mutex::new(I2cState {
            capability,
            ..Default::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockI2cHandle { state },
        )
    }

    fn state(&self) -> MutexGuard<'_, I2cState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl I2cOps for MockI2cBus {
    fn acquire(&self) -> Result<()> {
        let mut state = self.state();
        state.acquires += 1;
        if state.fail_acquire {
            return Err(HardwareError::bus("mock-i2c", "arbitration lost"));
        }
        Ok(())
    }

    fn release(&self) {
        self.state().releases += 1;
    }

    fn capability(&self) -> I2cCapability {
        self.state().capability
    }

    fn execute(
        &self,
        address: u16,
        operation: SmbusOperation,
        width: SmbusWidth,
        offset: u8,
        buffer: &mut SmbusBuffer,
        _flags: I2cFlags,
    ) -> Result<()> {
        let mut state = self.state();
        state.transactions.push(I2cTransaction {
            address,
            operation,
            width,
            offset,
        });
        if state.fail_transactions {
            return Err(HardwareError::bus(
                "mock-i2c",
                format!("NACK from {address:#04x}"),
            ));
        }

        let offset = match width {
            SmbusWidth::Byte => SMBUS_OFFSET_NON_CMD,
            _ => offset,
        };
        let registers = &mut state.registers;
        let get = |registers: &HashMap<(u16, u8), u8>, at: u8| {
            registers.get(&(address, at)).copied().unwrap_or(0)
        };

        match (operation, buffer) {
            (SmbusOperation::Read, SmbusBuffer::Byte(value)) => *value = get(registers, offset),
            (SmbusOperation::Write, SmbusBuffer::Byte(value)) => {
                registers.insert((address, offset), *value);
            }
            (SmbusOperation::Read, SmbusBuffer::Word(value)) => {
                let lo = get(registers, offset);
                let hi = get(registers, offset.wrapping_add(1));
                *value = u16::from_le_bytes([lo, hi]);
            }
            (SmbusOperation::Write, SmbusBuffer::Word(value)) => {
                let [lo, hi] = value.to_le_bytes();
                registers.insert((address, offset), lo);
                registers.insert((address, offset.wrapping_add(1)), hi);
            }
            (SmbusOperation::Read, SmbusBuffer::Block(data)) => {
                let mut at = offset;
                for slot in data.iter_mut() {
                    *slot = get(registers, at);
                    at = at.wrapping_add(1);
                }
            }
            (SmbusOperation::Write, SmbusBuffer::Block(data)) => {
                let mut at = offset;
                for value in data.iter() {
                    registers.insert((address, at), *value);
                    at = at.wrapping_add(1);
                }
            }
        }
        Ok(())
    }
}

/// Control handle of a [`MockI2cBus`].
#[derive(Debug, Clone)]
pub struct MockI2cHandle {
    state: Arc<Mutex<I2cState>>,
}

impl MockI2cHandle {
    fn state(&self) -> MutexGuard<'_, I2cState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_register(&self, address: u16, offset: u8, value: u8) {
        self.state().registers.insert((address, offset), value);
    }

    pub fn register(&self, address: u16, offset: u8) -> u8 {
        self.state()
            .registers
            .get(&(address, offset))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_capability(&self, capability: I2cCapability) {
        self.state().capability = capability;
    }

    /// Transactions that reached the bus driver, oldest first.
    pub fn transactions(&self) -> Vec<I2cTransaction> {
        self.state().transactions.clone()
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

    pub fn fail_transactions(&self, fail: bool) {
        self.state().fail_transactions = fail;
    }
}

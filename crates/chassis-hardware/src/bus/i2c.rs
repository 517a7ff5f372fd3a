use super::Bus;
use crate::{HardwareError, Result};
use chassis_core::constants::SMBUS_OFFSET_NON_CMD;
use chassis_core::{I2cCapability, I2cFlags, SmbusOperation, SmbusWidth};
use std::sync::MutexGuard;
use tracing::trace;

/// Data carried by one SMBus transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmbusBuffer {
    Byte(u8),
    Word(u16),
    Block(Vec<u8>),
}

impl SmbusBuffer {
    fn fits(&self, width: SmbusWidth) -> bool {
        matches!(
            (self, width),
            (Self::Byte(_), SmbusWidth::Byte | SmbusWidth::ByteData)
                | (Self::Word(_), SmbusWidth::WordData)
                | (Self::Block(_), SmbusWidth::BlockData)
        )
    }
}

/// Driver of an I2C bus segment.
///
/// `acquire` and `release` are hardware hooks (mux channel selection,
/// arbitration) run while the bus lock is held. The lock itself is managed by
/// [`I2cBus`].
pub trait I2cOps: Send + Sync {
    /// Bus bring-up.
    fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Hook run after the bus lock is taken.
    ///
    /// # Errors
    ///
    /// On failure the lock is dropped and `release` is not called.
    fn acquire(&self) -> Result<()> {
        Ok(())
    }

    /// Hook run before the bus lock is dropped.
    fn release(&self) {}

    /// Transactions this segment can execute.
    fn capability(&self) -> I2cCapability;

    /// Execute one transaction. Called with the bus lock held, after the
    /// capability and buffer checks passed.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Bus`] if the transaction fails on the wire.
    fn execute(
        &self,
        address: u16,
        operation: SmbusOperation,
        width: SmbusWidth,
        offset: u8,
        buffer: &mut SmbusBuffer,
        flags: I2cFlags,
    ) -> Result<()>;
}

/// I2C view of a [`Bus`].
#[derive(Clone, Copy)]
pub struct I2cBus<'a> {
    bus: &'a Bus,
    ops: &'a dyn I2cOps,
}

impl<'a> I2cBus<'a> {
    pub(super) fn new(bus: &'a Bus, ops: &'a dyn I2cOps) -> Self {
        Self { bus, ops }
    }

    pub fn name(&self) -> &'a str {
        self.bus.name()
    }

    pub fn capability(&self) -> I2cCapability {
        self.ops.capability()
    }

    /// Take the bus for a sequence of transactions.
    ///
    /// # Errors
    ///
    /// Returns the acquire hook's error; the bus is left unlocked.
    pub fn acquire(&self) -> Result<I2cGuard<'a>> {
        let lock = self.bus.lock();
        self.ops.acquire()?;
        trace!(bus = self.bus.name(), "i2c bus acquired");
        Ok(I2cGuard {
            bus: self.bus,
            ops: self.ops,
            _lock: lock,
        })
    }
}

/// Exclusive hold on an I2C bus. Releases the bus when dropped.
pub struct I2cGuard<'a> {
    bus: &'a Bus,
    ops: &'a dyn I2cOps,
    _lock: MutexGuard<'a, ()>,
}

impl I2cGuard<'_> {
    pub fn capability(&self) -> I2cCapability {
        self.ops.capability()
    }

    /// Execute one SMBus transaction.
    ///
    /// # Errors
    ///
    /// * [`HardwareError::NotSupported`] if the bus lacks the width or the
    ///   requested flags.
    /// * [`HardwareError::InvalidArgument`] if `buffer` does not match `width`.
    /// * Any error reported by the bus driver.
    pub fn execute(
        &self,
        address: u16,
        operation: SmbusOperation,
        width: SmbusWidth,
        offset: u8,
        buffer: &mut SmbusBuffer,
        flags: I2cFlags,
    ) -> Result<()> {
        let capability = self.ops.capability();
        if !capability.contains(width.required_capability(operation)) {
            return Err(HardwareError::not_supported(format!(
                "{width:?} {operation:?} on {}",
                self.bus.name()
            )));
        }
        if flags.contains(I2cFlags::PEC) && !capability.contains(I2cCapability::SMBUS_PEC) {
            return Err(HardwareError::not_supported(format!(
                "PEC on {}",
                self.bus.name()
            )));
        }
        if !buffer.fits(width) {
            return Err(HardwareError::invalid_argument(format!(
                "{buffer:?} does not fit a {width:?} transaction"
            )));
        }

        trace!(
            bus = self.bus.name(),
            address,
            ?operation,
            ?width,
            offset,
            "smbus transaction"
        );
        self.ops
            .execute(address, operation, width, offset, buffer, flags)
    }

    /// SMBus receive byte.
    pub fn recv_byte(&self, address: u16, flags: I2cFlags) -> Result<u8> {
        let mut buffer = SmbusBuffer::Byte(0);
        self.execute(
            address,
            SmbusOperation::Read,
            SmbusWidth::Byte,
            SMBUS_OFFSET_NON_CMD,
            &mut buffer,
            flags,
        )?;
        byte_of(buffer)
    }

    /// SMBus send byte.
    pub fn send_byte(&self, address: u16, value: u8, flags: I2cFlags) -> Result<()> {
        self.execute(
            address,
            SmbusOperation::Write,
            SmbusWidth::Byte,
            SMBUS_OFFSET_NON_CMD,
            &mut SmbusBuffer::Byte(value),
            flags,
        )
    }

    /// SMBus read byte data.
    pub fn read_byte(&self, address: u16, offset: u8, flags: I2cFlags) -> Result<u8> {
        let mut buffer = SmbusBuffer::Byte(0);
        self.execute(
            address,
            SmbusOperation::Read,
            SmbusWidth::ByteData,
            offset,
            &mut buffer,
            flags,
        )?;
        byte_of(buffer)
    }

    /// SMBus write byte data.
    pub fn write_byte(&self, address: u16, offset: u8, value: u8, flags: I2cFlags) -> Result<()> {
        self.execute(
            address,
            SmbusOperation::Write,
            SmbusWidth::ByteData,
            offset,
            &mut SmbusBuffer::Byte(value),
            flags,
        )
    }

    /// SMBus read word data.
    pub fn read_word(&self, address: u16, offset: u8, flags: I2cFlags) -> Result<u16> {
        let mut buffer = SmbusBuffer::Word(0);
        self.execute(
            address,
            SmbusOperation::Read,
            SmbusWidth::WordData,
            offset,
            &mut buffer,
            flags,
        )?;
        match buffer {
            SmbusBuffer::Word(value) => Ok(value),
            other => Err(HardwareError::invalid_argument(format!(
                "driver returned {other:?} for a word read"
            ))),
        }
    }

    /// SMBus write word data.
    pub fn write_word(&self, address: u16, offset: u8, value: u16, flags: I2cFlags) -> Result<()> {
        self.execute(
            address,
            SmbusOperation::Write,
            SmbusWidth::WordData,
            offset,
            &mut SmbusBuffer::Word(value),
            flags,
        )
    }

    /// Read consecutive registers starting at `offset`, one byte-data
    /// transaction each.
    pub fn read_multi_byte(
        &self,
        address: u16,
        offset: u8,
        data: &mut [u8],
        flags: I2cFlags,
    ) -> Result<()> {
        for (i, slot) in data.iter_mut().enumerate() {
            *slot = self.read_byte(address, offset_at(offset, i)?, flags)?;
        }
        Ok(())
    }

    /// Write consecutive registers starting at `offset`, one byte-data
    /// transaction each.
    pub fn write_multi_byte(
        &self,
        address: u16,
        offset: u8,
        data: &[u8],
        flags: I2cFlags,
    ) -> Result<()> {
        for (i, value) in data.iter().enumerate() {
            self.write_byte(address, offset_at(offset, i)?, *value, flags)?;
        }
        Ok(())
    }
}

impl Drop for I2cGuard<'_> {
    fn drop(&mut self) {
        self.ops.release();
        trace!(bus = self.bus.name(), "i2c bus released");
    }
}

fn byte_of(buffer: SmbusBuffer) -> Result<u8> {
    match buffer {
        SmbusBuffer::Byte(value) => Ok(value),
        other => Err(HardwareError::invalid_argument(format!(
            "driver returned {other:?} for a byte read"
        ))),
    }
}

fn offset_at(base: u8, index: usize) -> Result<u8> {
    u8::try_from(index)
        .ok()
        .and_then(|i| base.checked_add(i))
        .ok_or_else(|| {
            HardwareError::invalid_argument(format!("register range from {base:#04x} overflows"))
        })
}

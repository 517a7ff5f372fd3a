//! Simulated resource devices.
//!
//! Every mock device is a [`MockDevice`] over a per-type state struct. The
//! device implements the capability trait of its resource type; the paired
//! [`MockHandle`] reads and mutates the same state and injects failures.

use crate::bus::{Bus, Device};
use crate::capability::{
    DisplayControl, EntityInfoSource, FanControl, LedControl, MediaControl, MediaMonitor,
    MediaVendorInfo, PldControl, ResourceDriver, TemperatureSensor,
};
use crate::{HardwareError, Result};
use chassis_core::{EntityInfo, Threshold};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MockState<S> {
    data: S,
    probed: bool,
    init_seeds: Vec<u32>,
    calls: usize,
    fail_init: bool,
    fail_ops: bool,
}

/// A simulated device with state `S`.
pub struct MockDevice<S> {
    name: String,
    state: Arc<Mutex<MockState<S>>>,
}

impl<S: Default> MockDevice<S> {
    /// Create a device with default state.
    pub fn create(name: impl Into<String>) -> (Self, MockHandle<S>) {
        Self::with_state(name, S::default())
    }
}

impl<S> MockDevice<S> {
    pub fn with_state(name: impl Into<String>, data: S) -> (Self, MockHandle<S>) {
        let state = Arc::new(Mutex::new(MockState {
            data,
            probed: false,
            init_seeds: Vec::new(),
            calls: 0,
            fail_init: false,
            fail_ops: false,
        }));
        (
            Self {
                name: name.into(),
                state: Arc::clone(&state),
            },
            MockHandle { state },
        )
    }

    fn state(&self) -> MutexGuard<'_, MockState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a capability operation against the state.
    fn op<T>(&self, f: impl FnOnce(&mut S) -> Result<T>) -> Result<T> {
        let mut state = self.state();
        state.calls += 1;
        if state.fail_ops {
            return Err(HardwareError::bus(&self.name, "injected failure"));
        }
        f(&mut state.data)
    }
}

impl<S> fmt::Debug for MockDevice<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDevice").field("name", &self.name).finish()
    }
}

impl<S: Send> Device for MockDevice<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self, _bus: &Bus) -> Result<()> {
        self.state().probed = true;
        Ok(())
    }
}

impl<S: Send> ResourceDriver for MockDevice<S> {
    fn init(&self, seed: u32) -> Result<()> {
        let mut state = self.state();
        state.init_seeds.push(seed);
        if state.fail_init {
            return Err(HardwareError::bus(&self.name, "init failed"));
        }
        Ok(())
    }
}

/// Control handle of a [`MockDevice`].
pub struct MockHandle<S> {
    state: Arc<Mutex<MockState<S>>>,
}

impl<S> Clone for MockHandle<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S> fmt::Debug for MockHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockHandle").finish_non_exhaustive()
    }
}

impl<S> MockHandle<S> {
    fn state(&self) -> MutexGuard<'_, MockState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read or mutate the device state.
    pub fn with<T>(&self, f: impl FnOnce(&mut S) -> T) -> T {
        f(&mut self.state().data)
    }

    /// Whether the bus initialised the device.
    pub fn probed(&self) -> bool {
        self.state().probed
    }

    /// Seeds passed to resource init, oldest first.
    pub fn init_seeds(&self) -> Vec<u32> {
        self.state().init_seeds.clone()
    }

    pub fn init_count(&self) -> usize {
        self.state().init_seeds.len()
    }

    /// Capability operations that reached the device.
    pub fn calls(&self) -> usize {
        self.state().calls
    }

    pub fn fail_init(&self, fail: bool) {
        self.state().fail_init = fail;
    }

    pub fn fail_ops(&self, fail: bool) {
        self.state().fail_ops = fail;
    }
}

// ============================================================================
// Fan
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanState {
    pub speed: u32,
    pub fault: bool,
}

pub type MockFan = MockDevice<FanState>;
pub type MockFanHandle = MockHandle<FanState>;

impl FanControl for MockFan {
    fn speed_get(&self) -> Result<u32> {
        self.op(|s| Ok(s.speed))
    }

    fn speed_set(&self, rpm: u32) -> Result<()> {
        self.op(|s| {
            s.speed = rpm;
            Ok(())
        })
    }

    fn fault_get(&self) -> Result<bool> {
        self.op(|s| Ok(s.fault))
    }
}

// ============================================================================
// Entity info
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntityInfoState {
    pub info: EntityInfo,
}

pub type MockEntityInfo = MockDevice<EntityInfoState>;
pub type MockEntityInfoHandle = MockHandle<EntityInfoState>;

impl EntityInfoSource for MockEntityInfo {
    fn entity_info_read(&self) -> Result<EntityInfo> {
        self.op(|s| Ok(s.info.clone()))
    }
}

// ============================================================================
// LED and digit display
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LedState {
    pub on: bool,
}

pub type MockLed = MockDevice<LedState>;
pub type MockLedHandle = MockHandle<LedState>;

impl LedControl for MockLed {
    fn led_on(&self) -> Result<()> {
        self.op(|s| {
            s.on = true;
            Ok(())
        })
    }

    fn led_off(&self) -> Result<()> {
        self.op(|s| {
            s.on = false;
            Ok(())
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DisplayState {
    pub on: bool,
    pub text: String,
}

pub type MockDisplay = MockDevice<DisplayState>;
pub type MockDisplayHandle = MockHandle<DisplayState>;

impl DisplayControl for MockDisplay {
    fn display_on(&self) -> Result<()> {
        self.op(|s| {
            s.on = true;
            Ok(())
        })
    }

    fn display_off(&self) -> Result<()> {
        self.op(|s| {
            s.on = false;
            Ok(())
        })
    }

    fn display_set(&self, text: &str) -> Result<()> {
        self.op(|s| {
            s.text = text.to_string();
            Ok(())
        })
    }
}

// ============================================================================
// Thermal sensor
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ThermalState {
    pub temperature: i32,
    pub thresholds: HashMap<Threshold, i32>,
}

pub type MockThermal = MockDevice<ThermalState>;
pub type MockThermalHandle = MockHandle<ThermalState>;

impl TemperatureSensor for MockThermal {
    fn temperature_get(&self) -> Result<i32> {
        self.op(|s| Ok(s.temperature))
    }

    fn threshold_get(&self, threshold: Threshold) -> Result<i32> {
        self.op(|s| {
            s.thresholds
                .get(&threshold)
                .copied()
                .ok_or_else(|| HardwareError::not_found(format!("{threshold:?} threshold")))
        })
    }

    fn threshold_set(&self, threshold: Threshold, value: i32) -> Result<()> {
        self.op(|s| {
            s.thresholds.insert(threshold, value);
            Ok(())
        })
    }

    fn status_get(&self) -> Result<bool> {
        self.op(|s| {
            Ok(s
                .thresholds
                .get(&Threshold::High)
                .is_some_and(|high| s.temperature >= *high))
        })
    }
}

// ============================================================================
// Upgradable PLD
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PldState {
    pub version: u32,
}

pub type MockPld = MockDevice<PldState>;
pub type MockPldHandle = MockHandle<PldState>;

impl PldControl for MockPld {
    fn version_get(&self) -> Result<u32> {
        self.op(|s| Ok(s.version))
    }
}

// ============================================================================
// Optical media
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MediaState {
    pub present: bool,
    pub module_status: u32,
    pub channel_status: HashMap<u32, u32>,
    pub tx_disabled: HashSet<u32>,
    pub temperature: f64,
    pub voltage: f64,
    pub vendor_name: String,
    pub vendor_oui: String,
    pub part_number: String,
    pub serial_number: String,
    pub revision: String,
    pub eeprom: Vec<u8>,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            present: true,
            module_status: 0,
            channel_status: HashMap::new(),
            tx_disabled: HashSet::new(),
            temperature: 35.0,
            voltage: 3.3,
            vendor_name: "MOCK OPTICS".into(),
            vendor_oui: "00-00-00".into(),
            part_number: "QSFP-100G-SR4".into(),
            serial_number: "MK000001".into(),
            revision: "A0".into(),
            eeprom: vec![0; 256],
        }
    }
}

pub type MockMedia = MockDevice<MediaState>;
pub type MockMediaHandle = MockHandle<MediaState>;

fn eeprom_range(eeprom_len: usize, offset: u16, len: usize) -> Result<std::ops::Range<usize>> {
    let start = usize::from(offset);
    let end = start + len;
    if end > eeprom_len {
        return Err(HardwareError::invalid_argument(format!(
            "EEPROM range {start}..{end} exceeds {eeprom_len} bytes"
        )));
    }
    Ok(start..end)
}

impl MediaControl for MockMedia {
    fn presence_get(&self) -> Result<bool> {
        self.op(|s| Ok(s.present))
    }

    fn module_monitor_status_get(&self) -> Result<u32> {
        self.op(|s| Ok(s.module_status))
    }

    fn channel_status_get(&self, channel: u32) -> Result<u32> {
        self.op(|s| Ok(s.channel_status.get(&channel).copied().unwrap_or(0)))
    }

    fn tx_control(&self, channel: u32, enable: bool) -> Result<()> {
        self.op(|s| {
            if enable {
                s.tx_disabled.remove(&channel);
            } else {
                s.tx_disabled.insert(channel);
            }
            Ok(())
        })
    }

    fn tx_control_status_get(&self, channel: u32) -> Result<bool> {
        self.op(|s| Ok(!s.tx_disabled.contains(&channel)))
    }

    fn module_monitor_get(&self, monitor: MediaMonitor) -> Result<f64> {
        self.op(|s| {
            Ok(match monitor {
                MediaMonitor::Temperature => s.temperature,
                MediaMonitor::Voltage => s.voltage,
            })
        })
    }

    fn vendor_info_get(&self, field: MediaVendorInfo) -> Result<String> {
        self.op(|s| {
            Ok(match field {
                MediaVendorInfo::Name => s.vendor_name.clone(),
                MediaVendorInfo::Oui => s.vendor_oui.clone(),
                MediaVendorInfo::PartNumber => s.part_number.clone(),
                MediaVendorInfo::SerialNumber => s.serial_number.clone(),
                MediaVendorInfo::Revision => s.revision.clone(),
            })
        })
    }

    fn read(&self, offset: u16, data: &mut [u8]) -> Result<()> {
        self.op(|s| {
            let range = eeprom_range(s.eeprom.len(), offset, data.len())?;
            data.copy_from_slice(&s.eeprom[range]);
            Ok(())
        })
    }

    fn write(&self, offset: u16, data: &[u8]) -> Result<()> {
        self.op(|s| {
            let range = eeprom_range(s.eeprom.len(), offset, data.len())?;
            s.eeprom[range].copy_from_slice(data);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_shares_state() {
        let (fan, handle) = MockFan::create("fan_0");
        fan.speed_set(4200).unwrap();
        assert_eq!(handle.with(|s| s.speed), 4200);
        assert_eq!(handle.calls(), 1);
    }

    #[test]
    fn test_init_records_seed() {
        let (fan, handle) = MockFan::create("fan_0");
        ResourceDriver::init(&fan, 18000).unwrap();
        handle.fail_init(true);
        assert!(ResourceDriver::init(&fan, 0).is_err());
        assert_eq!(handle.init_seeds(), vec![18000, 0]);
    }

    #[test]
    fn test_thermal_status() {
        let (sensor, handle) = MockThermal::create("temp_0");
        handle.with(|s| s.temperature = 70);
        assert!(!sensor.status_get().unwrap());

        sensor.threshold_set(Threshold::High, 65).unwrap();
        assert!(sensor.status_get().unwrap());
        assert_eq!(sensor.threshold_get(Threshold::High).unwrap(), 65);
        assert!(sensor.threshold_get(Threshold::Low).is_err());
    }

    #[test]
    fn test_media_eeprom_bounds() {
        let (media, _handle) = MockMedia::create("qsfp_0");
        let mut out = [0u8; 4];
        assert!(media.read(254, &mut out).is_err());
        assert!(media.read(252, &mut out).is_ok());
    }
}

//! Entity lifecycle: init aggregation, reset and power sequencing, faults.

mod common;

use chassis_core::{EntityState, PinLevel, ResetType};
use chassis_hardware::HardwareError;
use common::{
    LINE_REGISTER, MUX_ADDRESS, POWER_BIT, PRESENCE_BIT, PSU_SETTLE_DELAY, RESET_REGISTER,
    chassis,
};
use rstest::rstest;
use std::time::Instant;

#[test]
fn test_init_continues_past_failed_resource() {
    let chassis = chassis();
    chassis.insert_fan_tray();
    let fan_1 = chassis.bench.fan("fan_1").unwrap();
    fan_1.fail_init(true);

    let err = chassis.platform.entity_init(chassis.fan_tray()).unwrap_err();
    assert!(matches!(
        err,
        HardwareError::PartialInit {
            failed: 1,
            total: 3
        }
    ));

    // resources before and after the failing one were still initialised
    assert_eq!(chassis.bench.fan("fan_0").unwrap().init_count(), 1);
    assert_eq!(fan_1.init_count(), 1);
    assert_eq!(chassis.bench.entity_info("ft_eeprom").unwrap().init_count(), 1);
    assert_eq!(
        chassis.platform.entity_state(chassis.fan_tray()).unwrap(),
        EntityState::NotInitialized
    );
}

#[test]
fn test_failed_info_read_keeps_cache() {
    let chassis = chassis();
    chassis.insert_fan_tray();
    let tray = chassis.fan_tray();
    chassis.platform.entity_init(tray).unwrap();

    let eeprom = chassis.bench.entity_info("ft_eeprom").unwrap();
    eeprom.fail_ops(true);
    chassis.platform.entity_init(tray).unwrap();

    assert_eq!(
        chassis.platform.entity_info(tray).unwrap().product_name,
        "FAN-TRAY-F2B"
    );
}

#[test]
fn test_reset_without_feature_touches_nothing() {
    let chassis = chassis();
    let i2c = chassis.i2c();
    let before = i2c.transactions().len();

    let err = chassis
        .platform
        .entity_reset(chassis.fan_tray(), ResetType::Warm)
        .unwrap_err();
    assert!(err.is_not_supported());
    assert_eq!(i2c.transactions().len(), before);
    assert_eq!(i2c.acquire_count(), i2c.release_count());
}

#[test]
fn test_reset_without_group_is_invalid() {
    let chassis = chassis();
    let err = chassis
        .platform
        .entity_reset(chassis.psu_tray(), ResetType::Warm)
        .unwrap_err();
    assert!(matches!(err, HardwareError::InvalidArgument { .. }));
}

#[rstest]
#[case::next_index(2)]
#[case::seven(7)]
#[case::max(u32::MAX)]
fn test_unknown_reset_index(#[case] raw: u32) {
    let chassis = chassis();
    let group = chassis.bench.pin_group("psu_reset").unwrap();
    let err = chassis
        .platform
        .entity_reset_raw(chassis.psu_tray(), raw)
        .unwrap_err();
    assert!(err.is_not_supported());
    assert_eq!(group.acquire_count(), 0);
}

#[test]
fn test_cold_reset_writes_group_and_reinitialises() {
    let chassis = chassis();
    chassis.insert_fan_tray();
    let i2c = chassis.i2c();
    i2c.set_register(MUX_ADDRESS, RESET_REGISTER, 0b1000_0001);
    let tray = chassis.fan_tray();

    chassis.platform.entity_reset(tray, ResetType::Cold).unwrap();

    assert_eq!(i2c.register(MUX_ADDRESS, RESET_REGISTER), 0b1000_1101);
    assert_eq!(chassis.platform.entity_state(tray).unwrap(), EntityState::Initialized);
    assert_eq!(chassis.bench.fan("fan_0").unwrap().init_count(), 1);
}

#[test]
fn test_reset_of_absent_tray_leaves_it_uninitialised() {
    let chassis = chassis();
    let tray = chassis.fan_tray();

    chassis.platform.entity_reset(tray, ResetType::Cold).unwrap();
    assert_eq!(
        chassis.platform.entity_state(tray).unwrap(),
        EntityState::NotInitialized
    );
}

#[test]
fn test_failed_reset_write_releases_once() {
    let chassis = chassis();
    let group = chassis.bench.pin_group("psu_reset").unwrap();
    group.fail_writes(true);
    let psu = chassis.psu_tray();

    let err = chassis.platform.entity_reset(psu, ResetType::Cold).unwrap_err();
    assert!(matches!(err, HardwareError::Bus { .. }));
    assert_eq!(group.acquire_count(), 1);
    assert_eq!(group.release_count(), 1);
    assert!(group.writes().is_empty());
    // no re-initialisation after a failed reset
    assert_eq!(chassis.bench.fan("psu_fan").unwrap().init_count(), 0);
}

#[test]
fn test_raw_reset_index_maps_to_type() {
    let chassis = chassis();
    let psu = chassis.psu_tray();
    chassis.platform.entity_reset_raw(psu, 1).unwrap();

    assert_eq!(chassis.bench.pin_group("psu_reset").unwrap().writes(), vec![0x2]);
}

#[test]
fn test_power_cycle() {
    let chassis = chassis();
    chassis.insert_fan_tray();
    let i2c = chassis.i2c();
    let tray = chassis.fan_tray();
    chassis.platform.entity_init(tray).unwrap();

    chassis.platform.entity_power_status_control(tray, false).unwrap();
    assert_eq!(i2c.register(MUX_ADDRESS, LINE_REGISTER), PRESENCE_BIT);
    assert_eq!(
        chassis.platform.entity_state(tray).unwrap(),
        EntityState::NotInitialized
    );

    chassis.platform.entity_power_status_control(tray, true).unwrap();
    assert_eq!(
        i2c.register(MUX_ADDRESS, LINE_REGISTER),
        PRESENCE_BIT | POWER_BIT
    );
    assert_eq!(chassis.platform.entity_state(tray).unwrap(), EntityState::Initialized);
    assert_eq!(chassis.bench.fan("fan_0").unwrap().init_count(), 2);
}

#[test]
fn test_power_control_requires_feature() {
    let chassis = chassis();
    let err = chassis
        .platform
        .entity_power_status_control(chassis.system_board(), true)
        .unwrap_err();
    assert!(err.is_not_supported());
}

#[test]
fn test_fan_fault_aggregation() {
    let chassis = chassis();
    let tray = chassis.fan_tray();

    let err = chassis.platform.fault_status_get(tray).unwrap_err();
    assert!(matches!(err, HardwareError::NotPresent { .. }));

    chassis.insert_fan_tray();
    assert!(!chassis.platform.fault_status_get(tray).unwrap());

    chassis.bench.fan("fan_0").unwrap().fail_ops(true);
    chassis.bench.fan("fan_1").unwrap().with(|fan| fan.fault = true);
    assert!(chassis.platform.fault_status_get(tray).unwrap());
}

#[test]
fn test_fault_pin_overrides_fan_aggregation() {
    let chassis = chassis();
    let psu = chassis.psu_tray();
    let fault_pin = chassis.bench.pin("psu_fault").unwrap();
    chassis.bench.fan("psu_fan").unwrap().with(|fan| fan.fault = true);

    // the fault pin is read even when the tray is absent
    chassis.bench.pin("psu_prs").unwrap().set_level(PinLevel::Low);
    assert!(!chassis.platform.presence_get(psu).unwrap());
    assert!(!chassis.platform.fault_status_get(psu).unwrap());
    fault_pin.set_level(PinLevel::High);
    assert!(chassis.platform.fault_status_get(psu).unwrap());

    // a faulty fan is not consulted while the pin reads low
    chassis.bench.pin("psu_prs").unwrap().set_level(PinLevel::High);
    fault_pin.set_level(PinLevel::Low);
    assert!(!chassis.platform.fault_status_get(psu).unwrap());
    assert_eq!(chassis.bench.fan("psu_fan").unwrap().calls(), 0);
}

#[test]
fn test_reset_waits_settle_delay_before_reinit() {
    let chassis = chassis();
    let psu = chassis.psu_tray();
    let group = chassis.bench.pin_group("psu_reset").unwrap();
    let fan = chassis.bench.fan("psu_fan").unwrap();

    let started = Instant::now();
    chassis.platform.entity_reset(psu, ResetType::Cold).unwrap();

    assert!(started.elapsed() >= PSU_SETTLE_DELAY);
    assert_eq!(group.writes(), vec![0x2]);
    assert_eq!(group.acquire_count(), 1);
    assert_eq!(group.release_count(), 1);
    assert_eq!(fan.init_count(), 1);
    assert_eq!(chassis.platform.entity_state(psu).unwrap(), EntityState::Initialized);
}

#[test]
fn test_presence_read_error_propagates() {
    let chassis = chassis();
    chassis.i2c().fail_transactions(true);

    let err = chassis.platform.presence_get(chassis.fan_tray()).unwrap_err();
    assert!(matches!(err, HardwareError::Bus { .. }));
    let err = chassis.platform.entity_init(chassis.fan_tray()).unwrap_err();
    assert!(matches!(err, HardwareError::Bus { .. }));
}

#[test]
fn test_init_fixed_entities_skips_hotswap() {
    let chassis = chassis();
    chassis.platform.init_fixed_entities().unwrap();

    assert_eq!(
        chassis.platform.entity_state(chassis.system_board()).unwrap(),
        EntityState::Initialized
    );
    assert_eq!(
        chassis.platform.entity_state(chassis.psu_tray()).unwrap(),
        EntityState::NotInitialized
    );
}

#[test]
fn test_removal_after_init() {
    let chassis = chassis();
    chassis.insert_fan_tray();
    let tray = chassis.fan_tray();
    chassis.platform.entity_init(tray).unwrap();

    chassis.remove_fan_tray();
    assert!(!chassis.platform.presence_get(tray).unwrap());
    assert!(matches!(
        chassis.platform.entity_init(tray).unwrap_err(),
        HardwareError::PermissionDenied { .. }
    ));
}

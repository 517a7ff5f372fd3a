//! Shared-platform access from several threads.

mod common;

use chassis_core::{I2cFlags, PinLevel};
use common::{LED_BIT, LINE_REGISTER, MUX_ADDRESS, POWER_BIT, PRESENCE_BIT, chassis};
use std::thread;

const ROUNDS: usize = 200;

#[test]
fn test_read_modify_write_is_atomic_per_bus() {
    let chassis = chassis();
    chassis.insert_fan_tray();
    let buses = chassis.platform.buses();

    thread::scope(|scope| {
        for (line, last) in [("ft_pwr", PinLevel::High), ("ft_led_n", PinLevel::Low)] {
            scope.spawn(move || {
                let pin = buses.find_by_name(line).unwrap().as_pin().unwrap();
                for round in 0..ROUNDS {
                    let level = if round % 2 == 0 { PinLevel::High } else { PinLevel::Low };
                    pin.write_level(level).unwrap();
                }
                pin.write_level(last).unwrap();
            });
        }
    });

    // ft_led_n is inverted: logical low drives the bit high
    assert_eq!(
        chassis.i2c().register(MUX_ADDRESS, LINE_REGISTER),
        PRESENCE_BIT | POWER_BIT | LED_BIT
    );
    let i2c = chassis.i2c();
    assert_eq!(i2c.acquire_count(), i2c.release_count());
}

#[test]
fn test_guard_serialises_transactions() {
    let chassis = chassis();
    let bus = chassis.platform.buses().find_by_name("i2c-3").unwrap();

    thread::scope(|scope| {
        for value in [0x11u8, 0x22, 0x33, 0x44] {
            scope.spawn(move || {
                let i2c = bus.as_i2c().unwrap();
                for _ in 0..ROUNDS {
                    let guard = i2c.acquire().unwrap();
                    guard.write_byte(0x50, 0x10, value, I2cFlags::empty()).unwrap();
                    assert_eq!(
                        guard.read_byte(0x50, 0x10, I2cFlags::empty()).unwrap(),
                        value
                    );
                }
            });
        }
    });
}

#[test]
fn test_concurrent_entity_operations() {
    let chassis = chassis();
    chassis.insert_fan_tray();
    let platform = &chassis.platform;
    let (board, tray, psu) = (chassis.system_board(), chassis.fan_tray(), chassis.psu_tray());

    thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..ROUNDS {
                platform.entity_init(board).unwrap();
            }
        });
        scope.spawn(|| {
            for _ in 0..ROUNDS {
                assert!(platform.presence_get(tray).unwrap());
                assert!(!platform.fault_status_get(tray).unwrap());
            }
        });
        scope.spawn(|| {
            for _ in 0..ROUNDS {
                assert!(!platform.psu_output_power_status_get(psu).unwrap());
            }
        });
    });

    assert_eq!(
        chassis.bench.led("sys_led").unwrap().init_count(),
        ROUNDS
    );
}

//! Relay driver against a simulated pair of cascaded 74HC595s.

use liquidvend::app::commands::{DISABLE_ALL_TARGET, PUMP_OUTPUTS, PumpSelect};
use liquidvend::app::ports::PumpPort;

use crate::mock_hw::relay_chain;

#[test]
fn init_latches_all_off_before_enabling_outputs() {
    let (mut pumps, chain) = relay_chain();
    assert!(chain.borrow().oe_high, "outputs start disabled");

    pumps.init();

    let s = chain.borrow();
    assert!(!s.oe_high);
    assert_eq!(s.enabled_with, Some(0xFFFF));
    assert!(s.active_lines().is_empty());
    assert!(pumps.is_enabled());
    assert_eq!(pumps.pin_errors(), 0);
}

#[test]
fn each_target_energises_exactly_its_line() {
    let (mut pumps, chain) = relay_chain();
    pumps.init();

    for target in 1..=PUMP_OUTPUTS {
        pumps.activate(target);
        assert_eq!(chain.borrow().active_lines(), vec![target]);
        assert_eq!(pumps.active().line(), Some(target));
    }
}

#[test]
fn sentinel_and_out_of_range_targets_switch_everything_off() {
    let (mut pumps, chain) = relay_chain();
    pumps.init();

    for target in [DISABLE_ALL_TARGET, 0, 200] {
        pumps.activate(5);
        assert_eq!(chain.borrow().active_lines(), vec![5]);
        pumps.activate(target);
        assert!(chain.borrow().active_lines().is_empty(), "target {}", target);
        assert_eq!(pumps.active(), PumpSelect::Off);
    }
}

#[test]
fn every_write_is_latched_once() {
    let (mut pumps, chain) = relay_chain();
    pumps.init();
    let after_init = chain.borrow().latches;
    assert_eq!(after_init, 1);

    pumps.set_pump(PumpSelect::for_product(9));
    pumps.set_pump(PumpSelect::Off);

    let s = chain.borrow();
    assert_eq!(s.latches, 3);
    assert!(s.active_lines().is_empty());
}

#[test]
fn product_index_maps_to_one_based_line() {
    let (mut pumps, chain) = relay_chain();
    pumps.init();

    pumps.set_pump(PumpSelect::for_product(9));
    assert_eq!(chain.borrow().active_lines(), vec![10]);
}

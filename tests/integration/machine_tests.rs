//! Integration tests for the keypad → VendingMachine → pumps pipeline.
//!
//! The catalog is loaded the way the firmware does it: configuration names
//! plus a product image provisioned into the simulated NVS backend.

use liquidvend::adapters::nvs::NvsAdapter;
use liquidvend::app::commands::PumpSelect;
use liquidvend::app::events::{AppEvent, SaleRecord};
use liquidvend::app::ports::CoinCounterPort;
use liquidvend::app::service::VendingMachine;
use liquidvend::coin::CoinSampler;
use liquidvend::config::{Language, MachineConfig, ProductDef};
use liquidvend::credit::CreditState;
use liquidvend::fsm::{Rejection, StateId};
use liquidvend::storage::ProductStore;

use crate::mock_hw::{Call, MockMachine, RecordingSink, Scan, leak_credit};

/// A: price 8, 2 s.  B: out of stock.  C: price 5, 0.5 s.  Rest unset.
fn stocked(language: Language) -> MachineConfig {
    let mut config = MachineConfig::for_language(language);
    stock(&mut config.products[0], 8, true, 20);
    stock(&mut config.products[1], 3, false, 10);
    stock(&mut config.products[2], 5, true, 5);
    config
}

fn stock(product: &mut ProductDef, price: u8, available: bool, unit_dispense_time: u8) {
    product.price = price;
    product.available = available;
    product.unit_dispense_time = unit_dispense_time;
}

fn provisioned(config: &MachineConfig) -> NvsAdapter {
    let mut nvs = NvsAdapter::new().unwrap();
    ProductStore::provision(&mut nvs, config).unwrap();
    nvs
}

fn boot<'a>(
    config: &MachineConfig,
    nvs: &NvsAdapter,
    credit: &'a CreditState,
    hw: &mut MockMachine,
    sink: &mut RecordingSink,
) -> VendingMachine<'a> {
    let catalog = ProductStore::load(nvs, config).unwrap();
    let mut machine = VendingMachine::new(config, catalog, credit);
    machine.start(hw, sink);
    machine
}

fn steps(machine: &mut VendingMachine<'_>, hw: &mut MockMachine, sink: &mut RecordingSink, n: usize) {
    for _ in 0..n {
        machine.step(hw, sink);
    }
}

// ── Purchase ──────────────────────────────────────────────────

#[test]
fn purchase_deducts_price_and_runs_one_pump_for_its_time() {
    let config = stocked(Language::English);
    let nvs = provisioned(&config);
    let credit = leak_credit();
    credit.add(10);
    let (mut hw, mut sink) = (MockMachine::new(credit), RecordingSink::new());
    hw.press('A');

    let mut m = boot(&config, &nvs, credit, &mut hw, &mut sink);
    assert_eq!(m.step(&mut hw, &mut sink), StateId::Validating);
    assert_eq!(m.step(&mut hw, &mut sink), StateId::Accepted);
    assert_eq!(m.step(&mut hw, &mut sink), StateId::Dispensing);
    assert_eq!(m.step(&mut hw, &mut sink), StateId::Cooldown);
    assert_eq!(m.step(&mut hw, &mut sink), StateId::AwaitingSelection);

    assert_eq!(credit.balance(), 2);
    assert_eq!(hw.pump_calls(), vec![PumpSelect::from_target(1), PumpSelect::Off]);

    // Line 1 stays on for exactly 20 × 100 ms and nothing else happens
    // in between.
    let on = hw.position(Call::Pump(PumpSelect::from_target(1))).unwrap();
    assert_eq!(hw.calls[on + 1], Call::Wait(2000));
    assert_eq!(hw.calls[on + 2], Call::Pump(PumpSelect::Off));

    assert!(sink.events.contains(&AppEvent::Sale(SaleRecord {
        product: 0,
        price: 8,
        remaining_credit: 2,
    })));
    assert!(hw.saw_screen("Lemon", "selected"));
    assert_eq!(hw.screen(), ("Thanks for".into(), "buying".into()));
}

#[test]
fn coin_sampling_is_off_while_the_pump_runs() {
    let config = stocked(Language::English);
    let nvs = provisioned(&config);
    let credit = leak_credit();
    credit.add(5);
    let (mut hw, mut sink) = (MockMachine::new(credit), RecordingSink::new());
    hw.press('C');

    let mut m = boot(&config, &nvs, credit, &mut hw, &mut sink);
    steps(&mut m, &mut hw, &mut sink, 5);

    let suspended = hw.position(Call::Sampling(false)).unwrap();
    let on = hw.position(Call::Pump(PumpSelect::from_target(3))).unwrap();
    let off = hw.position(Call::Pump(PumpSelect::Off)).unwrap();
    assert!(suspended < on && on < off);
    assert_eq!(hw.calls[on + 1], Call::Wait(500));
    // Only re-enabled on the next prompt.
    assert!(!hw.calls[suspended..].contains(&Call::Sampling(true)));
    assert_eq!(credit.balance(), 0, "exact credit is enough");
}

#[test]
fn sales_counters_are_not_written_back() {
    let config = stocked(Language::English);
    let nvs = provisioned(&config);
    let before = (
        ProductStore::read_sales(&nvs, 0).unwrap(),
        ProductStore::read_total_sales(&nvs).unwrap(),
    );
    let credit = leak_credit();
    credit.add(8);
    let (mut hw, mut sink) = (MockMachine::new(credit), RecordingSink::new());
    hw.press('A');

    let mut m = boot(&config, &nvs, credit, &mut hw, &mut sink);
    steps(&mut m, &mut hw, &mut sink, 5);

    assert_eq!(m.sales_since_boot(), 1);
    let after = (
        ProductStore::read_sales(&nvs, 0).unwrap(),
        ProductStore::read_total_sales(&nvs).unwrap(),
    );
    assert_eq!(before, after);
}

/// Counter outputs replayed tick by tick; a reset pulse clears it.
struct CounterReplay {
    readings: Vec<u8>,
    resets: usize,
}

impl CoinCounterPort for CounterReplay {
    fn read_raw(&mut self) -> u8 {
        if self.readings.is_empty() { 0 } else { self.readings.remove(0) }
    }

    fn pulse_reset(&mut self) {
        self.resets += 1;
    }
}

#[test]
fn two_coins_of_five_buy_a_product_of_eight() {
    let config = stocked(Language::English);
    let nvs = provisioned(&config);
    let credit = leak_credit();

    // Each coin is seen on two consecutive ticks before it counts; the
    // lone 3 is ripple noise.
    let counter = CounterReplay { readings: vec![5, 5, 0, 3, 5, 5], resets: 0 };
    let mut sampler = CoinSampler::new(counter, credit);
    let credited: Vec<u8> = (0..6).filter_map(|_| sampler.tick()).collect();
    assert_eq!(credited, vec![5, 5]);
    assert_eq!(sampler.counter().resets, 2);
    assert_eq!(credit.balance(), 10);

    let (mut hw, mut sink) = (MockMachine::new(credit), RecordingSink::new());
    hw.press('A');
    let mut m = boot(&config, &nvs, credit, &mut hw, &mut sink);
    steps(&mut m, &mut hw, &mut sink, 5);

    assert_eq!(credit.balance(), 2);
    let on = hw.position(Call::Pump(PumpSelect::from_target(1))).unwrap();
    assert_eq!(
        &hw.calls[on..on + 3],
        &[
            Call::Pump(PumpSelect::from_target(1)),
            Call::Wait(2000),
            Call::Pump(PumpSelect::Off)
        ]
    );
    assert_eq!(hw.screen(), ("Thanks for".into(), "buying".into()));
    assert_eq!(m.state(), StateId::AwaitingSelection);
}

// ── Credit display ────────────────────────────────────────────

#[test]
fn prompt_shows_credit_and_refreshes_while_waiting() {
    let config = stocked(Language::English);
    let nvs = provisioned(&config);
    let credit = leak_credit();
    credit.add(2);
    let (mut hw, mut sink) = (MockMachine::new(credit), RecordingSink::new());
    hw.script(&[Scan::Idle, Scan::Coins(3), Scan::Idle]);
    hw.press('C');

    let mut m = boot(&config, &nvs, credit, &mut hw, &mut sink);
    assert_eq!(m.step(&mut hw, &mut sink), StateId::Validating);

    assert_eq!(hw.screen(), ("Insert coins:".into(), "$5".into()));
    assert_eq!(m.step(&mut hw, &mut sink), StateId::Accepted);
}

#[test]
fn next_prompt_shows_remaining_credit() {
    let config = stocked(Language::English);
    let nvs = provisioned(&config);
    let credit = leak_credit();
    credit.add(10);
    let (mut hw, mut sink) = (MockMachine::new(credit), RecordingSink::new());
    hw.press('C');

    let mut m = boot(&config, &nvs, credit, &mut hw, &mut sink);
    steps(&mut m, &mut hw, &mut sink, 5);
    assert_eq!(credit.balance(), 5);

    hw.press('B');
    m.step(&mut hw, &mut sink);
    assert_eq!(hw.screen(), ("Insert coins:".into(), "$5".into()));
}

// ── Rejections ────────────────────────────────────────────────

#[test]
fn unavailable_product_is_refused_and_credit_kept() {
    let config = stocked(Language::English);
    let nvs = provisioned(&config);
    let credit = leak_credit();
    credit.add(10);
    let (mut hw, mut sink) = (MockMachine::new(credit), RecordingSink::new());
    hw.press('B');

    let mut m = boot(&config, &nvs, credit, &mut hw, &mut sink);
    assert_eq!(m.step(&mut hw, &mut sink), StateId::Validating);
    assert_eq!(m.step(&mut hw, &mut sink), StateId::Rejected);
    assert_eq!(m.step(&mut hw, &mut sink), StateId::AwaitingSelection);

    assert_eq!(credit.balance(), 10);
    assert!(hw.pump_calls().is_empty());
    assert_eq!(hw.screen(), ("Product not".into(), "available".into()));
    assert_eq!(hw.calls.last(), Some(&Call::Wait(1500)));
    assert!(sink.events.contains(&AppEvent::SelectionRejected {
        product: 1,
        reason: Rejection::NotAvailable,
        credit: 10,
    }));
}

#[test]
fn short_credit_is_refused_until_topped_up() {
    let config = stocked(Language::English);
    let nvs = provisioned(&config);
    let credit = leak_credit();
    credit.add(3);
    let (mut hw, mut sink) = (MockMachine::new(credit), RecordingSink::new());
    hw.press('A');
    hw.script(&[Scan::Coins(5)]);
    hw.press('A');

    let mut m = boot(&config, &nvs, credit, &mut hw, &mut sink);
    steps(&mut m, &mut hw, &mut sink, 3);
    assert_eq!(m.state(), StateId::AwaitingSelection);
    assert_eq!(credit.balance(), 3);
    assert!(hw.saw_screen("Insufficient", "credit"));
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::SelectionRejected {
            reason: Rejection::InsufficientCredit,
            credit: 3,
            ..
        }
    )));

    steps(&mut m, &mut hw, &mut sink, 5);
    assert_eq!(m.state(), StateId::AwaitingSelection);
    assert_eq!(credit.balance(), 0);
    assert_eq!(hw.pump_calls(), vec![PumpSelect::from_target(1), PumpSelect::Off]);
}

#[test]
fn unprovisioned_product_cannot_be_bought() {
    let config = stocked(Language::English);
    let nvs = provisioned(&config);
    let credit = leak_credit();
    credit.add(50);
    let (mut hw, mut sink) = (MockMachine::new(credit), RecordingSink::new());
    hw.press('J');

    let mut m = boot(&config, &nvs, credit, &mut hw, &mut sink);
    steps(&mut m, &mut hw, &mut sink, 2);
    assert_eq!(m.state(), StateId::Rejected);
    assert_eq!(credit.balance(), 50);
}

#[test]
fn key_without_a_product_goes_back_to_the_prompt() {
    let mut config = stocked(Language::English);
    config.products.truncate(3);
    let nvs = provisioned(&config);
    let credit = leak_credit();
    let (mut hw, mut sink) = (MockMachine::new(credit), RecordingSink::new());
    hw.press('E');

    let mut m = boot(&config, &nvs, credit, &mut hw, &mut sink);
    assert_eq!(m.step(&mut hw, &mut sink), StateId::Validating);
    assert_eq!(m.step(&mut hw, &mut sink), StateId::AwaitingSelection);
    assert!(
        !sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::SelectionRejected { .. }))
    );
}

// ── Keypad ────────────────────────────────────────────────────

#[test]
fn bouncing_key_is_not_accepted() {
    let config = stocked(Language::English);
    let nvs = provisioned(&config);
    let credit = leak_credit();
    let (mut hw, mut sink) = (MockMachine::new(credit), RecordingSink::new());
    hw.script(&[Scan::Key('A'), Scan::Idle, Scan::Key('A'), Scan::Key('B')]);
    hw.press('C');

    let mut m = boot(&config, &nvs, credit, &mut hw, &mut sink);
    m.step(&mut hw, &mut sink);

    let keys: Vec<char> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::KeyAccepted(k) => Some(*k),
            _ => None,
        })
        .collect();
    assert_eq!(keys, vec!['C']);
    assert_eq!(hw.scans, 6);
}

#[test]
fn idle_keypad_yields_between_scans() {
    let config = stocked(Language::English);
    let nvs = provisioned(&config);
    let credit = leak_credit();
    let (mut hw, mut sink) = (MockMachine::new(credit), RecordingSink::new());
    hw.script(&[Scan::Idle; 200]);
    hw.press('C');

    let mut m = boot(&config, &nvs, credit, &mut hw, &mut sink);
    assert_eq!(m.step(&mut hw, &mut sink), StateId::Validating);

    let idle = Call::Wait(config.timing.key_idle_scan_ms);
    assert_eq!(hw.calls.iter().filter(|&&c| c == idle).count(), 200);
    assert_eq!(hw.calls.last(), Some(&Call::Wait(config.timing.key_settle_ms)));
}

// ── Language ──────────────────────────────────────────────────

#[test]
fn spanish_machine_speaks_spanish() {
    let config = stocked(Language::Spanish);
    let nvs = provisioned(&config);
    let credit = leak_credit();
    credit.add(8);
    let (mut hw, mut sink) = (MockMachine::new(credit), RecordingSink::new());
    hw.press('A');

    let mut m = boot(&config, &nvs, credit, &mut hw, &mut sink);
    steps(&mut m, &mut hw, &mut sink, 5);

    assert!(hw.saw_screen("Iniciando", "maquina"));
    assert!(hw.saw_screen("Inserte dinero:", "$8"));
    assert!(hw.saw_screen("Cloro", "seleccionado"));
    assert!(hw.saw_screen("Llenando", "producto"));
    assert_eq!(hw.screen(), ("Vuelva".into(), "pronto".into()));
}

// ── State machine ─────────────────────────────────────────────

#[test]
fn every_reported_transition_is_legal() {
    let config = stocked(Language::English);
    let nvs = provisioned(&config);
    let credit = leak_credit();
    credit.add(4);
    let (mut hw, mut sink) = (MockMachine::new(credit), RecordingSink::new());
    hw.press('B');
    hw.press('A');
    hw.script(&[Scan::Coins(4)]);
    hw.press('A');

    let mut m = boot(&config, &nvs, credit, &mut hw, &mut sink);
    steps(&mut m, &mut hw, &mut sink, 11);

    let transitions = sink.transitions();
    assert_eq!(transitions.len(), 11);
    for (from, to) in transitions {
        assert!(from.can_transition_to(to), "{} -> {}", from, to);
    }
    assert_eq!(m.state(), StateId::AwaitingSelection);
    assert_eq!(credit.balance(), 0);
}

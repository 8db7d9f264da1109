//! Mock hardware for integration tests.
//!
//! [`MockMachine`] plays the keypad from a script and records every pump,
//! sampling and delay call in one ordered log, so tests can assert on the
//! full command history without touching real GPIO.  The screen is the
//! crate's own [`LogDisplay`], snapshotted on every clear.
//!
//! [`relay_chain`] builds the real shift-register driver on top of a
//! simulated pair of cascaded 74HC595s.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use liquidvend::adapters::display::LogDisplay;
use liquidvend::app::commands::{PUMP_OUTPUTS, PumpSelect};
use liquidvend::app::events::AppEvent;
use liquidvend::app::ports::{
    CoinSamplingPort, DisplayPort, EventSink, KeypadMatrixPort, PumpPort,
};
use liquidvend::credit::CreditState;
use liquidvend::drivers::shift_register::ShiftRegisterPumps;
use liquidvend::keypad::{Key, position_of};

/// A credit state that outlives the test, as the firmware's static does.
pub fn leak_credit() -> &'static CreditState {
    Box::leak(Box::new(CreditState::new()))
}

// ── Keypad script ─────────────────────────────────────────────

/// What the keypad shows on one scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scan {
    /// No contact closed.
    Idle,
    /// This key held down for the whole scan.
    Key(char),
    /// Coins credited just before the scan; does not consume a scan.
    Coins(u16),
}

/// Everything the machine did, in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Call {
    Pump(PumpSelect),
    Sampling(bool),
    Wait(u32),
}

// ── MockMachine ───────────────────────────────────────────────

pub struct MockMachine {
    credit: &'static CreditState,
    script: VecDeque<Scan>,
    pressed: Option<Key>,
    driven: Option<usize>,
    pub scans: usize,
    pub calls: Vec<Call>,
    pub display: LogDisplay,
    pub screens: Vec<(String, String)>,
}

#[allow(dead_code)]
impl MockMachine {
    pub fn new(credit: &'static CreditState) -> Self {
        Self {
            credit,
            script: VecDeque::new(),
            pressed: None,
            driven: None,
            scans: 0,
            calls: Vec::new(),
            display: LogDisplay::new(),
            screens: Vec::new(),
        }
    }

    /// Append scans to the script.
    pub fn script(&mut self, scans: &[Scan]) {
        self.script.extend(scans.iter().copied());
    }

    /// A clean press: two identical scans, enough for one debounce.
    pub fn press(&mut self, key: char) {
        self.script(&[Scan::Key(key), Scan::Key(key)]);
    }

    /// What is on the screen right now.
    pub fn screen(&self) -> (String, String) {
        (
            self.display.line(0).as_str().to_owned(),
            self.display.line(1).as_str().to_owned(),
        )
    }

    /// Every screen shown so far, including the current one.
    pub fn all_screens(&self) -> Vec<(String, String)> {
        let mut all = self.screens.clone();
        all.push(self.screen());
        all
    }

    pub fn saw_screen(&self, top: &str, bottom: &str) -> bool {
        self.all_screens()
            .iter()
            .any(|(t, b)| t == top && b == bottom)
    }

    pub fn pump_calls(&self) -> Vec<PumpSelect> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Pump(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, call: Call) -> Option<usize> {
        self.calls.iter().position(|&c| c == call)
    }

    fn next_scan(&mut self) {
        self.scans += 1;
        loop {
            match self.script.pop_front() {
                Some(Scan::Coins(amount)) => {
                    self.credit.add(amount);
                }
                Some(Scan::Idle) => {
                    self.pressed = None;
                    return;
                }
                Some(Scan::Key(c)) => {
                    self.pressed = Key::from_char(c);
                    return;
                }
                None => panic!("keypad script exhausted after {} scans", self.scans),
            }
        }
    }
}

impl KeypadMatrixPort for MockMachine {
    fn drive_column(&mut self, col: usize) {
        self.driven = Some(col);
    }

    fn release_column(&mut self, _col: usize) {
        self.driven = None;
    }

    fn row_active(&mut self, row: usize) -> bool {
        let Some(col) = self.driven else {
            return false;
        };
        // Every scan opens with the (row 0, column 0) probe.
        if row == 0 && col == 0 {
            self.next_scan();
        }
        self.pressed.is_some_and(|k| position_of(k) == (row, col))
    }
}

impl PumpPort for MockMachine {
    fn set_pump(&mut self, select: PumpSelect) {
        self.calls.push(Call::Pump(select));
    }
}

impl DisplayPort for MockMachine {
    fn clear(&mut self) {
        let screen = self.screen();
        if !screen.0.is_empty() || !screen.1.is_empty() {
            self.screens.push(screen);
        }
        self.display.clear();
    }

    fn set_cursor(&mut self, col: u8, row: u8) {
        self.display.set_cursor(col, row);
    }

    fn put_char(&mut self, c: char) {
        self.display.put_char(c);
    }
}

impl CoinSamplingPort for MockMachine {
    fn suspend_coin_sampling(&mut self) {
        self.calls.push(Call::Sampling(false));
    }

    fn resume_coin_sampling(&mut self) {
        self.calls.push(Call::Sampling(true));
    }
}

impl DelayNs for MockMachine {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(Call::Wait(ms));
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<(liquidvend::fsm::StateId, liquidvend::fsm::StateId)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Simulated 74HC595 pair ────────────────────────────────────

/// Two cascaded shift registers behind an active-low output enable.
#[derive(Debug)]
pub struct ChainState {
    ser: bool,
    clk: bool,
    latch: bool,
    shift: u16,
    /// Storage register, bit 0 = output 1.
    pub outputs: u16,
    /// Output enable pin level (HIGH = outputs floating, relays off).
    pub oe_high: bool,
    /// Storage register contents at the moment outputs were enabled.
    pub enabled_with: Option<u16>,
    pub latches: u32,
}

#[allow(dead_code)]
impl ChainState {
    /// Power-up: random register contents, outputs disabled.
    fn power_up() -> Self {
        Self {
            ser: false,
            clk: false,
            latch: false,
            shift: 0,
            outputs: 0x0000,
            oe_high: true,
            enabled_with: None,
            latches: 0,
        }
    }

    /// 1-based lines whose relay is energised (output LOW while enabled).
    pub fn active_lines(&self) -> Vec<u8> {
        if self.oe_high {
            return Vec::new();
        }
        (1..=PUMP_OUTPUTS)
            .filter(|&n| self.outputs & (1 << (n - 1)) == 0)
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Role {
    Ser,
    Clk,
    Latch,
    OutputEnable,
}

pub struct ChainPin {
    chain: Rc<RefCell<ChainState>>,
    role: Role,
}

impl ChainPin {
    fn set(&mut self, level: bool) {
        let mut s = self.chain.borrow_mut();
        match self.role {
            Role::Ser => s.ser = level,
            Role::Clk => {
                if !s.clk && level {
                    s.shift = (s.shift << 1) | u16::from(s.ser);
                }
                s.clk = level;
            }
            Role::Latch => {
                if !s.latch && level {
                    s.outputs = s.shift;
                    s.latches += 1;
                }
                s.latch = level;
            }
            Role::OutputEnable => {
                if s.oe_high && !level {
                    s.enabled_with = Some(s.outputs);
                }
                s.oe_high = level;
            }
        }
    }
}

impl ErrorType for ChainPin {
    type Error = Infallible;
}

impl OutputPin for ChainPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

pub type ChainPumps = ShiftRegisterPumps<ChainPin, ChainPin, ChainPin, ChainPin>;

/// The real relay driver wired to a simulated register pair.
pub fn relay_chain() -> (ChainPumps, Rc<RefCell<ChainState>>) {
    let chain = Rc::new(RefCell::new(ChainState::power_up()));
    let pin = |role| ChainPin {
        chain: Rc::clone(&chain),
        role,
    };
    let pumps = ShiftRegisterPumps::new(
        pin(Role::Ser),
        pin(Role::Clk),
        pin(Role::Latch),
        pin(Role::OutputEnable),
    );
    (pumps, chain)
}

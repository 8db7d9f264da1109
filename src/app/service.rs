//! Application service — the hexagonal core.
//!
//! [`VendingMachine`] owns the catalog, the current key and the state of
//! the selection / dispense cycle.  The only thing it shares is the
//! [`CreditState`], which the coin timer tops up concurrently.  All I/O
//! flows through the [`MachinePorts`] bundle and the [`EventSink`], so the
//! whole cycle runs against mock adapters on the host.
//!
//! ```text
//!  KeypadMatrixPort ──▶ ┌──────────────────────┐ ──▶ EventSink
//!       CreditState ──▶ │    VendingMachine    │ ──▶ PumpPort
//!                       │  cycle · validation  │ ──▶ DisplayPort
//!                       └──────────────────────┘ ──▶ CoinSamplingPort
//! ```

use heapless::String;
use log::{debug, info, warn};

use crate::catalog::{Catalog, Product};
use crate::config::{Language, MachineConfig, PRODUCT_NAME_LEN, Timing};
use crate::credit::CreditState;
use crate::fsm::{Rejection, StateId};
use crate::keypad::{Key, KeypadDebouncer};
use crate::messages::{self, MessageId, MessageOptions};

use super::commands::PumpSelect;
use super::events::{AppEvent, SaleRecord};
use super::ports::{EventSink, MachinePorts};

// ───────────────────────────────────────────────────────────────
// VendingMachine
// ───────────────────────────────────────────────────────────────

/// The selection / validation / dispense state machine.
pub struct VendingMachine<'a> {
    catalog: Catalog,
    language: Language,
    timing: Timing,
    keypad: KeypadDebouncer,
    credit: &'a CreditState,
    state: StateId,
    /// Key read in `AwaitingSelection`, consumed by the states after it.
    key: Option<Key>,
    /// Product index that passed validation.
    selected: Option<usize>,
    rejection: Option<Rejection>,
    sales: u32,
}

impl<'a> VendingMachine<'a> {
    /// Construct the machine.  Does **not** touch hardware; call
    /// [`start`](Self::start) next.
    pub fn new(config: &MachineConfig, catalog: Catalog, credit: &'a CreditState) -> Self {
        Self {
            catalog,
            language: config.language,
            timing: config.timing,
            keypad: KeypadDebouncer::new(
                config.timing.key_settle_ms,
                config.timing.key_idle_scan_ms,
            ),
            credit,
            state: StateId::AwaitingSelection,
            key: None,
            selected: None,
            rejection: None,
            sales: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Show the startup banner and announce the initial state.
    pub fn start<H, S>(&mut self, hw: &mut H, sink: &mut S)
    where
        H: MachinePorts + ?Sized,
        S: EventSink + ?Sized,
    {
        self.show(hw, MessageId::Startup, MessageOptions::CLEAR_HOLD);
        // The boot balance counts as a fresh credit reading.
        self.credit.mark_changed();
        let credit = self.credit.balance();
        sink.emit(&AppEvent::Started {
            state: self.state,
            credit,
        });
        info!("VendingMachine started in {} (credit {})", self.state, credit);
    }

    /// Run one state and move to the next.  Returns the new state.
    ///
    /// `AwaitingSelection` blocks until a stable key is read; `Dispensing`
    /// blocks for the whole pump interval.
    pub fn step<H, S>(&mut self, hw: &mut H, sink: &mut S) -> StateId
    where
        H: MachinePorts + ?Sized,
        S: EventSink + ?Sized,
    {
        let from = self.state;
        let to = match from {
            StateId::AwaitingSelection => self.await_selection(hw, sink),
            StateId::Validating => self.validate(sink),
            StateId::Rejected => self.reject(hw),
            StateId::Accepted => self.accept(hw, sink),
            StateId::Dispensing => self.dispense(hw, sink),
            StateId::Cooldown => self.cool_down(hw),
        };

        debug_assert!(from.can_transition_to(to), "illegal edge {} -> {}", from, to);
        if to != from {
            debug!("FSM: {} -> {}", from, to);
            sink.emit(&AppEvent::StateChanged { from, to });
        }
        self.state = to;
        to
    }

    /// Run the cycle forever.
    pub fn run_forever<H, S>(&mut self, hw: &mut H, sink: &mut S) -> !
    where
        H: MachinePorts + ?Sized,
        S: EventSink + ?Sized,
    {
        loop {
            self.step(hw, sink);
        }
    }

    // ── State handlers ────────────────────────────────────────

    fn await_selection<H, S>(&mut self, hw: &mut H, sink: &mut S) -> StateId
    where
        H: MachinePorts + ?Sized,
        S: EventSink + ?Sized,
    {
        hw.resume_coin_sampling();
        self.key = None;
        self.selected = None;
        self.rejection = None;

        // The prompt shows the balance read here; anything credited after
        // this point raises the flag again and is refreshed while waiting.
        let _ = self.credit.take_changed();
        self.show(hw, MessageId::InsertCoins, MessageOptions::CLEAR);

        let key = self.keypad.wait_for_key(hw, self.credit);
        sink.emit(&AppEvent::KeyAccepted(key.as_char()));
        self.key = Some(key);
        StateId::Validating
    }

    fn validate<S>(&mut self, sink: &mut S) -> StateId
    where
        S: EventSink + ?Sized,
    {
        let Some(key) = self.key else {
            return StateId::AwaitingSelection;
        };
        let index = key.index();
        let Some(product) = self.catalog.get(index) else {
            debug!("key {} has no product, ignored", key);
            self.key = None;
            return StateId::AwaitingSelection;
        };

        let credit = self.credit.balance();
        let rejection = if !product.available {
            Some(Rejection::NotAvailable)
        } else if u16::from(product.price) > credit {
            Some(Rejection::InsufficientCredit)
        } else {
            None
        };

        match rejection {
            Some(reason) => {
                sink.emit(&AppEvent::SelectionRejected {
                    product: index,
                    reason,
                    credit,
                });
                self.rejection = Some(reason);
                StateId::Rejected
            }
            None => {
                self.selected = Some(index);
                StateId::Accepted
            }
        }
    }

    fn reject<H>(&mut self, hw: &mut H) -> StateId
    where
        H: MachinePorts + ?Sized,
    {
        let message = match self.rejection.take() {
            Some(Rejection::NotAvailable) => MessageId::NotAvailable,
            Some(Rejection::InsufficientCredit) | None => MessageId::InsufficientCredit,
        };
        self.show(hw, message, MessageOptions::CLEAR_HOLD);
        self.key = None;
        StateId::AwaitingSelection
    }

    fn accept<H, S>(&mut self, hw: &mut H, sink: &mut S) -> StateId
    where
        H: MachinePorts + ?Sized,
        S: EventSink + ?Sized,
    {
        let Some((index, price, name)) = self
            .selected_product()
            .map(|(i, p)| (i, p.price, p.name.clone()))
        else {
            return StateId::Rejected;
        };

        match self.credit.try_take(u16::from(price)) {
            Ok(remaining) => {
                self.sales = self.sales.wrapping_add(1);
                sink.emit(&AppEvent::Sale(SaleRecord {
                    product: index,
                    price,
                    remaining_credit: remaining,
                }));
                info!("Sale: {} for {} (credit left {})", name, price, remaining);

                self.show_name(hw, &name);
                self.show(hw, MessageId::Selected, MessageOptions::HOLD);
                StateId::Dispensing
            }
            Err(e) => {
                // Only this task spends credit, so validation should have
                // caught this.
                warn!("Sale refused at deduction: {}", e);
                self.rejection = Some(Rejection::InsufficientCredit);
                self.selected = None;
                StateId::Rejected
            }
        }
    }

    fn dispense<H, S>(&mut self, hw: &mut H, sink: &mut S) -> StateId
    where
        H: MachinePorts + ?Sized,
        S: EventSink + ?Sized,
    {
        let Some((index, duration_ms)) = self
            .selected_product()
            .map(|(i, p)| (i, p.dispense_ms(self.timing.dispense_unit_ms)))
        else {
            return StateId::Cooldown;
        };

        self.show(hw, MessageId::Dispensing, MessageOptions::CLEAR);
        hw.suspend_coin_sampling();

        hw.set_pump(PumpSelect::for_product(index));
        sink.emit(&AppEvent::DispenseStarted {
            product: index,
            duration_ms,
        });
        hw.delay_ms(duration_ms);
        hw.set_pump(PumpSelect::Off);
        sink.emit(&AppEvent::DispenseFinished { product: index });

        self.key = None;
        self.selected = None;
        StateId::Cooldown
    }

    fn cool_down<H>(&mut self, hw: &mut H) -> StateId
    where
        H: MachinePorts + ?Sized,
    {
        self.show(hw, MessageId::ThankYou, MessageOptions::CLEAR_HOLD);
        StateId::AwaitingSelection
    }

    // ── Helpers ───────────────────────────────────────────────

    fn selected_product(&self) -> Option<(usize, &Product)> {
        let index = self.selected?;
        self.catalog.get(index).map(|p| (index, p))
    }

    fn show<H>(&self, hw: &mut H, id: MessageId, options: MessageOptions)
    where
        H: MachinePorts + ?Sized,
    {
        let text = id.render(self.language, self.credit.balance());
        messages::show(hw, &text, options, self.timing.message_hold_ms);
    }

    fn show_name<H>(&self, hw: &mut H, name: &String<PRODUCT_NAME_LEN>)
    where
        H: MachinePorts + ?Sized,
    {
        messages::show(hw, name, MessageOptions::CLEAR, self.timing.message_hold_ms);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Key currently held by the cycle, if any.
    pub fn pending_key(&self) -> Option<Key> {
        self.key
    }

    /// Purchases completed since boot (not persisted).
    pub fn sales_since_boot(&self) -> u32 {
        self.sales
    }
}

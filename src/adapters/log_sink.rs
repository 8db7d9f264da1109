//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { state, credit } => {
                info!("START | initial_state={} | credit={}", state, credit);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from, to);
            }
            AppEvent::KeyAccepted(key) => {
                info!("KEY   | {}", key);
            }
            AppEvent::SelectionRejected {
                product,
                reason,
                credit,
            } => {
                warn!("DENY  | product={} | {} | credit={}", product, reason, credit);
            }
            AppEvent::Sale(sale) => {
                info!(
                    "SALE  | product={} | price={} | credit_left={}",
                    sale.product, sale.price, sale.remaining_credit
                );
            }
            AppEvent::DispenseStarted {
                product,
                duration_ms,
            } => {
                info!("PUMP  | line={} on for {} ms", product + 1, duration_ms);
            }
            AppEvent::DispenseFinished { product } => {
                info!("PUMP  | line={} off", product + 1);
            }
        }
    }
}

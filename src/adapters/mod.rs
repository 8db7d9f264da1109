//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to                   |
//! |------------|--------------------|-------------------------------|
//! | `display`  | DisplayPort        | 16×2 screen mirrored to log   |
//! | `hardware` | KeypadMatrixPort   | Keypad rows / columns (GPIO)  |
//! |            | PumpPort           | 74HC595 relay bank            |
//! |            | DisplayPort        | `display`                     |
//! |            | CoinSamplingPort   | Coin timer (`hw_timer`)       |
//! | `log_sink` | EventSink          | Serial log output             |
//! | `nvs`      | ConfigPort         | NVS / in-memory store         |
//! |            | ByteStoragePort    | Product image blob            |
//! | `time`     | DelayNs            | FreeRTOS / ROM delays         |

pub mod display;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;

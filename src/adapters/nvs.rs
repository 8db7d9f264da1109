//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`ByteStoragePort`] for the dispenser.
//!
//! - Config: [`MachineConfig`] as a postcard blob, range-checked before
//!   persistence.
//! - Product image: the 44-byte price / sales / availability / timer /
//!   total table ([`crate::storage`]) kept as one blob.  It is read into RAM
//!   once at construction; every byte write updates RAM and commits the
//!   whole blob (ESP-IDF NVS commits are atomic per `nvs_commit()`).
//!
//! A missing image reads as erased flash (all `0xFF`).  An image that
//! exists but cannot be read makes every [`ByteStoragePort::read_byte`]
//! fail, so the catalog falls back to "nothing available".

use core::cell::RefCell;

use log::{info, warn};

use crate::app::ports::{ByteStoragePort, ConfigError, ConfigPort, StorageError};
use crate::config::{MAX_PRODUCTS, MachineConfig};
use crate::storage::{ERASED, IMAGE_LEN};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const NAMESPACE: &str = "liquidvend";
const CONFIG_KEY: &str = "machcfg";
const IMAGE_KEY: &str = "eeprom";

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const MAX_BLOB_SIZE: usize = 1024;

type Image = [u8; IMAGE_LEN as usize];

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: RefCell<HashMap<String, Vec<u8>>>,
    /// RAM copy of the product image; `None` if it could not be read.
    image: RefCell<Option<Image>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter, initialise NVS flash and cache the product
    /// image.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably. On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        let adapter = Self {
            #[cfg(not(target_os = "espidf"))]
            store: RefCell::new(HashMap::new()),
            image: RefCell::new(None),
        };
        adapter.reload_image();
        Ok(adapter)
    }

    /// Re-read the product image from flash into RAM.
    pub fn reload_image(&self) {
        let image = match self.read_blob(IMAGE_KEY) {
            Ok(Some(bytes)) if bytes.len() == IMAGE_LEN as usize => {
                let mut image = [ERASED; IMAGE_LEN as usize];
                image.copy_from_slice(&bytes);
                info!("NvsAdapter: product image loaded");
                Some(image)
            }
            Ok(Some(bytes)) => {
                warn!(
                    "NvsAdapter: product image has {} bytes, expected {}",
                    bytes.len(),
                    IMAGE_LEN
                );
                None
            }
            Ok(None) => {
                info!("NvsAdapter: no product image, starting erased");
                Some([ERASED; IMAGE_LEN as usize])
            }
            Err(e) => {
                warn!("NvsAdapter: product image read failed: {}", e);
                None
            }
        };
        *self.image.borrow_mut() = image;
    }

    /// Store a raw image blob as-is, bypassing the RAM copy.  Used to
    /// install factory images and by tests.
    pub fn write_raw_image(&self, bytes: &[u8]) -> Result<(), StorageError> {
        self.write_blob(IMAGE_KEY, bytes)
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .store
            .borrow()
            .get(&Self::composite_key(NAMESPACE, key))
            .cloned())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(NAMESPACE, key), bytes.to_vec());
        Ok(())
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns_buf = nvs_name(namespace);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key_buf = nvs_name(key);
        let result = Self::with_nvs_handle(NAMESPACE, false, |handle| {
            let mut size: usize = 0;

            // First call: get size
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    core::ptr::null_mut(),
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH);
            }

            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            buf.truncate(size);
            Ok(buf)
        });

        match result {
            Ok(bytes) => Ok(Some(bytes)),
            // A fresh partition has no namespace yet either.
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(None),
            Err(e) => {
                warn!("NvsAdapter: NVS read error {} for {}", e, key);
                Err(StorageError::IoError)
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let key_buf = nvs_name(key);
        let result = Self::with_nvs_handle(NAMESPACE, true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    bytes.as_ptr() as *const _,
                    bytes.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        result.map_err(|e| {
            warn!("NvsAdapter: NVS write error {} for {}", e, key);
            StorageError::IoError
        })
    }
}

/// NUL-terminated NVS name (15 characters max).
#[cfg(target_os = "espidf")]
fn nvs_name(name: &str) -> [u8; 16] {
    let mut buf = [0u8; 16];
    let bytes = name.as_bytes();
    let len = bytes.len().min(15);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

fn validate_config(cfg: &MachineConfig) -> Result<(), ConfigError> {
    if cfg.products.is_empty() || cfg.products.len() > MAX_PRODUCTS {
        return Err(ConfigError::ValidationFailed("products must hold 1–10 entries"));
    }
    if cfg.products.iter().any(|p| p.name.trim().is_empty()) {
        return Err(ConfigError::ValidationFailed("product names must not be blank"));
    }
    let t = &cfg.timing;
    if !(10..=1000).contains(&t.coin_poll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "coin_poll_interval_ms must be 10–1000",
        ));
    }
    if !(1..=500).contains(&t.key_settle_ms) {
        return Err(ConfigError::ValidationFailed("key_settle_ms must be 1–500"));
    }
    if !(1..=100).contains(&t.key_idle_scan_ms) {
        return Err(ConfigError::ValidationFailed("key_idle_scan_ms must be 1–100"));
    }
    if t.message_hold_ms > 10_000 {
        return Err(ConfigError::ValidationFailed(
            "message_hold_ms must be 0–10000",
        ));
    }
    if t.key_settle_ms >= t.message_hold_ms {
        return Err(ConfigError::ValidationFailed(
            "key_settle_ms must be < message_hold_ms",
        ));
    }
    if !(10..=1000).contains(&t.dispense_unit_ms) {
        return Err(ConfigError::ValidationFailed(
            "dispense_unit_ms must be 10–1000",
        ));
    }
    if !(1..=1000).contains(&t.counter_reset_pulse_us) {
        return Err(ConfigError::ValidationFailed(
            "counter_reset_pulse_us must be 1–1000",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<MachineConfig, ConfigError> {
        match self.read_blob(CONFIG_KEY) {
            Ok(Some(bytes)) => {
                let cfg: MachineConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                validate_config(&cfg)?;
                info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            Ok(None) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(MachineConfig::default())
            }
            Err(_) => {
                warn!("NvsAdapter: config unreadable, using defaults");
                Ok(MachineConfig::default())
            }
        }
    }

    fn save(&self, config: &MachineConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.write_blob(CONFIG_KEY, &bytes)
            .map_err(|_| ConfigError::IoError)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

impl ByteStoragePort for NvsAdapter {
    fn read_byte(&self, addr: u16) -> Result<u8, StorageError> {
        let image = self.image.borrow();
        let image = image.as_ref().ok_or(StorageError::IoError)?;
        image
            .get(usize::from(addr))
            .copied()
            .ok_or(StorageError::OutOfRange(addr))
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), StorageError> {
        let snapshot = {
            let mut image = self.image.borrow_mut();
            let image = image.as_mut().ok_or(StorageError::IoError)?;
            let cell = image
                .get_mut(usize::from(addr))
                .ok_or(StorageError::OutOfRange(addr))?;
            *cell = value;
            *image
        };
        self.write_blob(IMAGE_KEY, &snapshot)
    }
}

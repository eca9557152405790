//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`], [`StoragePort`], [`LevelStore`] and
//! [`PumpStore`] for the CocktailBot.
//!
//! # Layout
//!
//! | Namespace     | Key            | Value (postcard)           |
//! |---------------|----------------|----------------------------|
//! | `cocktailbot` | `machcfg`      | [`MachineConfig`]          |
//! | `pumps`       | `table`        | `Vec<PumpConfig>`          |
//! | `levels`      | `_index`       | `Vec<String>` tracked ids  |
//! | `levels`      | id or `#hash`  | [`IngredientLevel`]        |
//!
//! NVS keys are limited to 15 bytes.  Ingredient ids that fit are used
//! verbatim; longer ones map to `#` + 8 hex digits of their FNV-1a hash.
//! The index blob lets the ledger enumerate records at boot.
//!
//! Writes are atomic per `nvs_commit()`.  The simulation backend keeps a
//! `RefCell<HashMap>` and is used by every host test.

use crate::app::ports::{
    ConfigError, ConfigPort, LevelStore, PumpStore, StorageError, StoragePort,
};
use crate::config::{MachineConfig, validate_config};
use crate::inventory::IngredientLevel;
use crate::pumps::PumpConfig;
use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "cocktailbot";
const CONFIG_KEY: &str = "machcfg";
const PUMP_NAMESPACE: &str = "pumps";
const PUMP_KEY: &str = "table";
const LEVEL_NAMESPACE: &str = "levels";
const LEVEL_INDEX_KEY: &str = "_index";

/// NVS key length limit, excluding the terminating NUL.
const MAX_KEY_LEN: usize = 15;

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const MAX_BLOB_SIZE: usize = 4000;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
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
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    // ── Blob primitives (shared by every port) ────────────────

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Whole blob under `key`, or `None` if absent.
    #[cfg(not(target_os = "espidf"))]
    fn get_blob(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .store
            .borrow()
            .get(&Self::composite_key(namespace, key))
            .cloned())
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn erase_blob(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .remove(&Self::composite_key(namespace, key));
        Ok(())
    }

    /// NUL-terminated copy of `s`, truncated to the NVS limit.
    #[cfg(target_os = "espidf")]
    fn c_key(s: &str) -> [u8; MAX_KEY_LEN + 1] {
        let mut buf = [0u8; MAX_KEY_LEN + 1];
        let bytes = s.as_bytes();
        let len = bytes.len().min(MAX_KEY_LEN);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns_buf = Self::c_key(namespace);
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
    fn get_blob(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key_buf = Self::c_key(key);
        let result = Self::with_nvs_handle(namespace, false, |handle| {
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
            if size > MAX_BLOB_SIZE {
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
            // A namespace that was never written cannot be opened read-only.
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(None),
            Err(e) => {
                warn!("NvsAdapter: read {}/{} failed ({})", namespace, key, e);
                Err(StorageError::IoError)
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn set_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let key_buf = Self::c_key(key);
        let result = Self::with_nvs_handle(namespace, true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    data.as_ptr() as *const _,
                    data.len(),
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
            warn!("NvsAdapter: write {}/{} failed ({})", namespace, key, e);
            if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                StorageError::Full
            } else {
                StorageError::IoError
            }
        })
    }

    #[cfg(target_os = "espidf")]
    fn erase_blob(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let key_buf = Self::c_key(key);
        let result = Self::with_nvs_handle(namespace, true, |handle| {
            let ret = unsafe { nvs_erase_key(handle, key_buf.as_ptr() as *const _) };
            if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        result.map_err(|_| StorageError::IoError)
    }

    // ── Ledger index ──────────────────────────────────────────

    fn level_index(&self) -> Result<Vec<String>, StorageError> {
        match self.get_blob(LEVEL_NAMESPACE, LEVEL_INDEX_KEY)? {
            Some(bytes) => postcard::from_bytes(&bytes).map_err(|_| StorageError::Corrupted),
            None => Ok(Vec::new()),
        }
    }

    /// The level index, or an empty one if it cannot be read.  Records the
    /// unreadable index listed are orphaned from here on.
    fn level_index_or_empty(&self, during: &str) -> Vec<String> {
        self.level_index().unwrap_or_else(|e| {
            warn!(
                "NvsAdapter: level index unreadable during {} ({}), starting a new index",
                during, e
            );
            Vec::new()
        })
    }

    fn write_level_index(&self, ids: &[String]) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(ids).map_err(|_| StorageError::IoError)?;
        self.set_blob(LEVEL_NAMESPACE, LEVEL_INDEX_KEY, &bytes)
    }
}

/// NVS key for an ingredient level record.
pub fn level_key(ingredient_id: &str) -> String {
    if ingredient_id.len() <= MAX_KEY_LEN && !ingredient_id.starts_with(['#', '_']) {
        ingredient_id.to_string()
    } else {
        format!("#{:08x}", fnv1a(ingredient_id.as_bytes()))
    }
}

/// 32-bit FNV-1a.  Stable across builds, so keys survive firmware updates.
fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5_u32, |hash, &b| {
        (hash ^ u32::from(b)).wrapping_mul(0x0100_0193)
    })
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<MachineConfig, ConfigError> {
        match self.get_blob(CONFIG_NAMESPACE, CONFIG_KEY) {
            Ok(Some(bytes)) => {
                let cfg: MachineConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            Ok(None) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(MachineConfig::default())
            }
            Err(e) => {
                warn!("NvsAdapter: config read error ({}), using defaults", e);
                Ok(MachineConfig::default())
            }
        }
    }

    fn save(&self, config: &MachineConfig) -> Result<(), ConfigError> {
        validate_config(config).map_err(|e| ConfigError::ValidationFailed(e.0))?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.set_blob(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)
            .map_err(|_| ConfigError::IoError)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

impl LevelStore for NvsAdapter {
    fn load_levels(&self) -> Result<Vec<IngredientLevel>, StorageError> {
        let mut levels = Vec::new();
        for id in self.level_index()? {
            let Some(bytes) = self.get_blob(LEVEL_NAMESPACE, &level_key(&id))? else {
                warn!("NvsAdapter: indexed level '{}' missing, skipping", id);
                continue;
            };
            match postcard::from_bytes::<IngredientLevel>(&bytes) {
                Ok(level) if level.ingredient_id == id => levels.push(level),
                _ => warn!("NvsAdapter: level record for '{}' corrupted, skipping", id),
            }
        }
        Ok(levels)
    }

    fn save_level(&self, level: &IngredientLevel) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(level).map_err(|_| StorageError::IoError)?;
        self.set_blob(LEVEL_NAMESPACE, &level_key(&level.ingredient_id), &bytes)?;

        let mut index = self.level_index_or_empty("save");
        if !index.contains(&level.ingredient_id) {
            index.push(level.ingredient_id.clone());
            self.write_level_index(&index)?;
        }
        Ok(())
    }

    fn clear_levels(&self) -> Result<(), StorageError> {
        for id in self.level_index_or_empty("clear") {
            self.erase_blob(LEVEL_NAMESPACE, &level_key(&id))?;
        }
        self.erase_blob(LEVEL_NAMESPACE, LEVEL_INDEX_KEY)
    }
}

impl PumpStore for NvsAdapter {
    fn load_pumps(&self) -> Result<Vec<PumpConfig>, StorageError> {
        let bytes = self
            .get_blob(PUMP_NAMESPACE, PUMP_KEY)?
            .ok_or(StorageError::NotFound)?;
        postcard::from_bytes(&bytes).map_err(|_| StorageError::Corrupted)
    }

    fn save_pumps(&self, pumps: &[PumpConfig]) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(pumps).map_err(|_| StorageError::IoError)?;
        self.set_blob(PUMP_NAMESPACE, PUMP_KEY, &bytes)?;
        info!("NvsAdapter: pump table saved ({} pumps)", pumps.len());
        Ok(())
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self
            .get_blob(namespace, key)?
            .ok_or(StorageError::NotFound)?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.set_blob(namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.erase_blob(namespace, key)
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        matches!(self.get_blob(namespace, key), Ok(Some(_)))
    }
}

impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }
}

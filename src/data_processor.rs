//! The `DataProcessor` trait and the process-wide registry processors add themselves to.
//!
//! A processor post-processes a `RideFile` in place. Each processor also hands out a
//! `DataProcessorConfig`, the object a preferences pane would show for it.
//! Processors register under a string key at program start, see `fix_slope.rs`.

use crate::error::RideError;
use crate::ride_file::RideFile;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Configuration attached to a processor.
///
/// `read_config` loads persisted settings into the object, `save_config` writes them back.
/// Processors without parameters implement both as no-ops.
pub trait DataProcessorConfig: Debug {
    /// A human readable description of what the processor does.
    fn explain(&self) -> String;
    fn read_config(&mut self);
    fn save_config(&self);
}

/// A ride post-processor.
///
/// **Example**:
/// ```ignore
/// #[derive(Debug)]
/// struct ExampleProcessor;
///
/// impl DataProcessor for ExampleProcessor {
///     fn post_process(&self, ride: &mut RideFile, _config: Option<&dyn DataProcessorConfig>) -> bool {
///         !ride.is_empty()
///     }
///
///     fn processor_config(&self) -> Box<dyn DataProcessorConfig> {
///         Box::new(ExampleConfig)
///     }
///
///     fn name(&self) -> String {
///         "Example".to_string()
///     }
/// }
/// ```
pub trait DataProcessor: Send + Sync + Debug {
    /// Runs the processor on `ride`. Returns `true` when the ride was modified.
    fn post_process(&self, ride: &mut RideFile, config: Option<&dyn DataProcessorConfig>) -> bool;

    /// Builds the configuration object for this processor.
    fn processor_config(&self) -> Box<dyn DataProcessorConfig>;

    /// Display name.
    fn name(&self) -> String;
}

/// A registry of ride processors keyed by name.
#[derive(Debug, Default)]
pub struct DataProcessorFactory {
    processors: BTreeMap<String, Box<dyn DataProcessor>>,
}

impl DataProcessorFactory {
    /// Shared access to the global registry. A poisoned lock is recovered.
    pub fn instance() -> RwLockReadGuard<'static, DataProcessorFactory> {
        DATA_PROCESSOR_FACTORY
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Exclusive access to the global registry, for registration.
    pub fn instance_mut() -> RwLockWriteGuard<'static, DataProcessorFactory> {
        DATA_PROCESSOR_FACTORY
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds `processor` under `key`. Returns `false` and keeps the existing entry
    /// if the key is already taken.
    pub fn register_processor(&mut self, key: &str, processor: Box<dyn DataProcessor>) -> bool {
        if self.processors.contains_key(key) {
            log::warn!("Data processor '{}' is already registered", key);
            return false;
        }
        self.processors.insert(key.to_string(), processor);
        true
    }

    pub fn processor(&self, key: &str) -> Option<&dyn DataProcessor> {
        self.processors.get(key).map(|p| p.as_ref())
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.processors.keys().cloned().collect()
    }

    /// Runs the processor registered as `key`. Its configuration is read before the run
    /// and saved back after it.
    pub fn process(&self, key: &str, ride: &mut RideFile) -> Result<bool, RideError> {
        let processor = self
            .processor(key)
            .ok_or_else(|| RideError::UnknownProcessor(key.to_string()))?;
        let mut config = processor.processor_config();
        config.read_config();
        let changed = processor.post_process(ride, Some(config.as_ref()));
        config.save_config();
        Ok(changed)
    }

    /// Runs the given processors in order and returns how many of them changed the ride.
    /// Unknown keys are rejected before anything runs.
    pub fn auto_process<S: AsRef<str>>(
        &self,
        ride: &mut RideFile,
        keys: &[S],
    ) -> Result<usize, RideError> {
        if let Some(missing) = keys.iter().find(|k| self.processor(k.as_ref()).is_none()) {
            return Err(RideError::UnknownProcessor(missing.as_ref().to_string()));
        }

        let mut changed = 0;
        for key in keys {
            if self.process(key.as_ref(), ride)? {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

static DATA_PROCESSOR_FACTORY: Lazy<RwLock<DataProcessorFactory>> =
    Lazy::new(|| RwLock::new(DataProcessorFactory::default()));

// src/dataset/cache.rs

use once_cell::sync::{Lazy, OnceCell};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::debug;

use super::{loader::load_dataset, Dataset};
use crate::error::LoadError;

type Slot = Arc<OnceCell<Arc<Dataset>>>;

/// Process-wide map: canonical root → its write-once dataset slot.
static LOADED: Lazy<Mutex<HashMap<PathBuf, Slot>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Load `root` once per process and hand out the shared copy afterwards.
///
/// Each root has its own `OnceCell`, so concurrent first callers block on a
/// single disk read while other roots stay independent. A failed load leaves
/// the slot empty and the next call retries.
pub fn load_cached<P: AsRef<Path>>(root: P) -> Result<Arc<Dataset>, LoadError> {
    let root = root.as_ref();
    let key = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

    let slot = {
        let mut map = LOADED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(map.entry(key.clone()).or_default())
    };

    if let Some(ds) = slot.get() {
        debug!(root = %key.display(), "dataset served from cache");
        return Ok(Arc::clone(ds));
    }
    slot.get_or_try_init(|| load_dataset(&key).map(Arc::new))
        .map(Arc::clone)
}

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};

/// Rewrites the current value (if any) into the value to store.
pub type Updater<'a> = dyn FnMut(Option<&[u8]>) -> anyhow::Result<Vec<u8>> + 'a;

/// Raw byte access to a key-value backend.
///
/// Handlers only see `&dyn KeyValue`, so the same router runs on the Spin
/// key-value store inside the component and on [`MemoryStore`] natively.
pub trait KeyValue {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// Read-modify-write of one key. On [`MemoryStore`] no other write lands
    /// between the read and the write.
    fn update(&self, key: &str, f: &mut Updater<'_>) -> anyhow::Result<()>;

    /// Stores `value` only when `key` is unset. Returns whether it was stored.
    fn set_if_absent(&self, key: &str, value: &[u8]) -> anyhow::Result<bool>;
}

/// JSON helpers available on every [`KeyValue`] backend.
pub trait JsonStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>>;
    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()>;

    /// Atomically edits the value at `key`, starting from `T::default()`
    /// when it is unset.
    fn update_json<T, F>(&self, key: &str, f: F) -> anyhow::Result<()>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T);

    fn set_json_if_absent<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<bool>;
}

impl<S: KeyValue + ?Sized> JsonStore for S {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .with_context(|| format!("decode value at {}", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(value).with_context(|| format!("encode value at {}", key))?;
        self.set(key, &bytes)
    }

    fn update_json<T, F>(&self, key: &str, f: F) -> anyhow::Result<()>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T),
    {
        let mut f = Some(f);
        self.update(key, &mut |current: Option<&[u8]>| -> anyhow::Result<Vec<u8>> {
            let mut value: T = match current {
                Some(bytes) => serde_json::from_slice(bytes)
                    .with_context(|| format!("decode value at {}", key))?,
                None => T::default(),
            };
            if let Some(f) = f.take() {
                f(&mut value);
            }
            serde_json::to_vec(&value).with_context(|| format!("encode value at {}", key))
        })
    }

    fn set_json_if_absent<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<bool> {
        let bytes = serde_json::to_vec(value).with_context(|| format!("encode value at {}", key))?;
        self.set_if_absent(key, &bytes)
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValue for spin_sdk::key_value::Store {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        spin_sdk::key_value::Store::get(self, key)
            .map_err(|e| anyhow::anyhow!("key-value get {}: {:?}", key, e))
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        spin_sdk::key_value::Store::set(self, key, value)
            .map_err(|e| anyhow::anyhow!("key-value set {}: {:?}", key, e))
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        spin_sdk::key_value::Store::delete(self, key)
            .map_err(|e| anyhow::anyhow!("key-value delete {}: {:?}", key, e))
    }

    // Spin's key-value interface has no compare-and-swap. Each request runs
    // in its own instance, so these are a plain read followed by a write.
    fn update(&self, key: &str, f: &mut Updater<'_>) -> anyhow::Result<()> {
        let current = KeyValue::get(self, key)?;
        let next = f(current.as_deref())?;
        KeyValue::set(self, key, &next)
    }

    fn set_if_absent(&self, key: &str, value: &[u8]) -> anyhow::Result<bool> {
        if KeyValue::get(self, key)?.is_some() {
            return Ok(false);
        }
        KeyValue::set(self, key, value)?;
        Ok(true)
    }
}

/// Process-local store used by the native server and tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> anyhow::Result<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl KeyValue for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.entries()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }

    // `f` runs with the lock held and must not touch the store.
    fn update(&self, key: &str, f: &mut Updater<'_>) -> anyhow::Result<()> {
        let mut entries = self.entries()?;
        let next = f(entries.get(key).map(Vec::as_slice))?;
        entries.insert(key.to_string(), next);
        Ok(())
    }

    fn set_if_absent(&self, key: &str, value: &[u8]) -> anyhow::Result<bool> {
        match self.entries()?.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(value.to_vec());
                Ok(true)
            }
        }
    }
}

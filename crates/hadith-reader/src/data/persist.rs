//! Background persistence
//!
//! Registries update memory first and hand the encoded state to a writer
//! thread, so a mutation never waits on the durable store. Writes are
//! applied in the order they were queued. A failed write is logged and
//! remembered; memory is not rolled back.

use crate::data::storage::{encode_state, KeyValueStore};
use crossbeam_channel::{unbounded, Sender};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, warn};

enum PersistJob {
    Write { key: String, value: String },
    /// Acknowledged once every earlier job has been handled
    Flush(Sender<()>),
}

/// Owns the writer thread for one registry
pub struct PersistWorker {
    store: Arc<dyn KeyValueStore>,
    tx: Option<Sender<PersistJob>>,
    handle: Option<JoinHandle<()>>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl PersistWorker {
    /// Start a writer thread for `store`
    ///
    /// If the thread can't be spawned, writes happen inline instead.
    pub fn spawn(name: &str, store: Arc<dyn KeyValueStore>) -> Self {
        let last_error = Arc::new(Mutex::new(None));
        let (tx, rx) = unbounded::<PersistJob>();

        let thread_store = store.clone();
        let thread_error = last_error.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("persist-{}", name))
            .spawn(move || {
                for job in rx.iter() {
                    match job {
                        PersistJob::Write { key, value } => {
                            write_and_record(thread_store.as_ref(), &key, &value, &thread_error);
                        }
                        PersistJob::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
            });

        match spawned {
            Ok(handle) => Self {
                store,
                tx: Some(tx),
                handle: Some(handle),
                last_error,
            },
            Err(e) => {
                warn!(worker = name, error = %e, "Failed to spawn persistence thread, writing inline");
                Self {
                    store,
                    tx: None,
                    handle: None,
                    last_error,
                }
            }
        }
    }

    /// Queue a whole-value write of `value` under `key`
    pub fn submit(&self, key: &str, value: String) {
        let job = PersistJob::Write { key: key.to_string(), value };
        let job = match &self.tx {
            Some(tx) => match tx.send(job) {
                Ok(()) => return,
                Err(e) => e.into_inner(),
            },
            None => job,
        };

        // Writer gone: fall back to a synchronous write
        if let PersistJob::Write { key, value } = job {
            write_and_record(self.store.as_ref(), &key, &value, &self.last_error);
        }
    }

    /// Encode `state` in the persisted envelope and queue it
    pub fn submit_state<T: Serialize>(&self, key: &str, state: &T) {
        match encode_state(state) {
            Ok(value) => self.submit(key, value),
            Err(e) => {
                warn!(key, error = %e, "Failed to encode state");
                *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(e.to_string());
            }
        }
    }

    /// Block until every queued write has been attempted
    pub fn flush(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        if tx.send(PersistJob::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    /// Message of the most recent failed write, cleared by the next success
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Store this worker writes to
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }
}

impl Drop for PersistWorker {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain remaining jobs and exit
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn write_and_record(
    store: &dyn KeyValueStore,
    key: &str,
    value: &str,
    last_error: &Mutex<Option<String>>,
) {
    let mut slot = last_error.lock().unwrap_or_else(|e| e.into_inner());
    match store.write(key, value) {
        Ok(()) => {
            debug!(key, bytes = value.len(), "Persisted state");
            *slot = None;
        }
        Err(e) => {
            warn!(key, error = %e, "Failed to persist state");
            *slot = Some(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::storage::MemoryStore;
    use crate::error::{Result, StoreError};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store whose writes can be switched to fail
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    impl KeyValueStore for FlakyStore {
        fn read(&self, key: &str) -> Result<Option<String>> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::PersistenceWrite {
                    key: key.to_string(),
                    message: "disk full".to_string(),
                });
            }
            self.inner.write(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_writes_land_in_order() {
        let store = Arc::new(MemoryStore::new());
        let worker = PersistWorker::spawn("test", store.clone());

        for i in 0..100 {
            worker.submit("key", i.to_string());
        }
        worker.flush();

        assert_eq!(store.read("key").unwrap(), Some("99".to_string()));
    }

    #[test]
    fn test_drop_drains_queue() {
        let store = Arc::new(MemoryStore::new());
        {
            let worker = PersistWorker::spawn("drop", store.clone());
            worker.submit("key", "last".to_string());
        }
        assert_eq!(store.read("key").unwrap(), Some("last".to_string()));
    }

    #[test]
    fn test_failure_is_recorded_then_cleared() {
        let store = Arc::new(FlakyStore::default());
        let worker = PersistWorker::spawn("flaky", store.clone());

        store.failing.store(true, Ordering::SeqCst);
        worker.submit("key", "a".to_string());
        worker.flush();
        let err = worker.last_error().unwrap();
        assert!(err.contains("disk full"));
        assert_eq!(store.read("key").unwrap(), None);

        store.failing.store(false, Ordering::SeqCst);
        worker.submit("key", "b".to_string());
        worker.flush();
        assert!(worker.last_error().is_none());
        assert_eq!(store.read("key").unwrap(), Some("b".to_string()));
    }

    #[test]
    fn test_submit_state_uses_envelope() {
        let store = Arc::new(MemoryStore::new());
        let worker = PersistWorker::spawn("envelope", store.clone());

        worker.submit_state("key", &vec![1, 2, 3]);
        worker.flush();

        let raw = store.read("key").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["state"], serde_json::json!([1, 2, 3]));
        assert_eq!(value["version"], 0);
    }
}

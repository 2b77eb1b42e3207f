use std::sync::{Arc, Mutex, MutexGuard};

/// Single-slot, overwrite-on-write cell.
///
/// Writers replace the value wholesale and readers get a copy of whatever was
/// written last. Nothing queues: values written between two reads are never
/// observed. Each `store` is one assignment of the whole record, so a reader
/// can't see half of an update.
pub struct Latest<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

struct Slot<T> {
    value: T,
    version: u64,
}

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T: Copy> Latest<T> {
    pub fn new(initial: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                value: initial,
                version: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Replace the value; returns the new version.
    pub fn store(&self, value: T) -> u64 {
        let mut slot = self.lock();
        slot.value = value;
        slot.version += 1;
        slot.version
    }

    /// Read-modify-write under one lock.
    pub fn update(&self, f: impl FnOnce(T) -> T) -> T {
        let mut slot = self.lock();
        slot.value = f(slot.value);
        slot.version += 1;
        slot.value
    }

    pub fn load(&self) -> T {
        self.lock().value
    }

    /// Value plus the number of stores so far
    pub fn load_versioned(&self) -> (T, u64) {
        let slot = self.lock();
        (slot.value, slot.version)
    }
}

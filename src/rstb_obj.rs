use std::sync::{Arc, Mutex, MutexGuard};

// RstbObjSafe lets tasks share test state. Tasks must be Send, so this wraps Arc<Mutex<T>>
// even though everything runs on the simulator thread.
#[derive(Debug)]
pub struct RstbObjSafe<T>(Arc<Mutex<T>>);

impl<T> RstbObjSafe<T> {
    pub fn new(data: T) -> RstbObjSafe<T> {
        RstbObjSafe(Arc::new(Mutex::new(data)))
    }
    pub fn get(&self) -> MutexGuard<'_, T> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.get())
    }
}

impl<T> Clone for RstbObjSafe<T> {
    fn clone(&self) -> Self {
        RstbObjSafe(self.0.clone())
    }
}

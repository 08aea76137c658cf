use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::detection::domain::mask_detector::MaskDetector;

/// A loaded detector, shared between the session and the prediction loop.
/// Locked for the duration of one inference.
pub type DetectorHandle = Arc<Mutex<Box<dyn MaskDetector>>>;

/// Download progress callback handed to loaders: `(done, total)`.
pub type LoadProgress = Box<dyn Fn(u64, u64) + Send>;

#[derive(Clone)]
pub enum ModelState {
    Loading,
    Ready(DetectorHandle),
    Failed(String),
}

impl fmt::Debug for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelState::Loading => write!(f, "Loading"),
            ModelState::Ready(_) => write!(f, "Ready"),
            ModelState::Failed(msg) => write!(f, "Failed({msg})"),
        }
    }
}

/// Holds the mask detector while it loads in the background.
///
/// Readers either peek at the current [`ModelState`] or block until loading
/// settles.
pub struct ModelSlot {
    state: Mutex<ModelState>,
    settled: Condvar,
    progress: Mutex<(u64, u64)>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ModelSlot {
    /// An empty slot in the `Loading` state.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ModelState::Loading),
            settled: Condvar::new(),
            progress: Mutex::new((0, 0)),
        })
    }

    /// A slot that already holds `detector`.
    pub fn ready(detector: Box<dyn MaskDetector>) -> Arc<Self> {
        let slot = Self::new();
        slot.fulfill(Ok(detector));
        slot
    }

    /// Runs `loader` on a background thread and stores its outcome.
    ///
    /// The loader receives a callback for reporting download progress.
    pub fn load_in_background<F>(loader: F) -> Arc<Self>
    where
        F: FnOnce(LoadProgress) -> Result<Box<dyn MaskDetector>, String> + Send + 'static,
    {
        let slot = Self::new();
        let worker = slot.clone();
        thread::spawn(move || {
            let reporter = worker.clone();
            let result = loader(Box::new(move |done, total| reporter.set_progress(done, total)));
            worker.fulfill(result);
        });
        slot
    }

    pub fn fulfill(&self, result: Result<Box<dyn MaskDetector>, String>) {
        let next = match result {
            Ok(detector) => {
                log::info!("Mask detector ready");
                ModelState::Ready(Arc::new(Mutex::new(detector)))
            }
            Err(msg) => {
                log::error!("Mask detector failed to load: {msg}");
                ModelState::Failed(msg)
            }
        };
        *lock(&self.state) = next;
        self.settled.notify_all();
    }

    pub fn state(&self) -> ModelState {
        lock(&self.state).clone()
    }

    pub fn set_progress(&self, done: u64, total: u64) {
        *lock(&self.progress) = (done, total);
    }

    pub fn progress(&self) -> (u64, u64) {
        *lock(&self.progress)
    }

    /// Blocks until loading settles or `cancelled` is set, forwarding
    /// progress while waiting. Returns the state at that point.
    pub fn wait(&self, on_progress: &dyn Fn(u64, u64), cancelled: &AtomicBool) -> ModelState {
        let mut guard = lock(&self.state);
        loop {
            if !matches!(*guard, ModelState::Loading) || cancelled.load(Ordering::Relaxed) {
                return guard.clone();
            }
            let (done, total) = self.progress();
            if total > 0 {
                on_progress(done, total);
            }
            guard = match self.settled.wait_timeout(guard, Duration::from_millis(100)) {
                Ok((g, _)) => g,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

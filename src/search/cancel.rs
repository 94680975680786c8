use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Shared cooperative cancellation flag.
///
/// Cloning shares the flag. The search worker polls it before each file and
/// between lines; setting it never interrupts anything directly.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Starts a watchdog thread that cancels `token` once `timeout` elapses.
/// Returns a stop flag; setting it ends the watchdog without cancelling.
pub fn start_timeout_thread(timeout: Duration, token: CancellationToken) -> Arc<AtomicBool> {
    let should_stop = Arc::new(AtomicBool::new(false));
    let should_stop_clone = should_stop.clone();

    // Short ticks keep the watchdog responsive to both the stop flag and
    // sub-second timeouts
    let sleep_interval = Duration::from_millis(10).min(timeout.max(Duration::from_millis(1)));

    thread::spawn(move || {
        let mut elapsed_time = Duration::ZERO;

        while elapsed_time < timeout {
            if should_stop_clone.load(Ordering::SeqCst) || token.is_cancelled() {
                return;
            }
            thread::sleep(sleep_interval);
            elapsed_time += sleep_interval;
        }

        if !should_stop_clone.load(Ordering::SeqCst) {
            warn!("Search timed out after {:.2?}, cancelling", timeout);
            token.cancel();
        }
    });

    should_stop
}

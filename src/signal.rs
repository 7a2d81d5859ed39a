use crate::error::Result;
use crate::uplink::ShutdownHandle;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Watches for SIGINT/SIGTERM on a background thread.
///
/// On the first signal the returned flag is raised and the connection is shut
/// down, which wakes the session out of its blocking receive. Cleanup of the
/// robot itself stays with the session.
pub fn watch_termination(connection: ShutdownHandle) -> Result<Arc<AtomicBool>> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let mut signals = Signals::new(&[SIGINT, SIGTERM])?;
    let flag = Arc::clone(&interrupted);
    std::thread::Builder::new()
        .name("signal-watcher".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                log::info!("received signal {}, shutting down", signal);
                flag.store(true, Ordering::SeqCst);
                connection.shutdown();
            }
        })?;
    Ok(interrupted)
}

// Diagnostic log for emuMMC
//
// Keeps the first MAX_LOG_ENTRIES formatted records so the boot menu can
// show why emuMMC fell back to the real eMMC. Install with `init()`.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use core::sync::atomic::{AtomicUsize, Ordering};
use spin::Mutex;

const MAX_LOG_ENTRIES: usize = 64;

static LOG_BUFFER: Mutex<Vec<String>> = Mutex::new(Vec::new());
static LOG_COUNT: AtomicUsize = AtomicUsize::new(0);
static LOGGER: DiagnosticLog = DiagnosticLog;

/// `log::Log` sink backed by a bounded in-memory buffer
pub struct DiagnosticLog;

impl log::Log for DiagnosticLog {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let idx = LOG_COUNT.fetch_add(1, Ordering::SeqCst);
        if idx < MAX_LOG_ENTRIES {
            LOG_BUFFER
                .lock()
                .push(format!("[{}] {}", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

/// Install the diagnostic log (call once at boot)
pub fn init() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
    }
}

/// Copy of the recorded entries
pub fn entries() -> Vec<String> {
    LOG_BUFFER.lock().clone()
}

/// Number of records seen, capped at the buffer size
pub fn log_count() -> usize {
    LOG_COUNT.load(Ordering::SeqCst).min(MAX_LOG_ENTRIES)
}

/// Drop all recorded entries
pub fn clear() {
    let mut buffer = LOG_BUFFER.lock();
    buffer.clear();
    LOG_COUNT.store(0, Ordering::SeqCst);
}

use std::fs;
use std::sync::{Mutex, MutexGuard, PoisonError};

static LOCK: Mutex<()> = Mutex::new(());

/// Serialises tests that fork or count descriptors.
pub fn lock() -> MutexGuard<'static, ()> {
	LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn open_fd_count() -> usize {
	fs::read_dir("/proc/self/fd").unwrap().count()
}

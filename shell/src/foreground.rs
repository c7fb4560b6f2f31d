use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{info, warn};

const IDLE: i32 = 0;

/// The pid currently entitled to forwarded interrupt/suspend signals, if any.
///
/// Clones share the same slot, so the signal thread and the evaluator observe one value.
#[derive(Debug, Clone, Default)]
pub struct ForegroundState {
	pid: Arc<AtomicI32>,
}

impl ForegroundState {
	pub fn new() -> ForegroundState {
		ForegroundState::default()
	}

	pub fn current(&self) -> Option<Pid> {
		match self.pid.load(Ordering::SeqCst) {
			IDLE => None,
			raw => Some(Pid::from_raw(raw)),
		}
	}

	/// Marks `pid` as the foreground process until the returned guard is dropped.
	pub fn claim(&self, pid: Pid) -> ForegroundGuard<'_> {
		self.pid.store(pid.as_raw(), Ordering::SeqCst);
		ForegroundGuard { state: self }
	}

	/// Sends `sig` to the foreground process. Returns the pid it went to.
	pub fn forward(&self, sig: Signal) -> Option<Pid> {
		let pid = self.current()?;
		match signal::kill(pid, sig) {
			Ok(()) => {
				info!(pid = pid.as_raw(), signal = %sig, "forwarded signal");
				Some(pid)
			},
			// exited between the load and the kill
			Err(Errno::ESRCH) => None,
			Err(e) => {
				warn!(pid = pid.as_raw(), signal = %sig, error = %e, "cannot forward signal");
				None
			},
		}
	}
}

#[must_use]
#[derive(Debug)]
pub struct ForegroundGuard<'a> {
	state: &'a ForegroundState,
}

impl<'a> Drop for ForegroundGuard<'a> {
	fn drop(&mut self) {
		self.state.pid.store(IDLE, Ordering::SeqCst);
	}
}

/// User-facing line for a signal received at the prompt.
pub fn describe(sig: Signal, target: Option<Pid>) -> String {
	match (sig, target) {
		(Signal::SIGINT, Some(pid)) => format!("Process {} interrupted by SIGINT", pid),
		(Signal::SIGTSTP, Some(pid)) => format!("[1]+ Stopped    (Process {})", pid),
		(sig, Some(pid)) => format!("Process {} received {}", pid, sig),
		(_, None) => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::job::{try_reap, wait_stage, ExitOutcome};
	use crate::spawn::{spawn, StdioOverrides};
	use crate::test_util;
	use crate::types::Command;

	fn sleeper() -> Pid {
		let command = Command::new(vec!["sleep".to_string(), "30".to_string()]).unwrap();
		spawn(&command, StdioOverrides::default()).unwrap()
	}

	#[test]
	fn guard_returns_to_idle() {
		let fg = ForegroundState::new();
		assert_eq!(fg.current(), None);
		{
			let _guard = fg.claim(Pid::from_raw(1234));
			assert_eq!(fg.clone().current(), Some(Pid::from_raw(1234)));
		}
		assert_eq!(fg.current(), None);
	}

	#[test]
	fn idle_forward_has_no_target() {
		let fg = ForegroundState::new();
		assert_eq!(fg.forward(Signal::SIGINT), None);
		assert_eq!(describe(Signal::SIGINT, None), "");
	}

	#[test]
	fn interrupt_reaches_only_the_foreground_process() {
		let _lock = test_util::lock();
		let fg = ForegroundState::new();
		let background = sleeper();
		let foreground = sleeper();

		let outcome = {
			let _guard = fg.claim(foreground);
			assert_eq!(fg.forward(Signal::SIGINT), Some(foreground));
			wait_stage(foreground).unwrap()
		};
		assert_eq!(outcome, ExitOutcome::Signaled(Signal::SIGINT));
		assert_eq!(try_reap(background).unwrap(), None);

		assert_eq!(fg.forward(Signal::SIGINT), None);
		assert_eq!(try_reap(background).unwrap(), None);

		signal::kill(background, Signal::SIGKILL).unwrap();
		assert_eq!(wait_stage(background).unwrap(), ExitOutcome::Signaled(Signal::SIGKILL));
	}

	#[test]
	fn stopped_foreground_process_is_reported() {
		let _lock = test_util::lock();
		let fg = ForegroundState::new();
		let pid = sleeper();
		let outcome = {
			let _guard = fg.claim(pid);
			assert_eq!(fg.forward(Signal::SIGSTOP), Some(pid));
			wait_stage(pid).unwrap()
		};
		assert_eq!(outcome, ExitOutcome::Stopped(Signal::SIGSTOP));
		assert_eq!(fg.current(), None);

		signal::kill(pid, Signal::SIGKILL).unwrap();
		assert_eq!(wait_stage(pid).unwrap(), ExitOutcome::Signaled(Signal::SIGKILL));
	}

	#[test]
	fn describes_forwarded_signals() {
		let pid = Pid::from_raw(77);
		assert_eq!(describe(Signal::SIGINT, Some(pid)), "Process 77 interrupted by SIGINT");
		assert_eq!(describe(Signal::SIGTSTP, Some(pid)), "[1]+ Stopped    (Process 77)");
	}
}

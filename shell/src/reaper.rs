use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nix::unistd::Pid;
use tracing::{info, warn};

use crate::job::{self, ExitOutcome};

/// Collects background and suspended children without blocking the prompt.
///
/// Only pids handed over with [`Reaper::track`] are ever waited on, so foreground waits in the
/// evaluator never lose a status to the reaper.
#[derive(Debug, Clone, Default)]
pub struct Reaper {
	pids: Arc<Mutex<Vec<Pid>>>,
}

impl Reaper {
	pub fn new() -> Reaper {
		Reaper::default()
	}

	fn pids(&self) -> MutexGuard<'_, Vec<Pid>> {
		self.pids.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn track(&self, pid: Pid) {
		self.pids().push(pid);
	}

	#[cfg(test)]
	pub(crate) fn pending(&self) -> usize {
		self.pids().len()
	}

	#[cfg(test)]
	pub(crate) fn tracked(&self) -> Vec<Pid> {
		self.pids().clone()
	}

	/// Reaps every tracked child that has terminated.
	pub fn reap(&self) -> Vec<(Pid, ExitOutcome)> {
		let mut done = vec![];
		self.pids().retain(|&pid| match job::try_reap(pid) {
			Ok(None) => true,
			Ok(Some(outcome)) => {
				info!(pid = pid.as_raw(), %outcome, "reaped background process");
				done.push((pid, outcome));
				false
			},
			Err(e) => {
				warn!(pid = pid.as_raw(), error = %e, "dropping untrackable process");
				false
			},
		});
		done
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::spawn::{spawn, StdioOverrides};
	use crate::test_util;
	use crate::types::Command;
	use std::thread;
	use std::time::{Duration, Instant};

	fn sh(script: &str) -> Pid {
		let command = Command::new(vec!["sh".to_string(), "-c".to_string(), script.to_string()]).unwrap();
		spawn(&command, StdioOverrides::default()).unwrap()
	}

	#[test]
	fn reaps_only_finished_children() {
		let _lock = test_util::lock();
		let reaper = Reaper::new();
		let quick = sh("exit 3");
		let slow = sh("sleep 30");
		reaper.track(quick);
		reaper.track(slow);

		let deadline = Instant::now() + Duration::from_secs(10);
		let mut done = vec![];
		while done.is_empty() && Instant::now() < deadline {
			done = reaper.reap();
			thread::sleep(Duration::from_millis(20));
		}
		assert_eq!(done, vec![(quick, ExitOutcome::Exited(3))]);
		assert_eq!(reaper.pending(), 1);

		nix::sys::signal::kill(slow, nix::sys::signal::Signal::SIGKILL).unwrap();
		let deadline = Instant::now() + Duration::from_secs(10);
		while reaper.pending() > 0 && Instant::now() < deadline {
			reaper.reap();
			thread::sleep(Duration::from_millis(20));
		}
		assert_eq!(reaper.pending(), 0);
	}
}

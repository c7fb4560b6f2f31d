use std::fmt;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

/// How a waited-on process left the running state.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ExitOutcome {
	Exited(i32),
	Signaled(Signal),
	Stopped(Signal),
}

impl ExitOutcome {
	/// Shell-style status: the exit code, or 128 plus the signal number.
	pub fn code(self) -> i32 {
		match self {
			ExitOutcome::Exited(code) => code,
			ExitOutcome::Signaled(sig) | ExitOutcome::Stopped(sig) => 128 + sig as i32,
		}
	}

	pub fn is_stopped(self) -> bool {
		matches!(self, ExitOutcome::Stopped(_))
	}
}

impl fmt::Display for ExitOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match *self {
			ExitOutcome::Exited(code) => write!(f, "exit {}", code),
			ExitOutcome::Signaled(sig) => write!(f, "killed by {}", sig),
			ExitOutcome::Stopped(sig) => write!(f, "stopped by {}", sig),
		}
	}
}

pub trait WaitStatusExt {
	fn outcome(self) -> Option<ExitOutcome>;
}

impl WaitStatusExt for WaitStatus {
	fn outcome(self) -> Option<ExitOutcome> {
		match self {
			WaitStatus::Exited(_, code) => Some(ExitOutcome::Exited(code)),
			WaitStatus::Signaled(_, sig, _) => Some(ExitOutcome::Signaled(sig)),
			WaitStatus::Stopped(_, sig) => Some(ExitOutcome::Stopped(sig)),
			_ => None,
		}
	}
}

/// One spawned stage of a running pipeline.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct StageHandle {
	pub index: usize,
	pub pid: Pid,
}

/// Blocks until `pid` terminates or stops.
pub fn wait_stage(pid: Pid) -> nix::Result<ExitOutcome> {
	loop {
		match wait::waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
			Ok(status) => if let Some(outcome) = status.outcome() {
				return Ok(outcome);
			},
			Err(Errno::EINTR) => {},
			Err(e) => return Err(e),
		}
	}
}

/// Collects `pid` if it has already terminated. Stops are not reported.
pub fn try_reap(pid: Pid) -> nix::Result<Option<ExitOutcome>> {
	match wait::waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
		Ok(WaitStatus::StillAlive) => Ok(None),
		Ok(status) => Ok(status.outcome().filter(|o| !o.is_stopped())),
		Err(Errno::EINTR) => Ok(None),
		Err(e) => Err(e),
	}
}

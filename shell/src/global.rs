use std::path::PathBuf;

use nix::unistd::Pid;

use crate::error::{ExecError, ExecResult};
use crate::foreground::ForegroundState;
use crate::history::History;
use crate::job::{self, ExitOutcome};
use crate::reaper::Reaper;

pub struct State {
	pub foreground: ForegroundState,
	pub reaper: Reaper,
	pub last_status: i32,
	pub exit_requested: Option<i32>,
	pub previous_dir: Option<PathBuf>,
	pub history: History,
}

impl State {
	pub fn new() -> State {
		State {
			foreground: ForegroundState::new(),
			reaper: Reaper::new(),
			last_status: 0,
			exit_requested: None,
			previous_dir: None,
			history: History::new(),
		}
	}

	/// Waits for `pid` with it marked as the foreground process. A stopped process is handed to
	/// the reaper so it is still collected if it later dies.
	pub fn wait_foreground(&self, pid: Pid) -> ExecResult<ExitOutcome> {
		let outcome = {
			let _guard = self.foreground.claim(pid);
			job::wait_stage(pid).map_err(ExecError::Wait)?
		};
		if outcome.is_stopped() {
			self.reaper.track(pid);
		}
		Ok(outcome)
	}
}

impl Default for State {
	fn default() -> State {
		State::new()
	}
}

use std::mem;

use nix::fcntl::OFlag;
use nix::unistd;
use tracing::{debug, warn};

use crate::error::{ExecError, ExecResult};
use crate::global;
use crate::job::{ExitOutcome, StageHandle};
use crate::redirect;
use crate::spawn::{self, StdioOverrides, Stream};
use crate::types::{Command, RedirectionSpec};

/// Stages that were started before a pipeline failed to build.
#[derive(Debug)]
pub struct PartialSpawn {
	pub stages: Vec<StageHandle>,
	pub error: ExecError,
}

/// Starts every stage of the pipeline, linking each stage's stdout to the next stage's stdin.
///
/// The parent's copy of a link's write end is closed as soon as the stage writing to it has been
/// spawned, and the read end as soon as the stage reading from it has. Links are close-on-exec, so
/// no stage carries any handle past program load other than its own stdin and stdout. On error no
/// further stage is started and the already running ones are returned alongside the error.
pub fn spawn_stages(commands: &[Command], spec: &RedirectionSpec) -> Result<Vec<StageHandle>, PartialSpawn> {
	assert!(!commands.is_empty());

	let StdioOverrides { stdin: mut input, stdout: output } = redirect::open_overrides(spec)
		.map_err(|error| PartialSpawn { stages: vec![], error })?;
	let mut output = Some(output);
	let last = commands.len() - 1;
	let mut stages = Vec::with_capacity(commands.len());

	for (index, command) in commands.iter().enumerate() {
		let (stdout, next_input) = if index == last {
			(output.take().unwrap_or_default(), None)
		} else {
			match unistd::pipe2(OFlag::O_CLOEXEC) {
				Ok((read, write)) => {
					debug!(link = index, "allocated stage link");
					(Stream::Handle(write), Some(read))
				},
				Err(e) => return Err(PartialSpawn { stages, error: ExecError::Pipe(e) }),
			}
		};

		let overrides = StdioOverrides { stdin: mem::take(&mut input), stdout };
		match spawn::spawn(command, overrides) {
			Ok(pid) => stages.push(StageHandle { index, pid }),
			Err(e) => return Err(PartialSpawn { stages, error: e.into() }),
		}
		if let Some(read) = next_input {
			input = Stream::Handle(read);
		}
	}
	Ok(stages)
}

/// Waits for every stage in order, each one owning the foreground while it is waited on.
/// The result is the last stage's outcome, unless a stage stops, in which case the stopped stage
/// and those not yet waited on go to the reaper. A failed wait also hands the remaining stages to
/// the reaper before the error is returned.
fn wait_stages(state: &global::State, stages: &[StageHandle]) -> ExecResult<Option<ExitOutcome>> {
	let mut last = None;
	for (n, stage) in stages.iter().enumerate() {
		let outcome = match state.wait_foreground(stage.pid) {
			Ok(outcome) => outcome,
			Err(e) => {
				track_rest(state, &stages[n + 1..]);
				return Err(e);
			},
		};
		debug!(stage = stage.index, pid = stage.pid.as_raw(), %outcome, "stage finished");
		if outcome.is_stopped() {
			track_rest(state, &stages[n + 1..]);
			return Ok(Some(outcome));
		}
		last = Some(outcome);
	}
	Ok(last)
}

fn track_rest(state: &global::State, stages: &[StageHandle]) {
	for stage in stages {
		state.reaper.track(stage.pid);
	}
}

/// Collects the stages started before `error` stopped the pipeline, then hands the error back.
fn abort_stages(state: &global::State, stages: &[StageHandle], total: usize, error: ExecError) -> ExecError {
	warn!(spawned = stages.len(), total, %error, "pipeline aborted");
	if let Err(e) = wait_stages(state, stages) {
		warn!(error = %e, "cannot collect stages of aborted pipeline");
	}
	error
}

/// Runs the pipeline in the foreground and returns the last stage's outcome.
pub fn run_pipeline(state: &global::State, commands: &[Command], spec: &RedirectionSpec) -> ExecResult<ExitOutcome> {
	match spawn_stages(commands, spec) {
		Ok(stages) => {
			let outcome = wait_stages(state, &stages)?;
			// spawn_stages returns one handle per command
			Ok(outcome.unwrap_or(ExitOutcome::Exited(0)))
		},
		Err(PartialSpawn { stages, error }) => Err(abort_stages(state, &stages, commands.len(), error)),
	}
}

/// Starts the pipeline without waiting. Every started stage is handed to the reaper.
pub fn launch_pipeline(state: &global::State, commands: &[Command], spec: &RedirectionSpec) -> ExecResult<Vec<StageHandle>> {
	match spawn_stages(commands, spec) {
		Ok(stages) => {
			track_rest(state, &stages);
			Ok(stages)
		},
		Err(PartialSpawn { stages, error }) => {
			warn!(spawned = stages.len(), total = commands.len(), %error, "background pipeline aborted");
			track_rest(state, &stages);
			Err(error)
		},
	}
}

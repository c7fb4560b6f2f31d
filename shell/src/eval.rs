use nix::unistd::Pid;
use tracing::{debug, info};

use crate::builtin;
use crate::error::ExecResult;
use crate::global;
use crate::parser;
use crate::pipeline;
use crate::redirect;
use crate::types::ParsedPipeline;

#[derive(Debug, PartialEq, Eq)]
pub enum EvalResult {
	Done(i32),
	/// Started without waiting; carries the last stage's pid.
	Background(Pid),
}

fn launch_background(state: &global::State, pipeline: &ParsedPipeline) -> ExecResult<Pid> {
	let commands = &pipeline.commands;
	let pid = if commands.len() == 1 {
		let pid = redirect::spawn_one(&commands[0], &pipeline.redirection)?;
		state.reaper.track(pid);
		pid
	} else {
		let stages = pipeline::launch_pipeline(state, commands, &pipeline.redirection)?;
		stages[stages.len() - 1].pid
	};
	info!(pid = pid.as_raw(), stages = commands.len(), "started background job");
	Ok(pid)
}

pub fn eval(state: &mut global::State, pipeline: &ParsedPipeline) -> ExecResult<EvalResult> {
	let commands = &pipeline.commands;
	assert!(!commands.is_empty());

	if pipeline.is_background {
		return launch_background(state, pipeline).map(EvalResult::Background);
	}

	if pipeline.is_plain() {
		if let Some(func) = builtin::match_builtin(commands[0].program()) {
			return Ok(EvalResult::Done(func(state, commands[0].arguments())));
		}
	}

	let outcome = if commands.len() == 1 {
		redirect::run_one(state, &commands[0], &pipeline.redirection)?
	} else {
		pipeline::run_pipeline(state, commands, &pipeline.redirection)?
	};
	debug!(%outcome, "foreground job finished");
	Ok(EvalResult::Done(outcome.code()))
}

/// Parses and runs one input line, reporting errors on stderr. Returns the last status.
pub fn run_line(state: &mut global::State, line: &str) -> i32 {
	let pipelines = match parser::parse_line(line) {
		Ok(pipelines) => pipelines,
		Err(e) => {
			eprintln!("pipesh: {}", e);
			state.last_status = 2;
			return state.last_status;
		},
	};
	for pipeline in &pipelines {
		if state.exit_requested.is_some() {
			break;
		}
		state.last_status = match eval(state, pipeline) {
			Ok(EvalResult::Done(status)) => status,
			Ok(EvalResult::Background(pid)) => {
				println!("[1] {}", pid);
				0
			},
			Err(e) => {
				eprintln!("pipesh: {}", e);
				e.status()
			},
		};
	}
	state.last_status
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::spawn;
	use crate::test_util;
	use std::fs;
	use std::time::{Duration, Instant};

	#[test]
	fn routes_by_shape() {
		let _lock = test_util::lock();
		let mut state = global::State::new();
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("out.txt");

		let plain = parser::parse("true").unwrap().unwrap();
		assert_eq!(eval(&mut state, &plain).unwrap(), EvalResult::Done(0));

		let line = format!("printf routed > {}", out.display());
		let single = parser::parse(&line).unwrap().unwrap();
		assert_eq!(eval(&mut state, &single).unwrap(), EvalResult::Done(0));
		assert_eq!(fs::read_to_string(&out).unwrap(), "routed");

		let line = format!("printf routed | wc -c >> {}", out.display());
		let chain = parser::parse(&line).unwrap().unwrap();
		assert_eq!(eval(&mut state, &chain).unwrap(), EvalResult::Done(0));
		assert!(fs::read_to_string(&out).unwrap().starts_with("routed"));

		let missing = parser::parse("pipesh-no-such-program-xyz").unwrap().unwrap();
		assert_eq!(eval(&mut state, &missing).unwrap(), EvalResult::Done(spawn::EXIT_NOT_FOUND));
	}

	#[test]
	fn builtins_do_not_run_inside_pipelines() {
		let _lock = test_util::lock();
		let mut state = global::State::new();
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("out.txt");
		let line = format!("exit 3 > {}", out.display());
		let redirected = parser::parse(&line).unwrap().unwrap();
		assert_eq!(eval(&mut state, &redirected).unwrap(), EvalResult::Done(spawn::EXIT_NOT_FOUND));
		assert_eq!(state.exit_requested, None);

		let plain = parser::parse("exit 3").unwrap().unwrap();
		assert_eq!(eval(&mut state, &plain).unwrap(), EvalResult::Done(3));
		assert_eq!(state.exit_requested, Some(3));
	}

	#[test]
	fn parse_error_runs_nothing() {
		let _lock = test_util::lock();
		let mut state = global::State::new();
		let dir = tempfile::tempdir().unwrap();
		let marker = dir.path().join("marker");
		let line = format!("printf x > {} ; cat >", marker.display());
		assert_eq!(run_line(&mut state, &line), 2);
		assert!(!marker.exists());
	}

	#[test]
	fn background_returns_last_stage_pid_without_blocking() {
		let _lock = test_util::lock();
		let mut state = global::State::new();
		let started = Instant::now();
		let pipeline = parser::parse("sleep 30 | sleep 30 &").unwrap().unwrap();
		let pid = match eval(&mut state, &pipeline).unwrap() {
			EvalResult::Background(pid) => pid,
			other => panic!("unexpected {:?}", other),
		};
		assert!(started.elapsed() < Duration::from_secs(5));
		assert_eq!(state.reaper.pending(), 2);

		nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGKILL).unwrap();
		let deadline = Instant::now() + Duration::from_secs(10);
		let mut done = vec![];
		while done.is_empty() && Instant::now() < deadline {
			done = state.reaper.reap();
			std::thread::sleep(Duration::from_millis(20));
		}
		assert_eq!(done.len(), 1);
		assert_eq!(done[0].0, pid);
		assert_eq!(state.reaper.pending(), 1);

		for rest in state.reaper.tracked() {
			nix::sys::signal::kill(rest, nix::sys::signal::Signal::SIGKILL).unwrap();
		}
		let deadline = Instant::now() + Duration::from_secs(10);
		while state.reaper.pending() > 0 && Instant::now() < deadline {
			state.reaper.reap();
			std::thread::sleep(Duration::from_millis(20));
		}
		assert_eq!(state.reaper.pending(), 0);
	}
}

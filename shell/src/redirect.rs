use std::fs::OpenOptions;
use std::os::fd::OwnedFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use nix::unistd::Pid;

use crate::error::{ExecError, ExecResult};
use crate::global;
use crate::job::ExitOutcome;
use crate::spawn::{self, StdioOverrides, Stream};
use crate::types::{Command, RedirectionSpec};

const OUTPUT_MODE: u32 = 0o644;

pub fn open_input(path: &Path) -> ExecResult<OwnedFd> {
	OpenOptions::new()
		.read(true)
		.open(path)
		.map(OwnedFd::from)
		.map_err(|source| ExecError::File { path: path.to_owned(), source })
}

pub fn open_output(path: &Path, append: bool) -> ExecResult<OwnedFd> {
	let mut oopt = OpenOptions::new();
	if append {
		oopt.append(true);
	} else {
		oopt.write(true).truncate(true);
	}
	oopt.create(true)
		.mode(OUTPUT_MODE)
		.open(path)
		.map(OwnedFd::from)
		.map_err(|source| ExecError::File { path: path.to_owned(), source })
}

/// Opens the redirection targets of `spec`. Nothing is left open on failure.
pub fn open_overrides(spec: &RedirectionSpec) -> ExecResult<StdioOverrides> {
	let stdin = match &spec.input {
		Some(path) => Stream::Handle(open_input(path)?),
		None => Stream::Inherit,
	};
	let stdout = match &spec.output {
		Some(path) => Stream::Handle(open_output(path, spec.append)?),
		None => Stream::Inherit,
	};
	Ok(StdioOverrides { stdin, stdout })
}

/// Starts `command` with the redirections in `spec` without waiting for it.
pub fn spawn_one(command: &Command, spec: &RedirectionSpec) -> ExecResult<Pid> {
	let overrides = open_overrides(spec)?;
	Ok(spawn::spawn(command, overrides)?)
}

/// Runs `command` in the foreground with the redirections in `spec`.
pub fn run_one(state: &global::State, command: &Command, spec: &RedirectionSpec) -> ExecResult<ExitOutcome> {
	let pid = spawn_one(command, spec)?;
	state.wait_foreground(pid)
}

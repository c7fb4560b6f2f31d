use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::parser::ParseError;
use crate::spawn::SpawnError;

pub type ExecResult<T> = Result<T, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
	#[error("parse error: {0}")]
	Parse(#[from] ParseError),

	#[error("{}: {source}", .path.display())]
	File {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("cannot create pipe: {0}")]
	Pipe(#[source] nix::Error),

	#[error(transparent)]
	Spawn(#[from] SpawnError),

	#[error("wait failed: {0}")]
	Wait(#[source] nix::Error),
}

impl ExecError {
	/// Pipe or process allocation failed.
	#[cfg(test)]
	pub(crate) fn is_resource(&self) -> bool {
		matches!(self, ExecError::Pipe(_) | ExecError::Spawn(SpawnError::Fork(_)))
	}

	/// Status reported to the prompt for this failure.
	pub fn status(&self) -> i32 {
		match self {
			ExecError::Parse(_) => 2,
			_ => 1,
		}
	}
}

use std::collections::VecDeque;
use std::env;
use std::path::PathBuf;

/// Number of lines kept in memory and in the history file.
pub const HISTORY_SIZE: usize = 20;
/// Number of lines `history` shows without an argument.
pub const DEFAULT_SHOWN: usize = 10;

const HISTORY_FILE: &str = ".pipesh_history";

/// `$HOME/.pipesh_history`, or the file in the working directory when `HOME` is unset.
pub fn file_path() -> PathBuf {
	match env::var_os("HOME") {
		Some(home) if !home.is_empty() => PathBuf::from(home).join(HISTORY_FILE),
		_ => PathBuf::from(HISTORY_FILE),
	}
}

/// Lines entered at the prompt, oldest first, capped at [`HISTORY_SIZE`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct History {
	lines: VecDeque<String>,
}

impl History {
	pub fn new() -> History {
		History::default()
	}

	/// Records `line` unless it is blank or repeats the previous entry.
	pub fn push(&mut self, line: &str) {
		let line = line.trim();
		if line.is_empty() || self.lines.back().map(String::as_str) == Some(line) {
			return;
		}
		if self.lines.len() == HISTORY_SIZE {
			self.lines.pop_front();
		}
		self.lines.push_back(line.to_owned());
	}

	/// The most recent `n` lines, oldest first.
	pub fn last(&self, n: usize) -> impl Iterator<Item = &str> {
		self.lines.iter().skip(self.lines.len().saturating_sub(n)).map(String::as_str)
	}
}

impl<'a> Extend<&'a str> for History {
	fn extend<I: IntoIterator<Item = &'a str>>(&mut self, iter: I) {
		for line in iter {
			self.push(line);
		}
	}
}

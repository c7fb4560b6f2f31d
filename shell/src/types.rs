use std::fmt;
use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectType { Input, Output, Append }

impl RedirectType {
	pub fn operator(self) -> &'static str {
		match self {
			RedirectType::Input => "<",
			RedirectType::Output => ">",
			RedirectType::Append => ">>",
		}
	}
}

impl fmt::Display for RedirectType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.operator())
	}
}

/// A program name followed by its arguments. Never empty.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Command {
	argv: Vec<String>,
}

impl Command {
	pub fn new(argv: Vec<String>) -> Option<Command> {
		if argv.is_empty() {
			None
		} else {
			Some(Command { argv })
		}
	}

	pub fn program(&self) -> &str {
		&self.argv[0]
	}

	pub fn arguments(&self) -> &[String] {
		&self.argv[1..]
	}

	pub fn argv(&self) -> &[String] {
		&self.argv
	}
}

impl fmt::Display for Command {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.argv.join(" "))
	}
}

/// File overrides for the first stage's input and the last stage's output.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct RedirectionSpec {
	pub input: Option<PathBuf>,
	pub output: Option<PathBuf>,
	pub append: bool,
}

impl RedirectionSpec {
	pub fn is_empty(&self) -> bool {
		self.input.is_none() && self.output.is_none()
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParsedPipeline {
	pub commands: Vec<Command>,
	pub redirection: RedirectionSpec,
	pub is_background: bool,
}

impl ParsedPipeline {
	/// A lone command with no redirection runs as a plain invocation.
	pub fn is_plain(&self) -> bool {
		self.commands.len() == 1 && self.redirection.is_empty()
	}
}

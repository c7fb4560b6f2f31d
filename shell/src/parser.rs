use std::path::PathBuf;

use thiserror::Error;

use crate::types::*;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ParseError {
	#[error("missing filename after '{0}'")]
	MissingTarget(RedirectType),
	#[error("empty command in pipeline")]
	EmptyCommand,
	#[error("'{0}' is only allowed on the {1} command of a pipeline")]
	MisplacedRedirect(RedirectType, &'static str),
	#[error("unexpected '{0}' after '&'")]
	MisplacedAmpersand(char),
}

type ParseResult<T> = Result<T, ParseError>;

struct Stage {
	argv: Vec<String>,
	input: Option<PathBuf>,
	output: Option<(PathBuf, RedirectType)>,
}

struct Parser<'a> {
	line: &'a str,
	i: usize,
}

impl<'a> Parser<'a> {
	fn peek(&self) -> Option<u8> {
		self.line.as_bytes().get(self.i).copied()
	}

	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.peek() {
			if !f(c) { break; }
			self.i += 1;
		}
	}

	fn is_whitespace(c: u8) -> bool {
		matches!(c, b' ' | b'\t' | b'\n' | b'\r')
	}

	fn is_letter(c: u8) -> bool {
		match c {
			b'>' | b'<' | b'&' | b'|' | b';' => false,
			_ => !Parser::is_whitespace(c),
		}
	}

	fn skip_whitespaces(&mut self) {
		self.proceed_while(Parser::is_whitespace);
	}

	fn read_word(&mut self) -> &'a str {
		let orig = self.i;
		self.proceed_while(Parser::is_letter);
		&self.line[orig .. self.i]
	}

	fn read_redirect_type(&mut self) -> Option<RedirectType> {
		match self.peek() {
			Some(b'<') => {
				self.i += 1;
				Some(RedirectType::Input)
			},
			Some(b'>') => if self.line.as_bytes().get(self.i + 1) == Some(&b'>') {
				self.i += 2;
				Some(RedirectType::Append)
			} else {
				self.i += 1;
				Some(RedirectType::Output)
			},
			_ => None,
		}
	}

	fn parse_stage(&mut self) -> ParseResult<Stage> {
		let mut stage = Stage { argv: vec![], input: None, output: None };
		loop {
			self.skip_whitespaces();
			if let Some(typ) = self.read_redirect_type() {
				self.skip_whitespaces();
				let target = self.read_word();
				if target.is_empty() {
					return Err(ParseError::MissingTarget(typ));
				}
				let target = PathBuf::from(target);
				match typ {
					RedirectType::Input => stage.input = Some(target),
					_ => stage.output = Some((target, typ)),
				}
				continue;
			}
			let word = self.read_word();
			if word.is_empty() {
				break;
			}
			stage.argv.push(word.to_owned());
		}
		Ok(stage)
	}

	fn parse_pipeline(&mut self) -> ParseResult<Option<ParsedPipeline>> {
		let mut stages: Vec<Stage> = vec![];
		let mut is_background = false;

		self.skip_whitespaces();
		if matches!(self.peek(), None | Some(b';')) {
			self.i += 1;
			return Ok(None);
		}

		loop {
			let stage = self.parse_stage()?;
			if stage.argv.is_empty() {
				return Err(ParseError::EmptyCommand);
			}
			stages.push(stage);
			match self.peek() {
				Some(b'|') => { self.i += 1; },
				Some(b'&') => {
					self.i += 1;
					is_background = true;
					self.skip_whitespaces();
					match self.peek() {
						None => {},
						Some(b';') => { self.i += 1; },
						Some(c) => { return Err(ParseError::MisplacedAmpersand(c as char)); },
					}
					break;
				},
				Some(b';') => {
					self.i += 1;
					break;
				},
				_ => { break; },
			}
		}

		build_pipeline(stages, is_background).map(Some)
	}

	fn parse_line(&mut self) -> ParseResult<Vec<ParsedPipeline>> {
		let mut pipelines = vec![];
		while self.i < self.line.len() {
			if let Some(pipeline) = self.parse_pipeline()? {
				pipelines.push(pipeline);
			}
		}
		Ok(pipelines)
	}
}

fn build_pipeline(stages: Vec<Stage>, is_background: bool) -> ParseResult<ParsedPipeline> {
	let last = stages.len() - 1;
	let mut redirection = RedirectionSpec::default();
	let mut commands = Vec::with_capacity(stages.len());
	for (i, stage) in stages.into_iter().enumerate() {
		if let Some(input) = stage.input {
			if i != 0 {
				return Err(ParseError::MisplacedRedirect(RedirectType::Input, "first"));
			}
			redirection.input = Some(input);
		}
		if let Some((output, typ)) = stage.output {
			if i != last {
				return Err(ParseError::MisplacedRedirect(typ, "last"));
			}
			redirection.output = Some(output);
			redirection.append = typ == RedirectType::Append;
		}
		commands.extend(Command::new(stage.argv));
	}
	Ok(ParsedPipeline { commands, redirection, is_background })
}

/// Parses a single pipeline. Blank input yields `Ok(None)`.
pub fn parse(line: &str) -> ParseResult<Option<ParsedPipeline>> {
	let mut pipelines = parse_line(line)?;
	Ok(if pipelines.is_empty() { None } else { Some(pipelines.swap_remove(0)) })
}

/// Parses every `;`-separated pipeline on the line. One malformed pipeline rejects the whole line.
pub fn parse_line(line: &str) -> ParseResult<Vec<ParsedPipeline>> {
	let mut parser = Parser { line, i: 0 };
	parser.parse_line()
}

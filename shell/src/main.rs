use std::process;

use clap::Parser;
use pipesh::{eval, history, signal, State};
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// pipesh - run pipelines of programs with file redirection
#[derive(Parser, Debug)]
#[command(name = "pipesh", version, about)]
struct Args {
	/// Execute one command line and exit with its status
	#[arg(short = 'c')]
	command: Option<String>,

	/// Prompt shown before each line
	#[arg(long, env = "PIPESH_PROMPT", default_value = "pipesh> ")]
	prompt: String,

	/// Log filter, e.g. `debug` or `pipesh=trace`
	#[arg(long = "log", env = "PIPESH_LOG", default_value = "warn")]
	log: String,
}

fn init_logging(filter: &str) {
	tracing_subscriber::registry()
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.with(EnvFilter::new(filter))
		.init();
}

fn editor() -> rustyline::Result<DefaultEditor> {
	let config = Config::builder()
		.max_history_size(history::HISTORY_SIZE)?
		.history_ignore_dups(true)?
		.auto_add_history(false)
		.build();
	DefaultEditor::with_config(config)
}

fn repl(state: &mut State, prompt: &str) -> i32 {
	let mut rl = match editor() {
		Ok(rl) => rl,
		Err(e) => {
			eprintln!("pipesh: {}", e);
			return 1;
		},
	};
	let history_path = history::file_path();
	if let Err(e) = rl.load_history(&history_path) {
		debug!(path = %history_path.display(), error = %e, "no history loaded");
	}
	state.history.extend(rl.history().iter().map(String::as_str));

	loop {
		match rl.readline(prompt) {
			Ok(line) => {
				let entry = line.trim();
				if entry.is_empty() {
					continue;
				}
				let _ = rl.add_history_entry(entry);
				state.history.push(entry);
				if let Err(e) = rl.save_history(&history_path) {
					warn!(path = %history_path.display(), error = %e, "cannot save history");
				}
				eval::run_line(state, &line);
				if let Some(code) = state.exit_requested {
					return code;
				}
			},
			Err(ReadlineError::Interrupted) => continue,
			Err(ReadlineError::Eof) => {
				println!("Exiting the shell..");
				return state.last_status;
			},
			Err(e) => {
				eprintln!("pipesh: {}", e);
				return 1;
			},
		}
	}
}

fn main() {
	let args = Args::parse();
	init_logging(&args.log);

	let mut state = State::new();
	if let Err(e) = signal::install(state.foreground.clone(), state.reaper.clone()) {
		warn!(error = %e, "signal forwarding disabled");
	}

	let status = match args.command {
		Some(line) => eval::run_line(&mut state, &line),
		None => repl(&mut state, &args.prompt),
	};
	process::exit(status);
}

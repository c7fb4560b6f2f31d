use std::env;
use std::path::PathBuf;

use crate::global;
use crate::history;

pub type Builtin = fn(&mut global::State, &[String]) -> i32;

pub fn builtin_cd(state: &mut global::State, args: &[String]) -> i32 {
	if args.len() > 1 {
		eprintln!("pipesh: cd: too many arguments");
		return 1;
	}
	let target = match args.first().map(String::as_str) {
		None | Some("~") => match env::var_os("HOME") {
			Some(home) => PathBuf::from(home),
			None => {
				eprintln!("pipesh: cd: HOME not set");
				return 1;
			},
		},
		Some("-") => match state.previous_dir.clone() {
			Some(dir) => dir,
			None => {
				eprintln!("pipesh: cd: no previous directory");
				return 1;
			},
		},
		Some(dir) => PathBuf::from(dir),
	};
	let current = env::current_dir().ok();
	if let Err(e) = env::set_current_dir(&target) {
		eprintln!("pipesh: cd: {}: {}", target.display(), e);
		return 1;
	}
	state.previous_dir = current;
	0
}

pub fn builtin_pwd(_: &mut global::State, _: &[String]) -> i32 {
	match env::current_dir() {
		Ok(dir) => {
			println!("{}", dir.display());
			0
		},
		Err(e) => {
			eprintln!("pipesh: pwd: {}", e);
			1
		},
	}
}

pub fn builtin_exit(state: &mut global::State, args: &[String]) -> i32 {
	let code = match args.first() {
		None => state.last_status,
		Some(arg) => match arg.parse::<i32>() {
			Ok(code) => code & 0xff,
			Err(_) => {
				eprintln!("pipesh: exit: {}: numeric argument required", arg);
				2
			},
		},
	};
	state.exit_requested = Some(code);
	code
}

/// `history [n]`: the last `n` prompt lines, 10 by default.
pub fn builtin_history(state: &mut global::State, args: &[String]) -> i32 {
	let count = match args {
		[] => history::DEFAULT_SHOWN,
		[n] => match n.parse::<usize>() {
			Ok(n) => n,
			Err(_) => {
				eprintln!("pipesh: history: {}: numeric argument required", n);
				return 2;
			},
		},
		_ => {
			eprintln!("pipesh: history: too many arguments");
			return 1;
		},
	};
	for line in state.history.last(count) {
		println!("{}", line);
	}
	0
}

pub fn match_builtin(name: &str) -> Option<Builtin> {
	match name {
		"cd" => Some(builtin_cd),
		"pwd" => Some(builtin_pwd),
		"exit" => Some(builtin_exit),
		"history" => Some(builtin_history),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn exit_records_requested_status() {
		let mut state = global::State::new();
		state.last_status = 4;
		assert_eq!(builtin_exit(&mut state, &[]), 4);
		assert_eq!(state.exit_requested, Some(4));
		assert_eq!(builtin_exit(&mut state, &["300".to_string()]), 44);
		assert_eq!(builtin_exit(&mut state, &["x".to_string()]), 2);
	}

	#[test]
	fn history_rejects_bad_counts() {
		let mut state = global::State::new();
		state.history.push("true");
		assert_eq!(builtin_history(&mut state, &[]), 0);
		assert_eq!(builtin_history(&mut state, &["3".to_string()]), 0);
		assert_eq!(builtin_history(&mut state, &["-1".to_string()]), 2);
		assert_eq!(builtin_history(&mut state, &["1".to_string(), "2".to_string()]), 1);
	}

	#[test]
	fn only_shell_builtins_match() {
		assert!(match_builtin("cd").is_some());
		assert!(match_builtin("exit").is_some());
		assert!(match_builtin("history").is_some());
		assert!(match_builtin("ls").is_none());
	}
}

use std::io;
use std::thread;

use nix::sys::signal::Signal;
use signal_hook::consts::{SIGCHLD, SIGINT, SIGTSTP};
use signal_hook::iterator::Signals;
use tracing::debug;

use crate::foreground::{self, ForegroundState};
use crate::reaper::Reaper;

/// Starts the thread that forwards interrupt/suspend to the foreground process and reaps
/// background children on SIGCHLD.
pub fn install(foreground: ForegroundState, reaper: Reaper) -> io::Result<thread::JoinHandle<()>> {
	let mut signals = Signals::new([SIGINT, SIGTSTP, SIGCHLD])?;
	thread::Builder::new()
		.name("signals".to_string())
		.spawn(move || {
			for raw in signals.forever() {
				dispatch(&foreground, &reaper, raw);
			}
		})
}

fn dispatch(foreground: &ForegroundState, reaper: &Reaper, raw: i32) {
	if raw == SIGCHLD {
		for (pid, outcome) in reaper.reap() {
			println!("[done] {} {}", pid, outcome);
		}
		return;
	}
	let sig = match Signal::try_from(raw) {
		Ok(sig) => sig,
		Err(_) => return,
	};
	let target = foreground.forward(sig);
	debug!(signal = %sig, forwarded = target.is_some(), "received signal");
	println!();
	if target.is_some() {
		println!("{}", foreground::describe(sig, target));
	}
}

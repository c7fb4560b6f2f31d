use std::ffi::{CString, NulError};
use std::os::fd::{IntoRawFd, OwnedFd, RawFd};
use std::ptr;

use nix::errno::Errno;
use nix::fcntl::{self, FcntlArg, FdFlag};
use nix::unistd::{self, ForkResult, Pid};
use thiserror::Error;
use tracing::debug;

use crate::types::Command;

/// Exit status of a child whose program could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit status of a child whose program was found but could not be loaded.
pub const EXIT_CANNOT_EXECUTE: i32 = 126;

#[derive(Debug, Error)]
pub enum SpawnError {
	#[error("cannot create process: {0}")]
	Fork(#[source] nix::Error),
	#[error("argument contains a NUL byte: {0}")]
	NulByte(#[from] NulError),
}

/// Where a child's standard stream comes from.
#[derive(Debug)]
pub enum Stream {
	Inherit,
	Handle(OwnedFd),
}

impl Default for Stream {
	fn default() -> Stream {
		Stream::Inherit
	}
}

impl From<OwnedFd> for Stream {
	fn from(fd: OwnedFd) -> Stream {
		Stream::Handle(fd)
	}
}

#[derive(Debug, Default)]
pub struct StdioOverrides {
	pub stdin: Stream,
	pub stdout: Stream,
}

/// Forks a child running `command` with the given streams. The parent's copies of the override
/// handles are closed before this returns, whether or not the fork succeeded.
pub fn spawn(command: &Command, overrides: StdioOverrides) -> Result<Pid, SpawnError> {
	let argv = command.argv().iter().map(|a| CString::new(a.as_bytes())).collect::<Result<Vec<_>, _>>()?;
	let mut argv_ptrs: Vec<*const libc::c_char> = argv.iter().map(|a| a.as_ptr()).collect();
	argv_ptrs.push(ptr::null());

	// SAFETY: other threads may hold the allocator lock at fork time, so the child must not
	// allocate. Everything it needs is built above; it only calls dup2/fcntl/close, execvp, write
	// and _exit.
	match unsafe { unistd::fork() }.map_err(SpawnError::Fork)? {
		ForkResult::Parent { child } => {
			drop(overrides);
			debug!(pid = child.as_raw(), program = command.program(), "spawned");
			Ok(child)
		},
		ForkResult::Child => exec_child(&argv, &argv_ptrs, overrides),
	}
}

fn exec_child(argv: &[CString], argv_ptrs: &[*const libc::c_char], overrides: StdioOverrides) -> ! {
	let mut sources: [Option<RawFd>; 2] = [None, None];
	for (slot, (stream, target)) in [(overrides.stdin, libc::STDIN_FILENO), (overrides.stdout, libc::STDOUT_FILENO)].into_iter().enumerate() {
		if let Stream::Handle(fd) = stream {
			let fd = fd.into_raw_fd();
			if redirect_fd(fd, target).is_err() {
				child_exit(&argv[0], b": cannot set up standard streams\n", EXIT_CANNOT_EXECUTE);
			}
			sources[slot] = Some(fd);
		}
	}
	for fd in sources.iter().flatten() {
		if *fd != libc::STDIN_FILENO && *fd != libc::STDOUT_FILENO {
			let _ = unistd::close(*fd);
		}
	}

	unsafe { libc::execvp(argv[0].as_ptr(), argv_ptrs.as_ptr()) };
	match Errno::last() {
		Errno::ENOENT | Errno::ENOTDIR => child_exit(&argv[0], b": command not found\n", EXIT_NOT_FOUND),
		_ => child_exit(&argv[0], b": cannot execute\n", EXIT_CANNOT_EXECUTE),
	}
}

fn redirect_fd(fd: RawFd, target: RawFd) -> nix::Result<()> {
	if fd == target {
		// dup2 onto itself is a no-op, so clear close-on-exec by hand.
		fcntl::fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty()))?;
	} else {
		unistd::dup2(fd, target)?;
	}
	Ok(())
}

fn child_exit(program: &CString, message: &[u8], status: i32) -> ! {
	for part in [&b"pipesh: "[..], program.as_bytes(), message] {
		unsafe { libc::write(libc::STDERR_FILENO, part.as_ptr().cast(), part.len()) };
	}
	unsafe { libc::_exit(status) }
}

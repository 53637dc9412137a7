//! adb connection management
//!
//! One long-lived `adb shell` process serves every listing and file system
//! command. Each command is followed by an `echo` of a marker line so the
//! reader knows where its output ends. Transfers use separate one-shot
//! `adb push` / `adb pull` processes.

use std::process::{Output, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::config::AdbConfig;
use crate::error::ConnectionError;
use crate::logging::*;

const END_OF_COMMAND: &str = "ADBSYNC END OF COMMAND";

/// Quote one argument for the device's POSIX shell
pub fn quote(arg: &str) -> String {
	let safe = !arg.is_empty()
		&& arg.chars().all(|c| c.is_ascii_alphanumeric() || "_-./=:@%+,".contains(c));
	if safe {
		arg.to_string()
	} else {
		format!("'{}'", arg.replace('\'', r"'\''"))
	}
}

/// Output of one device command
#[derive(Debug, Default)]
pub struct ShellOutput {
	pub lines: Vec<String>,
	/// Lines that are not valid UTF-8, lossily decoded for messages only
	pub undecodable: Vec<String>,
}

/// Decode one output line without its terminator; `Err` holds a lossy rendering
fn decode_line(buf: &[u8]) -> Result<String, String> {
	let eol: &[char] = &['\r', '\n'];
	match std::str::from_utf8(buf) {
		Ok(text) => Ok(text.trim_end_matches(eol).to_string()),
		Err(_) => Err(String::from_utf8_lossy(buf).trim_end_matches(eol).to_string()),
	}
}

/// Running `adb shell` child
struct ShellSession {
	/// Stdin for sending commands
	send: ChildStdin,

	/// Stdout for reading responses
	recv: BufReader<ChildStdout>,

	/// adb's own diagnostics ("no devices/emulators found")
	stderr: Option<ChildStderr>,

	/// Child process handle
	_child: Child,
}

/// Connection to one device through the adb binary
pub struct AdbBridge {
	/// adb binary followed by global flags and options
	adb: Vec<String>,

	shell: Mutex<ShellSession>,
}

impl std::fmt::Debug for AdbBridge {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AdbBridge").field("adb", &self.adb).finish()
	}
}

impl AdbBridge {
	/// Build the adb invocation prefix, e.g. `adb -d -P 5037`
	pub fn adb_command(config: &AdbConfig) -> Vec<String> {
		let mut cmd = vec![config.bin.clone()];
		for flag in &config.flags {
			cmd.push(format!("-{}", flag.trim_start_matches('-')));
		}
		for (option, value) in &config.options {
			cmd.push(format!("-{}", option.trim_start_matches('-')));
			cmd.push(value.clone());
		}
		cmd
	}

	/// Spawn `adb shell` and verify that a device answers
	pub async fn connect(config: &AdbConfig) -> Result<Self, ConnectionError> {
		let adb = Self::adb_command(config);
		debug!("Starting {} shell", adb.join(" "));

		let mut child = Command::new(&adb[0])
			.args(&adb[1..])
			.arg("shell")
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| ConnectionError::SpawnFailed {
				cmd: format!("{} shell", adb.join(" ")),
				source: e,
			})?;

		let send = child
			.stdin
			.take()
			.ok_or(ConnectionError::StdioUnavailable { what: "stdin".to_string() })?;

		let stdout = child
			.stdout
			.take()
			.ok_or(ConnectionError::StdioUnavailable { what: "stdout".to_string() })?;

		let session = ShellSession {
			send,
			recv: BufReader::new(stdout),
			stderr: child.stderr.take(),
			_child: child,
		};

		let bridge = AdbBridge { adb, shell: Mutex::new(session) };
		bridge.test_connection().await?;
		Ok(bridge)
	}

	/// Run a no-op and expect no output
	async fn test_connection(&self) -> Result<(), ConnectionError> {
		let output = match self.shell(":").await {
			Ok(output) => output,
			Err(ConnectionError::Disconnected) => {
				let diagnostics = self.drain_stderr().await;
				if diagnostics.contains("no devices/emulators found") {
					return Err(ConnectionError::NoDevice);
				}
				return Err(ConnectionError::ProtocolError {
					message: format!("adb shell exited: {}", diagnostics.trim()),
				});
			}
			Err(e) => return Err(e),
		};

		for line in output.lines.into_iter().chain(output.undecodable) {
			if line.starts_with("* daemon") {
				debug!("{}", line);
				continue;
			}
			return Err(ConnectionError::ProtocolError {
				message: format!("Unexpected output from connection test: {}", line),
			});
		}
		Ok(())
	}

	async fn drain_stderr(&self) -> String {
		let mut session = self.shell.lock().await;
		let mut text = String::new();
		if let Some(mut stderr) = session.stderr.take() {
			if let Err(e) = stderr.read_to_string(&mut text).await {
				debug!("Reading adb diagnostics failed: {}", e);
			}
		}
		text
	}

	/// Run a shell command line on the device and collect its output lines
	///
	/// `command` must already be quoted with [`quote`]. Remote stderr is
	/// folded into stdout so error messages show up as output lines.
	pub async fn shell(&self, command: &str) -> Result<ShellOutput, ConnectionError> {
		let mut session = self.shell.lock().await;
		trace!("adb shell: {}", command);

		let script = format!("{} 2>&1 </dev/null\necho {} </dev/null\n", command, quote(END_OF_COMMAND));
		session
			.send
			.write_all(script.as_bytes())
			.await
			.map_err(|_| ConnectionError::Disconnected)?;
		session.send.flush().await.map_err(|_| ConnectionError::Disconnected)?;

		let mut output = ShellOutput::default();
		let mut buf = Vec::new();
		loop {
			buf.clear();
			let n = session
				.recv
				.read_until(b'\n', &mut buf)
				.await
				.map_err(|_| ConnectionError::Disconnected)?;
			if n == 0 {
				return Err(ConnectionError::Disconnected);
			}
			match decode_line(&buf) {
				Ok(line) if line == END_OF_COMMAND => break,
				Ok(line) => output.lines.push(line),
				Err(lossy) => output.undecodable.push(lossy),
			}
		}
		Ok(output)
	}

	/// Run a one-shot adb subcommand such as `push` or `pull`
	pub async fn run(&self, args: &[&str]) -> Result<Output, ConnectionError> {
		debug!("{} {}", self.adb.join(" "), args.join(" "));
		Command::new(&self.adb[0])
			.args(&self.adb[1..])
			.args(args)
			.stdin(Stdio::null())
			.output()
			.await
			.map_err(|e| ConnectionError::SpawnFailed {
				cmd: format!("{} {}", self.adb.join(" "), args.join(" ")),
				source: e,
			})
	}
}


// vim: ts=4

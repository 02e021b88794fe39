//! Interactive-shell command runner.
//!
//! Commands are typed into a PTY-backed login shell rather than sent with
//! `exec`, one line at a time.

use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use ssh2::Session;

use super::RemoteError;

#[derive(Debug, Clone, Copy)]
pub struct ShellTiming {
    /// Wait before draining the login banner.
    pub ready_delay: Duration,
    /// Wait after sending each command.
    pub step_delay: Duration,
    pub poll_interval: Duration,
    /// Upper bound on waiting for a command to print anything.
    pub timeout: Duration,
}

pub fn run_shell_commands(
    session: &Session,
    commands: &[String],
    timing: &ShellTiming,
) -> Result<String, RemoteError> {
    let mut channel = session.channel_session()?;
    channel.request_pty("xterm", None, None)?;
    channel.shell()?;

    session.set_blocking(false);
    let result = drive_shell(&mut channel, commands, timing);
    session.set_blocking(true);

    if let Err(err) = channel.close() {
        tracing::debug!("closing shell channel: {err}");
    }

    result
}

/// Types `commands` into a non-blocking shell stream and collects the output.
///
/// A read returning `WouldBlock` means nothing is ready yet.
pub fn drive_shell<S: Read + Write>(
    stream: &mut S,
    commands: &[String],
    timing: &ShellTiming,
) -> Result<String, RemoteError> {
    thread::sleep(timing.ready_delay);
    let mut banner = Vec::new();
    read_available(stream, &mut banner)?;
    tracing::trace!("discarded {} banner bytes", banner.len());

    let mut output = Vec::new();
    for command in commands {
        tracing::debug!("shell: {command}");
        write_line(stream, command, timing)?;
        thread::sleep(timing.step_delay);

        wait_readable(stream, &mut output, timing)?;
        read_available(stream, &mut output)?;
    }

    Ok(String::from_utf8_lossy(&output).into_owned())
}

fn write_line<S: Write>(
    stream: &mut S,
    command: &str,
    timing: &ShellTiming,
) -> Result<(), RemoteError> {
    let line = format!("{command}\n");
    let mut pending = line.as_bytes();
    let deadline = Instant::now() + timing.timeout;

    while !pending.is_empty() {
        match stream.write(pending) {
            Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero).into()),
            Ok(n) => pending = &pending[n..],
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(RemoteError::ShellTimeout(timing.timeout));
                }
                thread::sleep(timing.poll_interval);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    loop {
        match stream.flush() {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(RemoteError::ShellTimeout(timing.timeout));
                }
                thread::sleep(timing.poll_interval);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Blocks until at least one byte arrives or the stream reaches EOF.
fn wait_readable<S: Read>(
    stream: &mut S,
    out: &mut Vec<u8>,
    timing: &ShellTiming,
) -> Result<(), RemoteError> {
    let deadline = Instant::now() + timing.timeout;
    let mut buf = [0u8; 4096];

    loop {
        match stream.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => {
                out.extend_from_slice(&buf[..n]);
                return Ok(());
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(RemoteError::ShellTimeout(timing.timeout));
                }
                thread::sleep(timing.poll_interval);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
}

fn read_available<S: Read>(stream: &mut S, out: &mut Vec<u8>) -> Result<(), RemoteError> {
    let mut buf = [0u8; 4096];

    loop {
        match stream.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// A shell that answers each complete line with the next scripted reply.
    struct ScriptedShell {
        pending: VecDeque<u8>,
        replies: VecDeque<Vec<u8>>,
        written: Vec<u8>,
    }

    impl ScriptedShell {
        fn new(banner: &[u8], replies: &[&[u8]]) -> Self {
            Self {
                pending: banner.iter().copied().collect(),
                replies: replies.iter().map(|r| r.to_vec()).collect(),
                written: Vec::new(),
            }
        }
    }

    impl Read for ScriptedShell {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pending.is_empty() {
                return Err(ErrorKind::WouldBlock.into());
            }
            let n = buf.len().min(self.pending.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.pending.pop_front().unwrap();
            }
            Ok(n)
        }
    }

    impl Write for ScriptedShell {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            if buf.ends_with(b"\n") {
                if let Some(reply) = self.replies.pop_front() {
                    self.pending.extend(reply);
                }
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn fast_timing() -> ShellTiming {
        ShellTiming {
            ready_delay: Duration::ZERO,
            step_delay: Duration::ZERO,
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn banner_is_discarded_and_replies_collected() {
        let mut shell = ScriptedShell::new(
            b"Welcome to dent\r\n# ",
            &[b"systemctl stop dentpro.service\r\n# ", b"ok\r\n# "],
        );
        let commands = vec![
            "systemctl stop dentpro.service".to_string(),
            "echo ok".to_string(),
        ];

        let output = drive_shell(&mut shell, &commands, &fast_timing()).unwrap();

        assert!(!output.contains("Welcome"));
        assert!(output.contains("systemctl stop dentpro.service"));
        assert!(output.ends_with("ok\r\n# "));
        assert_eq!(
            shell.written,
            b"systemctl stop dentpro.service\necho ok\n".to_vec()
        );
    }

    #[test]
    fn silent_shell_times_out() {
        let mut shell = ScriptedShell::new(b"", &[]);
        let err = drive_shell(&mut shell, &["true".to_string()], &fast_timing()).unwrap_err();
        assert!(matches!(err, RemoteError::ShellTimeout(_)));
    }

    #[test]
    fn no_commands_sends_nothing() {
        let mut shell = ScriptedShell::new(b"banner", &[]);
        let output = drive_shell(&mut shell, &[], &fast_timing()).unwrap();
        assert!(output.is_empty());
        assert!(shell.written.is_empty());
    }
}

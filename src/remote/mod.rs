//! SSH plumbing: connection parameters, the [`RemoteHost`] seam used by the
//! maintenance actions, and the `ssh2`-backed implementation.

pub mod shell;
pub mod ssh;

use std::fmt;
use std::io;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

pub use ssh::SshConnector;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("host and username are required")]
    MissingConnectionFields,
    #[error("cannot reach {host}: {source}")]
    Connect { host: String, source: io::Error },
    #[error("SSH handshake with {host} failed: {source}")]
    Handshake { host: String, source: ssh2::Error },
    #[error("authentication failed for {username}: {source}")]
    Auth {
        username: String,
        source: ssh2::Error,
    },
    #[error("remote shell produced no output within {0:?}")]
    ShellTimeout(Duration),
    #[error(transparent)]
    Ssh(#[from] ssh2::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Everything needed to open one authenticated session.
#[derive(Clone)]
pub struct ConnectParams {
    pub host: String,
    pub username: String,
    pub password: String,
    pub port: u16,
    pub timeout: Duration,
}

impl ConnectParams {
    /// Rejects a blank host or username. Runs before any network activity.
    pub fn validate(&self) -> Result<(), RemoteError> {
        if self.host.trim().is_empty() || self.username.trim().is_empty() {
            return Err(RemoteError::MissingConnectionFields);
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// An open session on the device. Dropping it closes the connection.
pub trait RemoteHost {
    /// Runs `commands` one after another in an interactive shell and returns
    /// whatever the shell printed.
    fn run_shell(&mut self, commands: &[String]) -> Result<String, RemoteError>;

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, RemoteError>;

    /// Creates or truncates `path` and writes `contents`.
    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), RemoteError>;

    fn exists(&mut self, path: &str) -> Result<bool, RemoteError>;

    /// Copies the local file at `local` to `remote` verbatim.
    fn upload(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError>;
}

pub trait Connector: Send + Sync {
    fn connect(&self, params: &ConnectParams) -> Result<Box<dyn RemoteHost>, RemoteError>;
}

/// Joins a remote directory and file name with exactly one `/`.
pub fn remote_join(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(host: &str, username: &str) -> ConnectParams {
        ConnectParams {
            host: host.to_string(),
            username: username.to_string(),
            password: "secret".to_string(),
            port: 22,
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn blank_host_or_username_is_rejected() {
        assert!(matches!(
            params("", "root").validate(),
            Err(RemoteError::MissingConnectionFields)
        ));
        assert!(matches!(
            params("192.168.1.111", "  ").validate(),
            Err(RemoteError::MissingConnectionFields)
        ));
        assert!(params("192.168.1.111", "root").validate().is_ok());
    }

    #[test]
    fn empty_password_is_allowed() {
        let mut p = params("192.168.1.111", "root");
        p.password.clear();
        assert!(p.validate().is_ok());
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", params("h", "u"));
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn remote_join_normalizes_slashes() {
        assert_eq!(
            remote_join("/root/Dentware/databases/projectorCalibration/", "mask.png"),
            "/root/Dentware/databases/projectorCalibration/mask.png"
        );
        assert_eq!(remote_join("/tmp", "a.png"), "/tmp/a.png");
    }
}

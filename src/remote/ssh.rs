use std::fs::File;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;

use ssh2::{CheckResult, ErrorCode, KnownHostFileKind, Session, Sftp};

use super::shell::{ShellTiming, run_shell_commands};
use super::{ConnectParams, Connector, RemoteError, RemoteHost};

/// `LIBSSH2_FX_NO_SUCH_FILE`
const SFTP_NO_SUCH_FILE: i32 = 2;

#[derive(Debug, Clone)]
pub struct SshConnector {
    shell: ShellTiming,
}

impl SshConnector {
    pub fn new(shell: ShellTiming) -> Self {
        Self { shell }
    }
}

impl Connector for SshConnector {
    fn connect(&self, params: &ConnectParams) -> Result<Box<dyn RemoteHost>, RemoteError> {
        params.validate()?;

        let host = params.host.trim();
        let connect_err = |source: io::Error| RemoteError::Connect {
            host: host.to_string(),
            source,
        };

        let addr = (host, params.port)
            .to_socket_addrs()
            .map_err(connect_err)?
            .next()
            .ok_or_else(|| connect_err(io::Error::from(io::ErrorKind::AddrNotAvailable)))?;
        let tcp = TcpStream::connect_timeout(&addr, params.timeout).map_err(connect_err)?;

        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(params.timeout.as_millis()).unwrap_or(u32::MAX));
        session
            .handshake()
            .map_err(|source| RemoteError::Handshake {
                host: host.to_string(),
                source,
            })?;

        check_host_key(&session, host, params.port);

        session
            .userauth_password(&params.username, &params.password)
            .map_err(|source| RemoteError::Auth {
                username: params.username.clone(),
                source,
            })?;

        let sftp = session.sftp()?;
        tracing::info!("connected to {}@{}:{}", params.username, host, params.port);

        Ok(Box::new(SshHost {
            session,
            sftp,
            shell: self.shell,
        }))
    }
}

/// Logs unknown or changed host keys and carries on.
fn check_host_key(session: &Session, host: &str, port: u16) {
    let Some((key, _)) = session.host_key() else {
        tracing::warn!("{host} presented no host key");
        return;
    };

    let mut known_hosts = match session.known_hosts() {
        Ok(k) => k,
        Err(err) => {
            tracing::warn!("cannot load known hosts: {err}");
            return;
        }
    };

    if let Some(path) = known_hosts_path().filter(|p| p.exists()) {
        if let Err(err) = known_hosts.read_file(&path, KnownHostFileKind::OpenSSH) {
            tracing::warn!("failed to read {}: {err}", path.display());
        }
    }

    match known_hosts.check_port(host, port, key) {
        CheckResult::Match => tracing::debug!("host key for {host} matches known_hosts"),
        CheckResult::NotFound => {
            tracing::warn!("unknown host key for {host}:{port}, continuing")
        }
        CheckResult::Mismatch => {
            tracing::warn!("host key for {host}:{port} does not match known_hosts, continuing")
        }
        CheckResult::Failure => tracing::warn!("host key check for {host}:{port} failed"),
    }
}

fn known_hosts_path() -> Option<std::path::PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".ssh").join("known_hosts"))
}

struct SshHost {
    session: Session,
    sftp: Sftp,
    shell: ShellTiming,
}

impl RemoteHost for SshHost {
    fn run_shell(&mut self, commands: &[String]) -> Result<String, RemoteError> {
        run_shell_commands(&self.session, commands, &self.shell)
    }

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let mut file = self.sftp.open(Path::new(path))?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        Ok(contents)
    }

    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), RemoteError> {
        let mut file = self.sftp.create(Path::new(path))?;
        file.write_all(contents)?;
        file.flush()?;
        Ok(())
    }

    fn exists(&mut self, path: &str) -> Result<bool, RemoteError> {
        match self.sftp.stat(Path::new(path)) {
            Ok(_) => Ok(true),
            Err(err) if err.code() == ErrorCode::SFTP(SFTP_NO_SUCH_FILE) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn upload(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        let mut source = File::open(local)?;
        let mut target = self.sftp.create(Path::new(remote))?;
        let copied = io::copy(&mut source, &mut target)?;
        target.flush()?;
        tracing::info!("uploaded {} bytes to {remote}", copied);
        Ok(())
    }
}

impl Drop for SshHost {
    fn drop(&mut self) {
        if let Err(err) = self.session.disconnect(None, "done", None) {
            tracing::debug!("ssh disconnect: {err}");
        }
    }
}

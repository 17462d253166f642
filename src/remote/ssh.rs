// src/remote/ssh.rs
//! SSH/SFTP session against the Home Assistant host.
//!
//! The session is a scoped handle: it is disconnected when dropped, on the
//! success path and on every error path alike.

use std::{
    fs::File,
    io::{BufWriter, Read},
    net::{TcpStream, ToSocketAddrs},
    path::Path,
};

use log::Level;
use ssh2::{CheckResult, ErrorCode, ExtendedData, KnownHostFileKind, Session};

use super::{copy_with_progress, RemoteError, RemoteSession, TransferObserver};
use crate::config::RemoteConfig;
use crate::stage_log;

/// libssh2 SFTP status for a missing path (`LIBSSH2_FX_NO_SUCH_FILE`).
const SFTP_NO_SUCH_FILE: i32 = 2;

pub struct SshSession {
    session: Session,
    host: String,
}

impl SshSession {
    /// Open a TCP connection, verify the host key when `known_hosts` is
    /// configured, and authenticate with the configured private key.
    pub fn connect(cfg: &RemoteConfig) -> Result<Self, RemoteError> {
        let host = format!("{}:{}", cfg.hostname, cfg.port);
        let tcp = dial(&cfg.hostname, cfg.port, cfg.connect_timeout)
            .map_err(|source| RemoteError::Connect { host: host.clone(), source })?;

        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(cfg.connect_timeout.as_millis()).unwrap_or(u32::MAX));
        session.handshake()?;

        if let Some(known_hosts) = &cfg.known_hosts {
            verify_host_key(&session, &cfg.hostname, cfg.port, known_hosts)?;
        }

        session.userauth_pubkey_file(&cfg.username, None, &cfg.ssh_key_file, None)?;
        if !session.authenticated() {
            return Err(RemoteError::Auth(cfg.username.clone()));
        }

        stage_log!(Level::Info, "connect", "Connected to {} as {}", host, cfg.username);
        Ok(Self { session, host })
    }

    /// Log `user@host` and `uname -a` of the remote side. Failures only warn.
    pub fn log_host_info(&mut self) {
        for cmd in ["echo $USER@$(hostname)", "uname -a"] {
            match self.exec(cmd) {
                Ok(out) => stage_log!(Level::Info, "connect", "{}", out.trim()),
                Err(e) => stage_log!(Level::Warn, "connect", "'{}' failed: {}", cmd, e),
            }
        }
    }
}

impl RemoteSession for SshSession {
    fn file_size(&mut self, remote: &str) -> Result<Option<u64>, RemoteError> {
        let sftp = self.session.sftp()?;
        match sftp.stat(Path::new(remote)) {
            Ok(stat) => Ok(Some(stat.size.unwrap_or(0))),
            Err(e) if matches!(e.code(), ErrorCode::SFTP(SFTP_NO_SUCH_FILE)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn download(
        &mut self,
        remote: &str,
        local: &Path,
        observer: &mut dyn TransferObserver,
    ) -> Result<u64, RemoteError> {
        let sftp = self.session.sftp()?;
        let mut src = match sftp.open(Path::new(remote)) {
            Ok(f) => f,
            Err(e) if matches!(e.code(), ErrorCode::SFTP(SFTP_NO_SUCH_FILE)) => {
                return Err(RemoteError::NotFound(remote.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let total = src.stat()?.size.unwrap_or(0);
        let mut dst = BufWriter::new(File::create(local)?);
        let copied = copy_with_progress(&mut src, &mut dst, total, observer)?;
        dst.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        Ok(copied)
    }

    fn exec(&mut self, command: &str) -> Result<String, RemoteError> {
        let mut channel = self.session.channel_session()?;
        // stderr shares the window with stdout; unread it would stall the command
        channel.handle_extended_data(ExtendedData::Merge)?;
        channel.exec(command)?;
        let mut out = String::new();
        channel.read_to_string(&mut out)?;
        channel.wait_close()?;
        let status = channel.exit_status()?;
        if status != 0 {
            return Err(RemoteError::CommandFailed { command: command.to_string(), status });
        }
        Ok(out)
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        match self.session.disconnect(None, "ingest run finished", None) {
            Ok(()) => stage_log!(Level::Info, "connect", "Closed connection to {}", self.host),
            Err(e) => stage_log!(Level::Warn, "connect", "Disconnect from {} failed: {}", self.host, e),
        }
    }
}

/// Try every resolved address until one accepts within `timeout`.
fn dial(hostname: &str, port: u16, timeout: std::time::Duration) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (hostname, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(tcp) => return Ok(tcp),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no addresses")
    }))
}

fn verify_host_key(
    session: &Session,
    hostname: &str,
    port: u16,
    known_hosts: &Path,
) -> Result<(), RemoteError> {
    let mut hosts = session.known_hosts()?;
    hosts.read_file(known_hosts, KnownHostFileKind::OpenSSH)?;
    let (key, _) = session
        .host_key()
        .ok_or_else(|| RemoteError::HostKey(hostname.to_string()))?;
    match hosts.check_port(hostname, port, key) {
        CheckResult::Match => Ok(()),
        _ => Err(RemoteError::HostKey(hostname.to_string())),
    }
}

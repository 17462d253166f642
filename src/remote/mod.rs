// src/remote/mod.rs
//! Remote host access: the session seam consumed by the fetcher, the SSH/SFTP
//! implementation of it, and transfer progress reporting.

pub mod progress;
pub mod ssh;

use std::io::{self, Read, Write};
use std::path::Path;
use thiserror::Error;

pub use progress::{LogProgress, NoProgress, TransferObserver};
pub use ssh::SshSession;

/// Chunk size used for streamed copies.
const COPY_CHUNK: usize = 64 * 1024;

/// Authenticated command execution and file transfer against one host.
pub trait RemoteSession {
    /// Size of a remote file in bytes, or `None` when it does not exist.
    fn file_size(&mut self, remote: &str) -> Result<Option<u64>, RemoteError>;

    /// Copy `remote` to `local`, reporting progress to `observer`.
    /// Returns the number of bytes written.
    fn download(
        &mut self,
        remote: &str,
        local: &Path,
        observer: &mut dyn TransferObserver,
    ) -> Result<u64, RemoteError>;

    /// Run `command` and return its standard output. A non-zero exit status
    /// is an error.
    fn exec(&mut self, command: &str) -> Result<String, RemoteError>;
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("cannot reach {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("host key verification failed for {0}")]
    HostKey(String),

    #[error("authentication as '{0}' was rejected")]
    Auth(String),

    #[error("remote file '{0}' not found")]
    NotFound(String),

    #[error("remote command '{command}' exited with status {status}")]
    CommandFailed { command: String, status: i32 },

    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Stream `reader` into `writer` in fixed chunks, notifying `observer` at the
/// start, after every chunk and at completion.
pub fn copy_with_progress<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    total: u64,
    observer: &mut dyn TransferObserver,
) -> io::Result<u64> {
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut done = 0u64;
    observer.update(0, total);
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        done += n as u64;
        observer.update(done, total.max(done));
    }
    writer.flush()?;
    observer.finish(done);
    Ok(done)
}

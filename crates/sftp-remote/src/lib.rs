//! SFTP implementation of [`RemoteSession`] on top of libssh2.

use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;

use hostops_core::{EntryKind, RemoteEntry, RemoteError, RemoteSession, TransferObserver};
use ssh2::{ErrorCode, FileStat, Session, Sftp};
use thiserror::Error;
use tracing::{debug, info};

const CHUNK_SIZE: usize = 32 * 1024;
const NO_SUCH_FILE: i32 = 2;
const DIR_MODE: i32 = 0o755;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to connect to {address}: {source}")]
    Tcp {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("SSH handshake failed: {0}")]
    Handshake(#[source] ssh2::Error),

    #[error("SFTP authentication failed for {0}")]
    Auth(String),

    #[error("SFTP subsystem unavailable: {0}")]
    Subsystem(#[source] ssh2::Error),
}

impl From<ConnectError> for RemoteError {
    fn from(err: ConnectError) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// One authenticated SFTP channel. Built once per invocation.
pub struct SftpSession {
    // keeps the transport alive for `sftp`
    _session: Session,
    sftp: Sftp,
}

impl SftpSession {
    pub fn connect(config: &SftpConfig) -> Result<Self, ConnectError> {
        let address = format!("{}:{}", config.host, config.port);
        info!("connecting to {address}");
        let tcp = TcpStream::connect(&address).map_err(|source| ConnectError::Tcp {
            address: address.clone(),
            source,
        })?;
        let mut session = Session::new().map_err(ConnectError::Handshake)?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(ConnectError::Handshake)?;
        session
            .userauth_password(&config.username, &config.password)
            .map_err(|err| ConnectError::Auth(format!("{}: {err}", config.username)))?;
        if !session.authenticated() {
            return Err(ConnectError::Auth(config.username.clone()));
        }
        let sftp = session.sftp().map_err(ConnectError::Subsystem)?;
        debug!("SFTP channel open");
        Ok(Self {
            _session: session,
            sftp,
        })
    }
}

fn map_err(path: &str, err: ssh2::Error) -> RemoteError {
    match err.code() {
        ErrorCode::SFTP(NO_SUCH_FILE) => RemoteError::NotFound(path.to_string()),
        ErrorCode::SFTP(_) => RemoteError::io(path, err),
        ErrorCode::Session(_) => RemoteError::Transport(err.to_string()),
    }
}

fn entry_from_stat(path: &str, stat: &FileStat) -> RemoteEntry {
    let name = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    RemoteEntry {
        name,
        path: path.to_string(),
        size: stat.size.unwrap_or(0),
        modified: stat.mtime.unwrap_or(0),
        kind: if stat.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        },
    }
}

fn copy_with_progress(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    observer: &mut dyn TransferObserver,
) -> std::io::Result<u64> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut transferred = 0u64;
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        writer.write_all(&buffer[..read])?;
        transferred += read as u64;
        observer.on_progress(transferred);
    }
    writer.flush()?;
    Ok(transferred)
}

impl RemoteSession for SftpSession {
    fn stat(&self, path: &str) -> Result<RemoteEntry, RemoteError> {
        let stat = self
            .sftp
            .stat(Path::new(path))
            .map_err(|err| map_err(path, err))?;
        Ok(entry_from_stat(path, &stat))
    }

    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let entries = self
            .sftp
            .readdir(Path::new(path))
            .map_err(|err| map_err(path, err))?;
        Ok(entries
            .iter()
            .filter_map(|(entry_path, stat)| {
                let entry_path = entry_path.to_string_lossy().replace('\\', "/");
                let entry = entry_from_stat(&entry_path, stat);
                (entry.name != "." && entry.name != "..").then_some(entry)
            })
            .collect())
    }

    fn mkdir(&self, path: &str) -> Result<(), RemoteError> {
        self.sftp
            .mkdir(Path::new(path), DIR_MODE)
            .map_err(|err| map_err(path, err))
    }

    fn remove_file(&self, path: &str) -> Result<(), RemoteError> {
        self.sftp
            .unlink(Path::new(path))
            .map_err(|err| map_err(path, err))
    }

    fn remove_dir(&self, path: &str) -> Result<(), RemoteError> {
        self.sftp
            .rmdir(Path::new(path))
            .map_err(|err| map_err(path, err))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let mut file = self
            .sftp
            .open(Path::new(path))
            .map_err(|err| map_err(path, err))?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|err| RemoteError::io(path, err))?;
        Ok(contents)
    }

    fn write(&self, path: &str, contents: &[u8]) -> Result<(), RemoteError> {
        let mut file = self
            .sftp
            .create(Path::new(path))
            .map_err(|err| map_err(path, err))?;
        file.write_all(contents)
            .map_err(|err| RemoteError::io(path, err))
    }

    fn get(
        &self,
        remote: &str,
        local: &Path,
        observer: &mut dyn TransferObserver,
    ) -> Result<u64, RemoteError> {
        let mut source = self
            .sftp
            .open(Path::new(remote))
            .map_err(|err| map_err(remote, err))?;
        let mut target = fs::File::create(local)
            .map_err(|err| RemoteError::io(local.display().to_string(), err))?;
        copy_with_progress(&mut source, &mut target, observer)
            .map_err(|err| RemoteError::io(remote, err))
    }

    fn put(
        &self,
        local: &Path,
        remote: &str,
        observer: &mut dyn TransferObserver,
    ) -> Result<u64, RemoteError> {
        let mut source = fs::File::open(local)
            .map_err(|err| RemoteError::io(local.display().to_string(), err))?;
        let mut target = self
            .sftp
            .create(Path::new(remote))
            .map_err(|err| map_err(remote, err))?;
        copy_with_progress(&mut source, &mut target, observer)
            .map_err(|err| RemoteError::io(remote, err))
    }
}

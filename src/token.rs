//! Gateway token resolution.
//!
//! The token authenticates every link handed out by the gateway, so it must
//! be stable across restarts. Precedence: environment override, then the
//! persisted file on the durable volume, then a freshly generated value that
//! is persisted before use. Regenerating behind the operator's back would
//! silently invalidate previously shared URLs, which is why read and persist
//! failures are fatal rather than recoverable.

use crate::env::non_empty;
use crate::write;
use rand::Rng;
use secrecy::SecretString;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("persisted token at {path} exists but could not be read: {source}")]
    Unreadable { path: PathBuf, source: io::Error },

    #[error("failed to persist generated token to {path}: {source}")]
    Persist { path: PathBuf, source: io::Error },
}

/// Resolve the gateway token.
///
/// An override is used verbatim and never persisted; the environment remains
/// the source of truth on every boot it is set. Otherwise the persisted file
/// wins, and only when neither exists is a new token generated and written
/// (owner read/write only) before being returned.
pub fn resolve(
    override_token: Option<&SecretString>,
    path: &Path,
) -> Result<SecretString, TokenError> {
    if let Some(token) = non_empty(override_token) {
        debug!("using gateway token from environment override");
        return Ok(token.clone());
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => {
            // Tolerate a trailing newline from an operator's `echo >` edit.
            let token = contents.strip_suffix('\n').unwrap_or(&contents);
            info!(path = %path.display(), "loaded persisted gateway token");
            Ok(SecretString::from(token.to_owned()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => generate(path),
        Err(source) => Err(TokenError::Unreadable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Generate a 128-bit token, persist it, and return it.
fn generate(path: &Path) -> Result<SecretString, TokenError> {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes[..]);
    let token = bytes.iter().fold(String::with_capacity(32), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    });

    write::atomic_write_secret(path, token.as_bytes()).map_err(|source| TokenError::Persist {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), "generated and persisted new gateway token");
    Ok(SecretString::from(token))
}

use crate::{config::ConfigError, process::ProcessError, token::TokenError};
use sysexits::ExitCode;
use thiserror::Error;

/// Fatal startup failures. Anything here aborts before the target service is
/// launched; the platform sees a non-zero exit and applies its own restart
/// policy, which is safe because every persistent step is idempotent.
#[derive(Debug, Error)]
pub enum BootError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl BootError {
    pub fn exit_code(&self) -> u8 {
        match self {
            BootError::Token(e) => match e {
                TokenError::Unreadable { .. } => ExitCode::NoInput.into(),
                TokenError::Persist { .. } => ExitCode::CantCreat.into(),
            },
            BootError::Config(e) => match e {
                ConfigError::Serialize(_) => ExitCode::Software.into(),
                ConfigError::Write { .. } => ExitCode::CantCreat.into(),
            },
            BootError::Process(e) => match e {
                ProcessError::EmptyCommand => ExitCode::Usage.into(),
                ProcessError::Io(e) => match e.kind() {
                    std::io::ErrorKind::NotFound => 127,
                    std::io::ErrorKind::PermissionDenied => 126,
                    _ => ExitCode::IoErr.into(),
                },
            },
            BootError::Io(_) => ExitCode::IoErr.into(),
            BootError::Anyhow(_) => ExitCode::Software.into(),
        }
    }

    pub fn report(self) -> std::process::ExitCode {
        let code = self.exit_code();
        tracing::error!(exit_code = code, "{}", self);
        std::process::ExitCode::from(code)
    }
}

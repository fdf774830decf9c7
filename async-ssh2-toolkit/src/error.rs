use std::io::Error as IoError;

use ssh2::Error as Ssh2Error;

use crate::context::ContextState;

//
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ssh2: {0}")]
    Ssh2(#[from] Ssh2Error),
    #[error("io: {0}")]
    Io(#[from] IoError),

    //
    #[error("connect failed: {0}")]
    Connect(#[source] Box<Error>),
    #[error("host key rejected for {host}")]
    HostKeyRejected { host: String },
    #[error("userauth failed: {0}")]
    Userauth(#[source] Box<Error>),
    #[error("session not authenticated")]
    NotAuthenticated,
    #[error("open session failed: {0}")]
    Session(#[source] Box<Error>),

    //
    #[error("cannot {operation} while context is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: ContextState,
    },
    #[error("stdin already taken")]
    StdinTaken,

    //
    #[error("invalid {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },
    #[error("short copy, expected {expected} bytes but source ended after {copied}")]
    ShortCopy { expected: u64, copied: u64 },
    #[error("remote command exited with status {status}")]
    RemoteExit { status: i32 },
    #[error("cancelled")]
    Cancelled,
    #[error("task: {0}")]
    Task(String),
}

impl Error {
    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

impl From<Error> for IoError {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(err) => err,
            Error::Ssh2(err) => err.into(),
            err => IoError::other(err),
        }
    }
}

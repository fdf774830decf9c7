//! Asynchronous [ssh2](https://docs.rs/ssh2) remote commands, interactive
//! shells and single-file SCP upload on tokio.

pub use async_trait::async_trait;
pub use ssh2;
pub use tokio;
pub use tokio_util::sync::CancellationToken;

//
pub mod channel;
pub mod client;
pub mod session;

pub use channel::{AsyncChannel, AsyncStream};
pub use client::{
    AcceptAnyHostKey, AuthCredential, Client, ClientConfig, HostKey, HostKeyVerifier,
    RemoteEndpoint,
};
pub use session::{AsyncSession, SessionConfiguration};

//
pub mod context;
pub mod runner;
pub mod scp;

pub use context::{
    BoxedSink, CaptureBuffer, ContextMode, ContextState, ExecContext, RemoteProcess, SshProcess,
};
pub use runner::run_commands;
pub use scp::{upload, upload_str, upload_with_cancel, ScpTarget, ScpUploader, UploadConfiguration};

//
pub mod error;

pub use error::Error;

//
pub mod session_stream;

pub use session_stream::AsyncSessionStream;

pub(crate) mod util;

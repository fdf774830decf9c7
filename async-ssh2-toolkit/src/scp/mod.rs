//! Single-file SCP upload over a command-execution context.
//!
//! The remote side runs `scp -qtr <dir>` in sink mode. While the foreground
//! waits for that command, a spawned writer task owns the context's stdin and
//! speaks the protocol from [`protocol`] into it. The writer reports back on a
//! one-shot channel before it closes stdin, and closing stdin is what lets the
//! remote `scp` finish.

use std::io::Cursor;

use log::{debug, warn};
use tokio::{io::AsyncRead, sync::oneshot};
use tokio_util::sync::CancellationToken;

use crate::{
    context::{ExecContext, RemoteProcess},
    error::Error,
};

pub mod protocol;
mod writer;

pub use protocol::ScpTarget;

use writer::FileWriter;

//
pub const DEFAULT_SCP_PATH: &str = "/usr/bin/scp";
const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

#[derive(Debug, Clone)]
pub struct UploadConfiguration {
    scp_path: String,
    buffer_size: usize,
}

impl Default for UploadConfiguration {
    fn default() -> Self {
        Self {
            scp_path: DEFAULT_SCP_PATH.to_owned(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl UploadConfiguration {
    pub fn new() -> Self {
        Default::default()
    }

    /// Path of the `scp` executable on the remote host.
    pub fn set_scp_path(&mut self, scp_path: &str) {
        self.scp_path = scp_path.to_owned();
    }

    pub fn set_buffer_size(&mut self, buffer_size: usize) {
        self.buffer_size = buffer_size;
    }

    pub fn scp_path(&self) -> &str {
        &self.scp_path
    }
}

//
#[derive(Debug, Clone, Default)]
pub struct ScpUploader {
    configuration: UploadConfiguration,
}

impl ScpUploader {
    pub fn new(configuration: impl Into<Option<UploadConfiguration>>) -> Self {
        Self {
            configuration: configuration.into().unwrap_or_default(),
        }
    }

    /// Uploads exactly `length` bytes of `source` and returns the number of
    /// payload bytes written.
    pub async fn upload<P, R>(
        &self,
        ctx: &mut ExecContext<P>,
        source: R,
        length: u64,
        target: &ScpTarget,
    ) -> Result<u64, Error>
    where
        P: RemoteProcess,
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.upload_with_cancel(ctx, source, length, target, &CancellationToken::new())
            .await
    }

    /// Uploads in-memory `content`. The writer task needs an owned source, so
    /// pass a `Vec<u8>` to hand over the buffer; borrowed data is copied once.
    pub async fn upload_bytes<P>(
        &self,
        ctx: &mut ExecContext<P>,
        content: impl Into<Vec<u8>>,
        target: &ScpTarget,
    ) -> Result<u64, Error>
    where
        P: RemoteProcess,
    {
        let content = content.into();
        let length = content.len() as u64;
        self.upload(ctx, Cursor::new(content), length, target).await
    }

    /// Like [`upload`](Self::upload), aborting with [`Error::Cancelled`] once
    /// `cancel` fires.
    pub async fn upload_with_cancel<P, R>(
        &self,
        ctx: &mut ExecContext<P>,
        source: R,
        length: u64,
        target: &ScpTarget,
        cancel: &CancellationToken,
    ) -> Result<u64, Error>
    where
        P: RemoteProcess,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let command = protocol::sink_command(&self.configuration.scp_path, target.dir());
        let stdin = ctx.stdin_pipe()?;

        let writer_cancel = cancel.child_token();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let writer = FileWriter {
            header: target.header(length),
            source,
            length,
            buffer_size: self.configuration.buffer_size,
            cancel: writer_cancel.clone(),
        };
        tokio::spawn(writer.run(stdin, outcome_tx));

        debug!(
            "scp upload {} ({length} bytes) to {}",
            target.file_name(),
            target.dir()
        );

        let ret = tokio::select! {
            ret = ctx.run_scp_sink(&command) => ret,
            _ = cancel.cancelled() => Err(Error::Cancelled),
        };

        if matches!(ret, Err(Error::Cancelled)) {
            ctx.abort();
        }
        if let Err(err) = ret {
            warn!("scp sink `{command}` failed, err:{err}");
            writer_cancel.cancel();
            return Err(err);
        }

        outcome_rx
            .await
            .map_err(|_| Error::Task("scp writer ended without an outcome".into()))?
    }
}

//
/// Uploads `length` bytes of `source` as `dest_dir/dest_name` with the octal
/// `permission`, using the default `scp` path.
pub async fn upload<P, R>(
    ctx: &mut ExecContext<P>,
    source: R,
    length: u64,
    dest_dir: &str,
    dest_name: &str,
    permission: &str,
) -> Result<u64, Error>
where
    P: RemoteProcess,
    R: AsyncRead + Send + Unpin + 'static,
{
    let target = ScpTarget::new(dest_dir, dest_name, permission)?;
    ScpUploader::default()
        .upload(ctx, source, length, &target)
        .await
}

pub async fn upload_with_cancel<P, R>(
    ctx: &mut ExecContext<P>,
    source: R,
    length: u64,
    target: &ScpTarget,
    cancel: &CancellationToken,
) -> Result<u64, Error>
where
    P: RemoteProcess,
    R: AsyncRead + Send + Unpin + 'static,
{
    ScpUploader::default()
        .upload_with_cancel(ctx, source, length, target, cancel)
        .await
}

/// Uploads `content` as `dest_dir/dest_name`. The content is copied into the
/// writer task; use [`ScpUploader::upload_bytes`] with an owned buffer to avoid
/// the copy.
pub async fn upload_str<P>(
    ctx: &mut ExecContext<P>,
    content: &str,
    dest_dir: &str,
    dest_name: &str,
    permission: &str,
) -> Result<u64, Error>
where
    P: RemoteProcess,
{
    let target = ScpTarget::new(dest_dir, dest_name, permission)?;
    ScpUploader::default()
        .upload_bytes(ctx, content.as_bytes(), &target)
        .await
}

use core::future::Future;
use std::io::Error as IoError;

use log::{debug, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _},
    sync::oneshot,
};
use tokio_util::sync::CancellationToken;

use super::protocol::TERMINATOR;
use crate::error::Error;

//
pub(super) struct FileWriter<R> {
    pub(super) header: String,
    pub(super) source: R,
    pub(super) length: u64,
    pub(super) buffer_size: usize,
    pub(super) cancel: CancellationToken,
}

impl<R> FileWriter<R>
where
    R: AsyncRead + Send + Unpin,
{
    /// Writes the file into `sink`, publishes the outcome on `outcome_tx`,
    /// and only then shuts `sink` down.
    pub(super) async fn run<W>(
        mut self,
        mut sink: W,
        outcome_tx: oneshot::Sender<Result<u64, Error>>,
    ) where
        W: AsyncWrite + Send + Unpin,
    {
        let ret = self.write_file(&mut sink).await;
        match &ret {
            Ok(copied) => debug!("scp payload written, bytes:{copied}"),
            Err(err) => warn!("scp write failed, err:{err}"),
        }

        if outcome_tx.send(ret).is_err() {
            debug!("scp outcome dropped, uploader gone");
        }

        if let Err(err) = sink.shutdown().await {
            debug!("scp sink shutdown failed, err:{err}");
        }
    }

    async fn write_file<W>(&mut self, sink: &mut W) -> Result<u64, Error>
    where
        W: AsyncWrite + Send + Unpin,
    {
        let cancel = self.cancel.clone();

        until_cancelled(&cancel, sink.write_all(self.header.as_bytes())).await?;

        let mut buf = vec![0u8; self.buffer_size.max(1)];
        let mut copied = 0u64;
        while copied < self.length {
            let want = (self.length - copied).min(buf.len() as u64) as usize;
            let n = until_cancelled(&cancel, self.source.read(&mut buf[..want])).await?;
            if n == 0 {
                return Err(Error::ShortCopy {
                    expected: self.length,
                    copied,
                });
            }
            until_cancelled(&cancel, sink.write_all(&buf[..n])).await?;
            copied += n as u64;
        }

        until_cancelled(&cancel, sink.write_all(TERMINATOR)).await?;
        until_cancelled(&cancel, sink.flush()).await?;

        Ok(copied)
    }
}

async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, IoError>>,
) -> Result<T, Error> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        ret = fut => ret.map_err(Into::into),
    }
}

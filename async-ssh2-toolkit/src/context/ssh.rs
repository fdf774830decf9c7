use async_trait::async_trait;
use futures_util::future;
use log::{debug, warn};
use tokio::{
    io::{self, AsyncReadExt as _, AsyncWriteExt as _, DuplexStream},
    task::JoinHandle,
};

use super::{BoxedSink, RemoteProcess};
use crate::{channel::AsyncChannel, error::Error, session_stream::AsyncSessionStream};

//
const PIPE_CAPACITY: usize = 32 * 1024;
const BUF_SIZE: usize = 8 * 1024;

/// A [`RemoteProcess`] on an ssh2 session channel.
///
/// Standard input is an in-process pipe. Once the command or shell is started
/// a pump task owns the channel: it forwards the pipe into the channel,
/// sends channel EOF when the pipe closes, copies stdout and stderr into the
/// attached sinks and finally collects the exit status.
pub struct SshProcess<S> {
    channel: Option<AsyncChannel<S>>,
    stdin: Option<DuplexStream>,
    stdout: Option<BoxedSink>,
    stderr: Option<BoxedSink>,
    pump: Option<JoinHandle<Result<i32, Error>>>,
}

impl<S> SshProcess<S> {
    pub fn new(channel: AsyncChannel<S>) -> Self {
        Self {
            channel: Some(channel),
            stdin: None,
            stdout: None,
            stderr: None,
            pump: None,
        }
    }
}

impl<S> SshProcess<S>
where
    S: AsyncSessionStream + Send + Sync + 'static,
{
    fn channel(&mut self) -> Result<&mut AsyncChannel<S>, Error> {
        self.channel
            .as_mut()
            .ok_or_else(|| Error::Task("channel already handed to the pump".into()))
    }

    fn spawn_pump(&mut self) -> Result<(), Error> {
        let channel = self
            .channel
            .take()
            .ok_or_else(|| Error::Task("channel already handed to the pump".into()))?;
        let stdin = self.stdin.take();
        let stdout = self.stdout.take().unwrap_or_else(|| Box::new(io::sink()));
        let stderr = self.stderr.take().unwrap_or_else(|| Box::new(io::sink()));

        self.pump = Some(tokio::spawn(pump(channel, stdin, stdout, stderr)));
        Ok(())
    }
}

#[async_trait]
impl<S> RemoteProcess for SshProcess<S>
where
    S: AsyncSessionStream + Send + Sync + 'static,
{
    type Stdin = DuplexStream;

    fn stdin(&mut self) -> Result<Self::Stdin, Error> {
        if self.stdin.is_some() {
            return Err(Error::StdinTaken);
        }
        let (writer, reader) = io::duplex(PIPE_CAPACITY);
        self.stdin = Some(reader);
        Ok(writer)
    }

    fn set_stdout(&mut self, sink: BoxedSink) {
        self.stdout = Some(sink);
    }

    fn set_stderr(&mut self, sink: BoxedSink) {
        self.stderr = Some(sink);
    }

    async fn exec(&mut self, command: &str) -> Result<(), Error> {
        self.channel()?.exec(command).await?;
        self.spawn_pump()
    }

    async fn shell(&mut self) -> Result<(), Error> {
        self.channel()?.shell().await?;
        self.spawn_pump()
    }

    async fn wait(&mut self) -> Result<i32, Error> {
        let pump = self
            .pump
            .as_mut()
            .ok_or_else(|| Error::Task("process not started".into()))?;

        // The handle stays in `self.pump` until the pump is done, so a dropped
        // wait leaves it reachable for `abort`.
        let ret = pump.await;
        self.pump = None;
        ret.map_err(|err| Error::Task(err.to_string()))?
    }

    fn abort(&mut self) {
        if let Some(pump) = self.pump.take() {
            debug!("aborting channel pump");
            pump.abort();
        }
    }
}

impl<S> Drop for SshProcess<S> {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

async fn read_stdin(stdin: &mut Option<DuplexStream>, buf: &mut [u8]) -> io::Result<usize> {
    match stdin {
        Some(stdin) => stdin.read(buf).await,
        None => future::pending().await,
    }
}

async fn pump<S>(
    mut channel: AsyncChannel<S>,
    mut stdin: Option<DuplexStream>,
    mut stdout: BoxedSink,
    mut stderr: BoxedSink,
) -> Result<i32, Error>
where
    S: AsyncSessionStream + Send + Sync + 'static,
{
    let mut remote_stdin = channel.stream(0);
    let mut remote_stdout = channel.stdout();
    let mut remote_stderr = channel.stderr();

    if stdin.is_none() {
        channel.send_eof().await?;
    }

    let mut in_buf = vec![0u8; BUF_SIZE];
    let mut out_buf = vec![0u8; BUF_SIZE];
    let mut err_buf = vec![0u8; BUF_SIZE];
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !(stdout_done && stderr_done) {
        tokio::select! {
            ret = read_stdin(&mut stdin, &mut in_buf) => match ret {
                Ok(0) => {
                    stdin = None;
                    channel.send_eof().await?;
                }
                Ok(n) => remote_stdin.write_all(&in_buf[..n]).await?,
                Err(err) => {
                    warn!("stdin pipe read failed, err:{err}");
                    stdin = None;
                    channel.send_eof().await?;
                }
            },
            ret = remote_stdout.read(&mut out_buf), if !stdout_done => match ret? {
                0 => stdout_done = true,
                n => stdout.write_all(&out_buf[..n]).await?,
            },
            ret = remote_stderr.read(&mut err_buf), if !stderr_done => match ret? {
                0 => stderr_done = true,
                n => stderr.write_all(&err_buf[..n]).await?,
            },
        }
    }
    drop(stdin);

    stdout.flush().await?;
    stderr.flush().await?;

    channel.close().await?;
    channel.wait_close().await?;

    let status = channel.exit_status()?;
    debug!("channel closed with exit status {status}");
    Ok(status)
}

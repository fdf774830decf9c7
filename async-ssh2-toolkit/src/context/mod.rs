//! One remote command, shell or SCP sink per context.
//!
//! An [`ExecContext`] walks `Idle -> Running(mode) -> Finished` exactly once.
//! Sinks and the input pipe are wired up while `Idle`; after that the context
//! can only be waited on, and only one time.

use core::{
    pin::Pin,
    task::{Context, Poll},
};
use std::{
    io::Error as IoError,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use log::debug;
use tokio::io::AsyncWrite;

use crate::error::Error;

mod ssh;

pub use ssh::SshProcess;

//
pub type BoxedSink = Box<dyn AsyncWrite + Send + Unpin>;

/// The process behind a context: something that can be started once as a
/// command or a shell and then reports its exit status.
#[async_trait]
pub trait RemoteProcess: Send {
    type Stdin: AsyncWrite + Send + Unpin + 'static;

    fn stdin(&mut self) -> Result<Self::Stdin, Error>;
    fn set_stdout(&mut self, sink: BoxedSink);
    fn set_stderr(&mut self, sink: BoxedSink);

    async fn exec(&mut self, command: &str) -> Result<(), Error>;
    async fn shell(&mut self) -> Result<(), Error>;

    /// Blocks until the process exits and returns its exit status.
    async fn wait(&mut self) -> Result<i32, Error>;

    /// Stops whatever still runs on behalf of the process after an abandoned
    /// wait.
    fn abort(&mut self) {}
}

//
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMode {
    Command,
    Shell,
    ScpSink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Idle,
    Running(ContextMode),
    Finished,
}

//
pub struct ExecContext<P> {
    process: P,
    state: ContextState,
    stdin_taken: bool,
}

impl<P> ExecContext<P> {
    pub fn new(process: P) -> Self {
        Self {
            process,
            state: ContextState::Idle,
            stdin_taken: false,
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn process(&self) -> &P {
        &self.process
    }

    fn ensure_idle(&self, operation: &'static str) -> Result<(), Error> {
        match self.state {
            ContextState::Idle => Ok(()),
            state => Err(Error::InvalidState { operation, state }),
        }
    }
}

impl<P> ExecContext<P>
where
    P: RemoteProcess,
{
    /// Takes the write end of the remote standard input. Dropping or shutting
    /// it down is what the remote side sees as end of input.
    pub fn stdin_pipe(&mut self) -> Result<P::Stdin, Error> {
        self.ensure_idle("take stdin")?;
        if self.stdin_taken {
            return Err(Error::StdinTaken);
        }

        let stdin = self.process.stdin()?;
        self.stdin_taken = true;
        Ok(stdin)
    }

    pub fn set_stdout(
        &mut self,
        sink: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Result<(), Error> {
        self.ensure_idle("set stdout")?;
        self.process.set_stdout(Box::new(sink));
        Ok(())
    }

    pub fn set_stderr(
        &mut self,
        sink: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Result<(), Error> {
        self.ensure_idle("set stderr")?;
        self.process.set_stderr(Box::new(sink));
        Ok(())
    }

    pub async fn start(&mut self, command: &str) -> Result<(), Error> {
        self.begin(ContextMode::Command, Some(command)).await
    }

    pub async fn shell(&mut self) -> Result<(), Error> {
        self.begin(ContextMode::Shell, None).await
    }

    pub(crate) async fn start_scp_sink(&mut self, command: &str) -> Result<(), Error> {
        self.begin(ContextMode::ScpSink, Some(command)).await
    }

    /// Waits for the running command or shell. A non-zero exit status is
    /// reported as [`Error::RemoteExit`].
    pub async fn wait(&mut self) -> Result<(), Error> {
        let mode = match self.state {
            ContextState::Running(mode) => mode,
            state => {
                return Err(Error::InvalidState {
                    operation: "wait",
                    state,
                })
            }
        };
        self.state = ContextState::Finished;

        let status = self.process.wait().await?;
        debug!("{mode:?} exited with status {status}");

        match status {
            0 => Ok(()),
            status => Err(Error::RemoteExit { status }),
        }
    }

    /// Gives up on the running command without waiting for it. The context is
    /// `Finished` afterwards.
    pub fn abort(&mut self) {
        if let ContextState::Running(mode) = self.state {
            debug!("{mode:?} aborted");
        }
        self.state = ContextState::Finished;
        self.process.abort();
    }

    pub async fn run(&mut self, command: &str) -> Result<(), Error> {
        self.start(command).await?;
        self.wait().await
    }

    pub(crate) async fn run_scp_sink(&mut self, command: &str) -> Result<(), Error> {
        self.start_scp_sink(command).await?;
        self.wait().await
    }

    async fn begin(&mut self, mode: ContextMode, command: Option<&str>) -> Result<(), Error> {
        self.ensure_idle("start")?;

        let ret = match command {
            Some(command) => {
                debug!("{mode:?} exec `{command}`");
                self.process.exec(command).await
            }
            None => {
                debug!("{mode:?} start");
                self.process.shell().await
            }
        };

        self.state = match ret {
            Ok(()) => ContextState::Running(mode),
            Err(_) => ContextState::Finished,
        };
        ret
    }
}

//
/// Cloneable in-memory sink for a context's stdout or stderr.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl AsyncWrite for CaptureBuffer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, IoError>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), IoError>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), IoError>> {
        Poll::Ready(Ok(()))
    }
}

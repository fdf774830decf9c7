use core::task::{Context, Poll};
use std::io::Error as IoError;

use async_trait::async_trait;
use ssh2::{BlockDirections, Error as Ssh2Error, Session};

use crate::error::Error;

//
mod impl_tokio;

//
/// A socket that libssh2 is reading from and writing to in non-blocking mode.
///
/// Every libssh2 call is retried until it stops returning `EAGAIN`, waiting in
/// between for the socket readiness that `Session::block_directions` asks for.
#[async_trait]
pub trait AsyncSessionStream {
    //
    async fn x_with<R: Send>(
        &self,
        op: impl FnMut() -> Result<R, Ssh2Error> + Send,
        sess: &Session,
        expected_block_directions: BlockDirections,
    ) -> Result<R, Error>;

    async fn rw_with<R: Send>(
        &self,
        op: impl FnMut() -> Result<R, Ssh2Error> + Send,
        sess: &Session,
    ) -> Result<R, Error> {
        self.x_with(op, sess, BlockDirections::Both).await
    }

    async fn read_with<R: Send>(
        &self,
        op: impl FnMut() -> Result<R, Ssh2Error> + Send,
        sess: &Session,
    ) -> Result<R, Error> {
        self.x_with(op, sess, BlockDirections::Inbound).await
    }

    async fn write_with<R: Send>(
        &self,
        op: impl FnMut() -> Result<R, Ssh2Error> + Send,
        sess: &Session,
    ) -> Result<R, Error> {
        self.x_with(op, sess, BlockDirections::Outbound).await
    }

    //
    fn poll_x_with<R>(
        &self,
        cx: &mut Context,
        op: impl FnMut() -> Result<R, IoError> + Send,
        sess: &Session,
        expected_block_directions: BlockDirections,
    ) -> Poll<Result<R, IoError>>;

    fn poll_read_with<R>(
        &self,
        cx: &mut Context,
        op: impl FnMut() -> Result<R, IoError> + Send,
        sess: &Session,
    ) -> Poll<Result<R, IoError>> {
        self.poll_x_with(cx, op, sess, BlockDirections::Inbound)
    }

    fn poll_write_with<R>(
        &self,
        cx: &mut Context,
        op: impl FnMut() -> Result<R, IoError> + Send,
        sess: &Session,
    ) -> Poll<Result<R, IoError>> {
        self.poll_x_with(cx, op, sess, BlockDirections::Outbound)
    }
}

//
pub trait BlockDirectionsExt {
    fn is_readable(&self) -> bool;
    fn is_writable(&self) -> bool;
}
impl BlockDirectionsExt for BlockDirections {
    fn is_readable(&self) -> bool {
        matches!(self, BlockDirections::Inbound | BlockDirections::Both)
    }

    fn is_writable(&self) -> bool {
        matches!(self, BlockDirections::Outbound | BlockDirections::Both)
    }
}

/// Directions to wait on after libssh2 returned `EAGAIN`.
///
/// libssh2 normally knows which way it is blocked; when it reports `None` the
/// caller's expectation is used, and `None` there means both.
pub(crate) fn wait_directions(
    actual: BlockDirections,
    expected: &BlockDirections,
) -> BlockDirections {
    match actual {
        BlockDirections::None => match expected {
            BlockDirections::Inbound => BlockDirections::Inbound,
            BlockDirections::Outbound => BlockDirections::Outbound,
            _ => BlockDirections::Both,
        },
        actual => actual,
    }
}

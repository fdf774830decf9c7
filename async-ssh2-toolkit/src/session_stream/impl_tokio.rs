use core::task::{Context, Poll};
use std::io::{Error as IoError, ErrorKind as IoErrorKind};

use async_trait::async_trait;
use ssh2::{BlockDirections, Error as Ssh2Error, Session};
use tokio::{io::Interest, net::TcpStream};

use super::{wait_directions, AsyncSessionStream, BlockDirectionsExt as _};
use crate::{error::Error, util::ssh2_error_is_would_block};

//
#[async_trait]
impl AsyncSessionStream for TcpStream {
    async fn x_with<R: Send>(
        &self,
        mut op: impl FnMut() -> Result<R, Ssh2Error> + Send,
        sess: &Session,
        expected_block_directions: BlockDirections,
    ) -> Result<R, Error> {
        loop {
            match op() {
                Ok(x) => return Ok(x),
                Err(err) => {
                    if !ssh2_error_is_would_block(&err) {
                        return Err(err.into());
                    }
                }
            }

            let interest = interest(&wait_directions(
                sess.block_directions(),
                &expected_block_directions,
            ));

            self.ready(interest).await?;
            // libssh2 drains the socket itself, so tokio never sees the reads.
            clear_readiness(self, interest);
        }
    }

    fn poll_x_with<R>(
        &self,
        cx: &mut Context,
        mut op: impl FnMut() -> Result<R, IoError> + Send,
        sess: &Session,
        expected_block_directions: BlockDirections,
    ) -> Poll<Result<R, IoError>> {
        match op() {
            Err(err) if err.kind() == IoErrorKind::WouldBlock => {}
            ret => return Poll::Ready(ret),
        }

        let directions = wait_directions(sess.block_directions(), &expected_block_directions);

        let mut ready = None;
        if directions.is_readable() {
            if let Poll::Ready(ret) = self.poll_read_ready(cx) {
                ret?;
                ready = Some(Interest::READABLE);
            }
        }
        if directions.is_writable() {
            if let Poll::Ready(ret) = self.poll_write_ready(cx) {
                ret?;
                ready = Some(match ready {
                    Some(interest) => interest | Interest::WRITABLE,
                    None => Interest::WRITABLE,
                });
            }
        }

        match ready {
            // Readiness was cached from an earlier event; clear it and retry `op`.
            Some(interest) => {
                clear_readiness(self, interest);
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            None => Poll::Pending,
        }
    }
}

fn interest(directions: &BlockDirections) -> Interest {
    match (directions.is_readable(), directions.is_writable()) {
        (true, false) => Interest::READABLE,
        (false, true) => Interest::WRITABLE,
        _ => Interest::READABLE | Interest::WRITABLE,
    }
}

fn clear_readiness(stream: &TcpStream, interest: Interest) {
    let _ = stream.try_io(interest, || {
        Err::<(), _>(IoError::from(IoErrorKind::WouldBlock))
    });
}

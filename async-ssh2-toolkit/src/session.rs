use core::time::Duration;
use std::{net::SocketAddr, path::Path, sync::Arc};

#[cfg(unix)]
use std::os::unix::io::AsRawFd;
#[cfg(windows)]
use std::os::windows::io::{AsRawSocket, BorrowedSocket};

use ssh2::{DisconnectCode, HostKeyType, Session};
use tokio::net::TcpStream;

use crate::{channel::AsyncChannel, error::Error, session_stream::AsyncSessionStream};

//
pub struct AsyncSession<S> {
    inner: Session,
    stream: Arc<S>,
}

impl<S> Clone for AsyncSession<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            stream: self.stream.clone(),
        }
    }
}

#[cfg(unix)]
impl<S> AsyncSession<S>
where
    S: AsRawFd + 'static,
{
    pub fn new(
        stream: S,
        configuration: impl Into<Option<SessionConfiguration>>,
    ) -> Result<Self, Error> {
        let mut session = get_session(configuration)?;
        session.set_tcp_stream(stream.as_raw_fd());

        let stream = Arc::new(stream);

        Ok(Self {
            inner: session,
            stream,
        })
    }
}

#[cfg(windows)]
impl<S> AsyncSession<S>
where
    S: AsRawSocket + 'static,
{
    pub fn new(
        stream: S,
        configuration: impl Into<Option<SessionConfiguration>>,
    ) -> Result<Self, Error> {
        let mut session = get_session(configuration)?;
        session.set_tcp_stream(unsafe { BorrowedSocket::borrow_raw(stream.as_raw_socket()) });

        let stream = Arc::new(stream);

        Ok(Self {
            inner: session,
            stream,
        })
    }
}

impl AsyncSession<TcpStream> {
    pub async fn connect<A: Into<SocketAddr>>(
        addr: A,
        configuration: impl Into<Option<SessionConfiguration>>,
    ) -> Result<Self, Error> {
        let stream = TcpStream::connect(addr.into()).await?;

        Self::new(stream, configuration)
    }
}

impl<S> AsyncSession<S> {
    pub fn timeout(&self) -> u32 {
        self.inner.timeout()
    }

    pub fn authenticated(&self) -> bool {
        self.inner.authenticated()
    }

    pub fn host_key(&self) -> Option<(&[u8], HostKeyType)> {
        self.inner.host_key()
    }
}

impl<S> AsyncSession<S>
where
    S: AsyncSessionStream + Send + Sync + 'static,
{
    pub async fn handshake(&mut self) -> Result<(), Error> {
        let sess = self.inner.clone();
        self.stream.rw_with(|| self.inner.handshake(), &sess).await
    }

    pub async fn userauth_password(&self, username: &str, password: &str) -> Result<(), Error> {
        self.stream
            .rw_with(
                || self.inner.userauth_password(username, password),
                &self.inner,
            )
            .await
    }

    pub async fn userauth_pubkey_file(
        &self,
        username: &str,
        pubkey: Option<&Path>,
        privatekey: &Path,
        passphrase: Option<&str>,
    ) -> Result<(), Error> {
        self.stream
            .rw_with(
                || {
                    self.inner
                        .userauth_pubkey_file(username, pubkey, privatekey, passphrase)
                },
                &self.inner,
            )
            .await
    }

    #[cfg(any(unix, feature = "vendored-openssl", feature = "openssl-on-win32"))]
    pub async fn userauth_pubkey_memory(
        &self,
        username: &str,
        pubkeydata: Option<&str>,
        privatekeydata: &str,
        passphrase: Option<&str>,
    ) -> Result<(), Error> {
        self.stream
            .rw_with(
                || {
                    self.inner.userauth_pubkey_memory(
                        username,
                        pubkeydata,
                        privatekeydata,
                        passphrase,
                    )
                },
                &self.inner,
            )
            .await
    }

    pub async fn channel_session(&self) -> Result<AsyncChannel<S>, Error> {
        let channel = self
            .stream
            .rw_with(|| self.inner.channel_session(), &self.inner)
            .await?;

        Ok(AsyncChannel::from_parts(
            channel,
            self.inner.clone(),
            self.stream.clone(),
        ))
    }

    pub async fn disconnect(
        &self,
        reason: Option<DisconnectCode>,
        description: &str,
        lang: Option<&str>,
    ) -> Result<(), Error> {
        self.stream
            .rw_with(
                || self.inner.disconnect(reason, description, lang),
                &self.inner,
            )
            .await
    }
}

//
//
//
/// Options applied to the libssh2 session before the handshake.
#[derive(Debug, Clone, Default)]
pub struct SessionConfiguration {
    banner: Option<String>,
    compress: Option<bool>,
    timeout: Option<Duration>,
}
impl SessionConfiguration {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set_banner(&mut self, banner: &str) {
        self.banner = Some(banner.to_owned());
    }

    pub fn set_compress(&mut self, compress: bool) {
        self.compress = Some(compress);
    }

    /// Upper bound for a single blocking libssh2 call, `0` disables it.
    pub fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout = Some(Duration::from_millis(timeout_ms as u64));
    }
}

pub(crate) fn get_session(
    configuration: impl Into<Option<SessionConfiguration>>,
) -> Result<Session, Error> {
    let session = Session::new()?;
    session.set_blocking(false);

    let configuration = configuration.into().unwrap_or_default();
    if let Some(banner) = configuration.banner {
        session.set_banner(banner.as_ref())?;
    }
    if let Some(compress) = configuration.compress {
        session.set_compress(compress);
    }
    if let Some(timeout) = configuration.timeout {
        session.set_timeout(timeout.as_millis() as u32);
    }

    Ok(session)
}

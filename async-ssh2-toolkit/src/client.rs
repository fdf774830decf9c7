use core::fmt;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use log::{debug, warn};
use ssh2::HostKeyType;
use tokio::net::{lookup_host, TcpStream};

use crate::{
    context::{ExecContext, SshProcess},
    error::Error,
    session::{AsyncSession, SessionConfiguration},
};

//
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    host: String,
    port: u16,
}

impl RemoteEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

//
#[derive(Clone)]
pub enum AuthCredential {
    PrivateKeyFile {
        path: PathBuf,
        passphrase: Option<String>,
    },
    PrivateKeyMemory {
        key: String,
        passphrase: Option<String>,
    },
    Password {
        password: String,
    },
}

impl fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivateKeyFile { path, .. } => {
                f.debug_struct("PrivateKeyFile").field("path", path).finish()
            }
            Self::PrivateKeyMemory { .. } => f.write_str("PrivateKeyMemory"),
            Self::Password { .. } => f.write_str("Password"),
        }
    }
}

//
/// What the server presented during the handshake.
#[derive(Debug)]
pub struct HostKey<'a> {
    pub hostname: &'a str,
    pub addr: SocketAddr,
    pub key: &'a [u8],
    pub key_type: HostKeyType,
}

pub trait HostKeyVerifier: Send + Sync {
    fn verify(&self, host_key: &HostKey<'_>) -> bool;
}

impl<F> HostKeyVerifier for F
where
    F: Fn(&HostKey<'_>) -> bool + Send + Sync,
{
    fn verify(&self, host_key: &HostKey<'_>) -> bool {
        self(host_key)
    }
}

/// Trusts every host key. Only for throwaway hosts and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAnyHostKey;

impl HostKeyVerifier for AcceptAnyHostKey {
    fn verify(&self, host_key: &HostKey<'_>) -> bool {
        warn!(
            "accepting {:?} host key of {} without verification",
            host_key.key_type, host_key.hostname
        );
        true
    }
}

//
#[derive(Clone)]
pub struct ClientConfig {
    username: String,
    credential: AuthCredential,
    verifier: Arc<dyn HostKeyVerifier>,
    session: Option<SessionConfiguration>,
}

impl ClientConfig {
    pub fn new(
        username: impl Into<String>,
        credential: AuthCredential,
        verifier: impl HostKeyVerifier + 'static,
    ) -> Self {
        Self {
            username: username.into(),
            credential,
            verifier: Arc::new(verifier),
            session: None,
        }
    }

    pub fn private_key_file(
        username: impl Into<String>,
        path: impl Into<PathBuf>,
        verifier: impl HostKeyVerifier + 'static,
    ) -> Self {
        let credential = AuthCredential::PrivateKeyFile {
            path: path.into(),
            passphrase: None,
        };
        Self::new(username, credential, verifier)
    }

    pub fn private_key_memory(
        username: impl Into<String>,
        key: impl Into<String>,
        verifier: impl HostKeyVerifier + 'static,
    ) -> Self {
        let credential = AuthCredential::PrivateKeyMemory {
            key: key.into(),
            passphrase: None,
        };
        Self::new(username, credential, verifier)
    }

    pub fn password(
        username: impl Into<String>,
        password: impl Into<String>,
        verifier: impl HostKeyVerifier + 'static,
    ) -> Self {
        let credential = AuthCredential::Password {
            password: password.into(),
        };
        Self::new(username, credential, verifier)
    }

    pub fn set_session_configuration(&mut self, configuration: SessionConfiguration) {
        self.session = Some(configuration);
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn credential(&self) -> &AuthCredential {
        &self.credential
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("username", &self.username)
            .field("credential", &self.credential)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

//
/// An authenticated ssh2 session that hands out command-execution contexts.
#[derive(Clone)]
pub struct Client {
    session: AsyncSession<TcpStream>,
    endpoint: RemoteEndpoint,
}

impl Client {
    pub async fn connect(endpoint: &RemoteEndpoint, config: ClientConfig) -> Result<Self, Error> {
        let addr = lookup_host((endpoint.host(), endpoint.port()))
            .await
            .map_err(|err| Error::Connect(Box::new(err.into())))?
            .next()
            .ok_or_else(|| {
                Error::Connect(Box::new(Error::invalid_argument(
                    "endpoint",
                    format!("{endpoint} resolved to no address"),
                )))
            })?;

        let mut session = AsyncSession::<TcpStream>::connect(addr, config.session.clone())
            .await
            .map_err(|err| Error::Connect(Box::new(err)))?;
        session
            .handshake()
            .await
            .map_err(|err| Error::Connect(Box::new(err)))?;
        debug!("handshake with {endpoint} done");

        verify_host_key(&session, endpoint, addr, config.verifier.as_ref())?;

        let username = config.username.as_str();
        let ret = match &config.credential {
            AuthCredential::PrivateKeyFile { path, passphrase } => {
                session
                    .userauth_pubkey_file(username, None, path, passphrase.as_deref())
                    .await
            }
            #[cfg(any(unix, feature = "vendored-openssl", feature = "openssl-on-win32"))]
            AuthCredential::PrivateKeyMemory { key, passphrase } => {
                session
                    .userauth_pubkey_memory(username, None, key, passphrase.as_deref())
                    .await
            }
            #[cfg(not(any(unix, feature = "vendored-openssl", feature = "openssl-on-win32")))]
            AuthCredential::PrivateKeyMemory { .. } => Err(Error::invalid_argument(
                "credential",
                "in-memory private keys need openssl",
            )),
            AuthCredential::Password { password } => {
                session.userauth_password(username, password).await
            }
        };
        ret.map_err(|err| Error::Userauth(Box::new(err)))?;

        if !session.authenticated() {
            return Err(Error::NotAuthenticated);
        }
        debug!("authenticated to {endpoint} as {username}");

        Ok(Self {
            session,
            endpoint: endpoint.clone(),
        })
    }

    pub fn session(&self) -> &AsyncSession<TcpStream> {
        &self.session
    }

    pub fn endpoint(&self) -> &RemoteEndpoint {
        &self.endpoint
    }

    /// Opens a fresh channel for exactly one command, shell or upload.
    pub async fn context(&self) -> Result<ExecContext<SshProcess<TcpStream>>, Error> {
        let channel = self
            .session
            .channel_session()
            .await
            .map_err(|err| Error::Session(Box::new(err)))?;

        Ok(ExecContext::new(SshProcess::new(channel)))
    }

    pub async fn disconnect(&self) -> Result<(), Error> {
        self.session.disconnect(None, "bye", None).await
    }
}

fn verify_host_key<S>(
    session: &AsyncSession<S>,
    endpoint: &RemoteEndpoint,
    addr: SocketAddr,
    verifier: &dyn HostKeyVerifier,
) -> Result<(), Error> {
    let rejected = || Error::HostKeyRejected {
        host: endpoint.to_string(),
    };

    let (key, key_type) = session.host_key().ok_or_else(rejected)?;
    let host_key = HostKey {
        hostname: endpoint.host(),
        addr,
        key,
        key_type,
    };

    if verifier.verify(&host_key) {
        Ok(())
    } else {
        warn!("host key of {endpoint} rejected");
        Err(rejected())
    }
}

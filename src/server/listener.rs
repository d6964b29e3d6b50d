//! TCP accept loop and the line-oriented wire protocol
//!
//! One request per LF-terminated line, one reply per request, no banner.
//! Each connection gets its own task and session; a disconnect drains that
//! session's workers through the normal stop path.

use crate::config::Config;
use crate::fetch::LinkProvider;
use crate::server::SessionRegistry;
use crate::session::Session;
use crate::store::Store;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// The crawld server: listener, registry, and shared collaborators
pub struct Server {
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
    provider: Arc<dyn LinkProvider>,
    config: Arc<Config>,
}

impl Server {
    /// Opens the store and binds the listen socket
    pub async fn bind(config: Config, provider: Arc<dyn LinkProvider>) -> crate::Result<Self> {
        let store = Store::open(Path::new(&config.server.data_dir))?;
        let registry = SessionRegistry::new(store);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            registry,
            provider,
            config: Arc::new(config),
        })
    }

    /// The address the listener actually bound, useful with port 0
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the process is stopped
    pub async fn run(self) -> crate::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            tracing::info!("client connected: {peer}");

            let registry = Arc::clone(&self.registry);
            let provider = Arc::clone(&self.provider);
            let config = Arc::clone(&self.config);
            tokio::spawn(async move {
                handle_client(stream, peer, registry, provider, &config).await;
                tracing::info!("client disconnected: {peer}");
            });
        }
    }
}

/// Handles one client connection; returns when the client disconnects
async fn handle_client(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<SessionRegistry>,
    provider: Arc<dyn LinkProvider>,
    config: &Config,
) {
    let session = match Session::connect(registry, provider, config) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("failed to create session for {peer}: {e}");
            return;
        }
    };

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.strip_suffix('\r').unwrap_or(&line);
                tracing::info!(%peer, request = %line);

                let reply = session.execute(line).await;
                tracing::info!(%peer, reply = %reply);

                if let Err(e) = write_reply(&mut writer, &reply).await {
                    tracing::warn!("write to {peer} failed: {e}");
                    break;
                }
            }
            Ok(None) => break, // EOF
            Err(e) => {
                tracing::warn!("read from {peer} failed: {e}");
                break;
            }
        }
    }

    session.shutdown().await;
}

async fn write_reply(
    writer: &mut (impl AsyncWriteExt + Unpin),
    reply: &str,
) -> std::io::Result<()> {
    writer.write_all(reply.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

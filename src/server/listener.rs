use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::fs::{DiskTree, FileTree};
use crate::http::connection::{Connection, Outcome};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Binds the listening socket with the configured accept backlog.
pub fn bind(cfg: &Config) -> anyhow::Result<TcpListener> {
    let addr = cfg.listen_addr()?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket
        .bind(addr)
        .with_context(|| format!("binding {addr}"))?;

    Ok(socket.listen(cfg.server.backlog)?)
}

/// Serves `cfg.static_files.root` on `cfg.server.listen_addr` until the
/// returned future is dropped.
pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let tree = DiskTree::new(&cfg.static_files.root)?;
    let listener = bind(cfg)?;

    info!(
        addr = %listener.local_addr()?,
        root = %tree.root().display(),
        backlog = cfg.server.backlog,
        "Listening"
    );

    serve(listener, &tree, cfg).await
}

/// The accept loop.
///
/// Connections are handled strictly one after another: the next accept
/// happens only after the previous connection is closed. Peers arriving
/// meanwhile wait in the listen backlog. Nothing a single connection does
/// stops the loop.
pub async fn serve(listener: TcpListener, tree: &dyn FileTree, cfg: &Config) -> anyhow::Result<()> {
    let mut requests: u64 = 0;

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        // Small writes must not wait on acks over a slow link.
        if let Err(e) = socket.set_nodelay(true) {
            warn!(peer = %peer, error = %e, "Could not disable Nagle");
        }

        let mut conn = Connection::new(socket, tree, cfg);
        match conn.run().await {
            Ok(Outcome::Served { request, status, bytes }) => {
                requests += 1;
                let request = request.as_deref().unwrap_or("<malformed>");
                info!(%peer, status = status.as_u16(), bytes, "#{requests} {request}");
            }
            Ok(Outcome::PeerClosed) => {
                info!(%peer, "Connection closed without a request");
            }
            Ok(Outcome::TimedOut) => {
                warn!(%peer, "Connection timed out waiting for request");
            }
            Err(e) => {
                error!("Connection error from {}: {:#}", peer, e);
            }
        }
    }
}

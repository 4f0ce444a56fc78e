//! Protocol upgrade tunnelling.
//!
//! # Data Flow
//! ```text
//! Client ←──── raw bytes ────→ Router ←──── raw bytes ────→ Dev server
//! ```
//!
//! # Design Decisions
//! - The handshake is forwarded as ordinary HTTP; after `101` both sides
//!   are upgraded and bytes are copied without framing
//! - Either side closing ends the tunnel

use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;

/// Join the client and upstream connections once both finish upgrading.
pub fn spawn_tunnel(client: OnUpgrade, upstream: OnUpgrade, upstream_name: String) {
    tokio::spawn(async move {
        let (client, upstream) = match tokio::try_join!(client, upstream) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(upstream = %upstream_name, error = %e, "Upgrade failed");
                return;
            }
        };

        let mut client = TokioIo::new(client);
        let mut upstream = TokioIo::new(upstream);
        match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
            Ok((to_upstream, to_client)) => tracing::debug!(
                upstream = %upstream_name,
                to_upstream,
                to_client,
                "Upgraded connection closed"
            ),
            Err(e) => tracing::debug!(
                upstream = %upstream_name,
                error = %e,
                "Upgraded connection ended"
            ),
        }
    });
}

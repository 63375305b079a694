use crate::error::Result;
use crate::types::PeerAddr;
use async_trait::async_trait;
use std::sync::Arc;

/// Connection-management side of the network stack, as seen by the controller
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    /// Open a new connection to `addr`
    async fn dial(&self, addr: &PeerAddr) -> Result<()>;

    /// Point-in-time check of whether `addr` has a live connection
    fn is_connected(&self, addr: &PeerAddr) -> bool;
}

/// Entry point the host event system calls when a peer connection is torn down.
///
/// Called before the connection has left the connection manager's registry.
pub trait PeerDisconnectHandler: Send + Sync {
    fn peer_disconnected(&self, addr: PeerAddr, conn: Arc<dyn ConnectionManager>);
}

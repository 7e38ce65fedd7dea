//! Printer transport boundary
//!
//! The dispatcher hands rendered ticket bytes to a transport; the
//! transport owns connection details and applies its own short connect
//! timeout. Returning `false` (or hanging until the dispatcher's
//! per-printer deadline) is the only failure mode the dispatcher sees.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use prep_printer::{NetworkPrinter, Printer};

/// What class of device a destination is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DestinationKind {
    Kitchen,
    Receipt,
}

/// Transport that delivers ticket bytes to a printer address
#[async_trait]
pub trait PrinterTransport: Send + Sync {
    /// Send `data` to the printer at `address`. Returns true on success.
    async fn send(&self, address: &str, data: &[u8], kind: DestinationKind) -> bool;
}

/// TCP transport for network thermal printers (port 9100 class)
#[derive(Debug, Clone)]
pub struct TcpTransport {
    connect_timeout: Duration,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrinterTransport for TcpTransport {
    async fn send(&self, address: &str, data: &[u8], kind: DestinationKind) -> bool {
        let printer = match NetworkPrinter::from_addr(address) {
            Ok(p) => p.with_timeout(self.connect_timeout),
            Err(e) => {
                warn!(address = %address, kind = ?kind, error = %e, "Invalid printer address");
                return false;
            }
        };

        match printer.print(data).await {
            Ok(()) => true,
            Err(e) => {
                warn!(address = %address, kind = ?kind, error = %e, "Printer send failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_address_is_failure() {
        let transport = TcpTransport::new();
        assert!(
            !transport
                .send("not-an-address", b"x", DestinationKind::Kitchen)
                .await
        );
    }

    #[tokio::test]
    async fn test_send_to_local_listener() {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            sock.read_to_end(&mut buf).await.unwrap();
            buf
        });

        let transport = TcpTransport::new();
        assert!(
            transport
                .send(&addr.to_string(), b"ticket", DestinationKind::Kitchen)
                .await
        );
        assert_eq!(server.await.unwrap(), b"ticket");
    }
}

//! Face Landmarker result receiver
//!
//! Receives one JSON-encoded [`FaceLandmarkerResult`] per UDP datagram, as sent
//! by a desktop MediaPipe helper. On device, results arrive through the JNI
//! bridge instead.

use std::net::SocketAddr;
use tokio::net::UdpSocket;

use crate::config::TrackingConfig;
use crate::error::{CartoonHeadError, TrackingError};
use crate::tracking::FaceLandmarkerResult;

const MAX_DATAGRAM: usize = 65536;

/// JSON-over-UDP landmarker result receiver
pub struct ResultReceiver {
    socket: UdpSocket,
    buf: Vec<u8>,
    received: u64,
}

impl ResultReceiver {
    /// Bind the UDP socket described by `config`
    pub async fn bind(config: &TrackingConfig) -> Result<Self, CartoonHeadError> {
        let addr = format!("{}:{}", config.listen_address, config.port);

        let socket = UdpSocket::bind(&addr).await.map_err(|e| {
            TrackingError::Receiver(format!("Failed to bind to {}: {}", addr, e))
        })?;

        tracing::info!("Landmarker result receiver listening on {}", addr);

        Ok(Self {
            socket,
            buf: vec![0u8; MAX_DATAGRAM],
            received: 0,
        })
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, CartoonHeadError> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait for the next datagram and parse it.
    ///
    /// A malformed datagram yields `TrackingError::Parse`; the receiver stays usable.
    pub async fn recv(&mut self) -> Result<FaceLandmarkerResult, CartoonHeadError> {
        let size = self
            .socket
            .recv(&mut self.buf)
            .await
            .map_err(|e| TrackingError::Receiver(format!("Receive error: {}", e)))?;

        let result: FaceLandmarkerResult = serde_json::from_slice(&self.buf[..size])
            .map_err(|e| TrackingError::Parse(format!("JSON parse error: {}", e)))?;

        self.received += 1;
        Ok(result)
    }

    /// Number of results parsed so far
    pub fn received(&self) -> u64 {
        self.received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ephemeral() -> TrackingConfig {
        TrackingConfig {
            port: 0,
            ..TrackingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_receive_result() {
        let mut receiver = ResultReceiver::bind(&ephemeral()).await.unwrap();
        let addr = receiver.local_addr().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let json = serde_json::json!({
            "face_blendshapes": [[{"category_name": "jawOpen", "score": 0.7}]],
            "facial_transformation_matrixes": []
        })
        .to_string();
        sender.send_to(json.as_bytes(), addr).await.unwrap();

        let result = receiver.recv().await.unwrap();
        assert_eq!(result.first_face().unwrap()[0].category_name, "jawOpen");
        assert_eq!(receiver.received(), 1);
    }

    #[tokio::test]
    async fn test_malformed_datagram_keeps_receiver_alive() {
        let mut receiver = ResultReceiver::bind(&ephemeral()).await.unwrap();
        let addr = receiver.local_addr().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"not json", addr).await.unwrap();
        sender.send_to(b"{}", addr).await.unwrap();

        assert!(matches!(
            receiver.recv().await,
            Err(CartoonHeadError::Tracking(TrackingError::Parse(_)))
        ));
        let result = receiver.recv().await.unwrap();
        assert!(!result.has_face());
        assert_eq!(receiver.received(), 1);
    }
}

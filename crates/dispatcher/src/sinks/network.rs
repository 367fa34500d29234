//! NetworkSink - UDP fire-and-forget streaming

use contracts::{BridgeError, TelemetryRecord, TelemetrySink};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

/// Configuration for NetworkSink
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Max packet size (UDP typically 65507 for IPv4)
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            max_packet_size,
        })
    }
}

/// Sink that sends JSON-encoded records over UDP
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    socket: Option<UdpSocket>,
}

impl NetworkSink {
    /// Create a new NetworkSink
    #[instrument(name = "network_sink_new", skip(name, config))]
    pub async fn new(name: impl Into<String>, config: NetworkSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        // Bind to any available port
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&config.addr).await?;

        debug!(
            sink = %name,
            target = %config.addr,
            "NetworkSink connected"
        );

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "network_sink_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, BridgeError> {
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| BridgeError::sink_write("network", e))?;

        Self::new(name, config)
            .await
            .map_err(|e| BridgeError::SinkConnection {
                sink_name: "network".to_string(),
                message: e.to_string(),
            })
    }

    fn socket(&self) -> Result<&UdpSocket, BridgeError> {
        self.socket
            .as_ref()
            .ok_or_else(|| BridgeError::sink_write(&self.name, "socket not connected"))
    }

    fn prepare_payload(&self, record: &TelemetryRecord) -> Result<Vec<u8>, BridgeError> {
        let data = serde_json::to_vec(record)
            .map_err(|e| BridgeError::sink_write(&self.name, e.to_string()))?;

        if data.len() > self.config.max_packet_size {
            warn!(
                sink = %self.name,
                size = data.len(),
                max = self.config.max_packet_size,
                "Packet too large, truncating"
            );
        }

        Ok(data)
    }

    async fn transmit(&self, socket: &UdpSocket, data: &[u8], tag: &str) {
        match socket.send(data).await {
            Ok(sent) => {
                debug!(sink = %self.name, record = tag, bytes = sent, "Sent");
            }
            Err(e) => {
                // Log but don't fail - UDP is best-effort
                error!(sink = %self.name, error = %e, "UDP send failed");
            }
        }
    }
}

impl TelemetrySink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_write",
        skip(self, record),
        fields(sink = %self.name, record = record.tag())
    )]
    async fn write(&mut self, record: &TelemetryRecord) -> Result<(), BridgeError> {
        let socket = self.socket()?;
        let data = self.prepare_payload(record)?;
        self.transmit(socket, &data, record.tag()).await;
        Ok(())
    }

    #[instrument(name = "network_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), BridgeError> {
        // UDP doesn't buffer
        Ok(())
    }

    #[instrument(name = "network_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), BridgeError> {
        self.socket = None;
        debug!(sink = %self.name, "NetworkSink closed");
        Ok(())
    }
}

use hickory_proto::op::{Message, MessageType};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

use super::Upstream;
use crate::error::ProxyError;

/// Large enough for any EDNS(0) reply a resolver will send over UDP
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// Plain DNS over UDP to a single resolver, one attempt per exchange.
pub struct UdpUpstream {
    server: SocketAddr,
    timeout: Duration,
}

impl UdpUpstream {
    pub fn new(server: SocketAddr, timeout: Duration) -> Self {
        Self { server, timeout }
    }

    async fn send_and_receive(&self, request_bytes: &[u8]) -> Result<Vec<u8>, ProxyError> {
        // Ephemeral port on the matching address family
        let bind_addr: SocketAddr = if self.server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind_addr).await.map_err(|e| {
            ProxyError::upstream(self.server, format!("failed to bind socket: {}", e))
        })?;

        // Connecting filters out datagrams from any other source.
        socket
            .connect(self.server)
            .await
            .map_err(|e| ProxyError::upstream(self.server, format!("failed to connect: {}", e)))?;

        let bytes_sent = socket.send(request_bytes).await.map_err(|e| {
            ProxyError::upstream(self.server, format!("failed to send query: {}", e))
        })?;
        debug!("Sent {} byte query to {}", bytes_sent, self.server);

        let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let bytes_received = socket.recv(&mut recv_buf).await.map_err(|e| {
            ProxyError::upstream(self.server, format!("failed to receive reply: {}", e))
        })?;
        recv_buf.truncate(bytes_received);

        debug!("Received {} byte reply from {}", bytes_received, self.server);
        Ok(recv_buf)
    }
}

#[async_trait::async_trait]
impl Upstream for UdpUpstream {
    fn server(&self) -> SocketAddr {
        self.server
    }

    async fn exchange(&self, request: &Message) -> Result<Message, ProxyError> {
        let request_bytes = request
            .to_vec()
            .map_err(|e| ProxyError::upstream(self.server, format!("cannot encode query: {}", e)))?;

        let reply_bytes = timeout(self.timeout, self.send_and_receive(&request_bytes))
            .await
            .map_err(|_| {
                ProxyError::upstream(self.server, format!("no reply within {:?}", self.timeout))
            })??;

        let reply = Message::from_vec(&reply_bytes)
            .map_err(|e| ProxyError::upstream(self.server, format!("malformed reply: {}", e)))?;

        if reply.id() != request.id() {
            return Err(ProxyError::upstream(
                self.server,
                format!("reply id {} does not match query id {}", reply.id(), request.id()),
            ));
        }

        if reply.message_type() != MessageType::Response {
            return Err(ProxyError::upstream(self.server, "reply is not a response"));
        }

        Ok(reply)
    }
}

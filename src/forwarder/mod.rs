mod udp;

pub use udp::UdpUpstream;

use crate::error::ProxyError;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::Record;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// One request/response exchange with an upstream resolver.
#[async_trait::async_trait]
pub trait Upstream: Send + Sync {
    /// Address of the resolver, for logging.
    fn server(&self) -> SocketAddr;

    async fn exchange(&self, request: &Message) -> Result<Message, ProxyError>;
}

/// Answers obtained for the forwarded part of a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForwardOutcome {
    /// Upstream answers in reply order.
    pub answers: Vec<Record>,
    /// Response code of the upstream reply; `None` when nothing was sent or
    /// the exchange failed.
    pub response_code: Option<ResponseCode>,
}

/// Relays questions that are not answered locally.
#[derive(Clone)]
pub struct Forwarder {
    upstream: Arc<dyn Upstream>,
}

impl Forwarder {
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }

    /// Send `batch` upstream in a single message, once.
    ///
    /// An empty batch never touches the network. Failures are logged and
    /// yield an empty outcome so the request can still be answered.
    pub async fn forward(
        &self,
        id: u16,
        recursion_desired: bool,
        batch: &[Query],
    ) -> ForwardOutcome {
        if batch.is_empty() {
            return ForwardOutcome::default();
        }

        let request = build_upstream_query(id, recursion_desired, batch);
        match self.upstream.exchange(&request).await {
            Ok(reply) => {
                debug!(
                    "Upstream {} answered {} question(s) with {} record(s), {:?}",
                    self.upstream.server(),
                    batch.len(),
                    reply.answers().len(),
                    reply.response_code()
                );
                ForwardOutcome {
                    answers: reply.answers().to_vec(),
                    response_code: Some(reply.response_code()),
                }
            }
            Err(e) => {
                warn!("Forwarding {} question(s) failed: {}", batch.len(), e);
                ForwardOutcome::default()
            }
        }
    }
}

/// Build the upstream query: the inbound id and RD flag with only the
/// questions that were not answered locally.
pub fn build_upstream_query(id: u16, recursion_desired: bool, batch: &[Query]) -> Message {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(recursion_desired);
    message.add_queries(batch.iter().cloned());
    message
}

#[cfg(test)]
pub(crate) mod testing;

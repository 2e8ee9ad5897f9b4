use hickory_proto::op::{Header, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::Record;
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::assemble::{assemble, response_code};
use super::classify::{TargetDomains, classify};
use crate::config::{AaaaPolicy, Config};
use crate::discovery::AddressState;
use crate::forwarder::{Forwarder, UdpUpstream};

/// Answers and response code for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub answers: Vec<Record>,
    pub response_code: ResponseCode,
}

/// DNS request handler that redirects target names and forwards the rest
pub struct ZwiftDnsHandler {
    targets: TargetDomains,
    state: AddressState,
    forwarder: Forwarder,
    aaaa_policy: AaaaPolicy,
}

impl ZwiftDnsHandler {
    pub fn new(
        targets: TargetDomains,
        state: AddressState,
        forwarder: Forwarder,
        aaaa_policy: AaaaPolicy,
    ) -> Self {
        Self {
            targets,
            state,
            forwarder,
            aaaa_policy,
        }
    }

    /// Create a handler forwarding over UDP to the configured resolver
    pub fn from_config(config: &Config, state: AddressState) -> Self {
        let upstream = UdpUpstream::new(config.upstream.address, config.upstream_timeout());
        Self::new(
            TargetDomains::new(&config.redirect.domains),
            state,
            Forwarder::new(Arc::new(upstream)),
            config.redirect.aaaa_policy,
        )
    }

    /// Answer a request's questions.
    ///
    /// The address is read once, so every synthesized record in a response
    /// carries the same value even if the poller publishes meanwhile.
    pub async fn resolve(&self, id: u16, recursion_desired: bool, queries: &[Query]) -> Resolution {
        let address = self.state.current();
        let classification = classify(queries, &self.targets, address, self.aaaa_policy);

        for query in &classification.synthesize {
            debug!("Redirecting {} to {}", query.name(), address);
        }
        for query in &classification.dropped {
            debug!("Dropping {} {:?}", query.name(), query.query_type());
        }

        let outcome = self
            .forwarder
            .forward(id, recursion_desired, &classification.forward)
            .await;

        let code = response_code(classification.synthesize.len(), outcome.response_code);
        let answers = assemble(&classification.synthesize, address, outcome.answers);

        info!(
            "Answering {} question(s) with {} record(s): \
             {} synthesized, {} forwarded, {} dropped, {:?}",
            queries.len(),
            answers.len(),
            classification.synthesize.len(),
            classification.forward.len(),
            classification.dropped.len(),
            code
        );

        Resolution {
            answers,
            response_code: code,
        }
    }
}

fn describe(queries: &[Query]) -> String {
    queries
        .iter()
        .map(|q| format!("{} {:?}", q.name(), q.query_type()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait::async_trait]
impl RequestHandler for ZwiftDnsHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        let builder = MessageResponseBuilder::from_message_request(request);
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);

        if request.header().message_type() != MessageType::Query
            || request.header().op_code() != OpCode::Query
        {
            debug!(
                "Unsupported message from {}: {:?} {:?}",
                request.src(),
                request.header().message_type(),
                request.header().op_code()
            );
            header.set_response_code(ResponseCode::NotImp);
            let response = builder.build_no_records(header);
            return response_handle.send_response(response).await.unwrap_or_else(|e| {
                error!("Error sending response: {}", e);
                ResponseInfo::from(header)
            });
        }

        let queries: Vec<Query> = request
            .queries()
            .iter()
            .map(|query| query.original().clone())
            .collect();

        info!("Received DNS query from {}: {}", request.src(), describe(&queries));

        let resolution = self
            .resolve(request.header().id(), request.header().recursion_desired(), &queries)
            .await;
        header.set_response_code(resolution.response_code);

        let response = builder.build(
            header,
            resolution.answers.iter(),
            std::iter::empty(),
            std::iter::empty(),
            std::iter::empty(),
        );
        response_handle.send_response(response).await.unwrap_or_else(|e| {
            error!("Error sending response: {}", e);
            ResponseInfo::from(header)
        })
    }
}

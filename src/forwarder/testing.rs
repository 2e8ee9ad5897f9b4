use super::Upstream;
use crate::error::ProxyError;
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::{RData, Record, RecordType, rdata::A};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Mutex;

/// How the in-memory upstream replies.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Reply {
    /// One A record per A question, TTL 60.
    Answer(Ipv4Addr),
    /// No answers, the given response code.
    Code(ResponseCode),
    /// The exchange fails.
    Fail,
}

/// Upstream double that records every message it receives.
pub(crate) struct RecordingUpstream {
    reply: Reply,
    requests: Mutex<Vec<Message>>,
}

impl RecordingUpstream {
    pub(crate) fn new(reply: Reply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<Message> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Upstream for RecordingUpstream {
    fn server(&self) -> SocketAddr {
        "10.10.10.1:53".parse().unwrap()
    }

    async fn exchange(&self, request: &Message) -> Result<Message, ProxyError> {
        self.requests.lock().unwrap().push(request.clone());

        let mut reply = Message::new();
        reply
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code());
        reply.add_queries(request.queries().iter().cloned());

        match self.reply {
            Reply::Answer(addr) => {
                for query in request.queries() {
                    if query.query_type() == RecordType::A {
                        let rdata = RData::A(A(addr));
                        reply.add_answer(Record::from_rdata(query.name().clone(), 60, rdata));
                    }
                }
            }
            Reply::Code(code) => {
                reply.set_response_code(code);
            }
            Reply::Fail => return Err(ProxyError::upstream(self.server(), "timed out")),
        }

        Ok(reply)
    }
}

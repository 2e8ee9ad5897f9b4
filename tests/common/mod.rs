#![allow(dead_code)]
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{RData, Record, RecordType, rdata::A};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::time::timeout;

/// How the fake resolver treats each query it receives.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// One A record per A question, TTL 60.
    Answer(Ipv4Addr),
    /// Never reply.
    Silent,
    /// Reply with bytes that are not a DNS message.
    Garbage,
    /// Reply to a different transaction id.
    WrongId(Ipv4Addr),
}

/// Resolver on a loopback UDP port that records what it is asked.
pub struct FakeUpstream {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<Message>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl FakeUpstream {
    pub async fn start(behavior: Behavior) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind fake upstream");
        let addr = socket.local_addr().expect("fake upstream address");
        let received = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let log = received.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = socket.recv_from(&mut buf) => {
                        let Ok((len, peer)) = result else { continue };
                        let Ok(request) = Message::from_vec(&buf[..len]) else { continue };
                        log.lock().unwrap().push(request.clone());

                        if let Some(reply) = reply_for(behavior, &request) {
                            let _ = socket.send_to(&reply, peer).await;
                        }
                    }
                }
            }
        });

        Self {
            addr,
            received,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn requests(&self) -> Vec<Message> {
        self.received.lock().unwrap().clone()
    }
}

impl Drop for FakeUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn reply_for(behavior: Behavior, request: &Message) -> Option<Vec<u8>> {
    let (addr, id) = match behavior {
        Behavior::Silent => return None,
        Behavior::Garbage => return Some(vec![0xde, 0xad, 0xbe]),
        Behavior::Answer(addr) => (addr, request.id()),
        Behavior::WrongId(addr) => (addr, request.id().wrapping_add(1)),
    };

    let mut reply = Message::new();
    reply
        .set_id(id)
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(request.recursion_desired())
        .set_recursion_available(true);
    reply.add_queries(request.queries().iter().cloned());
    for query in request.queries() {
        if query.query_type() == RecordType::A {
            reply.add_answer(Record::from_rdata(query.name().clone(), 60, RData::A(A(addr))));
        }
    }

    Some(reply.to_vec().expect("encode fake reply"))
}

/// Send one query message to `server` and wait for its reply.
pub async fn ask(server: SocketAddr, id: u16, queries: Vec<Query>) -> Message {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind client");

    let mut request = Message::new();
    request
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    request.add_queries(queries);

    socket
        .send_to(&request.to_vec().expect("encode query"), server)
        .await
        .expect("send query");

    let mut buf = vec![0u8; 4096];
    let (len, _) = timeout(Duration::from_secs(5), socket.recv_from(&mut buf))
        .await
        .expect("no reply from proxy")
        .expect("receive reply");

    Message::from_vec(&buf[..len]).expect("decode reply")
}

pub fn a_records(message: &Message) -> Vec<(String, u32, Ipv4Addr)> {
    message
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            RData::A(a) => Some((record.name().to_utf8(), record.ttl(), a.0)),
            _ => None,
        })
        .collect()
}

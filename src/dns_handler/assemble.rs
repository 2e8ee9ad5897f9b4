use hickory_proto::op::{Query, ResponseCode};
use hickory_proto::rr::{RData, Record, rdata::A};
use std::net::Ipv4Addr;

use crate::discovery::Address;

/// TTL of every locally synthesized answer, in seconds
pub const SYNTHESIZED_TTL: u32 = 300;

/// A record for `query`'s owner name pointing at `addr`.
pub fn synthesize_answer(query: &Query, addr: Ipv4Addr) -> Record {
    Record::from_rdata(query.name().clone(), SYNTHESIZED_TTL, RData::A(A(addr)))
}

/// Synthesized answers in question order, then the upstream answers as received.
pub fn assemble(synthesize: &[Query], address: Address, forwarded: Vec<Record>) -> Vec<Record> {
    let mut answers = Vec::with_capacity(synthesize.len() + forwarded.len());

    if let Some(addr) = address.resolved() {
        answers.extend(synthesize.iter().map(|query| synthesize_answer(query, addr)));
    }
    answers.extend(forwarded);

    answers
}

/// The upstream's code is only meaningful when it alone answered the request.
pub fn response_code(synthesized: usize, upstream: Option<ResponseCode>) -> ResponseCode {
    match upstream {
        Some(code) if synthesized == 0 => code,
        _ => ResponseCode::NoError,
    }
}

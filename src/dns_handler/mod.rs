mod assemble;
mod classify;
mod handler;

pub use assemble::{SYNTHESIZED_TTL, assemble, response_code, synthesize_answer};
pub use classify::{Classification, TargetDomains, classify};
pub use handler::{Resolution, ZwiftDnsHandler};

//! Media negotiation
//!
//! [`offer_answer`] turns offers and answers into negotiated descriptions,
//! [`plan`] decides what a new negotiated description means for the streams
//! that are already running.

pub mod offer_answer;
pub mod plan;

pub use offer_answer::{
    answer_incoming, compute_dir_incoming, compute_dir_outgoing, match_crypto, match_payloads, process_answer,
    puts_on_hold, AnswerOptions, IncomingNegotiation,
};
pub use plan::{RenegotiationPlan, StreamAction, ENDPOINT_FLAGS, REBUILD_FLAGS};

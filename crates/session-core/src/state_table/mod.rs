//! Declarative call state table.
//!
//! Every `(role, state, event)` triple the session accepts is listed here.
//! Anything missing is rejected by the session with
//! [`SessionError::InvalidTransition`](crate::errors::SessionError), which is
//! also what keeps two negotiation rounds from overlapping: there is no
//! `UpdateCall` out of `Updating`.

pub mod builder;
pub mod tables;
pub mod types;

pub use builder::StateTableBuilder;
pub use types::*;

use lazy_static::lazy_static;
use std::sync::Arc;

lazy_static! {
    /// The master state table - single source of truth for all transitions
    pub static ref MASTER_TABLE: Arc<MasterStateTable> = Arc::new(build_master_table());
}

/// Build the complete master state table
fn build_master_table() -> MasterStateTable {
    let mut builder = StateTableBuilder::new();
    tables::add_uac_transitions(&mut builder);
    tables::add_uas_transitions(&mut builder);
    tables::add_common_transitions(&mut builder);
    let table = builder.build();

    if let Err(errors) = table.validate() {
        panic!("Invalid default state table: {:?}", errors);
    }

    tracing::debug!("Built call state table with {} transitions", table.transition_count());
    table
}

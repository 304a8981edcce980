use super::types::{CallEvent, CallState, MasterStateTable, Role, StateKey, Transition};

/// Accumulates transitions into a [`MasterStateTable`]
#[derive(Default)]
pub struct StateTableBuilder {
    table: MasterStateTable,
}

impl StateTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transition(&mut self, role: Role, state: CallState, event: CallEvent, transition: Transition) -> &mut Self {
        self.table.insert(StateKey { role, state, event }, transition);
        self
    }

    /// Same transition for both roles
    pub fn add_common(&mut self, state: CallState, event: CallEvent, transition: Transition) -> &mut Self {
        for role in [Role::UAC, Role::UAS] {
            self.add_transition(role, state, event, transition.clone());
        }
        self
    }

    pub fn build(self) -> MasterStateTable {
        self.table
    }
}

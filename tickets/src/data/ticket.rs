//! Ticket data layer
//!
//! Holds every ticket the app knows about plus the bookkeeping for requests
//! in flight. Loads are numbered: only the response to the most recent
//! `RequestLoad` may replace the collection, so a slow stale response never
//! overwrites a newer one.

use crate::app::TicketsEnvironment;
use crate::types::{Ticket, TicketId, UserId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tickets_core::environment::Clock;
use tickets_core::{
    DateTime, EntityStore, SmallVec, Utc, async_effect, effect::Effect, reducer::Reducer,
    smallvec,
};

/// Requests in flight against one ticket
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Submitting {
    /// Pending assignee changes
    pub assignee: u32,
    /// Pending completion changes
    pub completed: u32,
}

impl Submitting {
    const fn is_idle(self) -> bool {
        self.assignee == 0 && self.completed == 0
    }
}

/// Ticket state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TicketState {
    /// Tickets in backend order
    pub entities: EntityStore<Ticket>,
    /// Loads in flight (full and single)
    pub loading: u32,
    /// Creations in flight
    pub adding: u32,
    /// Per-ticket mutations in flight; idle tickets have no entry
    pub submitting: BTreeMap<TicketId, Submitting>,
    /// Last failure message
    pub error: Option<String>,
    /// When the latest full load was applied
    pub loaded_at: Option<DateTime<Utc>>,
    /// Number of the most recent full load
    pub latest_load: u64,
}

impl TicketState {
    /// Every ticket in order
    pub fn all(&self) -> impl Iterator<Item = &Ticket> + '_ {
        self.entities.iter()
    }

    /// One ticket
    #[must_use]
    pub fn get(&self, id: TicketId) -> Option<&Ticket> {
        self.entities.get(&id)
    }

    /// Whether any load is in flight
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading > 0
    }

    /// Whether any creation or per-ticket mutation is in flight
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.adding > 0 || !self.submitting.is_empty()
    }

    /// Whether an assignee change for this ticket is in flight
    #[must_use]
    pub fn is_assigning(&self, id: TicketId) -> bool {
        self.submitting.get(&id).is_some_and(|s| s.assignee > 0)
    }

    /// Whether a completion change for this ticket is in flight
    #[must_use]
    pub fn is_completing(&self, id: TicketId) -> bool {
        self.submitting.get(&id).is_some_and(|s| s.completed > 0)
    }

    fn begin_submission(&mut self, id: TicketId, bump: impl FnOnce(&mut Submitting)) {
        bump(self.submitting.entry(id).or_default());
    }

    fn end_submission(&mut self, id: TicketId, drop_one: impl FnOnce(&mut Submitting)) {
        if let Some(entry) = self.submitting.get_mut(&id) {
            drop_one(entry);
            if entry.is_idle() {
                self.submitting.remove(&id);
            }
        }
    }
}

/// Ticket actions
#[derive(Clone, Debug, PartialEq)]
pub enum TicketAction {
    /// Reload every ticket
    RequestLoad,
    /// A full load finished
    LoadSuccess {
        /// Load number the response belongs to
        load: u64,
        /// Every ticket
        tickets: Vec<Ticket>,
    },
    /// A full load failed
    LoadError {
        /// Load number the response belongs to
        load: u64,
        /// Failure message
        error: String,
    },
    /// Load one ticket
    RequestLoadSingle {
        /// Ticket to load
        id: TicketId,
    },
    /// A single load finished
    LoadSingleSuccess {
        /// The ticket
        ticket: Ticket,
    },
    /// A single load failed
    LoadSingleError {
        /// Ticket that was requested
        id: TicketId,
        /// Failure message
        error: String,
    },
    /// Create a ticket
    RequestAdd {
        /// Description of the new ticket
        description: String,
    },
    /// A ticket was created
    AddSuccess {
        /// The new ticket
        ticket: Ticket,
    },
    /// Creating a ticket failed
    AddError {
        /// Failure message
        error: String,
    },
    /// Assign a ticket to a user
    RequestAssign {
        /// Ticket to assign
        ticket_id: TicketId,
        /// New assignee
        user_id: UserId,
    },
    /// An assignment finished
    AssignSuccess {
        /// The updated ticket
        ticket: Ticket,
    },
    /// An assignment failed
    AssignError {
        /// Ticket that was to be assigned
        ticket_id: TicketId,
        /// Failure message
        error: String,
    },
    /// Set a ticket's completion flag
    RequestComplete {
        /// Ticket to update
        ticket_id: TicketId,
        /// New flag value
        completed: bool,
    },
    /// A completion change finished
    CompleteSuccess {
        /// The updated ticket
        ticket: Ticket,
    },
    /// A completion change failed
    CompleteError {
        /// Ticket that was to be updated
        ticket_id: TicketId,
        /// Failure message
        error: String,
    },
}

/// Ticket reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketReducer;

impl Reducer for TicketReducer {
    type State = TicketState;
    type Action = TicketAction;
    type Environment = TicketsEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TicketAction::RequestLoad => {
                state.loading += 1;
                state.latest_load += 1;
                let load = state.latest_load;
                let backend = Arc::clone(&env.backend);
                smallvec![async_effect! {
                    Some(match backend.tickets().await {
                        Ok(tickets) => TicketAction::LoadSuccess { load, tickets },
                        Err(error) => TicketAction::LoadError { load, error: error.to_string() },
                    })
                }]
            },
            TicketAction::LoadSuccess { load, tickets } => {
                state.loading = state.loading.saturating_sub(1);
                if load == state.latest_load {
                    state.entities.set_all(tickets);
                    state.loaded_at = Some(env.clock.now());
                } else {
                    tracing::debug!(load, latest = state.latest_load, "Discarding stale ticket load");
                }
                SmallVec::new()
            },
            TicketAction::LoadError { load, error } => {
                state.loading = state.loading.saturating_sub(1);
                if load == state.latest_load {
                    tracing::warn!(%error, "Loading tickets failed");
                    state.error = Some(error);
                }
                SmallVec::new()
            },
            TicketAction::RequestLoadSingle { id } => {
                state.loading += 1;
                let backend = Arc::clone(&env.backend);
                smallvec![async_effect! {
                    Some(match backend.ticket(id).await {
                        Ok(ticket) => TicketAction::LoadSingleSuccess { ticket },
                        Err(error) => TicketAction::LoadSingleError { id, error: error.to_string() },
                    })
                }]
            },
            TicketAction::LoadSingleSuccess { ticket } => {
                state.loading = state.loading.saturating_sub(1);
                state.entities.upsert_one(ticket);
                SmallVec::new()
            },
            TicketAction::LoadSingleError { id, error } => {
                state.loading = state.loading.saturating_sub(1);
                tracing::warn!(%id, %error, "Loading ticket failed");
                state.error = Some(error);
                SmallVec::new()
            },
            TicketAction::RequestAdd { description } => {
                state.adding += 1;
                let backend = Arc::clone(&env.backend);
                smallvec![async_effect! {
                    Some(match backend.new_ticket(&description).await {
                        Ok(ticket) => TicketAction::AddSuccess { ticket },
                        Err(error) => TicketAction::AddError { error: error.to_string() },
                    })
                }]
            },
            TicketAction::AddSuccess { ticket } => {
                state.adding = state.adding.saturating_sub(1);
                state.entities.upsert_one(ticket);
                smallvec![Effect::send(TicketAction::RequestLoad)]
            },
            TicketAction::AddError { error } => {
                state.adding = state.adding.saturating_sub(1);
                tracing::warn!(%error, "Creating ticket failed");
                state.error = Some(error);
                SmallVec::new()
            },
            TicketAction::RequestAssign { ticket_id, user_id } => {
                state.begin_submission(ticket_id, |s| s.assignee += 1);
                let backend = Arc::clone(&env.backend);
                smallvec![async_effect! {
                    Some(match backend.assign(ticket_id, user_id).await {
                        Ok(ticket) => TicketAction::AssignSuccess { ticket },
                        Err(error) => TicketAction::AssignError { ticket_id, error: error.to_string() },
                    })
                }]
            },
            TicketAction::AssignSuccess { ticket } => {
                state.end_submission(ticket.id, |s| s.assignee = s.assignee.saturating_sub(1));
                state.entities.upsert_one(ticket);
                smallvec![Effect::send(TicketAction::RequestLoad)]
            },
            TicketAction::AssignError { ticket_id, error } => {
                state.end_submission(ticket_id, |s| s.assignee = s.assignee.saturating_sub(1));
                tracing::warn!(%ticket_id, %error, "Assigning ticket failed");
                state.error = Some(error);
                SmallVec::new()
            },
            TicketAction::RequestComplete { ticket_id, completed } => {
                state.begin_submission(ticket_id, |s| s.completed += 1);
                let backend = Arc::clone(&env.backend);
                smallvec![async_effect! {
                    Some(match backend.complete(ticket_id, completed).await {
                        Ok(ticket) => TicketAction::CompleteSuccess { ticket },
                        Err(error) => TicketAction::CompleteError { ticket_id, error: error.to_string() },
                    })
                }]
            },
            TicketAction::CompleteSuccess { ticket } => {
                state.end_submission(ticket.id, |s| s.completed = s.completed.saturating_sub(1));
                state.entities.upsert_one(ticket);
                smallvec![Effect::send(TicketAction::RequestLoad)]
            },
            TicketAction::CompleteError { ticket_id, error } => {
                state.end_submission(ticket_id, |s| s.completed = s.completed.saturating_sub(1));
                tracing::warn!(%ticket_id, %error, "Completing ticket failed");
                state.error = Some(error);
                SmallVec::new()
            },
        }
    }
}

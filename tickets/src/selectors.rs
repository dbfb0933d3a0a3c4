//! View models derived from [`AppState`]

use crate::app::AppState;
use crate::table::{self, TablePage};
use crate::types::{Ticket, TicketId, User, UserId};
use serde::Serialize;

/// Current page of the ticket table
#[must_use]
pub fn ticket_table(state: &AppState) -> TablePage {
    let rows = table::rows(state.tickets.all(), &state.users.entities);
    table::apply(rows, &state.list.query)
}

/// Whether any load or mutation is in flight
#[must_use]
pub fn is_busy(state: &AppState) -> bool {
    state.tickets.is_loading() || state.tickets.is_submitting() || state.users.is_loading()
}

/// Details page view model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TicketDetails<'a> {
    /// Selected ticket
    pub ticket: &'a Ticket,
    /// Its assignee, when assigned and known
    pub assignee: Option<&'a User>,
}

/// The selected ticket with its assignee
///
/// `None` until a ticket is selected and present in the store.
#[must_use]
pub fn ticket_details(state: &AppState) -> Option<TicketDetails<'_>> {
    let ticket = state.tickets.get(state.details.selected?)?;
    let assignee = ticket.assignee_id.and_then(|id| state.users.get(id));
    Some(TicketDetails { ticket, assignee })
}

/// Whether the create form may be submitted
#[must_use]
pub fn can_submit_new_ticket(state: &AppState, description: &str) -> bool {
    !description.trim().is_empty() && state.tickets.adding == 0
}

/// Whether the assignee form may be submitted
///
/// A user must be picked, it must differ from the current assignee and no
/// assignment of the ticket may be in flight.
#[must_use]
pub fn can_submit_assignee(state: &AppState, ticket_id: TicketId, selected: Option<UserId>) -> bool {
    let Some(ticket) = state.tickets.get(ticket_id) else {
        return false;
    };
    selected.is_some() && ticket.assignee_id != selected && !state.tickets.is_assigning(ticket_id)
}

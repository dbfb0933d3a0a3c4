//! Ticket details page

use crate::app::{AppAction, TicketsEnvironment};
use crate::data::{TicketAction, UserAction};
use crate::types::{TicketId, UserId};
use tickets_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// Details page state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketDetailsState {
    /// Ticket shown on the page
    pub selected: Option<TicketId>,
}

/// Details page actions
#[derive(Clone, Debug, PartialEq)]
pub enum TicketDetailsAction {
    /// The page was opened for a ticket
    Init {
        /// Ticket to show
        id: TicketId,
    },
    /// Completion checkbox toggled
    AlterCompleted {
        /// New flag value
        completed: bool,
    },
    /// Assignee form submitted
    EditAssignee {
        /// Picked user
        user_id: UserId,
    },
}

/// Details page reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketDetailsReducer;

impl Reducer for TicketDetailsReducer {
    type State = TicketDetailsState;
    type Action = AppAction;
    type Environment = TicketsEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let AppAction::Details(action) = action else {
            return SmallVec::new();
        };

        match action {
            TicketDetailsAction::Init { id } => {
                state.selected = Some(id);
                smallvec![Effect::merge(vec![
                    Effect::send(AppAction::Tickets(TicketAction::RequestLoadSingle { id })),
                    Effect::send(AppAction::Users(UserAction::RequestLoad)),
                ])]
            },
            TicketDetailsAction::AlterCompleted { completed } => match state.selected {
                Some(ticket_id) => smallvec![Effect::send(AppAction::Tickets(
                    TicketAction::RequestComplete { ticket_id, completed }
                ))],
                None => {
                    tracing::debug!("No ticket selected");
                    SmallVec::new()
                },
            },
            TicketDetailsAction::EditAssignee { user_id } => match state.selected {
                Some(ticket_id) => smallvec![Effect::send(AppAction::Tickets(
                    TicketAction::RequestAssign { ticket_id, user_id }
                ))],
                None => {
                    tracing::debug!("No ticket selected");
                    SmallVec::new()
                },
            },
        }
    }
}

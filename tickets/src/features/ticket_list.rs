//! Ticket list page

use crate::app::{AppAction, TicketsEnvironment};
use crate::data::{TicketAction, UserAction};
use crate::table::{Sort, TableQuery};
use crate::types::{TicketId, UserId};
use tickets_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// List page state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketListState {
    /// Filter, sort and paging of the table
    pub query: TableQuery,
}

impl TicketListState {
    /// Start with a custom page size; zero keeps the default
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        let mut state = Self::default();
        if page_size > 0 {
            state.query.page_size = page_size;
        }
        state
    }
}

/// List page actions
#[derive(Clone, Debug, PartialEq)]
pub enum TicketListAction {
    /// The page was opened
    Init,
    /// Create a ticket
    CreateNew {
        /// Description typed into the form
        description: String,
    },
    /// Pick an assignee from a row
    EditAssignee {
        /// Row's ticket
        ticket_id: TicketId,
        /// Picked user
        user_id: UserId,
    },
    /// Toggle a row's completion checkbox
    AlterCompleted {
        /// Row's ticket
        ticket_id: TicketId,
        /// New flag value
        completed: bool,
    },
    /// Filter text changed
    FilterChanged(String),
    /// Sort header clicked
    SortChanged(Option<Sort>),
    /// Paginator moved
    PageChanged(usize),
    /// Rows per page changed
    PageSizeChanged(usize),
}

/// List page reducer
///
/// Reduces only `AppAction::List` and answers with data-layer actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketListReducer;

impl Reducer for TicketListReducer {
    type State = TicketListState;
    type Action = AppAction;
    type Environment = TicketsEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let AppAction::List(action) = action else {
            return SmallVec::new();
        };

        match action {
            TicketListAction::Init => smallvec![Effect::merge(vec![
                Effect::send(AppAction::Tickets(TicketAction::RequestLoad)),
                Effect::send(AppAction::Users(UserAction::RequestLoad)),
            ])],
            TicketListAction::CreateNew { description } => {
                let description = description.trim();
                if description.is_empty() {
                    tracing::debug!("Ignoring blank ticket description");
                    return SmallVec::new();
                }
                smallvec![Effect::send(AppAction::Tickets(TicketAction::RequestAdd {
                    description: description.to_string(),
                }))]
            },
            TicketListAction::EditAssignee { ticket_id, user_id } => {
                smallvec![Effect::send(AppAction::Tickets(TicketAction::RequestAssign {
                    ticket_id,
                    user_id,
                }))]
            },
            TicketListAction::AlterCompleted { ticket_id, completed } => {
                smallvec![Effect::send(AppAction::Tickets(TicketAction::RequestComplete {
                    ticket_id,
                    completed,
                }))]
            },
            TicketListAction::FilterChanged(filter) => {
                state.query.filter = filter;
                state.query.page_index = 0;
                SmallVec::new()
            },
            TicketListAction::SortChanged(sort) => {
                state.query.sort = sort;
                SmallVec::new()
            },
            TicketListAction::PageChanged(page_index) => {
                state.query.page_index = page_index;
                SmallVec::new()
            },
            TicketListAction::PageSizeChanged(page_size) => {
                if page_size > 0 {
                    state.query.page_size = page_size;
                    state.query.page_index = 0;
                }
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::search::SearchAction;
    use crate::table::Column;
    use std::sync::Arc;
    use std::time::Duration;
    use tickets_testing::{ReducerTest, assertions, collect_actions, test_clock};

    fn env() -> TicketsEnvironment {
        TicketsEnvironment::new(
            Arc::new(InMemoryBackend::with_latency(Duration::ZERO)),
            Arc::new(test_clock()),
        )
    }

    async fn dispatched(action: TicketListAction) -> Vec<AppAction> {
        let (_, effects) = ReducerTest::new(TicketListReducer)
            .with_env(env())
            .given_state(TicketListState::default())
            .when_action(AppAction::List(action))
            .run();
        collect_actions(effects).await
    }

    #[tokio::test]
    async fn init_loads_tickets_and_users() {
        assert_eq!(
            dispatched(TicketListAction::Init).await,
            vec![
                AppAction::Tickets(TicketAction::RequestLoad),
                AppAction::Users(UserAction::RequestLoad),
            ]
        );
    }

    #[tokio::test]
    async fn row_intents_become_data_requests() {
        assert_eq!(
            dispatched(TicketListAction::CreateNew {
                description: "  Order chairs ".to_string(),
            })
            .await,
            vec![AppAction::Tickets(TicketAction::RequestAdd {
                description: "Order chairs".to_string(),
            })]
        );
        assert_eq!(
            dispatched(TicketListAction::EditAssignee {
                ticket_id: TicketId::new(1),
                user_id: UserId::new(0),
            })
            .await,
            vec![AppAction::Tickets(TicketAction::RequestAssign {
                ticket_id: TicketId::new(1),
                user_id: UserId::new(0),
            })]
        );
        assert_eq!(
            dispatched(TicketListAction::AlterCompleted {
                ticket_id: TicketId::new(2),
                completed: false,
            })
            .await,
            vec![AppAction::Tickets(TicketAction::RequestComplete {
                ticket_id: TicketId::new(2),
                completed: false,
            })]
        );
    }

    #[test]
    fn blank_description_is_ignored() {
        ReducerTest::new(TicketListReducer)
            .with_env(env())
            .given_state(TicketListState::default())
            .when_action(AppAction::List(TicketListAction::CreateNew {
                description: "   ".to_string(),
            }))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn filter_resets_page() {
        ReducerTest::new(TicketListReducer)
            .with_env(env())
            .given_state(TicketListState::default())
            .given_actions([AppAction::List(TicketListAction::PageChanged(3))])
            .when_action(AppAction::List(TicketListAction::FilterChanged("desk".to_string())))
            .then_state(|state| {
                assert_eq!(state.query.filter, "desk");
                assert_eq!(state.query.page_index, 0);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn sort_keeps_page() {
        ReducerTest::new(TicketListReducer)
            .with_env(env())
            .given_state(TicketListState::default())
            .given_actions([AppAction::List(TicketListAction::PageChanged(2))])
            .when_action(AppAction::List(TicketListAction::SortChanged(Some(Sort::descending(
                Column::User,
            )))))
            .then_state(|state| {
                assert_eq!(state.query.sort, Some(Sort::descending(Column::User)));
                assert_eq!(state.query.page_index, 2);
            })
            .run();
    }

    #[test]
    fn page_size_resets_page_and_rejects_zero() {
        ReducerTest::new(TicketListReducer)
            .with_env(env())
            .given_state(TicketListState::default())
            .given_actions([
                AppAction::List(TicketListAction::PageChanged(4)),
                AppAction::List(TicketListAction::PageSizeChanged(25)),
            ])
            .when_action(AppAction::List(TicketListAction::PageSizeChanged(0)))
            .then_state(|state| {
                assert_eq!(state.query.page_size, 25);
                assert_eq!(state.query.page_index, 0);
            })
            .run();
    }

    #[test]
    fn other_actions_are_ignored() {
        ReducerTest::new(TicketListReducer)
            .with_env(env())
            .given_state(TicketListState::with_page_size(5))
            .when_action(AppAction::Search(SearchAction::QueryChanged(Default::default())))
            .then_state(|state| assert_eq!(state.query.page_size, 5))
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}

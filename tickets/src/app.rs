//! Application root: state tree, action enum, reducer and store
//!
//! The data layers and the search view own their action enums and are
//! embedded with [`pullback`]. Pages reduce the app action directly (they
//! dispatch data-layer actions) and are only scoped to their state slice.

use crate::backend::Backend;
use crate::data::{TicketAction, TicketReducer, TicketState, UserAction, UserReducer, UserState};
use crate::features::{
    TicketDetailsAction, TicketDetailsReducer, TicketDetailsState, TicketListAction, TicketListReducer,
    TicketListState,
};
use crate::search::{SearchAction, SearchReducer, SearchState};
use std::sync::Arc;
use std::time::Duration;
use tickets_core::composition::{CombinedReducer, combine_reducers, pullback, scope_reducer};
use tickets_core::environment::Clock;
use tickets_core::{SmallVec, effect::Effect, reducer::Reducer};
use tickets_runtime::Store;

/// Debounce applied to search queries unless configured otherwise
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Dependencies shared by every reducer
#[derive(Clone)]
pub struct TicketsEnvironment {
    /// Ticket and user service
    pub backend: Arc<dyn Backend>,
    /// Time source for load timestamps
    pub clock: Arc<dyn Clock>,
    /// Quiet period before a search query is sent
    pub search_debounce: Duration,
}

impl TicketsEnvironment {
    /// Environment with the default search debounce
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }

    /// Replace the search debounce
    #[must_use]
    pub const fn with_search_debounce(mut self, debounce: Duration) -> Self {
        self.search_debounce = debounce;
        self
    }
}

/// Whole application state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppState {
    /// Ticket data layer
    pub tickets: TicketState,
    /// User data layer
    pub users: UserState,
    /// List page
    pub list: TicketListState,
    /// Details page
    pub details: TicketDetailsState,
    /// Search view
    pub search: SearchState,
}

/// Every action the application handles
#[derive(Clone, Debug, PartialEq)]
pub enum AppAction {
    /// Ticket data layer
    Tickets(TicketAction),
    /// User data layer
    Users(UserAction),
    /// List page
    List(TicketListAction),
    /// Details page
    Details(TicketDetailsAction),
    /// Search view
    Search(SearchAction),
}

impl From<TicketAction> for AppAction {
    fn from(action: TicketAction) -> Self {
        Self::Tickets(action)
    }
}

impl From<UserAction> for AppAction {
    fn from(action: UserAction) -> Self {
        Self::Users(action)
    }
}

impl From<TicketListAction> for AppAction {
    fn from(action: TicketListAction) -> Self {
        Self::List(action)
    }
}

impl From<TicketDetailsAction> for AppAction {
    fn from(action: TicketDetailsAction) -> Self {
        Self::Details(action)
    }
}

impl From<SearchAction> for AppAction {
    fn from(action: SearchAction) -> Self {
        Self::Search(action)
    }
}

/// Runtime store for the application
pub type AppStore = Store<AppState, AppAction, TicketsEnvironment, AppReducer>;

/// Root reducer
pub struct AppReducer {
    inner: CombinedReducer<AppState, AppAction, TicketsEnvironment>,
}

impl AppReducer {
    /// Assemble the root reducer from the data layers, pages and search
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: combine_reducers(vec![
                Box::new(pullback(TicketReducer, tickets_state, tickets_action, AppAction::Tickets)),
                Box::new(pullback(UserReducer, users_state, users_action, AppAction::Users)),
                Box::new(pullback(SearchReducer, search_state, search_action, AppAction::Search)),
                Box::new(scope_reducer(TicketListReducer, list_state, set_list)),
                Box::new(scope_reducer(TicketDetailsReducer, details_state, set_details)),
            ]),
        }
    }
}

impl Default for AppReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for AppReducer {
    type State = AppState;
    type Action = AppAction;
    type Environment = TicketsEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        tracing::trace!(?action, "Reducing");
        self.inner.reduce(state, action, env)
    }
}

fn tickets_state(state: &mut AppState) -> &mut TicketState {
    &mut state.tickets
}

fn tickets_action(action: AppAction) -> Option<TicketAction> {
    match action {
        AppAction::Tickets(action) => Some(action),
        _ => None,
    }
}

fn users_state(state: &mut AppState) -> &mut UserState {
    &mut state.users
}

fn users_action(action: AppAction) -> Option<UserAction> {
    match action {
        AppAction::Users(action) => Some(action),
        _ => None,
    }
}

fn search_state(state: &mut AppState) -> &mut SearchState {
    &mut state.search
}

fn search_action(action: AppAction) -> Option<SearchAction> {
    match action {
        AppAction::Search(action) => Some(action),
        _ => None,
    }
}

fn list_state(state: &AppState) -> &TicketListState {
    &state.list
}

fn set_list(state: &mut AppState, list: TicketListState) {
    state.list = list;
}

fn details_state(state: &AppState) -> &TicketDetailsState {
    &state.details
}

fn set_details(state: &mut AppState, details: TicketDetailsState) {
    state.details = details;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::search::SearchQuery;
    use crate::types::TicketId;
    use tickets_testing::{ReducerTest, assertions, collect_actions, test_clock};

    fn env() -> TicketsEnvironment {
        TicketsEnvironment::new(
            Arc::new(InMemoryBackend::with_latency(Duration::ZERO)),
            Arc::new(test_clock()),
        )
        .with_search_debounce(Duration::ZERO)
    }

    #[tokio::test]
    async fn data_effects_come_back_as_app_actions() {
        let (state, effects) = ReducerTest::new(AppReducer::new())
            .with_env(env())
            .given_state(AppState::default())
            .when_action(TicketAction::RequestLoad.into())
            .run();

        assert!(state.tickets.is_loading());
        assert!(!state.users.is_loading());

        let actions = collect_actions(effects).await;
        assert!(matches!(
            actions.as_slice(),
            [AppAction::Tickets(TicketAction::LoadSuccess { load: 1, .. })]
        ));
    }

    #[tokio::test]
    async fn page_init_reaches_both_data_layers() {
        let reducer = AppReducer::new();
        let env = env();
        let mut state = AppState::default();

        let effects = reducer.reduce(&mut state, TicketListAction::Init.into(), &env);
        let requests = collect_actions(effects).await;
        assert_eq!(requests.len(), 2);

        for request in requests {
            let effects = reducer.reduce(&mut state, request, &env);
            for result in collect_actions(effects).await {
                let _ = reducer.reduce(&mut state, result, &env);
            }
        }

        assert_eq!(state.tickets.entities.len(), 5);
        assert!(state.users.loaded);
        assert!(!state.tickets.is_loading());
    }

    #[test]
    fn details_init_selects_ticket() {
        ReducerTest::new(AppReducer::new())
            .with_env(env())
            .given_state(AppState::default())
            .when_action(TicketDetailsAction::Init { id: TicketId::new(2) }.into())
            .then_state(|state| {
                assert_eq!(state.details.selected, Some(TicketId::new(2)));
                // Loading starts once the dispatched request is reduced
                assert!(!state.tickets.is_loading());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assert!(matches!(&effects[0], Effect::Parallel(requests) if requests.len() == 2));
            })
            .run();
    }

    #[test]
    fn search_is_cancellable_at_app_level() {
        ReducerTest::new(AppReducer::new())
            .with_env(env())
            .given_state(AppState::default())
            .when_action(
                SearchAction::QueryChanged(SearchQuery {
                    filter: "desk".to_string(),
                    completed_only: false,
                })
                .into(),
            )
            .then_state(|state| assert!(state.search.searching))
            .then_effects(|effects| assertions::assert_has_cancellable_effect(effects, "ticket-search"))
            .run();
    }
}

//! Backend-side ticket search
//!
//! Opening the view searches the starting query. Typing into the search form
//! produces a stream of queries. Repeating the current query does nothing;
//! any other query is debounced and then sent to the backend, replacing a
//! search that is still waiting or in flight.

use crate::app::TicketsEnvironment;
use crate::types::Ticket;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tickets_core::effect::{Effect, EffectId};
use tickets_core::{SmallVec, async_effect, cancellable, reducer::Reducer, smallvec};

/// Cancellation id shared by every search request
pub const SEARCH_EFFECT_ID: EffectId = EffectId::from_static("ticket-search");

/// Search form values
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Description filter
    pub filter: String,
    /// Only return completed tickets
    pub completed_only: bool,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            filter: String::new(),
            completed_only: true,
        }
    }
}

/// Search state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchState {
    /// Current query
    pub query: SearchQuery,
    /// Results for the current query
    pub results: Vec<Ticket>,
    /// Whether a request for the current query is pending
    pub searching: bool,
    /// Failure message for the current query
    pub error: Option<String>,
}

/// Search actions
#[derive(Clone, Debug, PartialEq)]
pub enum SearchAction {
    /// The view opened; searches the current query
    Init,
    /// The form changed
    QueryChanged(SearchQuery),
    /// The backend answered
    Results {
        /// Query the results belong to
        query: SearchQuery,
        /// Matching tickets
        tickets: Vec<Ticket>,
    },
    /// The backend failed
    Failed {
        /// Query that failed
        query: SearchQuery,
        /// Failure message
        error: String,
    },
}

/// Search reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchReducer;

impl Reducer for SearchReducer {
    type State = SearchState;
    type Action = SearchAction;
    type Environment = TicketsEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SearchAction::Init => {
                state.searching = true;
                state.error = None;
                smallvec![search(env, state.query.clone())]
            },
            SearchAction::QueryChanged(query) => {
                if query == state.query {
                    return SmallVec::new();
                }
                state.query = query.clone();
                state.searching = true;
                state.error = None;
                smallvec![search(env, query)]
            },
            SearchAction::Results { query, tickets } => {
                if query == state.query {
                    state.results = tickets;
                    state.searching = false;
                } else {
                    tracing::debug!(?query, "Ignoring results for an outdated search");
                }
                SmallVec::new()
            },
            SearchAction::Failed { query, error } => {
                if query == state.query {
                    tracing::warn!(%error, "Ticket search failed");
                    state.searching = false;
                    state.error = Some(error);
                }
                SmallVec::new()
            },
        }
    }
}

/// Debounced backend request for `query`, replacing any earlier one
fn search(env: &TicketsEnvironment, query: SearchQuery) -> Effect<SearchAction> {
    let backend = Arc::clone(&env.backend);
    let debounce = env.search_debounce;
    cancellable! {
        id: SEARCH_EFFECT_ID,
        effect: async_effect! {
            if !debounce.is_zero() {
                tokio::time::sleep(debounce).await;
            }
            Some(match backend.tickets_by(&query.filter, query.completed_only).await {
                Ok(tickets) => SearchAction::Results { query, tickets },
                Err(error) => SearchAction::Failed { query, error: error.to_string() },
            })
        },
    }
}

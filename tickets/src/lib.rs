//! # Tickets
//!
//! A ticket tracker built on the composable architecture: tickets are
//! assigned to users and marked completed, everything goes through a mock
//! backend with simulated latency.
//!
//! ## Layout
//!
//! - [`data`]: normalized ticket and user collections and the requests that fill them
//! - [`features`]: list and details pages, which turn user intent into data requests
//! - [`search`]: debounced backend search where the latest query wins
//! - [`table`] and [`selectors`]: view models derived from state
//! - [`app`]: the state tree, the root reducer and the store type
//! - [`refresh`]: periodic reload in the background
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tickets::app::{AppReducer, AppState, AppStore, TicketsEnvironment};
//! use tickets::backend::InMemoryBackend;
//! use tickets::features::TicketListAction;
//! use tickets_core::environment::SystemClock;
//!
//! # async fn demo() -> Result<(), tickets_runtime::StoreError> {
//! let env = TicketsEnvironment::new(Arc::new(InMemoryBackend::new()), Arc::new(SystemClock));
//! let store = AppStore::new(AppState::default(), AppReducer::new(), env);
//!
//! store.send(TicketListAction::Init.into()).await?;
//! store.settle(Duration::from_secs(10)).await?;
//!
//! let page = store.state(tickets::selectors::ticket_table).await;
//! assert_eq!(page.total, 5);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod data;
pub mod features;
pub mod refresh;
pub mod search;
pub mod selectors;
pub mod table;
pub mod types;

pub use app::{AppAction, AppReducer, AppState, AppStore, TicketsEnvironment};
pub use backend::{Backend, BackendError, InMemoryBackend};
pub use config::Config;
pub use types::{Ticket, TicketId, User, UserId};

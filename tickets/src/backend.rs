//! Backend service for tickets and users.
//!
//! [`Backend`] is the seam the reducers' effects call through. The only
//! implementation shipped here is [`InMemoryBackend`], a mock service that
//! keeps its records in memory and answers every call after a random delay.

use crate::types::{Ticket, TicketId, User, UserId};
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by a [`Backend`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No ticket has this id
    #[error("ticket not found: {0}")]
    TicketNotFound(TicketId),

    /// No user has this id
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// Assignment needs both records to exist
    #[error("ticket or user not found")]
    AssignTargetNotFound {
        /// Ticket that was to be assigned
        ticket_id: TicketId,
        /// Intended assignee
        user_id: UserId,
    },

    /// The service could not be reached
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Boxed future returned by [`Backend`] methods
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

/// Ticket and user service
///
/// Methods return boxed futures so the trait stays object safe and can be
/// shared as `Arc<dyn Backend>` in the environment.
pub trait Backend: Send + Sync {
    /// Every ticket
    fn tickets(&self) -> BackendFuture<'_, Vec<Ticket>>;

    /// Tickets whose description contains `filter` (case-insensitive)
    ///
    /// An empty filter matches every ticket. With `completed_only` only
    /// completed tickets are returned.
    fn tickets_by(&self, filter: &str, completed_only: bool) -> BackendFuture<'_, Vec<Ticket>>;

    /// One ticket
    ///
    /// # Errors
    ///
    /// [`BackendError::TicketNotFound`] when the id is unknown.
    fn ticket(&self, id: TicketId) -> BackendFuture<'_, Ticket>;

    /// Every user
    fn users(&self) -> BackendFuture<'_, Vec<User>>;

    /// One user
    ///
    /// # Errors
    ///
    /// [`BackendError::UserNotFound`] when the id is unknown.
    fn user(&self, id: UserId) -> BackendFuture<'_, User>;

    /// Create an open, unassigned ticket
    fn new_ticket(&self, description: &str) -> BackendFuture<'_, Ticket>;

    /// Assign a ticket and return the updated record
    ///
    /// # Errors
    ///
    /// [`BackendError::AssignTargetNotFound`] unless both records exist.
    fn assign(&self, ticket_id: TicketId, user_id: UserId) -> BackendFuture<'_, Ticket>;

    /// Set a ticket's completion flag and return the updated record
    ///
    /// # Errors
    ///
    /// [`BackendError::TicketNotFound`] when the id is unknown.
    fn complete(&self, ticket_id: TicketId, completed: bool) -> BackendFuture<'_, Ticket>;
}

/// Default upper bound of the simulated latency
pub const DEFAULT_MAX_LATENCY: Duration = Duration::from_secs(4);

#[derive(Debug, Default)]
struct Records {
    tickets: Vec<Ticket>,
    users: Vec<User>,
}

impl Records {
    fn ticket_mut(&mut self, id: TicketId) -> Option<&mut Ticket> {
        self.tickets.iter_mut().find(|t| t.id == id)
    }

    fn has_user(&self, id: UserId) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn next_ticket_id(&self) -> TicketId {
        self.tickets
            .iter()
            .map(|t| t.id.value())
            .max()
            .map_or(TicketId::new(0), |max| TicketId::new(max + 1))
    }
}

/// In-memory mock backend
///
/// Clones share the same records. Each call sleeps for a uniformly random
/// duration in `[0, max_latency)` before answering; a zero `max_latency`
/// answers immediately.
#[derive(Clone, Debug)]
pub struct InMemoryBackend {
    records: Arc<Mutex<Records>>,
    max_latency: Duration,
    offline: Arc<AtomicBool>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Backend seeded with the demo records and the default latency
    #[must_use]
    pub fn new() -> Self {
        Self::with_latency(DEFAULT_MAX_LATENCY)
    }

    /// Backend seeded with the demo records
    #[must_use]
    pub fn with_latency(max_latency: Duration) -> Self {
        Self::with_records(seed_tickets(), seed_users(), max_latency)
    }

    /// Backend holding exactly these records
    #[must_use]
    pub fn with_records(tickets: Vec<Ticket>, users: Vec<User>, max_latency: Duration) -> Self {
        Self {
            records: Arc::new(Mutex::new(Records { tickets, users })),
            max_latency,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every following call fail with [`BackendError::Unavailable`]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn records(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn latency(&self) -> Duration {
        if self.max_latency.is_zero() {
            return Duration::ZERO;
        }
        let max_ms = u64::try_from(self.max_latency.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms.max(1)))
    }

    /// Wait the simulated latency, then run `op` against the records
    fn respond<T, F>(&self, call: &'static str, op: F) -> BackendFuture<'_, T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Records) -> Result<T, BackendError> + Send + 'static,
    {
        let latency = self.latency();
        Box::pin(async move {
            tracing::debug!(call, ?latency, "Backend call");
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if self.offline.load(Ordering::SeqCst) {
                return Err(BackendError::Unavailable(format!("{call} failed: service offline")));
            }
            let result = op(&mut *self.records());
            if let Err(error) = &result {
                tracing::warn!(call, %error, "Backend call failed");
            }
            result
        })
    }
}

impl Backend for InMemoryBackend {
    fn tickets(&self) -> BackendFuture<'_, Vec<Ticket>> {
        self.respond("tickets", |records| Ok(records.tickets.clone()))
    }

    fn tickets_by(&self, filter: &str, completed_only: bool) -> BackendFuture<'_, Vec<Ticket>> {
        let needle = filter.to_lowercase();
        self.respond("tickets_by", move |records| {
            Ok(records
                .tickets
                .iter()
                .filter(|t| !completed_only || t.completed)
                .filter(|t| needle.is_empty() || t.description.to_lowercase().contains(&needle))
                .cloned()
                .collect())
        })
    }

    fn ticket(&self, id: TicketId) -> BackendFuture<'_, Ticket> {
        self.respond("ticket", move |records| {
            records
                .tickets
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or(BackendError::TicketNotFound(id))
        })
    }

    fn users(&self) -> BackendFuture<'_, Vec<User>> {
        self.respond("users", |records| Ok(records.users.clone()))
    }

    fn user(&self, id: UserId) -> BackendFuture<'_, User> {
        self.respond("user", move |records| {
            records
                .users
                .iter()
                .find(|u| u.id == id)
                .cloned()
                .ok_or(BackendError::UserNotFound(id))
        })
    }

    fn new_ticket(&self, description: &str) -> BackendFuture<'_, Ticket> {
        let description = description.to_string();
        self.respond("new_ticket", move |records| {
            let ticket = Ticket::new(records.next_ticket_id(), description);
            records.tickets.push(ticket.clone());
            Ok(ticket)
        })
    }

    fn assign(&self, ticket_id: TicketId, user_id: UserId) -> BackendFuture<'_, Ticket> {
        self.respond("assign", move |records| {
            let known_user = records.has_user(user_id);
            match records.ticket_mut(ticket_id) {
                Some(ticket) if known_user => {
                    ticket.assignee_id = Some(user_id);
                    Ok(ticket.clone())
                },
                _ => Err(BackendError::AssignTargetNotFound { ticket_id, user_id }),
            }
        })
    }

    fn complete(&self, ticket_id: TicketId, completed: bool) -> BackendFuture<'_, Ticket> {
        self.respond("complete", move |records| {
            let ticket = records
                .ticket_mut(ticket_id)
                .ok_or(BackendError::TicketNotFound(ticket_id))?;
            ticket.completed = completed;
            Ok(ticket.clone())
        })
    }
}

/// The demo tickets every fresh backend starts with
#[must_use]
pub fn seed_tickets() -> Vec<Ticket> {
    let victor = Some(UserId::new(111));
    [
        (0, "Install a monitor arm", false),
        (1, "Move the desk to the new location", false),
        (2, "Unique", true),
        (3, "Not", true),
        (4, "Project X", true),
    ]
    .into_iter()
    .map(|(id, description, completed)| Ticket {
        id: TicketId::new(id),
        description: description.to_string(),
        assignee_id: victor,
        completed,
    })
    .collect()
}

/// The demo users every fresh backend starts with
#[must_use]
pub fn seed_users() -> Vec<User> {
    vec![
        User {
            id: UserId::new(111),
            name: "Victor".to_string(),
        },
        User {
            id: UserId::new(0),
            name: "Zack".to_string(),
        },
    ]
}

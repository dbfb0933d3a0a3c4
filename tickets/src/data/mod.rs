//! Data layer: normalized ticket and user collections and the requests that fill them.

pub mod ticket;
pub mod user;

pub use ticket::{Submitting, TicketAction, TicketReducer, TicketState};
pub use user::{UserAction, UserReducer, UserState};

//! Page features
//!
//! Each page owns a small slice of state and reacts to its own actions.
//! Requests for data are not handled here: a page dispatches the matching
//! data-layer action as an effect and the data layer does the work.

pub mod ticket_details;
pub mod ticket_list;

pub use ticket_details::{TicketDetailsAction, TicketDetailsReducer, TicketDetailsState};
pub use ticket_list::{TicketListAction, TicketListReducer, TicketListState};

//! Table view of the ticket collection
//!
//! Rows are derived from the ticket and user stores, then filtered, sorted
//! and paged on the client side according to a [`TableQuery`].

use crate::types::{Ticket, TicketId, User};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Reverse;
use tickets_core::EntityStore;

/// User text for tickets without an assignee
pub const NOT_ASSIGNED: &str = "Not Assigned";

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Separator placed between fields when matching the filter,
/// so a match never spans two cells
const FIELD_SEPARATOR: char = '\u{25EC}';

/// One table row
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TicketRow {
    /// Ticket id
    pub id: TicketId,
    /// Ticket description
    pub description: String,
    /// Assignee name or [`NOT_ASSIGNED`]
    pub user: String,
    /// Completion flag
    pub completed: bool,
}

impl TicketRow {
    fn cell(&self, column: Column) -> Cow<'_, str> {
        match column {
            Column::Id => Cow::Owned(self.id.to_string()),
            Column::Description => Cow::Borrowed(&self.description),
            Column::User => Cow::Borrowed(&self.user),
            Column::Completed => Cow::Borrowed(if self.completed { "true" } else { "false" }),
        }
    }

    fn search_text(&self) -> String {
        Column::ALL
            .iter()
            .map(|c| self.cell(*c))
            .collect::<Vec<_>>()
            .join(&FIELD_SEPARATOR.to_string())
            .to_lowercase()
    }
}

/// Table columns
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    /// Ticket id
    Id,
    /// Description
    Description,
    /// Assignee name
    User,
    /// Completion flag
    Completed,
}

impl Column {
    /// Columns in display order
    pub const ALL: [Column; 4] = [Column::Id, Column::Description, Column::User, Column::Completed];
}

/// Sort direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Active sort
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    /// Column to sort by
    pub column: Column,
    /// Direction
    pub direction: Direction,
}

impl Sort {
    /// Ascending sort on a column
    #[must_use]
    pub const fn ascending(column: Column) -> Self {
        Self {
            column,
            direction: Direction::Ascending,
        }
    }

    /// Descending sort on a column
    #[must_use]
    pub const fn descending(column: Column) -> Self {
        Self {
            column,
            direction: Direction::Descending,
        }
    }
}

/// Filter, sort and page settings of the table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableQuery {
    /// Free-text filter
    pub filter: String,
    /// Active sort, if any
    pub sort: Option<Sort>,
    /// Zero-based page
    pub page_index: usize,
    /// Rows per page
    pub page_size: usize,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            filter: String::new(),
            sort: None,
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of the table
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TablePage {
    /// Rows on this page
    pub rows: Vec<TicketRow>,
    /// Rows matching the filter across all pages
    pub total: usize,
    /// Page actually shown, after clamping
    pub page_index: usize,
    /// Number of pages
    pub page_count: usize,
}

/// Build one row per ticket, in ticket order
pub fn rows<'a>(tickets: impl IntoIterator<Item = &'a Ticket>, users: &EntityStore<User>) -> Vec<TicketRow> {
    tickets
        .into_iter()
        .map(|ticket| TicketRow {
            id: ticket.id,
            description: ticket.description.clone(),
            user: ticket
                .assignee_id
                .and_then(|id| users.get(&id))
                .map_or_else(|| NOT_ASSIGNED.to_string(), |user| user.name.clone()),
            completed: ticket.completed,
        })
        .collect()
}

/// Filter, sort and page rows
#[must_use]
pub fn apply(rows: Vec<TicketRow>, query: &TableQuery) -> TablePage {
    let needle = query.filter.trim().to_lowercase();
    let mut rows: Vec<TicketRow> = if needle.is_empty() {
        rows
    } else {
        rows.into_iter()
            .filter(|row| row.search_text().contains(&needle))
            .collect()
    };

    // Both sorts are stable, so ties keep their input order
    match query.sort {
        Some(Sort {
            column,
            direction: Direction::Ascending,
        }) => rows.sort_by_cached_key(|row| SortKey::of(&row.cell(column))),
        Some(Sort {
            column,
            direction: Direction::Descending,
        }) => rows.sort_by_cached_key(|row| Reverse(SortKey::of(&row.cell(column)))),
        None => {},
    }

    let total = rows.len();
    let page_size = query.page_size.max(1);
    let page_count = total.div_ceil(page_size);
    let page_index = query.page_index.min(page_count.saturating_sub(1));

    let rows = rows
        .into_iter()
        .skip(page_index * page_size)
        .take(page_size)
        .collect();

    TablePage {
        rows,
        total,
        page_index,
        page_count,
    }
}

/// Ordering key of a cell
///
/// Numeric cells compare as numbers and come before all text; text compares
/// case-insensitively. Every cell maps to exactly one key, so mixed columns
/// still get a total order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Number(i64),
    Text(String),
}

impl SortKey {
    fn of(cell: &str) -> Self {
        cell.parse()
            .map_or_else(|_| Self::Text(cell.to_lowercase()), Self::Number)
    }
}

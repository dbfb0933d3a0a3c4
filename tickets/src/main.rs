//! Ticket tracker demo binary
//!
//! Drives the list page, the details page and the search view against the
//! in-memory backend and prints the resulting view models.

use std::sync::Arc;
use std::time::Duration;
use tickets::app::{AppState, TicketsEnvironment};
use tickets::features::{TicketDetailsAction, TicketListAction, TicketListState};
use tickets::refresh::spawn_refresh;
use tickets::search::{SearchAction, SearchQuery};
use tickets::{AppReducer, AppStore, Config, InMemoryBackend, UserId, selectors};
use tickets_core::environment::SystemClock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tickets=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(?config, "Starting ticket tracker");

    let backend = Arc::new(InMemoryBackend::with_latency(config.backend_max_latency()));
    let env = TicketsEnvironment::new(backend, Arc::new(SystemClock))
        .with_search_debounce(config.search_debounce());

    let initial = AppState {
        list: TicketListState::with_page_size(config.page_size),
        ..AppState::default()
    };
    let store = AppStore::new(initial, AppReducer::new(), env);

    // Generous enough for a few round trips at the configured latency
    let settle_timeout = config.backend_max_latency() * 4 + Duration::from_secs(5);

    println!("=== Ticket Tracker ===\n");

    let refresh = spawn_refresh(store.clone(), config.refresh_interval());

    println!(">>> Opening the list page");
    store.send(TicketListAction::Init.into()).await?;
    store.settle(settle_timeout).await?;
    println!("{}", serde_json::to_string_pretty(&store.state(selectors::ticket_table).await)?);

    println!("\n>>> Creating a ticket");
    let description = "Replace the broken chair";
    store
        .send(
            TicketListAction::CreateNew {
                description: description.to_string(),
            }
            .into(),
        )
        .await?;
    store.settle(settle_timeout).await?;

    let created = store
        .state(|s| s.tickets.all().find(|t| t.description == description).map(|t| t.id))
        .await;

    if let Some(id) = created {
        println!("\n>>> Assigning ticket {id} to Zack and completing it");
        store
            .send(
                TicketListAction::EditAssignee {
                    ticket_id: id,
                    user_id: UserId::new(0),
                }
                .into(),
            )
            .await?;
        store
            .send(
                TicketListAction::AlterCompleted {
                    ticket_id: id,
                    completed: true,
                }
                .into(),
            )
            .await?;
        store.settle(settle_timeout).await?;

        println!("\n>>> Opening the details page");
        store.send(TicketDetailsAction::Init { id }.into()).await?;
        store.settle(settle_timeout).await?;
        let details = store
            .state(|s| selectors::ticket_details(s).map(|d| serde_json::to_string_pretty(&d)))
            .await
            .transpose()?;
        println!("{}", details.unwrap_or_default());
    } else {
        tracing::warn!("Created ticket not found");
    }

    println!("\n>>> Filtering the table by \"chair\"");
    store
        .send(TicketListAction::FilterChanged("chair".to_string()).into())
        .await?;
    println!("{}", serde_json::to_string_pretty(&store.state(selectors::ticket_table).await)?);

    println!("\n>>> Opening the search view");
    store.send(SearchAction::Init.into()).await?;
    store.settle(settle_timeout).await?;
    println!("{}", serde_json::to_string_pretty(&store.state(|s| s.search.results.clone()).await)?);

    println!("\n>>> Searching completed tickets for \"x\"");
    store
        .send(
            SearchAction::QueryChanged(SearchQuery {
                filter: "x".to_string(),
                completed_only: true,
            })
            .into(),
        )
        .await?;
    store.settle(settle_timeout).await?;
    println!("{}", serde_json::to_string_pretty(&store.state(|s| s.search.results.clone()).await)?);

    refresh.stop();
    store.shutdown(Duration::from_secs(5)).await?;

    println!("\n=== Done ===");
    Ok(())
}

//! Periodic background reload of tickets and users

use crate::app::{AppAction, AppStore};
use crate::data::{TicketAction, UserAction};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to a running refresh loop
///
/// Dropping the handle stops the loop.
#[derive(Debug)]
pub struct RefreshTask {
    handle: JoinHandle<()>,
}

impl RefreshTask {
    /// Whether the loop has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the loop
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Reload tickets and users now and then every `interval`
///
/// The loop ends on its own once the store stops accepting actions.
#[must_use = "the refresh loop stops when the task is dropped"]
pub fn spawn_refresh(store: AppStore, interval: Duration) -> RefreshTask {
    let period = if interval.is_zero() {
        tracing::warn!("Refresh interval of zero, using 1ms");
        Duration::from_millis(1)
    } else {
        interval
    };

    let handle = tokio::spawn(async move {
        let mut ticks = tokio::time::interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticks.tick().await;
            tracing::debug!("Refreshing tickets and users");

            let sent = async {
                store.send(AppAction::Tickets(TicketAction::RequestLoad)).await?;
                store.send(AppAction::Users(UserAction::RequestLoad)).await
            }
            .await;

            if let Err(error) = sent {
                tracing::info!(%error, "Refresh stopped");
                break;
            }
        }
    });

    RefreshTask { handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{AppReducer, AppState, TicketsEnvironment};
    use crate::backend::InMemoryBackend;
    use std::sync::Arc;
    use tickets_testing::test_clock;
    use tokio::sync::broadcast;
    use tokio::sync::broadcast::error::RecvError;
    use tokio::time::Instant;

    fn store() -> AppStore {
        let env = TicketsEnvironment::new(
            Arc::new(InMemoryBackend::with_latency(Duration::ZERO)),
            Arc::new(test_clock()),
        );
        AppStore::new(AppState::default(), AppReducer::new(), env)
    }

    async fn next_ticket_load(actions: &mut broadcast::Receiver<AppAction>) -> Result<(), RecvError> {
        loop {
            match actions.recv().await {
                Ok(AppAction::Tickets(TicketAction::LoadSuccess { .. })) => return Ok(()),
                Ok(_) | Err(RecvError::Lagged(_)) => {},
                Err(RecvError::Closed) => return Err(RecvError::Closed),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reloads_immediately_then_every_interval() -> Result<(), RecvError> {
        let store = store();
        let mut actions = store.subscribe_actions();
        let _task = spawn_refresh(store.clone(), Duration::from_secs(10));

        next_ticket_load(&mut actions).await?;
        let first = Instant::now();
        next_ticket_load(&mut actions).await?;

        assert!(first.elapsed() >= Duration::from_secs(10));
        let (tickets, users) = store
            .state(|s| (s.tickets.latest_load, s.users.latest_load))
            .await;
        assert_eq!(tickets, 2);
        assert!(users >= 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_task_stops_reloads() -> Result<(), RecvError> {
        let store = store();
        let mut actions = store.subscribe_actions();
        let task = spawn_refresh(store.clone(), Duration::from_secs(10));

        next_ticket_load(&mut actions).await?;
        task.stop();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(store.state(|s| s.tickets.latest_load).await, 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn ends_when_the_store_shuts_down() -> Result<(), RecvError> {
        let store = store();
        let mut actions = store.subscribe_actions();
        let task = spawn_refresh(store.clone(), Duration::from_secs(10));

        next_ticket_load(&mut actions).await?;
        store.settle(Duration::from_secs(1)).await.ok();
        store.shutdown(Duration::from_secs(1)).await.ok();

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(task.is_finished());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn waiting_for_a_load_ends_when_the_store_is_gone() {
        let store = store();
        let mut actions = store.subscribe_actions();
        drop(store);

        assert_eq!(next_ticket_load(&mut actions).await, Err(RecvError::Closed));
    }
}

//! # Tickets Testing
//!
//! Testing utilities and helpers for the ticket tracker.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - A Given-When-Then harness for reducers
//! - Assertion helpers for effects
//! - An inline effect runner that collects the actions effects produce
//!
//! ## Example
//!
//! ```ignore
//! use tickets_testing::{ReducerTest, collect_actions};
//!
//! ReducerTest::new(TicketReducer)
//!     .with_env(test_environment())
//!     .given_state(TicketState::default())
//!     .when_action(TicketAction::RequestLoad)
//!     .then_state(|state| assert!(state.is_loading()))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use tickets_core::environment::Clock;


/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use tickets_testing::mocks::FixedClock;
    /// use tickets_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default())
    }
}

/// Running effects without a store
pub mod effects {
    use futures::future::BoxFuture;
    use tickets_core::effect::Effect;

    /// Run effects to completion in order and collect the actions they produce
    ///
    /// `Delay` effects yield their action immediately and `Cancel` is ignored,
    /// so reducers can be driven step by step without timers.
    pub async fn collect_actions<A, I>(effects: I) -> Vec<A>
    where
        A: Send + 'static,
        I: IntoIterator<Item = Effect<A>>,
    {
        let mut actions = Vec::new();
        for effect in effects {
            run(effect, &mut actions).await;
        }
        actions
    }

    fn run<A: Send + 'static>(effect: Effect<A>, actions: &mut Vec<A>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            match effect {
                Effect::None | Effect::Cancel(_) => {},
                Effect::Future(fut) => actions.extend(fut.await),
                Effect::Delay { action, .. } => actions.push(*action),
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    for effect in effects {
                        run(effect, actions).await;
                    }
                },
                Effect::Cancellable { effect, .. } => run(*effect, actions).await,
            }
        })
    }
}

// Re-export commonly used items
pub use effects::collect_actions;
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};

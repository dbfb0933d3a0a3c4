//! User data layer
//!
//! Same load numbering as the ticket layer: the latest full load wins.

use crate::app::TicketsEnvironment;
use crate::types::{User, UserId};
use std::sync::Arc;
use tickets_core::{EntityStore, SmallVec, async_effect, effect::Effect, reducer::Reducer, smallvec};

/// User state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserState {
    /// Users in backend order
    pub entities: EntityStore<User>,
    /// Loads in flight
    pub loading: u32,
    /// Whether the latest full load has been applied
    pub loaded: bool,
    /// Last failure message
    pub error: Option<String>,
    /// Number of the most recent full load
    pub latest_load: u64,
}

impl UserState {
    /// Every user in order
    pub fn all(&self) -> impl Iterator<Item = &User> + '_ {
        self.entities.iter()
    }

    /// One user
    #[must_use]
    pub fn get(&self, id: UserId) -> Option<&User> {
        self.entities.get(&id)
    }

    /// Whether any load is in flight
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading > 0
    }
}

/// User actions
#[derive(Clone, Debug, PartialEq)]
pub enum UserAction {
    /// Reload every user
    RequestLoad,
    /// A full load finished
    LoadSuccess {
        /// Load number the response belongs to
        load: u64,
        /// Every user
        users: Vec<User>,
    },
    /// A full load failed
    LoadError {
        /// Load number the response belongs to
        load: u64,
        /// Failure message
        error: String,
    },
    /// Load one user
    RequestLoadSingle {
        /// User to load
        id: UserId,
    },
    /// A single load finished
    LoadSingleSuccess {
        /// The user
        user: User,
    },
    /// A single load failed
    LoadSingleError {
        /// User that was requested
        id: UserId,
        /// Failure message
        error: String,
    },
}

/// User reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct UserReducer;

impl Reducer for UserReducer {
    type State = UserState;
    type Action = UserAction;
    type Environment = TicketsEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            UserAction::RequestLoad => {
                state.loading += 1;
                state.loaded = false;
                state.latest_load += 1;
                let load = state.latest_load;
                let backend = Arc::clone(&env.backend);
                smallvec![async_effect! {
                    Some(match backend.users().await {
                        Ok(users) => UserAction::LoadSuccess { load, users },
                        Err(error) => UserAction::LoadError { load, error: error.to_string() },
                    })
                }]
            },
            UserAction::LoadSuccess { load, users } => {
                state.loading = state.loading.saturating_sub(1);
                if load == state.latest_load {
                    state.entities.set_all(users);
                    state.loaded = true;
                }
                SmallVec::new()
            },
            UserAction::LoadError { load, error } => {
                state.loading = state.loading.saturating_sub(1);
                if load == state.latest_load {
                    tracing::warn!(%error, "Loading users failed");
                    state.error = Some(error);
                }
                SmallVec::new()
            },
            UserAction::RequestLoadSingle { id } => {
                state.loading += 1;
                let backend = Arc::clone(&env.backend);
                smallvec![async_effect! {
                    Some(match backend.user(id).await {
                        Ok(user) => UserAction::LoadSingleSuccess { user },
                        Err(error) => UserAction::LoadSingleError { id, error: error.to_string() },
                    })
                }]
            },
            UserAction::LoadSingleSuccess { user } => {
                state.loading = state.loading.saturating_sub(1);
                state.entities.upsert_one(user);
                SmallVec::new()
            },
            UserAction::LoadSingleError { id, error } => {
                state.loading = state.loading.saturating_sub(1);
                tracing::warn!(%id, %error, "Loading user failed");
                state.error = Some(error);
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InMemoryBackend, seed_users};
    use std::time::Duration;
    use tickets_testing::{ReducerTest, collect_actions, test_clock};

    fn env() -> TicketsEnvironment {
        TicketsEnvironment::new(
            Arc::new(InMemoryBackend::with_latency(Duration::ZERO)),
            Arc::new(test_clock()),
        )
    }

    #[tokio::test]
    async fn load_replaces_users() {
        let (state, effects) = ReducerTest::new(UserReducer)
            .with_env(env())
            .given_state(UserState::default())
            .when_action(UserAction::RequestLoad)
            .then_state(|state| {
                assert!(state.is_loading());
                assert!(!state.loaded);
            })
            .run();

        let mut state = state;
        for action in collect_actions(effects).await {
            let _ = UserReducer.reduce(&mut state, action, &env());
        }

        assert!(state.loaded);
        assert_eq!(state.loading, 0);
        let names: Vec<_> = state.all().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Victor", "Zack"]);
    }

    #[test]
    fn stale_load_keeps_loaded_false() {
        ReducerTest::new(UserReducer)
            .with_env(env())
            .given_state(UserState::default())
            .given_actions([UserAction::RequestLoad, UserAction::RequestLoad])
            .when_action(UserAction::LoadSuccess {
                load: 1,
                users: seed_users(),
            })
            .then_state(|state| {
                assert!(!state.loaded);
                assert!(state.entities.is_empty());
                assert_eq!(state.loading, 1);
            })
            .run();
    }

    #[test]
    fn reload_clears_loaded_flag() {
        ReducerTest::new(UserReducer)
            .with_env(env())
            .given_state(UserState {
                entities: seed_users().into_iter().collect(),
                loaded: true,
                latest_load: 1,
                ..UserState::default()
            })
            .when_action(UserAction::RequestLoad)
            .then_state(|state| {
                assert!(!state.loaded);
                // Existing users stay visible while reloading
                assert_eq!(state.entities.len(), 2);
            })
            .run();
    }

    #[tokio::test]
    async fn load_single_unknown_user_records_error() {
        let (mut state, effects) = ReducerTest::new(UserReducer)
            .with_env(env())
            .given_state(UserState::default())
            .when_action(UserAction::RequestLoadSingle { id: UserId::new(7) })
            .run();

        for action in collect_actions(effects).await {
            let _ = UserReducer.reduce(&mut state, action, &env());
        }

        assert_eq!(state.loading, 0);
        assert_eq!(state.error.as_deref(), Some("user not found: 7"));
        assert!(state.get(UserId::new(7)).is_none());
    }
}

//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants for backend
//! requests and replaceable searches.

/// Create an `Effect::Future` from an async block body
///
/// The body must evaluate to `Option<Action>`.
///
/// # Example
///
/// ```rust,ignore
/// use tickets_core::async_effect;
///
/// async_effect! {
///     match backend.ticket(id).await {
///         Ok(ticket) => Some(TicketAction::LoadSingleSuccess { ticket }),
///         Err(error) => Some(TicketAction::LoadSingleError { id, error: error.to_string() }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Wrap an effect so that a newer effect started under the same id replaces it
///
/// # Example
///
/// ```rust,ignore
/// use tickets_core::cancellable;
///
/// cancellable! {
///     id: "ticket-search",
///     effect: async_effect! { Some(SearchAction::Results { query, tickets }) }
/// }
/// ```
#[macro_export]
macro_rules! cancellable {
    (
        id: $id:expr,
        effect: $effect:expr $(,)?
    ) => {
        $crate::effect::Effect::Cancellable {
            id: $crate::effect::EffectId::from($id),
            effect: ::std::boxed::Box::new($effect),
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::{Effect, EffectId};

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Loaded(u32),
    }

    #[test]
    fn test_async_effect_macro() {
        let effect: Effect<TestAction> = async_effect! {
            Some(TestAction::Loaded(3))
        };

        assert!(matches!(effect, Effect::Future(_)));
    }

    #[test]
    fn test_cancellable_macro() {
        let effect: Effect<TestAction> = cancellable! {
            id: "ticket-search",
            effect: Effect::None
        };

        match effect {
            Effect::Cancellable { id, effect } => {
                assert_eq!(id, EffectId::from_static("ticket-search"));
                assert!(effect.is_none());
            },
            other => unreachable!("unexpected effect {other:?}"),
        }
    }
}

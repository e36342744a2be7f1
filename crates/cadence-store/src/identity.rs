//! Identity collaborator events

use cadence_model::UserId;

/// Session lifecycle event emitted by the identity collaborator
///
/// The engine initializes subscriptions on sign-in and tears down all
/// subscriptions plus cached state on sign-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A user signed in
    SignedIn(UserId),
    /// The active user signed out
    SignedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_compare_by_user() {
        assert_eq!(
            AuthEvent::SignedIn(UserId::new("u1")),
            AuthEvent::SignedIn(UserId::new("u1")),
        );
        assert_ne!(AuthEvent::SignedIn(UserId::new("u1")), AuthEvent::SignedOut);
    }
}

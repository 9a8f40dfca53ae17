// Scorer Readiness State
// Written by the supervisor's start routine, read by every match request

use super::error::DomainError;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Lifecycle state of the external semantic scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupervisorState {
    NotStarted,
    Ready,
    Failed,
}

impl SupervisorState {
    /// Legal edges of the state machine.
    ///
    /// `Failed -> NotStarted` is only taken by an explicit restart.
    pub fn can_transition_to(self, next: SupervisorState) -> bool {
        use SupervisorState::*;
        matches!(
            (self, next),
            (NotStarted, Ready) | (NotStarted, Failed) | (Ready, Failed) | (Failed, NotStarted)
        )
    }
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisorState::NotStarted => write!(f, "NOT_STARTED"),
            SupervisorState::Ready => write!(f, "READY"),
            SupervisorState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Typed holder for [`SupervisorState`].
///
/// Transitions are compare-and-set, so a writer can only move the state
/// from the value it observed. Readers never block writers for longer than
/// a copy of the enum.
pub struct ReadinessCell {
    tx: watch::Sender<SupervisorState>,
}

impl ReadinessCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SupervisorState::NotStarted);
        Self { tx }
    }

    /// Current state
    pub fn get(&self) -> SupervisorState {
        *self.tx.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.get() == SupervisorState::Ready
    }

    /// Move from `from` to `to`, failing if the edge is illegal or the
    /// current state is no longer `from`
    pub fn transition(
        &self,
        from: SupervisorState,
        to: SupervisorState,
    ) -> Result<(), DomainError> {
        if !from.can_transition_to(to) {
            return Err(DomainError::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let mut observed = from;
        let changed = self.tx.send_if_modified(|current| {
            observed = *current;
            if *current == from {
                *current = to;
                true
            } else {
                false
            }
        });

        if changed {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                from: observed.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// Receiver that is notified on every transition
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.tx.subscribe()
    }
}

impl Default for ReadinessCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_not_started() {
        let cell = ReadinessCell::new();
        assert_eq!(cell.get(), SupervisorState::NotStarted);
        assert!(!cell.is_ready());
    }

    #[test]
    fn test_happy_path_transitions() {
        let cell = ReadinessCell::new();
        cell.transition(SupervisorState::NotStarted, SupervisorState::Ready)
            .unwrap();
        assert!(cell.is_ready());

        cell.transition(SupervisorState::Ready, SupervisorState::Failed)
            .unwrap();
        assert_eq!(cell.get(), SupervisorState::Failed);
    }

    #[test]
    fn test_failed_is_sticky_without_restart() {
        let cell = ReadinessCell::new();
        cell.transition(SupervisorState::NotStarted, SupervisorState::Failed)
            .unwrap();

        let err = cell
            .transition(SupervisorState::Failed, SupervisorState::Ready)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
        assert_eq!(cell.get(), SupervisorState::Failed);
    }

    #[test]
    fn test_stale_compare_and_set_is_rejected() {
        let cell = ReadinessCell::new();
        cell.transition(SupervisorState::NotStarted, SupervisorState::Failed)
            .unwrap();

        // Second writer still believes the state is NotStarted
        let err = cell
            .transition(SupervisorState::NotStarted, SupervisorState::Ready)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidStateTransition {
                from: "FAILED".to_string(),
                to: "READY".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_subscribers_observe_transition() {
        let cell = ReadinessCell::new();
        let mut rx = cell.subscribe();

        cell.transition(SupervisorState::NotStarted, SupervisorState::Ready)
            .unwrap();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SupervisorState::Ready);
    }

    #[test]
    fn test_waiter_stays_pending_until_transition() {
        let cell = ReadinessCell::new();
        let mut rx = cell.subscribe();
        let mut changed = tokio_test::task::spawn(async move { rx.changed().await });

        tokio_test::assert_pending!(changed.poll());

        cell.transition(SupervisorState::NotStarted, SupervisorState::Failed)
            .unwrap();
        assert!(changed.is_woken());
        tokio_test::assert_ready_ok!(changed.poll());
    }
}

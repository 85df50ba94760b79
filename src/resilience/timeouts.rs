//! Per-request timeout supervision.
//!
//! Every request owns one [`RequestTimer`], armed when the request arrives.
//! The timer leaves `Armed` exactly once:
//!
//! ```text
//!            responder answers
//!   ARMED ──────────────────────▶ CANCELLED
//!     │
//!     │ deadline elapses first
//!     ▼
//!   FIRED
//! ```
//!
//! Both transitions are a single compare-and-swap, so whichever side gets there
//! first wins and the other becomes a no-op. Work started on behalf of the
//! request is never cancelled; if it answers after the timer fired, its answer
//! is dropped.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

const ARMED: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Observable state of a [`RequestTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Armed,
    Fired,
    Cancelled,
}

/// Deadline for a single request.
#[derive(Debug)]
pub struct RequestTimer {
    state: AtomicU8,
    deadline: Instant,
    timeout: Duration,
}

impl RequestTimer {
    /// Arm a timer that expires `timeout` from now.
    pub fn arm(timeout: Duration) -> Self {
        Self {
            state: AtomicU8::new(ARMED),
            deadline: Instant::now() + timeout,
            timeout,
        }
    }

    /// Stop the timer because a response is being sent.
    ///
    /// Returns `true` only for the call that moved the timer out of `Armed`.
    /// Calling it again, or after the timer fired, returns `false`.
    pub fn cancel(&self) -> bool {
        self.transition(CANCELLED)
    }

    /// Mark the timer as expired. Same exclusivity rules as [`cancel`](Self::cancel).
    pub fn fire(&self) -> bool {
        self.transition(FIRED)
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(ARMED, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn state(&self) -> TimerState {
        match self.state.load(Ordering::Acquire) {
            ARMED => TimerState::Armed,
            FIRED => TimerState::Fired,
            _ => TimerState::Cancelled,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// How a supervised request ended.
#[derive(Debug)]
pub enum Supervised<T> {
    /// The responder produced a value before the deadline.
    Answered(T),
    /// The deadline elapsed first; the timer is now `Fired`.
    TimedOut,
    /// Every responder handle was dropped without answering.
    Abandoned,
}

/// Race the responder against the request's deadline.
pub async fn supervise<T>(timer: &RequestTimer, mut pending: oneshot::Receiver<T>) -> Supervised<T> {
    tokio::select! {
        answered = &mut pending => match answered {
            Ok(value) => Supervised::Answered(value),
            Err(_) => Supervised::Abandoned,
        },
        _ = tokio::time::sleep_until(timer.deadline()) => {
            if timer.fire() {
                return Supervised::TimedOut;
            }
            // The responder cancelled the timer first; its value is on the way.
            match pending.await {
                Ok(value) => Supervised::Answered(value),
                Err(_) => Supervised::Abandoned,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_idempotent() {
        let timer = RequestTimer::arm(Duration::from_secs(5));
        assert_eq!(timer.state(), TimerState::Armed);
        assert!(timer.cancel());
        assert!(!timer.cancel());
        assert!(!timer.fire());
        assert_eq!(timer.state(), TimerState::Cancelled);
    }

    #[test]
    fn fired_timer_cannot_be_cancelled() {
        let timer = RequestTimer::arm(Duration::from_secs(5));
        assert!(timer.fire());
        assert!(!timer.cancel());
        assert!(!timer.fire());
        assert_eq!(timer.state(), TimerState::Fired);
    }

    #[tokio::test]
    async fn answer_before_deadline_wins() {
        let timer = RequestTimer::arm(Duration::from_secs(5));
        let (tx, rx) = oneshot::channel();

        assert!(timer.cancel());
        tx.send(7).unwrap();

        assert!(matches!(supervise(&timer, rx).await, Supervised::Answered(7)));
        assert_eq!(timer.state(), TimerState::Cancelled);
    }

    #[tokio::test]
    async fn deadline_fires_when_nobody_answers() {
        let timer = RequestTimer::arm(Duration::from_millis(20));
        let (tx, rx) = oneshot::channel::<u32>();

        assert!(matches!(supervise(&timer, rx).await, Supervised::TimedOut));
        assert_eq!(timer.state(), TimerState::Fired);

        // A late responder loses the race and its value is never observed.
        assert!(!timer.cancel());
        assert!(tx.send(1).is_err());
    }

    #[tokio::test]
    async fn dropped_responder_is_abandoned() {
        let timer = RequestTimer::arm(Duration::from_secs(5));
        let (tx, rx) = oneshot::channel::<u32>();
        drop(tx);

        assert!(matches!(supervise(&timer, rx).await, Supervised::Abandoned));
        assert_eq!(timer.state(), TimerState::Armed);
    }

    #[tokio::test]
    async fn responder_that_cancelled_first_still_delivers() {
        let timer = RequestTimer::arm(Duration::from_millis(10));
        let (tx, rx) = oneshot::channel();
        assert!(timer.cancel());

        let sender = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            let _ = tx.send("late but owned");
        });

        assert!(matches!(
            supervise(&timer, rx).await,
            Supervised::Answered("late but owned")
        ));
        sender.await.unwrap();
    }
}

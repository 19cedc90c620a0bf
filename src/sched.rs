//! Cancellable timer scheduler
//!
//! Bare delayed callbacks race: a new event arriving inside a delay
//! window would compete with the stale timer. Every delay goes through
//! the scheduler instead: at most one timer per kind is pending,
//! scheduling a kind aborts the previous one, and a fired timer must be
//! claimed with its sequence number before the pipeline acts on it, so
//! an already-queued stale firing is discarded deterministically.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::pipeline::PipelineEvent;

/// The delayed actions the pipeline schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Begin command capture shortly after waking up
    WakeActivation,
    /// Restart the wake channel after going idle
    ResumeWakeListening,
    /// Return to idle after results have been displayed
    ResultDisplay,
    /// Return to idle after a successful execution
    PostExecute,
    /// Retry a failed wake-listener start
    RetryBackoff,
}

pub struct Scheduler {
    tx: UnboundedSender<PipelineEvent>,
    pending: HashMap<TimerKind, (u64, JoinHandle<()>)>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new(tx: UnboundedSender<PipelineEvent>) -> Self {
        Self {
            tx,
            pending: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Arm `kind` to fire after `delay`, replacing any pending timer of
    /// the same kind.
    pub fn schedule(&mut self, kind: TimerKind, delay: Duration) -> u64 {
        self.cancel(kind);
        let seq = self.next_seq;
        self.next_seq += 1;

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(PipelineEvent::Timer(kind, seq));
        });
        trace!(?kind, seq, ?delay, "timer armed");
        self.pending.insert(kind, (seq, handle));
        seq
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        if let Some((seq, handle)) = self.pending.remove(&kind) {
            handle.abort();
            trace!(?kind, seq, "timer cancelled");
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, (_, handle)) in self.pending.drain() {
            handle.abort();
        }
    }

    /// Accept a fired timer. Returns false for a stale firing that was
    /// superseded or cancelled after it was already queued.
    pub fn claim(&mut self, kind: TimerKind, seq: u64) -> bool {
        match self.pending.get(&kind) {
            Some((pending_seq, _)) if *pending_seq == seq => {
                self.pending.remove(&kind);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_and_is_claimed_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sched = Scheduler::new(tx);

        let seq = sched.schedule(TimerKind::ResultDisplay, Duration::from_secs(3));
        let event = rx.recv().await.unwrap();
        assert_eq!(event, PipelineEvent::Timer(TimerKind::ResultDisplay, seq));

        assert!(sched.claim(TimerKind::ResultDisplay, seq));
        assert!(!sched.claim(TimerKind::ResultDisplay, seq));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_supersedes_previous_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sched = Scheduler::new(tx);

        let first = sched.schedule(TimerKind::ResultDisplay, Duration::from_secs(3));
        let second = sched.schedule(TimerKind::ResultDisplay, Duration::from_secs(3));

        let event = rx.recv().await.unwrap();
        assert_eq!(event, PipelineEvent::Timer(TimerKind::ResultDisplay, second));

        assert!(!sched.claim(TimerKind::ResultDisplay, first));
        assert!(sched.claim(TimerKind::ResultDisplay, second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_already_queued_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sched = Scheduler::new(tx);

        let seq = sched.schedule(TimerKind::PostExecute, Duration::from_millis(10));
        // let it fire into the queue, then cancel before processing
        let event = rx.recv().await.unwrap();
        sched.cancel(TimerKind::PostExecute);

        assert_eq!(event, PipelineEvent::Timer(TimerKind::PostExecute, seq));
        assert!(!sched.claim(TimerKind::PostExecute, seq));
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_kinds_do_not_interfere() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sched = Scheduler::new(tx);

        let a = sched.schedule(TimerKind::WakeActivation, Duration::from_millis(500));
        let b = sched.schedule(TimerKind::ResumeWakeListening, Duration::from_secs(2));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first, PipelineEvent::Timer(TimerKind::WakeActivation, a));
        assert_eq!(
            second,
            PipelineEvent::Timer(TimerKind::ResumeWakeListening, b)
        );
        assert!(sched.claim(TimerKind::WakeActivation, a));
        assert!(sched.claim(TimerKind::ResumeWakeListening, b));
    }
}

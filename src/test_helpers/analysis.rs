//! An analysis client whose calls are answered by the test.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::{
    analysis::{AnalysisClient, AnalysisError},
    models::{DerivedInsight, Reading},
};

/// An outstanding call waiting for the test to answer it.
#[derive(Debug)]
pub struct PendingAnalysis {
    /// The reading the coordinator asked about.
    pub reading: Reading,
    reply: oneshot::Sender<Result<DerivedInsight, AnalysisError>>,
}

impl PendingAnalysis {
    /// Completes the call with a fresh insight.
    pub fn succeed(self, summary: &str) {
        let insight = DerivedInsight::fresh(
            summary.to_string(),
            vec![format!("{summary} recommendation")],
            self.reading,
        );
        let _ = self.reply.send(Ok(insight));
    }

    /// Fails the call.
    pub fn fail(self, reason: &str) {
        let _ = self.reply.send(Err(AnalysisError::Rejected(reason.to_string())));
    }
}

/// The test side of a [`ScriptedAnalysisClient`].
#[derive(Debug)]
pub struct AnalysisCalls {
    calls: mpsc::UnboundedReceiver<PendingAnalysis>,
    peak: Arc<AtomicUsize>,
}

impl AnalysisCalls {
    /// Waits up to a second for the next call.
    ///
    /// # Panics
    /// If no call arrives.
    pub async fn next(&mut self) -> PendingAnalysis {
        tokio::time::timeout(Duration::from_secs(1), self.calls.recv())
            .await
            .expect("timed out waiting for an analysis call")
            .expect("analysis client dropped")
    }

    /// Returns a call that has already been made, if any.
    pub fn try_next(&mut self) -> Option<PendingAnalysis> {
        self.calls.try_recv().ok()
    }

    /// Highest number of calls that were outstanding at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// An [`AnalysisClient`] that forwards every call to the test and waits for
/// the test to answer it.
#[derive(Debug)]
pub struct ScriptedAnalysisClient {
    calls: mpsc::UnboundedSender<PendingAnalysis>,
    outstanding: AtomicUsize,
    peak: Arc<AtomicUsize>,
}

impl ScriptedAnalysisClient {
    /// Creates a client and the receiver of its calls.
    pub fn new() -> (Self, AnalysisCalls) {
        let (tx, rx) = mpsc::unbounded_channel();
        let peak = Arc::new(AtomicUsize::new(0));
        let client = Self { calls: tx, outstanding: AtomicUsize::new(0), peak: Arc::clone(&peak) };
        (client, AnalysisCalls { calls: rx, peak })
    }
}

#[async_trait]
impl AnalysisClient for ScriptedAnalysisClient {
    async fn analyze(&self, reading: &Reading) -> Result<DerivedInsight, AnalysisError> {
        let now = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let (reply, rx) = oneshot::channel();
        let result = match self.calls.send(PendingAnalysis { reading: *reading, reply }) {
            Ok(()) => rx
                .await
                .unwrap_or_else(|_| Err(AnalysisError::Rejected("call abandoned".to_string()))),
            Err(_) => Err(AnalysisError::Rejected("no test listening".to_string())),
        };

        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

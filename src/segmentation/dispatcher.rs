use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use log::{debug, info};
use parking_lot::Mutex;

use super::{ImageRegion, Prompt, SegmentationAdapter};
use crate::error::{EngineError, EngineResult};
use crate::geometry::Polygon;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionKind {
    Click,
    BrushFill,
    DetectAll,
}

/// Result of one background request, posted back to the interaction thread.
#[derive(Debug)]
pub struct DetectionResponse {
    pub sequence: u64,
    pub kind: DetectionKind,
    pub result: EngineResult<Vec<Polygon>>,
}

/// What one `poll` drained from the channel.
#[derive(Debug, Default)]
pub struct DetectionPoll {
    /// Responses to the most recent request, at most one
    pub accepted: Vec<DetectionResponse>,
    /// Sequence numbers of responses dropped as superseded
    pub discarded: Vec<u64>,
}

/// Runs segmentation requests on worker threads and hands back only the
/// newest request's result.
///
/// Every request gets the next sequence number. Workers check the shared
/// latest-issued counter before starting inference, and `poll` drops any
/// response that is not for the latest request, so a slow early request can
/// never overwrite a later one.
pub struct DetectionDispatcher {
    adapter: Arc<dyn SegmentationAdapter>,
    latest_issued: Arc<AtomicU64>,
    last_applied: u64,
    discarded_total: u64,
    progress: Arc<Mutex<Option<(u64, u8)>>>,
    sender: UnboundedSender<DetectionResponse>,
    receiver: UnboundedReceiver<DetectionResponse>,
}

impl std::fmt::Debug for DetectionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionDispatcher")
            .field("latest_issued", &self.latest_sequence())
            .field("last_applied", &self.last_applied)
            .field("discarded_total", &self.discarded_total)
            .finish()
    }
}

impl DetectionDispatcher {
    pub fn new(adapter: Arc<dyn SegmentationAdapter>) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            adapter,
            latest_issued: Arc::new(AtomicU64::new(0)),
            last_applied: 0,
            discarded_total: 0,
            progress: Arc::new(Mutex::new(None)),
            sender,
            receiver,
        }
    }

    /// Starts a request; `None` as prompt means detect-all. Returns its
    /// sequence number. Any earlier request still in flight is superseded.
    pub fn submit(&mut self, region: ImageRegion, prompt: Option<Prompt>, kind: DetectionKind) -> u64 {
        let sequence = self.latest_issued.fetch_add(1, Ordering::SeqCst) + 1;
        *self.progress.lock() = Some((sequence, 0));
        info!("🔍 detection #{} ({:?}) submitted", sequence, kind);

        let adapter = Arc::clone(&self.adapter);
        let latest = Arc::clone(&self.latest_issued);
        let progress = Arc::clone(&self.progress);
        let sender = self.sender.clone();
        std::thread::spawn(move || {
            let result = if latest.load(Ordering::SeqCst) != sequence {
                Err(EngineError::Superseded { sequence })
            } else {
                let report = |percent: u8| {
                    let mut slot = progress.lock();
                    if matches!(*slot, Some((current, _)) if current == sequence) {
                        *slot = Some((sequence, percent.min(100)));
                    }
                };
                match &prompt {
                    Some(prompt) => adapter.segment(&region, prompt, &report),
                    None => adapter.segment_all(&region, &report),
                }
            };
            if let Err(e) = &result {
                debug!("detection #{} finished with {}", sequence, e);
            }
            if sender
                .unbounded_send(DetectionResponse {
                    sequence,
                    kind,
                    result,
                })
                .is_err()
            {
                debug!("detection #{} finished after the dispatcher was dropped", sequence);
            }
        });
        sequence
    }

    /// Drains every response that has arrived, without blocking.
    pub fn poll(&mut self) -> DetectionPoll {
        let mut poll = DetectionPoll::default();
        loop {
            match self.receiver.try_recv() {
                Ok(response) => {
                    let latest = self.latest_sequence();
                    if response.sequence == latest && response.sequence > self.last_applied {
                        self.last_applied = response.sequence;
                        poll.accepted.push(response);
                    } else {
                        debug!(
                            "discarding detection #{} (latest is #{})",
                            response.sequence, latest
                        );
                        self.discarded_total += 1;
                        poll.discarded.push(response.sequence);
                    }
                }
                // Empty, or closed with nothing left
                Err(_) => break,
            }
        }
        poll
    }

    pub fn latest_sequence(&self) -> u64 {
        self.latest_issued.load(Ordering::SeqCst)
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }

    /// True while the newest request has not come back yet.
    pub fn is_pending(&self) -> bool {
        self.last_applied < self.latest_sequence()
    }

    pub fn discarded_count(&self) -> u64 {
        self.discarded_total
    }

    /// Progress of the newest request, if it is still running
    pub fn progress(&self) -> Option<u8> {
        if !self.is_pending() {
            return None;
        }
        let latest = self.latest_sequence();
        match *self.progress.lock() {
            Some((sequence, percent)) if sequence == latest => Some(percent),
            _ => None,
        }
    }
}

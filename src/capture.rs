//! Burst capture against an external landmark detector.
//!
//! The detector is a collaborator behind [`LandmarkDetector`]; the workflow
//! is a small state machine whose transition table is a pure function, so it
//! can be checked without any detector at all.

use tracing::{debug, info, warn};

use crate::aggregate::{AggregateResult, Aggregator, Sample};
use crate::error::{Error, Result};
use crate::types::LandmarkSet;

/// Frames per burst when not configured.
pub const DEFAULT_BURST_SIZE: usize = 5;

/// A face-mesh model producing normalized landmarks.
///
/// `load` is called once before the first detection, `dispose` when the
/// session releases the model.
pub trait LandmarkDetector {
    type Frame;

    fn load(&mut self) -> Result<()>;

    /// Landmarks of the first face in `frame`, or `None` when no face is
    /// visible.
    fn detect(&mut self, frame: &Self::Frame) -> Result<Option<LandmarkSet>>;

    fn dispose(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Capturing,
    Analyzing,
    Done,
    Error,
}

impl CapturePhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Analyzing => "analyzing",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    Start,
    SampleTaken,
    BurstComplete,
    Analyzed,
    Failed,
    Reset,
}

impl CaptureEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::SampleTaken => "sample-taken",
            Self::BurstComplete => "burst-complete",
            Self::Analyzed => "analyzed",
            Self::Failed => "failed",
            Self::Reset => "reset",
        }
    }
}

/// Next phase, or `None` if `event` is not allowed in `phase`.
pub fn transition(phase: CapturePhase, event: CaptureEvent) -> Option<CapturePhase> {
    use CaptureEvent as E;
    use CapturePhase as P;
    match (phase, event) {
        (P::Idle, E::Start) => Some(P::Capturing),
        (P::Capturing, E::SampleTaken) => Some(P::Capturing),
        (P::Capturing, E::BurstComplete) => Some(P::Analyzing),
        (P::Analyzing, E::Analyzed) => Some(P::Done),
        (P::Capturing | P::Analyzing, E::Failed) => Some(P::Error),
        (P::Done | P::Error, E::Reset) => Some(P::Idle),
        _ => None,
    }
}

/// Runs bursts through a detector and aggregates them.
pub struct CaptureSession<D: LandmarkDetector> {
    detector: D,
    loaded: bool,
    phase: CapturePhase,
    burst_size: usize,
    aggregator: Aggregator,
    samples: Vec<Sample>,
}

impl<D: LandmarkDetector> CaptureSession<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            loaded: false,
            phase: CapturePhase::Idle,
            burst_size: DEFAULT_BURST_SIZE,
            aggregator: Aggregator::new(),
            samples: Vec::new(),
        }
    }

    /// Frames taken per burst (at least 1).
    pub fn with_burst_size(mut self, burst_size: usize) -> Self {
        self.burst_size = burst_size.max(1);
        self
    }

    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn burst_size(&self) -> usize {
        self.burst_size
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Samples kept from the last burst.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Take up to `burst_size` frames, keep those with a measurable face and
    /// aggregate them. Must start from [`CapturePhase::Idle`]; ends in
    /// `Done` on success and `Error` otherwise.
    pub fn capture(&mut self, frames: &[D::Frame]) -> Result<AggregateResult> {
        self.apply(CaptureEvent::Start)?;
        self.samples.clear();

        if !self.loaded {
            if let Err(e) = self.detector.load() {
                warn!(error = %e, "detector failed to load");
                self.apply(CaptureEvent::Failed)?;
                return Err(e);
            }
            self.loaded = true;
        }

        for (i, frame) in frames.iter().take(self.burst_size).enumerate() {
            let landmarks = match self.detector.detect(frame) {
                Ok(Some(landmarks)) => landmarks,
                Ok(None) => {
                    debug!(frame = i, "no face in frame");
                    continue;
                }
                Err(e) => {
                    warn!(frame = i, error = %e, "detection failed, skipping frame");
                    continue;
                }
            };
            let sample = self.aggregator.sample(&landmarks);
            if sample.face.is_some() {
                self.samples.push(sample);
                self.apply(CaptureEvent::SampleTaken)?;
            }
        }
        self.apply(CaptureEvent::BurstComplete)?;

        match self.aggregator.aggregate(&self.samples) {
            Ok(result) => {
                self.apply(CaptureEvent::Analyzed)?;
                info!(
                    samples = result.samples,
                    face = result.face.shape.key(),
                    confidence = result.face.confidence,
                    "capture complete"
                );
                Ok(result)
            }
            Err(e) => {
                self.apply(CaptureEvent::Failed)?;
                Err(e)
            }
        }
    }

    /// Back to `Idle` after a finished or failed capture.
    pub fn reset(&mut self) -> Result<()> {
        self.apply(CaptureEvent::Reset)?;
        self.samples.clear();
        Ok(())
    }

    /// Release the detector. A later capture loads it again.
    pub fn dispose(&mut self) {
        if self.loaded {
            self.detector.dispose();
            self.loaded = false;
        }
    }

    fn apply(&mut self, event: CaptureEvent) -> Result<()> {
        match transition(self.phase, event) {
            Some(next) => {
                debug!(from = self.phase.name(), to = next.name(), "capture phase");
                self.phase = next;
                Ok(())
            }
            None => Err(Error::IllegalTransition {
                phase: self.phase.name(),
                event: event.name(),
            }),
        }
    }
}

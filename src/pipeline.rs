//! The capture → detect → classify → render loop.

use image::RgbImage;
use tracing::{debug, error, info};

use crate::camera::FrameSource;
use crate::detector::HandDetector;
use crate::error::Result;
use crate::fingers::FingerState;
use crate::hand::Hand;
use crate::overlay;
use crate::window::FrameSink;

/// What was found in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub hand: Option<Hand>,
    pub fingers: Option<FingerState>,
}

impl FrameReport {
    pub fn label(&self) -> Option<&'static str> {
        self.fingers.as_ref().and_then(FingerState::label)
    }

    pub fn count(&self) -> Option<usize> {
        self.fingers.as_ref().map(FingerState::count)
    }
}

/// Runs detection on `frame`, classifies the first hand and annotates the frame in place.
///
/// With no hand in view the frame is left untouched.
pub fn process_frame<D: HandDetector + ?Sized>(
    detector: &mut D,
    frame: &mut RgbImage,
    draw: bool,
) -> Result<FrameReport> {
    let hand = detector.detect(frame)?.into_iter().next();
    let fingers = hand.as_ref().map(FingerState::from_hand);

    if let Some(hand) = &hand {
        debug!(center = ?hand.center(), presence = hand.presence(), "hand found");
        if draw {
            overlay::draw_hand(frame, hand);
        }
    }
    if let Some(state) = &fingers {
        info!(fingers = %state, "finger up list");
        overlay::draw_finger_state(frame, state);
    }

    Ok(FrameReport { hand, fingers })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QuitKey,
    CaptureFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub stop: StopReason,
}

/// Everything the loop needs, acquired before it starts and released when this is dropped.
pub struct Session<S, D, K> {
    pub source: S,
    pub detector: D,
    pub sink: K,
    pub draw: bool,
}

impl<S, D, K> Session<S, D, K>
where
    S: FrameSource,
    D: HandDetector,
    K: FrameSink,
{
    pub fn new(source: S, detector: D, sink: K) -> Self {
        Self {
            source,
            detector,
            sink,
            draw: true,
        }
    }

    pub fn with_draw(mut self, draw: bool) -> Self {
        self.draw = draw;
        self
    }

    /// Runs until the quit key is pressed or a frame cannot be captured.
    ///
    /// A capture failure ends the loop normally; only display errors are returned.
    pub fn run(&mut self) -> Result<RunSummary> {
        let mut frames = 0;
        loop {
            let mut frame = match self.source.read_frame() {
                Ok(f) => f,
                Err(e) => {
                    error!("failed to capture image: {e}");
                    return Ok(RunSummary {
                        frames,
                        stop: StopReason::CaptureFailed,
                    });
                }
            };
            frames += 1;

            if let Err(e) = process_frame(&mut self.detector, &mut frame, self.draw) {
                error!(frame = frames, "hand detection failed: {e}");
            }

            self.sink.show(&frame)?;

            if self.sink.quit_requested() {
                debug!(frames, "quit requested");
                return Ok(RunSummary {
                    frames,
                    stop: StopReason::QuitKey,
                });
            }
        }
    }
}

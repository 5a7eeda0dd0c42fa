//! Finger-state derivation and the label table.

use crate::hand::{Hand, Handedness, LandmarkIdx};
use std::fmt;

/// Which of the five fingers are extended, ordered thumb, index, middle, ring, pinky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FingerState(pub [bool; 5]);

const FINGER_TIPS: [LandmarkIdx; 4] = [
    LandmarkIdx::IndexFingerTip,
    LandmarkIdx::MiddleFingerTip,
    LandmarkIdx::RingFingerTip,
    LandmarkIdx::PinkyTip,
];

const FINGER_PIPS: [LandmarkIdx; 4] = [
    LandmarkIdx::IndexFingerPip,
    LandmarkIdx::MiddleFingerPip,
    LandmarkIdx::RingFingerPip,
    LandmarkIdx::PinkyPip,
];

impl FingerState {
    /// Derives the finger states from a landmark set.
    ///
    /// The thumb counts as extended when its tip lies outside its IP joint horizontally (the
    /// direction depends on handedness). The other fingers count as extended when the tip is
    /// above the PIP joint in image space.
    pub fn from_hand(hand: &Hand) -> Self {
        let mut state = [false; 5];

        let tip = hand.landmark(LandmarkIdx::ThumbTip);
        let ip = hand.landmark(LandmarkIdx::ThumbIp);
        state[0] = match hand.handedness() {
            Handedness::Right => tip.x > ip.x,
            Handedness::Left => tip.x < ip.x,
        };

        for (i, (tip, pip)) in FINGER_TIPS.iter().zip(FINGER_PIPS).enumerate() {
            state[i + 1] = hand.landmark(*tip).y < hand.landmark(pip).y;
        }

        FingerState(state)
    }

    /// Number of extended fingers.
    pub fn count(&self) -> usize {
        self.0.iter().filter(|up| **up).count()
    }

    /// Status text for the recognised patterns, `None` for every other vector.
    pub fn label(&self) -> Option<&'static str> {
        match self.0 {
            [false, true, false, false, false] => Some("1 Finger Up"),
            [false, true, true, false, false] => Some("2 Fingers Up"),
            [false, true, true, true, false] => Some("3 Fingers Up"),
            [false, true, true, true, true] => Some("4 Fingers Up"),
            [true, true, true, true, true] => Some("5 Fingers Up"),
            _ => None,
        }
    }
}

impl From<[u8; 5]> for FingerState {
    fn from(v: [u8; 5]) -> Self {
        FingerState(v.map(|f| f != 0))
    }
}

impl fmt::Display for FingerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, up) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", u8::from(*up))?;
        }
        write!(f, "]")
    }
}

//! Drawing onto frames.
//!
//! Everything here draws through `embedded-graphics`; [`Canvas`] adapts an [`RgbImage`] into a
//! draw target that silently clips pixels outside the frame.

use std::convert::Infallible;

use embedded_graphics::{
    mono_font::{ascii::FONT_10X20, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use image::{Rgb, RgbImage};

use crate::fingers::FingerState;
use crate::hand::{Hand, BBOX_PADDING, CONNECTIVITY};

pub const LABEL_ORIGIN: (i32, i32) = (50, 50);
pub const COUNT_ORIGIN: (i32, i32) = (50, 450);

pub const LABEL_COLOR: Rgb888 = Rgb888::new(0, 0, 255);
pub const COUNT_COLOR: Rgb888 = Rgb888::new(0, 255, 0);
pub const HAND_COLOR: Rgb888 = Rgb888::new(255, 0, 255);
pub const LANDMARK_COLOR: Rgb888 = Rgb888::new(255, 0, 0);
const CONNECTION_COLOR: Rgb888 = Rgb888::new(255, 255, 255);

const TEXT_STROKE: i32 = 2;

struct Canvas<'a>(&'a mut RgbImage);

impl OriginDimensions for Canvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}

impl DrawTarget for Canvas<'_> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (w, h) = self.0.dimensions();
        for Pixel(pt, color) in pixels {
            if pt.x >= 0 && pt.y >= 0 && (pt.x as u32) < w && (pt.y as u32) < h {
                self.0.put_pixel(pt.x as u32, pt.y as u32, Rgb([color.r(), color.g(), color.b()]));
            }
        }
        Ok(())
    }
}

fn ok(res: Result<impl Sized, Infallible>) {
    match res {
        Ok(_) => {}
        Err(infallible) => match infallible {},
    }
}

/// Draws `text` with its baseline starting at `origin`.
///
/// Mono fonts have a fixed 1px stroke, so the glyphs are stamped `TEXT_STROKE` times with a
/// horizontal offset to thicken them.
pub fn put_text(frame: &mut RgbImage, text: &str, origin: (i32, i32), color: Rgb888) {
    let style = MonoTextStyle::new(&FONT_10X20, color);
    let mut canvas = Canvas(frame);
    for dx in 0..TEXT_STROKE {
        let pos = Point::new(origin.0 + dx, origin.1);
        ok(Text::with_baseline(text, pos, style, Baseline::Alphabetic).draw(&mut canvas));
    }
}

/// Landmark dots, skeleton, padded bounding box and handedness label.
pub fn draw_hand(frame: &mut RgbImage, hand: &Hand) {
    let mut canvas = Canvas(&mut *frame);

    for (a, b) in CONNECTIVITY {
        let (a, b) = (hand.landmark(*a), hand.landmark(*b));
        ok(Line::new(
            Point::new(a.x as i32, a.y as i32),
            Point::new(b.x as i32, b.y as i32),
        )
        .into_styled(PrimitiveStyle::with_stroke(CONNECTION_COLOR, 2))
        .draw(&mut canvas));
    }
    for lm in hand.landmarks() {
        ok(Circle::with_center(Point::new(lm.x as i32, lm.y as i32), 9)
            .into_styled(PrimitiveStyle::with_fill(LANDMARK_COLOR))
            .draw(&mut canvas));
    }

    let bbox = hand.bounding_box().padded(BBOX_PADDING);
    ok(Rectangle::new(
        Point::new(bbox.x, bbox.y),
        Size::new(bbox.width.max(0) as u32, bbox.height.max(0) as u32),
    )
    .into_styled(PrimitiveStyle::with_stroke(HAND_COLOR, 2))
    .draw(&mut canvas));

    let label = hand.handedness().label();
    put_text(frame, label, (bbox.x, bbox.y - 10), HAND_COLOR);
}

/// Status label (when the vector matches a known pattern) and the finger count.
pub fn draw_finger_state(frame: &mut RgbImage, state: &FingerState) {
    if let Some(label) = state.label() {
        put_text(frame, label, LABEL_ORIGIN, LABEL_COLOR);
    }
    put_text(
        frame,
        &format!("Fingers: {}", state.count()),
        COUNT_ORIGIN,
        COUNT_COLOR,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::{Handedness, Landmark, LANDMARK_COUNT};

    fn count_color(frame: &RgbImage, color: Rgb888) -> usize {
        let want = Rgb([color.r(), color.g(), color.b()]);
        frame.pixels().filter(|p| **p == want).count()
    }

    fn rows(frame: &RgbImage, color: Rgb888) -> Option<(u32, u32)> {
        let want = Rgb([color.r(), color.g(), color.b()]);
        let ys: Vec<u32> = frame
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == want)
            .map(|(_, y, _)| y)
            .collect();
        Some((*ys.iter().min()?, *ys.iter().max()?))
    }

    #[test]
    fn labelled_state_draws_label_and_count() {
        let mut frame = RgbImage::new(640, 480);
        draw_finger_state(&mut frame, &FingerState::from([0u8, 1, 1, 0, 0]));

        let (top, bottom) = rows(&frame, LABEL_COLOR).unwrap();
        assert!(top >= 30 && bottom <= 56, "label rows {top}..{bottom}");
        let (top, bottom) = rows(&frame, COUNT_COLOR).unwrap();
        assert!(top >= 430 && bottom <= 456, "count rows {top}..{bottom}");
    }

    #[test]
    fn unlabelled_state_draws_only_count() {
        let mut frame = RgbImage::new(640, 480);
        draw_finger_state(&mut frame, &FingerState::from([1u8, 0, 0, 0, 1]));
        assert_eq!(count_color(&frame, LABEL_COLOR), 0);
        assert!(count_color(&frame, COUNT_COLOR) > 0);
    }

    #[test]
    fn drawing_clips_to_small_frames() {
        let mut frame = RgbImage::new(64, 64);
        draw_finger_state(&mut frame, &FingerState::from([1u8, 1, 1, 1, 1]));
        assert_eq!(count_color(&frame, COUNT_COLOR), 0);
    }

    #[test]
    fn hand_annotation_marks_landmarks() {
        let mut lms = [Landmark::default(); LANDMARK_COUNT];
        for (i, lm) in lms.iter_mut().enumerate() {
            *lm = Landmark::new(200.0 + i as f32 * 4.0, 300.0 - i as f32 * 8.0, 0.0);
        }
        let hand = Hand::new(lms, Handedness::Left, 0.95);
        let mut frame = RgbImage::new(640, 480);
        draw_hand(&mut frame, &hand);

        assert_eq!(*frame.get_pixel(200, 300), Rgb([255, 0, 0]));
        assert!(count_color(&frame, HAND_COLOR) > 0);
    }
}

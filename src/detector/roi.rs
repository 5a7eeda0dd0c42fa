//! Mappings between frame pixels and network input pixels.

use image::{imageops, imageops::FilterType, Rgb, RgbImage};

/// Aspect-preserving fit of a frame into a square network input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub size: u32,
    pub scale: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    scaled_width: u32,
    scaled_height: u32,
}

impl Letterbox {
    pub fn fit(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width.max(1) as f32).min(size as f32 / height.max(1) as f32);
        let scaled_width = ((width as f32 * scale).round() as u32).clamp(1, size);
        let scaled_height = ((height as f32 * scale).round() as u32).clamp(1, size);
        Self {
            size,
            scale,
            pad_x: (size - scaled_width) / 2,
            pad_y: (size - scaled_height) / 2,
            scaled_width,
            scaled_height,
        }
    }

    /// Resizes `frame` and centers it on a black square canvas.
    pub fn apply(&self, frame: &RgbImage) -> RgbImage {
        let resized = imageops::resize(
            frame,
            self.scaled_width,
            self.scaled_height,
            FilterType::Triangle,
        );
        let mut canvas = RgbImage::new(self.size, self.size);
        imageops::replace(&mut canvas, &resized, self.pad_x as i64, self.pad_y as i64);
        canvas
    }

    /// Maps a point in network input pixels back to frame pixels.
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

/// A square region of the frame, rotated clockwise by `radians` around its center.
///
/// Inner coordinates have their origin at the top left corner of the upright square and range
/// from 0 to `side` on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub cx: f32,
    pub cy: f32,
    pub side: f32,
    pub radians: f32,
}

/// Rotates a vector clockwise in image space (y pointing down).
pub(crate) fn rotate(x: f32, y: f32, radians: f32) -> (f32, f32) {
    let (sin, cos) = radians.sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

impl RotatedRect {
    pub fn new(cx: f32, cy: f32, side: f32, radians: f32) -> Self {
        Self {
            cx,
            cy,
            side,
            radians,
        }
    }

    /// Transforms a point from the rectangle's coordinate system to frame pixels.
    pub fn transform_out(&self, x: f32, y: f32) -> (f32, f32) {
        let half = self.side * 0.5;
        let (dx, dy) = rotate(x - half, y - half, self.radians);
        (self.cx + dx, self.cy + dy)
    }

    /// Samples the region into an upright `size`×`size` image. Parts outside the frame are black.
    pub fn crop(&self, frame: &RgbImage, size: u32) -> RgbImage {
        let step = self.side / size as f32;
        let mut out = RgbImage::new(size, size);
        for (u, v, px) in out.enumerate_pixels_mut() {
            let (x, y) = self.transform_out((u as f32 + 0.5) * step, (v as f32 + 0.5) * step);
            *px = imageops::interpolate_bilinear(frame, x - 0.5, y - 0.5).unwrap_or(Rgb([0, 0, 0]));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    impl Letterbox {
        fn to_input(&self, x: f32, y: f32) -> (f32, f32) {
            (
                x * self.scale + self.pad_x as f32,
                y * self.scale + self.pad_y as f32,
            )
        }
    }

    impl RotatedRect {
        fn transform_in(&self, x: f32, y: f32) -> (f32, f32) {
            let half = self.side * 0.5;
            let (dx, dy) = rotate(x - self.cx, y - self.cy, -self.radians);
            (dx + half, dy + half)
        }
    }

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-3 && (a.1 - b.1).abs() < 1e-3
    }

    #[test]
    fn letterbox_landscape_pads_vertically() {
        let lb = Letterbox::fit(640, 480, 224);
        assert_eq!(lb.scale, 0.35);
        assert_eq!((lb.pad_x, lb.pad_y), (0, 28));
        assert!(close(lb.to_frame(112.0, 112.0), (320.0, 240.0)));
    }

    #[test]
    fn letterbox_round_trips_points() {
        for (w, h) in [(640, 480), (480, 640), (1280, 720), (192, 192)] {
            let lb = Letterbox::fit(w, h, 192);
            for (x, y) in [(0.0, 0.0), (w as f32 / 3.0, h as f32 - 1.0)] {
                let (ix, iy) = lb.to_input(x, y);
                let (fx, fy) = lb.to_frame(ix, iy);
                assert!((fx - x).abs() < 1e-2 && (fy - y).abs() < 1e-2, "{w}x{h}");
            }
        }
    }

    #[test]
    fn letterbox_centers_image() {
        let frame = RgbImage::from_pixel(400, 200, Rgb([255, 255, 255]));
        let lb = Letterbox::fit(400, 200, 100);
        let input = lb.apply(&frame);
        assert_eq!(input.dimensions(), (100, 100));
        assert_eq!(*input.get_pixel(50, 5), Rgb([0, 0, 0]));
        assert_eq!(*input.get_pixel(50, 50), Rgb([255, 255, 255]));
        assert_eq!(*input.get_pixel(50, 95), Rgb([0, 0, 0]));
    }

    #[test]
    fn upright_rect_maps_corners() {
        let rect = RotatedRect::new(100.0, 50.0, 40.0, 0.0);
        assert!(close(rect.transform_out(0.0, 0.0), (80.0, 30.0)));
        assert!(close(rect.transform_out(40.0, 40.0), (120.0, 70.0)));
    }

    #[test]
    fn quarter_turn_points_up_to_the_right() {
        // The top edge midpoint of the upright square ends up right of the center.
        let rect = RotatedRect::new(100.0, 100.0, 40.0, FRAC_PI_2);
        assert!(close(rect.transform_out(20.0, 0.0), (120.0, 100.0)));
    }

    #[test]
    fn transforms_are_inverse() {
        for radians in [0.0, 0.4, -1.3, PI] {
            let rect = RotatedRect::new(320.0, 240.0, 180.0, radians);
            for p in [(0.0, 0.0), (12.5, 170.0), (90.0, 90.0)] {
                let (fx, fy) = rect.transform_out(p.0, p.1);
                assert!(close(rect.transform_in(fx, fy), p), "{radians} {p:?}");
            }
        }
    }

    #[test]
    fn crop_follows_rotation() {
        let mut frame = RgbImage::from_pixel(200, 200, Rgb([255, 0, 0]));
        for y in 0..200 {
            for x in 100..200 {
                frame.put_pixel(x, y, Rgb([0, 0, 255]));
            }
        }

        let upright = RotatedRect::new(100.0, 100.0, 100.0, 0.0).crop(&frame, 20);
        assert_eq!(upright.dimensions(), (20, 20));
        assert_eq!(*upright.get_pixel(2, 10), Rgb([255, 0, 0]));
        assert_eq!(*upright.get_pixel(17, 10), Rgb([0, 0, 255]));

        let flipped = RotatedRect::new(100.0, 100.0, 100.0, PI).crop(&frame, 20);
        assert_eq!(*flipped.get_pixel(2, 10), Rgb([0, 0, 255]));
        assert_eq!(*flipped.get_pixel(17, 10), Rgb([255, 0, 0]));
    }

    #[test]
    fn crop_outside_frame_is_black() {
        let frame = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        let crop = RotatedRect::new(500.0, 500.0, 40.0, 0.0).crop(&frame, 8);
        assert!(crop.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}

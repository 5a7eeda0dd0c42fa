use image::RgbImage;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
    Camera,
};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Anything the frame loop can pull images from.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<RgbImage>;
}

const PREFERRED_RESOLUTIONS: [(u32, u32); 2] = [(1280, 720), (640, 480)];
const PREFERRED_FORMATS: [FrameFormat; 3] =
    [FrameFormat::RAWRGB, FrameFormat::MJPEG, FrameFormat::YUYV];

/// A camera with an open stream. The stream is stopped when this is dropped.
pub struct Webcam {
    cam: Camera,
}

impl Webcam {
    pub fn open(index: u32) -> Result<Self> {
        let mut cam = None;
        'outer: for (w, h) in PREFERRED_RESOLUTIONS {
            for fmt in PREFERRED_FORMATS {
                let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
                    CameraFormat::new_from(w, h, fmt, 30),
                ));
                match Camera::new(CameraIndex::Index(index), req) {
                    Ok(c) => {
                        cam = Some(c);
                        break 'outer;
                    }
                    Err(e) => trace!(w, h, ?fmt, "format rejected: {e}"),
                }
            }
        }
        let mut cam = match cam {
            Some(c) => c,
            None => {
                let fallback = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
                Camera::new(CameraIndex::Index(index), fallback).map_err(|e| {
                    Error::CameraOpen {
                        index,
                        reason: e.to_string(),
                    }
                })?
            }
        };
        cam.open_stream().map_err(|e| Error::CameraOpen {
            index,
            reason: format!("failed to open stream: {e}"),
        })?;
        debug!(index, format = ?cam.camera_format(), "camera stream opened");
        Ok(Self { cam })
    }
}

impl FrameSource for Webcam {
    fn read_frame(&mut self) -> Result<RgbImage> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::Capture(e.to_string()))?;
        frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::Capture(format!("failed to decode frame: {e}")))
    }
}

impl Drop for Webcam {
    fn drop(&mut self) {
        if let Err(e) = self.cam.stop_stream() {
            debug!("failed to stop camera stream: {e}");
        }
    }
}

use image::RgbImage;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use tracing::debug;

use crate::error::{Error, Result};

/// Where annotated frames go.
pub trait FrameSink {
    fn show(&mut self, frame: &RgbImage) -> Result<()>;

    /// Polls for the quit request (the `q` key, or the window being closed).
    fn quit_requested(&mut self) -> bool;
}

/// Packs RGB pixels into the `0RGB` words minifb expects.
pub fn pack_rgb(frame: &RgbImage, out: &mut Vec<u32>) {
    out.clear();
    out.extend(
        frame
            .pixels()
            .map(|p| (u32::from(p[0]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[2])),
    );
}

/// On-screen window. Created lazily on the first frame so it matches the camera resolution.
pub struct VideoWindow {
    title: String,
    window: Option<Window>,
    buffer: Vec<u32>,
}

impl VideoWindow {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            window: None,
            buffer: Vec::new(),
        }
    }

    fn window_for(&mut self, width: usize, height: usize) -> Result<&mut Window> {
        let recreate = match &self.window {
            Some(w) => w.get_size() != (width, height),
            None => true,
        };
        if recreate {
            debug!(title = %self.title, width, height, "creating window");
            let mut window = Window::new(&self.title, width, height, WindowOptions::default())
                .map_err(|e| Error::Window(e.to_string()))?;
            window.set_target_fps(0);
            self.window = Some(window);
        }
        self.window
            .as_mut()
            .ok_or_else(|| Error::Window("window unavailable".to_string()))
    }
}

impl FrameSink for VideoWindow {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        let (w, h) = (frame.width() as usize, frame.height() as usize);
        let mut buffer = std::mem::take(&mut self.buffer);
        pack_rgb(frame, &mut buffer);
        let res = self
            .window_for(w, h)?
            .update_with_buffer(&buffer, w, h)
            .map_err(|e| Error::Window(e.to_string()));
        self.buffer = buffer;
        res
    }

    fn quit_requested(&mut self) -> bool {
        match &self.window {
            Some(w) => !w.is_open() || w.is_key_pressed(Key::Q, KeyRepeat::No),
            None => false,
        }
    }
}

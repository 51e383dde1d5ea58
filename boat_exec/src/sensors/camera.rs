//! Camera backends

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{DynamicImage, Rgb, RgbImage};

use super::Camera;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// SMPTE style colour bars.
const BARS: [[u8; 3]; 7] = [
    [192, 192, 192],
    [192, 192, 0],
    [0, 192, 192],
    [0, 192, 0],
    [192, 0, 192],
    [192, 0, 0],
    [0, 0, 192],
];

/// Width of the moving marker.
///
/// Units: pixels
const MARKER_WIDTH: u32 = 8;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Renders colour bars with a white marker sweeping across them, so a stalled stream is obvious.
pub struct SimCamera {
    width: u32,
    height: u32,
    frame: u64,
    released: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: 0,
            released: false,
        }
    }
}

impl Camera for SimCamera {
    fn capture_frame(&mut self) -> Option<DynamicImage> {
        if self.released || self.width == 0 || self.height == 0 {
            return None;
        }

        let marker_x = ((self.frame * 4) % self.width as u64) as u32;
        self.frame += 1;

        let bar_width = (self.width / BARS.len() as u32).max(1);

        let img = RgbImage::from_fn(self.width, self.height, |x, _| {
            if x >= marker_x && x < marker_x + MARKER_WIDTH {
                Rgb([255, 255, 255])
            }
            else {
                let bar = ((x / bar_width) as usize).min(BARS.len() - 1);
                Rgb(BARS[bar])
            }
        });

        Some(DynamicImage::ImageRgb8(img))
    }

    fn release(&mut self) {
        self.released = true;
    }
}

#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
pub use v4l::V4lCamera;

#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
mod v4l {
    use image::DynamicImage;
    use log::{info, warn};

    use super::Camera;
    use crate::hal::HalError;

    /// A V4L2 camera streaming MJPEG.
    pub struct V4lCamera {
        camera: Option<rscam::Camera>,
    }

    impl V4lCamera {
        pub fn new(device: &str, width: u32, height: u32) -> Result<Self, HalError> {
            let mut camera = rscam::Camera::new(device)
                .map_err(|e| HalError::Attach(format!("camera {}: {}", device, e)))?;

            camera.start(&rscam::Config {
                interval: (1, 30),
                resolution: (width, height),
                format: b"MJPG",
                ..Default::default()
            }).map_err(|e| HalError::Attach(format!("camera {}: {}", device, e)))?;

            info!("Camera {} streaming at {}x{}", device, width, height);

            Ok(Self { camera: Some(camera) })
        }
    }

    impl Camera for V4lCamera {
        fn capture_frame(&mut self) -> Option<DynamicImage> {
            let frame = match self.camera.as_ref()?.capture() {
                Ok(f) => f,
                Err(e) => {
                    warn!("Camera error: {}", e);
                    return None;
                }
            };

            match image::load_from_memory_with_format(&frame[..], image::ImageFormat::Jpeg) {
                Ok(img) => Some(img),
                Err(e) => {
                    warn!("Could not decode camera frame: {}", e);
                    None
                }
            }
        }

        fn release(&mut self) {
            if let Some(mut camera) = self.camera.take() {
                if let Err(e) = camera.stop() {
                    warn!("Could not stop camera: {}", e);
                }
                info!("Camera released");
            }
        }
    }
}

//! # Camera Equipment Communications Module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use image::{DynamicImage, ImageResult};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An encoded frame from the camera
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CamFrame {

    /// UTC timestamp at which the frame was acquired
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// The format of this frame
    pub format: ImageFormat,

    /// The formatted image data
    pub data: Vec<u8>
}

/// A decoded image from the camera
#[derive(Clone)]
pub struct CamImage {
    /// UTC timestamp at which the frame was acquired
    pub timestamp: DateTime<Utc>,

    /// The image itself
    pub image: DynamicImage
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible formats for camera images. This is used rather than image::ImageFormat to:
///     1. Restrict the formats that can be sent to observers
///     2. Allow serialisation as image::ImageFormat does not implement serde.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG image
    Png,

    /// JPEG image with a quality value between 1 and 100, where 100 is best.
    Jpeg(u8)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CamFrame {
    /// Convert this camera frame into a camera image
    pub fn to_cam_image(&self) -> ImageResult<CamImage>  {
        let image = image::load_from_memory_with_format(
            &self.data,
            self.format.to_image_format()
        )?;

        Ok(CamImage {
            timestamp: self.timestamp,
            image
        })
    }

    /// Encode this frame as a `data:` URI which browsers can display directly, for example
    /// `data:image/jpeg;base64,/9j/4AAQ...`.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            base64::encode(&self.data)
        )
    }
}

impl CamImage {
    /// Create a new camera image stamped with the current time.
    pub fn now(image: DynamicImage) -> Self {
        Self {
            timestamp: Utc::now(),
            image
        }
    }

    /// Convert this camera image into a camera frame with the given format
    pub fn to_cam_frame(&self, format: ImageFormat) -> ImageResult<CamFrame> {
        // Write data to the buffer
        let mut data = Vec::<u8>::new();

        // Get the output format type
        let output_format = match format {
            ImageFormat::Png => image::ImageOutputFormat::Png,
            ImageFormat::Jpeg(q)  => image::ImageOutputFormat::Jpeg(q)
        };

        self.image.write_to(&mut data, output_format)?;

        Ok(CamFrame {
            timestamp: self.timestamp,
            format,
            data
        })
    }
}

impl ImageFormat {
    /// MIME type of images in this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg(_) => "image/jpeg"
        }
    }

    fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg(_) => image::ImageFormat::Jpeg
        }
    }
}

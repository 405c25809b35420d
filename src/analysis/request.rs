use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use serde::Serialize;
use uuid::Uuid;

use crate::common::Frame;
use crate::error::AnalysisError;

/// JPEG-encoded frame ready to go over the wire.
#[derive(Clone)]
pub struct ImagePayload {
    jpeg: Vec<u8>,
    width: u32,
    height: u32,
}

impl ImagePayload {
    pub fn encode(frame: &Frame, quality: u8) -> Result<Self, AnalysisError> {
        let rgb = frame.image().to_rgb8();
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality)
            .encode_image(&rgb)
            .map_err(|e| AnalysisError::Encode(e.to_string()))?;
        Ok(Self {
            jpeg,
            width: rgb.width(),
            height: rgb.height(),
        })
    }

    pub fn from_jpeg(jpeg: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            jpeg,
            width,
            height,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", BASE64_STANDARD.encode(&self.jpeg))
    }
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("bytes", &self.jpeg.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// One submission to the analysis endpoint.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub frame_id: Uuid,
    pub sequence: u64,
    pub payload: ImagePayload,
    pub throttle: bool,
    pub generate_audio: bool,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    image: String,
    frame_id: &'a Uuid,
    sequence: u64,
    throttle: bool,
    generate_audio: bool,
}

impl AnalysisRequest {
    pub fn to_json(&self) -> Result<String, AnalysisError> {
        serde_json::to_string(&WireRequest {
            image: self.payload.data_url(),
            frame_id: &self.frame_id,
            sequence: self.sequence,
            throttle: self.throttle,
            generate_audio: self.generate_audio,
        })
        .map_err(|e| AnalysisError::Encode(e.to_string()))
    }
}

//! StampedMessage - conversion output
//!
//! The transport message produced by a channel or event conversion, fanned out
//! to publish, record and log-buffer sinks.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Value;

/// Wall-clock seconds since the UNIX epoch
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Message bound for a transport topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedMessage {
    /// Transport topic the message belongs to
    pub topic: String,

    /// Acquisition time (seconds since epoch); 0.0 means "unstamped"
    pub stamp: f64,

    /// Message body
    pub payload: Payload,
}

impl StampedMessage {
    pub fn new(topic: impl Into<String>, stamp: f64, payload: Payload) -> Self {
        Self {
            topic: topic.into(),
            stamp,
            payload,
        }
    }

    /// Whether the producer attached a stamp
    #[inline]
    pub fn is_stamped(&self) -> bool {
        self.stamp > 0.0
    }
}

/// Message body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Float { data: f64 },
    Int { data: i64 },
    Text { data: String },
    Bool { data: bool },

    /// Several memory keys read together
    MemoryList { entries: Vec<(String, Value)> },

    /// Camera frame
    Image(ImageData),

    /// Joint names with their positions/velocities/efforts
    JointState(JointStateData),

    /// Opaque bytes (fallback)
    Raw { data: Bytes },
}

impl Payload {
    /// Short kind name for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Float { .. } => "float",
            Payload::Int { .. } => "int",
            Payload::Text { .. } => "text",
            Payload::Bool { .. } => "bool",
            Payload::MemoryList { .. } => "memory_list",
            Payload::Image(_) => "image",
            Payload::JointState(_) => "joint_state",
            Payload::Raw { .. } => "raw",
        }
    }
}

/// Camera frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub data: Bytes,
}

/// Pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Rgb8,
    Yuv422,
    Depth16,
    Mono8,
}

/// Joint state sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointStateData {
    pub names: Vec<String>,
    pub positions: Vec<f64>,
    #[serde(default)]
    pub velocities: Vec<f64>,
    #[serde(default)]
    pub efforts: Vec<f64>,
}

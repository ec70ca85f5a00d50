use std::time::Duration;
use thiserror::Error;

/// Reasons a datagram is rejected by the codec. Every variant is a silent drop for the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("truncated packet: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("bad magic: {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("unknown message type: {0}")]
    UnknownMessageType(u8),
}

/// Failures of the offload lane. All of them are recoverable per packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccelError {
    #[error("accelerator did not complete within {0:?}")]
    Timeout(Duration),

    #[error("accelerator device error: {0}")]
    Device(String),

    #[error("accelerator unavailable")]
    Unavailable,

    #[error("accelerator stalled: score buffer full")]
    Busy,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("ring storage error: {0}")]
    Storage(std::io::Error),
}

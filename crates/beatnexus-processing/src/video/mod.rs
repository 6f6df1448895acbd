//! Video processing module

pub mod compressor;
pub mod service;

pub use compressor::FFmpegCompressor;
pub use service::FFmpegService;

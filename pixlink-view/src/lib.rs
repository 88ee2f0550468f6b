//! # pixlink-view — PixLink viewer
//!
//! Foreground tool that connects to a pixel display device over a
//! serial line (or a TCP-simulated one), decodes the frame stream,
//! and renders it as ASCII. Stdin is forwarded to the device as raw
//! input bytes.

pub mod app;
pub mod config;

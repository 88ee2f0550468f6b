//! Viewer core logic.
//!
//! Connects a [`SerialLink`] to the configured transport, renders
//! incoming frames as ASCII, forwards stdin bytes to the device, and
//! tears the link down on Ctrl-C.

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use pixlink_core::transport::tcp::TcpOpener;
use pixlink_core::{Frame, LinkConfig, LinkHandle, PortOpener, SerialLink};

use crate::config::ViewConfig;

/// Brightness ramp for ASCII rendering, darkest first.
const RAMP: &[u8] = b" .:-=+*#%@";

// ── ViewerApp ────────────────────────────────────────────────────

/// The top-level viewer.
pub struct ViewerApp {
    config: ViewConfig,
}

impl ViewerApp {
    pub fn new(config: ViewConfig) -> Self {
        Self { config }
    }

    /// Run until Ctrl-C or until the link actor is gone.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let link_config = self.link_config()?;
        let opener = self.build_opener()?;
        let (link, handle) = SerialLink::new(link_config, opener);
        tokio::spawn(link.run());

        handle.connect().await?;

        // Forward stdin bytes to the device (input for the far side).
        tokio::spawn(forward_stdin(handle.clone()));

        let max_sample = (1u16 << self.config.display.bits_per_color.clamp(1, 7)) - 1;
        let mut frames = handle.frames();
        let mut status = handle.status();
        let mut rate = handle.throughput();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl-C received — shutting down");
                    handle.disconnect().await?;
                    break;
                }
                changed = frames.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let frame = frames.borrow_and_update().clone();
                    if self.config.display.ascii {
                        if let Some(frame) = frame {
                            render_ascii(&frame, max_sample);
                        }
                    }
                }
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    info!("status: {}", *status.borrow_and_update());
                }
                changed = rate.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let bytes = *rate.borrow_and_update();
                    if bytes > 0 {
                        info!("throughput: {bytes} B/s");
                    }
                }
            }
        }
        Ok(())
    }

    /// Validate the display geometry and build the link configuration.
    fn link_config(&self) -> Result<LinkConfig, String> {
        let config = self.config.to_link_config();
        if !config.format.is_row_aligned() {
            return Err(format!(
                "display width {} is not a whole number of {}-sample bytes",
                config.format.width,
                config.format.colors_per_byte()
            ));
        }
        Ok(config)
    }

    fn build_opener(&self) -> Result<Box<dyn PortOpener>, Box<dyn std::error::Error>> {
        match self.config.link.transport.as_str() {
            "tcp" => Ok(Box::new(TcpOpener::new(self.config.link.address.clone()))),
            "tty" => {
                #[cfg(target_os = "linux")]
                {
                    use pixlink_core::transport::tty::TtyOpener;
                    Ok(Box::new(TtyOpener::new(self.config.link.device.clone())))
                }
                #[cfg(not(target_os = "linux"))]
                {
                    Err("tty transport is only available on Linux; use --tcp".into())
                }
            }
            other => Err(format!("unknown transport {other:?}").into()),
        }
    }
}

/// Print one frame as an ASCII grid.
fn render_ascii(frame: &Frame, max_sample: u16) {
    let mut out = String::with_capacity((frame.width + 1) * frame.height + 16);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let sample = frame.sample(x, y) as usize;
            let idx = sample * (RAMP.len() - 1) / max_sample.max(1) as usize;
            out.push(RAMP[idx.min(RAMP.len() - 1)] as char);
        }
        out.push('\n');
    }
    // Clear screen, home cursor, draw.
    print!("\x1b[2J\x1b[H{out}");
}

/// Pump stdin to the device, byte for byte.
async fn forward_stdin(handle: LinkHandle) {
    let mut stdin = tokio::io::stdin();
    let mut buf = [0u8; 64];
    loop {
        match stdin.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if !handle.send(Bytes::copy_from_slice(&buf[..n])).await {
                    warn!("input not delivered; link is down");
                }
            }
            Err(e) => {
                warn!("stdin read error: {e}");
                break;
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;

    #[test]
    fn tcp_opener_builds() {
        let mut cfg = ViewConfig::default();
        cfg.link.transport = "tcp".into();
        assert!(ViewerApp::new(cfg).build_opener().is_ok());
    }

    #[test]
    fn unknown_transport_is_rejected() {
        let mut cfg = ViewConfig::default();
        cfg.link.transport = "carrier-pigeon".into();
        assert!(ViewerApp::new(cfg).build_opener().is_err());
    }

    #[test]
    fn native_geometry_is_accepted() {
        assert!(ViewerApp::new(ViewConfig::default()).link_config().is_ok());
    }

    #[test]
    fn misaligned_display_width_is_rejected() {
        let mut cfg = ViewConfig::default();
        cfg.display.width = 10; // 2 bits/color packs 3 samples per byte
        assert!(ViewerApp::new(cfg).link_config().is_err());
    }
}

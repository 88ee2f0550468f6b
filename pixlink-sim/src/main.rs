//! PixLink device simulator.
//!
//! Serves the device side of the serial protocol over TCP so the
//! viewer can be exercised without hardware: on connect it emits a
//! burst of boot noise, then the BOOTED control byte, then a paced
//! stream of encoded frames showing a pixel bouncing around the
//! screen. Bytes received from the client are logged as input.
//!
//! ```text
//! pixlink-sim                  Listen on 127.0.0.1:7411 at 30 fps
//! pixlink-sim --port <port>    Listen elsewhere
//! pixlink-sim --fps <n>        Change the frame rate
//! ```

use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use pixlink_core::wire::{BITS_PER_COLOR, ControlCode, SCREEN_HEIGHT, SCREEN_WIDTH};
use pixlink_core::{FrameFormat, encode_frame};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "pixlink-sim", about = "PixLink pixel display device simulator")]
struct Cli {
    /// TCP port to listen on.
    #[arg(short, long, default_value_t = 7411)]
    port: u16,

    /// Frames per second.
    #[arg(long, default_value_t = 30)]
    fps: u8,

    /// Bits per pixel sample.
    #[arg(long, default_value_t = BITS_PER_COLOR)]
    bits: u8,

    /// Frame width in pixels.
    #[arg(long, default_value_t = SCREEN_WIDTH)]
    width: usize,

    /// Frame height in pixels.
    #[arg(long, default_value_t = SCREEN_HEIGHT)]
    height: usize,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let format = frame_format(cli.bits, cli.width, cli.height)?;
    let fps = cli.fps.clamp(1, 120);

    let addr = format!("127.0.0.1:{}", cli.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("pixlink-sim v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "listening on {addr}; {}x{} @ {} bits/color, {fps} fps",
        format.width, format.height, format.bits_per_color
    );

    loop {
        let accept = tokio::select! {
            result = listener.accept() => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received — shutting down");
                break;
            }
        };
        let (stream, peer) = match accept {
            Ok(pair) => pair,
            Err(e) => {
                warn!("accept error: {e}");
                continue;
            }
        };
        info!("viewer connected from {peer}");
        tokio::spawn(async move {
            if let Err(e) = run_session(stream, format, fps).await {
                debug!("session with {peer} ended: {e}");
            }
            info!("viewer {peer} disconnected");
        });
    }
    Ok(())
}

/// Build and validate the frame geometry from the CLI arguments.
///
/// A width that is not a whole number of packed bytes would make the
/// stream undecodable (frames shorter than width * height samples).
fn frame_format(bits: u8, width: usize, height: usize) -> Result<FrameFormat, String> {
    let format = FrameFormat::new(bits.clamp(1, 7), width, height);
    if !format.is_row_aligned() {
        return Err(format!(
            "width {} is not a whole number of {}-sample bytes",
            format.width,
            format.colors_per_byte()
        ));
    }
    Ok(format)
}

// ── Session ──────────────────────────────────────────────────────

/// Serve one viewer: boot noise, BOOTED, then paced frames.
async fn run_session(
    stream: TcpStream,
    format: FrameFormat,
    fps: u8,
) -> std::io::Result<()> {
    stream.set_nodelay(true).ok();
    let (mut read_half, mut write_half) = stream.into_split();

    // Real firmware prints a debug banner before the protocol starts.
    write_half
        .write_all(b"PixLink firmware v1.0\r\nself-test ok\r\nstarting frame output\r\n")
        .await?;
    write_half.write_all(&[ControlCode::Booted.to_wire()]).await?;

    let mut scene = Bouncer::new(format);
    let mut tick = tokio::time::interval(Duration::from_millis(1000 / fps as u64));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut input = [0u8; 64];

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let wire = encode_frame(&format, &scene.step());
                write_half.write_all(&wire).await?;
            }
            read = read_half.read(&mut input) => {
                match read? {
                    0 => return Ok(()), // viewer went away
                    n => debug!("input from viewer: {:x?}", &input[..n]),
                }
            }
        }
    }
}

// ── Scene ────────────────────────────────────────────────────────

/// A bright block bouncing around an otherwise dark screen.
struct Bouncer {
    format: FrameFormat,
    x: isize,
    y: isize,
    dx: isize,
    dy: isize,
}

impl Bouncer {
    fn new(format: FrameFormat) -> Self {
        Self { format, x: 1, y: 1, dx: 1, dy: 1 }
    }

    /// Advance one step and render the frame's samples.
    fn step(&mut self) -> Vec<u8> {
        let (w, h) = (self.format.width as isize, self.format.height as isize);
        self.x += self.dx;
        self.y += self.dy;
        if self.x <= 0 || self.x >= w - 2 {
            self.dx = -self.dx;
            self.x = self.x.clamp(0, w - 2);
        }
        if self.y <= 0 || self.y >= h - 2 {
            self.dy = -self.dy;
            self.y = self.y.clamp(0, h - 2);
        }

        let max = self.format.sample_mask();
        let mut samples = vec![0u8; self.format.samples_per_frame()];
        for dy in 0..2isize {
            for dx in 0..2isize {
                let idx = (self.y + dy) * w + self.x + dx;
                samples[idx as usize] = max;
            }
        }
        samples
    }
}

// ── Tests ────────────────────────────────────────────────────────

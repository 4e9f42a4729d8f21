//! Headless capture example - connect, grab the screen, save a PNG.
//!
//! Usage:
//!   cargo run --example headless_capture -- localhost:5900 -o screen.png
//!   cargo run --example headless_capture -- localhost:5901 --password secret
//!
//! This example demonstrates:
//! - Building a session configuration
//! - Connecting and handshaking with a VNC server
//! - Capturing the full screen through the black-frame retry loop
//! - Persisting the framebuffer as a PNG

use clap::Parser;
use rfb_capture::{Config, VncSession};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Capture a VNC server's screen to a PNG file")]
struct Args {
    /// Server address as host:port (port defaults to 5900).
    server: String,

    /// VNC password, when the server requires authentication.
    #[arg(short, long)]
    password: Option<String>,

    /// Per-operation timeout in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// Output file.
    #[arg(short, long, default_value = "screen.png")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let (host, port) = parse_server_address(&args.server)?;

    let mut builder = Config::builder()
        .host(host)
        .port(port)
        .timeout_ms(args.timeout_ms);
    if let Some(password) = args.password {
        builder = builder.password(password);
    }
    let config = builder.build()?;

    let mut session = VncSession::connect(config)?;
    info!(
        "connected: {} ({}x{}, {} bpp)",
        session.server_name(),
        session.width(),
        session.height(),
        session.pixel_format().bits_per_pixel
    );

    let frame = session.capture_full_screen()?;
    if frame.is_all_black() {
        info!("screen captured all-black (server may still be starting up)");
    }

    session.save_png(&args.output)?;
    info!("wrote {}", args.output.display());

    session.close();
    Ok(())
}

fn parse_server_address(server: &str) -> anyhow::Result<(String, u16)> {
    match server.rsplit_once(':') {
        Some((host, port)) => Ok((host.to_string(), port.parse()?)),
        None => Ok((server.to_string(), 5900)),
    }
}

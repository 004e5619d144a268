mod config;
mod room;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;

use config::SimConfig;
use room::Room;

#[derive(Parser)]
#[command(name = "tether-sim")]
#[command(about = "Headless multi-peer gravity gun simulation over an in-memory relay")]
struct Args {
    #[arg(short, long, default_value_t = 3)]
    peers: usize,

    #[arg(short, long, default_value_t = 10.0)]
    seconds: f32,

    #[arg(short, long, default_value_t = 60)]
    frame_rate: u32,

    #[arg(short, long, default_value_t = 6)]
    boxes: usize,

    #[arg(long, help = "Packet loss percentage (0-100) on the unreliable channel")]
    loss_percent: Option<f32>,

    #[arg(short, long, help = "TOML file with session and relay settings")]
    config: Option<PathBuf>,

    #[arg(long, help = "Run frames back to back instead of in real time")]
    fast: bool,
}

const MAX_FRAME_RATE: u32 = 1000;

fn frame_delta(frame_rate: u32) -> Result<f32> {
    if frame_rate == 0 {
        bail!("frame rate must be positive");
    }
    if frame_rate > MAX_FRAME_RATE {
        bail!("frame rate must be at most {MAX_FRAME_RATE}");
    }
    Ok(1.0 / frame_rate as f32)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let delta = frame_delta(args.frame_rate)?;

    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(loss) = args.loss_percent {
        config.relay.loss_percent = loss.clamp(0.0, 100.0);
    }

    let mut room = Room::new(args.peers, args.boxes, &config)?;
    let frames = (args.seconds.max(0.0) * args.frame_rate as f32).round() as u64;
    log::info!(
        "simulating {} peers with {} boxes for {} frames",
        args.peers,
        args.boxes,
        frames
    );

    let mut ticker = tokio::time::interval(Duration::from_secs_f32(delta));
    for frame in 0..frames {
        if !args.fast {
            ticker.tick().await;
        }
        room.frame(delta)?;

        if frame % u64::from(args.frame_rate) == 0 {
            log::debug!("t={:.1}s divergence {:.3}", frame as f32 * delta, room.divergence());
        }
    }

    let report = room.report();
    log::info!(
        "{} frames, {} holds active, max divergence {:.3} m",
        report.frames,
        report.holds,
        report.max_divergence
    );
    log::info!(
        "relay: {} sent, {} delivered, {} lost, {} bytes",
        report.relay.payloads_sent,
        report.relay.payloads_delivered,
        report.relay.payloads_lost,
        report.relay.bytes_sent
    );

    Ok(())
}

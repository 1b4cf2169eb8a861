//! SPI Periodic Sampler - Main Entry Point
//!
//! Samples a simulated ADS1271 chain and prints each frame as a JSON line.
//! Usage: `spp-periodic [config-file]` (or `SPP_CONFIG`); `SPP_LOG` sets the
//! log level.

use acquisition::AcquisitionError;
use anyhow::Context;
use bus_transport::ads1271::{ChannelFrame, FRAME_SIZE};
use spp_device::{
    init_logging, ControlCommand, DeviceConfig, DeviceError, FrameRecord, ReadFlags, SppDevice,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let level = std::env::var("SPP_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(Level::INFO);
    init_logging(level)?;

    info!("=== SPP Periodic Sampler v{} ===", env!("CARGO_PKG_VERSION"));

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("SPP_CONFIG").map(PathBuf::from));
    let config = DeviceConfig::load(path.as_deref()).context("loading configuration")?;
    info!(
        "Period {:?}, {} buffers of {} bytes",
        config.acquisition.period(),
        config.acquisition.pool_size,
        config.acquisition.sample_size
    );

    let (device, transport) = SppDevice::open_mock(&config)?;

    let frame_time = device.spi().transfer_time(FRAME_SIZE);
    if frame_time >= config.acquisition.period() {
        warn!(
            "Clocking one frame takes {:?}, not shorter than the {:?} period",
            frame_time,
            config.acquisition.period()
        );
    }

    device.control(ControlCommand::Start)?;
    let vref = config.vref();

    let batch = config.acquisition.pool_size;
    let shutdown = shutdown_signal(config.run_for());
    tokio::pin!(shutdown);

    loop {
        match device.read_frames(batch, ReadFlags::BLOCKING, &mut shutdown).await {
            Ok(frames) => print_frames(&frames, vref)?,
            Err(DeviceError::Acquisition(AcquisitionError::Interrupted)) => break,
            Err(e) => return Err(e.into()),
        }
    }

    device.control(ControlCommand::Stop)?;

    // Hand out whatever was still queued, up to end of data
    loop {
        let frames = device
            .read_frames(batch, ReadFlags::BLOCKING, std::future::pending())
            .await?;
        if frames.is_empty() {
            break;
        }
        print_frames(&frames, vref)?;
    }

    let closed = device.close().await;
    let abandoned = transport.close();
    if abandoned > 0 {
        warn!("{} transfers never completed", abandoned);
    }
    let stats = closed.context("closing sampler")?;
    info!("Final statistics: {}", stats);
    println!("{}", serde_json::to_string(&stats)?);

    Ok(())
}

fn print_frames(frames: &[ChannelFrame], vref: f64) -> anyhow::Result<()> {
    for frame in frames {
        println!("{}", serde_json::to_string(&FrameRecord::new(frame, vref))?);
    }
    Ok(())
}

/// Resolves on Ctrl-C or once the run length has elapsed
async fn shutdown_signal(run_for: Option<Duration>) {
    let deadline = async {
        match run_for {
            Some(length) => tokio::time::sleep(length).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Interrupted, stopping"),
            Err(e) => warn!("Cannot listen for Ctrl-C ({}), stopping", e),
        },
        _ = deadline => info!("Run length reached, stopping"),
    }
}

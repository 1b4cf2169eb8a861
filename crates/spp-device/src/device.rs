//! Sampler Endpoint
//!
//! The surface an outside caller sees: three control commands, a
//! record-oriented read, a readiness query and a refused write.

use crate::{ControlCommand, DeviceConfig, DeviceError};
use acquisition::{Acquisition, AcquisitionState, AcquisitionStats, FnSink, SampleSink};
use bus_transport::ads1271::{ChannelFrame, FRAME_SIZE};
use bus_transport::{BusTransport, MockTransport, SpiSettings};
use std::future::Future;
use std::io;
use std::sync::Arc;
use tracing::{debug, info};

/// Per-read options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadFlags {
    /// Fail with `WouldBlock` instead of waiting for a sample
    pub nonblocking: bool,
}

impl ReadFlags {
    pub const BLOCKING: ReadFlags = ReadFlags { nonblocking: false };
    pub const NONBLOCKING: ReadFlags = ReadFlags { nonblocking: true };
}

/// Result of a readiness query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    /// At least one sample is waiting
    pub readable: bool,
    /// Engine state at the time of the query
    pub state: AcquisitionState,
}

/// A periodic sampler bound to one bus transport
#[derive(Debug)]
pub struct SppDevice {
    acquisition: Acquisition,
    spi: SpiSettings,
}

impl SppDevice {
    /// Bring up a sampler on `transport`
    pub fn open(config: &DeviceConfig, transport: Arc<dyn BusTransport>) -> Result<Self, DeviceError> {
        config.spi.validate()?;
        let name = transport.name().to_string();
        let acquisition = Acquisition::attach(config.acquisition.clone(), transport)?;

        info!(
            "Sampler open on {} (bus {}.{}, {} Hz, mode {})",
            name,
            config.spi.bus,
            config.spi.chip_select,
            config.spi.max_speed_hz,
            config.spi.mode.bits()
        );
        Ok(Self {
            acquisition,
            spi: config.spi.clone(),
        })
    }

    /// Bring up a sampler on a simulated bus built from `config.mock`
    pub fn open_mock(config: &DeviceConfig) -> Result<(Self, Arc<MockTransport>), DeviceError> {
        let transport = Arc::new(MockTransport::new(config.mock.clone())?);
        let device = Self::open(config, transport.clone())?;
        Ok((device, transport))
    }

    /// Apply a decoded control command
    pub fn control(&self, command: ControlCommand) -> Result<(), DeviceError> {
        debug!("Control {} ({:#06x})", command, command.code());
        match command {
            ControlCommand::Start => self.acquisition.start()?,
            ControlCommand::Stop => self.acquisition.stop()?,
            ControlCommand::SetPeriod(spec) => self.acquisition.set_period(spec.period()?)?,
        }
        Ok(())
    }

    /// Decode a raw control code and apply it
    pub fn ioctl(&self, code: u32, arg: &[u8]) -> Result<(), DeviceError> {
        self.control(ControlCommand::decode(code, arg)?)
    }

    /// Copy whole sample records into `dst`; 0 means end of data
    pub async fn read(&self, dst: &mut [u8], flags: ReadFlags) -> Result<usize, DeviceError> {
        Ok(self.acquisition.read_into(dst, flags.nonblocking).await?)
    }

    /// Deliver up to `max_samples` samples to `sink`, giving up with
    /// `Interrupted` if `cancel` resolves while waiting
    pub async fn read_until<S, C>(
        &self,
        sink: &mut S,
        max_samples: usize,
        flags: ReadFlags,
        cancel: C,
    ) -> Result<usize, DeviceError>
    where
        S: SampleSink + ?Sized,
        C: Future<Output = ()>,
    {
        Ok(self
            .acquisition
            .read_until(sink, max_samples, flags.nonblocking, cancel)
            .await?)
    }

    /// Read samples and decode them as converter frames
    pub async fn read_frames<C>(
        &self,
        max_frames: usize,
        flags: ReadFlags,
        cancel: C,
    ) -> Result<Vec<ChannelFrame>, DeviceError>
    where
        C: Future<Output = ()>,
    {
        if self.acquisition.sample_size() != FRAME_SIZE {
            return Err(DeviceError::InvalidArgument(format!(
                "{}-byte samples are not {}-byte converter frames",
                self.acquisition.sample_size(),
                FRAME_SIZE
            )));
        }

        let mut frames = Vec::with_capacity(max_frames.min(self.acquisition.pool_size()));
        let mut sink = FnSink(|sequence: u32, payload: &[u8]| -> io::Result<()> {
            let frame = ChannelFrame::decode(sequence, payload)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            frames.push(frame);
            Ok(())
        });
        self.read_until(&mut sink, max_frames, flags, cancel).await?;
        Ok(frames)
    }

    /// The sampler produces data only
    pub fn write(&self, _src: &[u8]) -> Result<usize, DeviceError> {
        Err(DeviceError::ReadOnly)
    }

    /// Readiness for a poll-style wait
    pub fn poll(&self) -> Readiness {
        Readiness {
            readable: self.acquisition.has_data(),
            state: self.acquisition.state(),
        }
    }

    /// Bus settings the sampler was opened with
    pub fn spi(&self) -> &SpiSettings {
        &self.spi
    }

    /// Underlying engine
    pub fn acquisition(&self) -> &Acquisition {
        &self.acquisition
    }

    /// Stop sampling and wait (bounded) for the last transfer
    pub async fn close(self) -> Result<AcquisitionStats, DeviceError> {
        info!("Closing sampler");
        Ok(self.acquisition.detach().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{PeriodSpec, SPPIOC_SPARAMS, SPPIOC_START, SPPIOC_STOP};
    use acquisition::AcquisitionError;
    use bus_transport::MockBehavior;
    use std::time::Duration;

    fn config(behavior: MockBehavior) -> DeviceConfig {
        let mut config = DeviceConfig {
            mock: behavior,
            ..Default::default()
        };
        config.acquisition.pool_size = 4;
        config.acquisition.period_ns = 10_000_000;
        config
    }

    fn completing() -> MockBehavior {
        MockBehavior::completing(Duration::from_millis(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ioctl_start_read_stop() {
        let (device, transport) = SppDevice::open_mock(&config(completing())).unwrap();
        device.ioctl(SPPIOC_START, &[]).unwrap();

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(device.poll().readable);

        let mut buf = [0u8; 24 * 4];
        assert_eq!(device.read(&mut buf, ReadFlags::NONBLOCKING).await.unwrap(), 2);
        assert!(!device.poll().readable);

        device.ioctl(SPPIOC_STOP, &[]).unwrap();
        assert_eq!(device.poll().state, AcquisitionState::Stopped);

        let stats = device.close().await.unwrap();
        assert_eq!(stats.delivered, 2);
        assert_eq!(transport.completed(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_period_through_ioctl() {
        let (device, _transport) = SppDevice::open_mock(&config(completing())).unwrap();
        let spec = PeriodSpec { secs: 0, nsecs: 2_000_000 };
        device.ioctl(SPPIOC_SPARAMS, &spec.to_bytes()).unwrap();
        assert_eq!(device.acquisition().period(), Duration::from_millis(2));

        let zero = PeriodSpec { secs: 0, nsecs: 0 };
        let err = device.ioctl(SPPIOC_SPARAMS, &zero.to_bytes()).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(device.acquisition().period(), Duration::from_millis(2));
    }

    #[tokio::test]
    async fn test_control_errors_surface() {
        let (device, _transport) = SppDevice::open_mock(&config(completing())).unwrap();
        assert!(matches!(
            device.control(ControlCommand::Stop),
            Err(DeviceError::Acquisition(AcquisitionError::NotRunning))
        ));
        device.control(ControlCommand::Start).unwrap();
        assert!(matches!(
            device.control(ControlCommand::Start),
            Err(DeviceError::Acquisition(AcquisitionError::AlreadyRunning))
        ));
        device.control(ControlCommand::Stop).unwrap();
        assert!(device.ioctl(0xdead, &[]).unwrap_err().is_invalid_argument());
    }

    #[tokio::test]
    async fn test_write_is_refused() {
        let (device, _transport) = SppDevice::open_mock(&config(completing())).unwrap();
        assert!(matches!(device.write(&[1, 2, 3]), Err(DeviceError::ReadOnly)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_flags() {
        let (device, _transport) = SppDevice::open_mock(&config(completing())).unwrap();
        device.control(ControlCommand::Start).unwrap();

        let mut buf = [0u8; 24];
        assert!(device
            .read(&mut buf, ReadFlags::NONBLOCKING)
            .await
            .unwrap_err()
            .is_would_block());
        assert_eq!(device.read(&mut buf, ReadFlags::BLOCKING).await.unwrap(), 1);

        let mut odd = [0u8; 30];
        assert!(device
            .read(&mut odd, ReadFlags::BLOCKING)
            .await
            .unwrap_err()
            .is_invalid_argument());
        device.control(ControlCommand::Stop).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_frames_decodes_channels() {
        let (device, _transport) = SppDevice::open_mock(&config(completing())).unwrap();
        device.control(ControlCommand::Start).unwrap();
        tokio::time::sleep(Duration::from_millis(35)).await;
        device.control(ControlCommand::Stop).unwrap();

        let frames = device
            .read_frames(8, ReadFlags::BLOCKING, std::future::pending())
            .await
            .unwrap();
        let sequences: Vec<u32> = frames.iter().map(|f| f.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);

        // Drained and stopped
        let rest = device
            .read_frames(8, ReadFlags::BLOCKING, std::future::pending())
            .await
            .unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_read_frames_needs_frame_sized_samples() {
        let mut config = config(completing());
        config.acquisition.sample_size = 16;
        let (device, _transport) = SppDevice::open_mock(&config).unwrap();
        let err = device
            .read_frames(1, ReadFlags::NONBLOCKING, std::future::pending())
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[tokio::test]
    async fn test_open_rejects_bad_spi_settings() {
        let mut config = config(completing());
        config.spi.max_speed_hz = 0;
        assert!(matches!(
            SppDevice::open_mock(&config),
            Err(DeviceError::Transport(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_times_out_on_hung_bus() {
        let mut config = config(MockBehavior::hanging());
        config.acquisition.teardown_timeout_ms = 50;
        let (device, transport) = SppDevice::open_mock(&config).unwrap();
        device.control(ControlCommand::Start).unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert_eq!(transport.held_count(), 1);

        assert!(matches!(
            device.close().await,
            Err(DeviceError::Acquisition(AcquisitionError::TeardownTimeout(_)))
        ));

        // The held completion keeps the engine, and through it the bus, alive
        assert!(Arc::strong_count(&transport) > 1);
        assert_eq!(transport.close(), 1);
        tokio::task::yield_now().await;
        assert_eq!(Arc::strong_count(&transport), 1);
    }
}

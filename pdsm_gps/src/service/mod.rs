//! The location service: session lifecycle and the threads behind it.
//!
//! [`GpsService::init`] starts a control/ingest thread and a position
//! polling thread, and registers the engine clients. Sessions run between
//! [`GpsService::start`] and [`GpsService::stop`]. With
//! [`FixSource::Sentences`] a publish timer delivers the aggregated fix once
//! per fix interval; with [`FixSource::Rpc`] fixes are delivered as PD events
//! arrive through the [`PdsmDispatcher`].

mod control;
mod dispatch;
mod poller;
mod signal;
mod timer;

use std::{
    fs::OpenOptions,
    os::unix::fs::OpenOptionsExt,
    path::PathBuf,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing::{debug, error, info, warn};

pub use control::DeviceStream;
pub use dispatch::{DispatchHandler, PdsmDispatcher, CALLBACK_ACK};
pub use signal::{SessionSignal, SessionState};

use self::control::{control_pipe, ControlChannel, ControlCommand, ControlLoop};
use crate::{
    aggregator::FixAggregator,
    callbacks::HostCallbacks,
    config::{FixSource, GpsConfig},
    constants::{MAX_FIX_FREQUENCY, TIMER_LEAD_MS},
    error::ServiceError,
    fix::GpsStatusValue,
    revision::{EngineRevision, Leo},
    rpc::{PdsmClient, RpcChannel},
    xtra::{elapsed_realtime_ms, inject_xtra_data, XtraTimeInfo},
};

/// How long a control command may take to be acknowledged.
const CONTROL_TIMEOUT: Duration = Duration::from_secs(5);

/// State shared by every service thread.
pub(crate) struct ServiceShared<R: EngineRevision> {
    pub(crate) config: GpsConfig,
    pub(crate) fix_frequency: AtomicU32,
    pub(crate) signal: SessionSignal,
    pub(crate) aggregator: FixAggregator,
    pub(crate) host: Arc<dyn HostCallbacks>,
    pub(crate) client: PdsmClient<R>,
}

impl<R: EngineRevision> ServiceShared<R> {
    /// Publish period: the fix interval, less the timer lead.
    pub(crate) fn publish_period(&self) -> Duration {
        let interval = u64::from(self.fix_frequency.load(Ordering::Relaxed)) * 1000;
        Duration::from_millis(interval.saturating_sub(TIMER_LEAD_MS).max(TIMER_LEAD_MS))
    }

    /// Upper bound on waiting for one position request.
    pub(crate) fn request_timeout(&self) -> Duration {
        let interval = self.fix_frequency.load(Ordering::Relaxed);
        Duration::from_secs(u64::from(interval.max(self.config.session_timeout)))
    }
}

/// Where the NMEA stream comes from.
enum DeviceSource {
    None,
    Path(PathBuf),
    Stream(Box<dyn DeviceStream>),
}

struct Runtime {
    control: Arc<ControlChannel>,
    control_thread: JoinHandle<()>,
    poll_thread: JoinHandle<()>,
}

/// Location service bridging one engine to one host.
pub struct GpsService<R: EngineRevision = Leo> {
    shared: Arc<ServiceShared<R>>,
    device: Mutex<DeviceSource>,
    runtime: Mutex<Option<Runtime>>,
}

impl<R: EngineRevision> GpsService<R> {
    pub fn new(
        channel: Arc<dyn RpcChannel>,
        host: Arc<dyn HostCallbacks>,
        config: GpsConfig,
    ) -> Self {
        let client = PdsmClient::new(channel, config.failure_policy, config.session_timeout);
        let shared = ServiceShared {
            fix_frequency: AtomicU32::new(config.fix_frequency.clamp(1, MAX_FIX_FREQUENCY)),
            config,
            signal: SessionSignal::new(),
            aggregator: FixAggregator::new(),
            host,
            client,
        };
        Self {
            shared: Arc::new(shared),
            device: Mutex::new(DeviceSource::None),
            runtime: Mutex::new(None),
        }
    }

    /// Reads sentences from the device node at `path`, opened at init.
    pub fn with_device_path<P: Into<PathBuf>>(self, path: P) -> Self {
        *self.device_source() = DeviceSource::Path(path.into());
        self
    }

    /// Reads sentences from an already open, non-blocking stream.
    pub fn with_device_stream(self, stream: Box<dyn DeviceStream>) -> Self {
        *self.device_source() = DeviceSource::Stream(stream);
        self
    }

    fn device_source(&self) -> MutexGuard<'_, DeviceSource> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn runtime(&self) -> MutexGuard<'_, Option<Runtime>> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &GpsConfig {
        &self.shared.config
    }

    pub fn session_state(&self) -> SessionState {
        self.shared.signal.state()
    }

    pub fn is_initialized(&self) -> bool {
        self.runtime().is_some()
    }

    pub fn client(&self) -> &PdsmClient<R> {
        &self.shared.client
    }

    /// Handler for the engine's inbound callbacks, to be wired into the RPC transport.
    pub fn dispatcher(&self) -> PdsmDispatcher<R> {
        PdsmDispatcher::new(Arc::clone(&self.shared))
    }

    fn open_device(&self) -> Option<Box<dyn DeviceStream>> {
        if self.shared.config.fix_source != FixSource::Sentences {
            return None;
        }
        match std::mem::replace(&mut *self.device_source(), DeviceSource::None) {
            DeviceSource::None => None,
            DeviceSource::Stream(stream) => Some(stream),
            DeviceSource::Path(path) => {
                let opened = OpenOptions::new()
                    .read(true)
                    .custom_flags(libc::O_NONBLOCK)
                    .open(&path);
                *self.device_source() = DeviceSource::Path(path.clone());
                match opened {
                    Ok(file) => Some(Box::new(file)),
                    Err(e) => {
                        warn!("cannot open {}: {}", path.display(), e);
                        None
                    },
                }
            },
        }
    }

    /// Starts the service threads and registers the engine clients.
    pub fn init(&self) -> Result<(), ServiceError> {
        let mut runtime = self.runtime();
        if runtime.is_some() {
            return Ok(());
        }

        self.shared.host.on_status(GpsStatusValue::EngineOn);
        self.shared.signal.activate();

        let started = self.spawn_threads();
        let rt = match started {
            Ok(rt) => rt,
            Err(e) => {
                error!("could not start GPS service threads: {}", e);
                self.shared.signal.quit();
                self.shared.host.on_status(GpsStatusValue::EngineOff);
                return Err(e);
            },
        };

        if let Err(e) = self.shared.client.register_all(&self.shared.config) {
            error!("engine client registration failed: {}", e);
            shut_down(rt);
            self.shared.host.on_status(GpsStatusValue::EngineOff);
            return Err(e.into());
        }

        info!(
            revision = R::NAME,
            source = ?self.shared.config.fix_source,
            "GPS service initialized"
        );
        *runtime = Some(rt);
        Ok(())
    }

    fn spawn_threads(&self) -> Result<Runtime, ServiceError> {
        let (control, receiver) = control_pipe()?;
        let control_loop = ControlLoop::new(
            receiver,
            self.open_device(),
            Arc::clone(&control),
            Arc::clone(&self.shared),
        )?;
        let control_thread = thread::Builder::new()
            .name("gps-control".into())
            .spawn(move || control_loop.run())?;

        let shared = Arc::clone(&self.shared);
        let poll_thread = match thread::Builder::new()
            .name("gps-position".into())
            .spawn(move || poller::run_position_poller(&shared))
        {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.signal.quit();
                let _ = control.send(ControlCommand::Quit);
                let _ = control_thread.join();
                return Err(e.into());
            },
        };

        Ok(Runtime {
            control,
            control_thread,
            poll_thread,
        })
    }

    fn command(&self, cmd: ControlCommand) -> Result<(), ServiceError> {
        let runtime = self.runtime();
        let rt = runtime.as_ref().ok_or(ServiceError::NotInitialized)?;
        let seq = rt.control.send(cmd)?;
        if rt.control.wait(seq, CONTROL_TIMEOUT) {
            Ok(())
        } else {
            Err(ServiceError::ControlTimeout)
        }
    }

    /// Starts a navigation session.
    pub fn start(&self) -> Result<(), ServiceError> {
        if !self.is_initialized() {
            return Err(ServiceError::NotInitialized);
        }
        self.shared.host.on_status(GpsStatusValue::SessionBegin);
        self.command(ControlCommand::Start)
    }

    /// Stops the session. No fix is published once this returns.
    pub fn stop(&self) -> Result<(), ServiceError> {
        if !self.is_initialized() {
            return Err(ServiceError::NotInitialized);
        }
        self.shared.host.on_status(GpsStatusValue::SessionEnd);
        self.command(ControlCommand::Stop)
    }

    /// Stops the service threads and releases the engine clients.
    ///
    /// Does nothing when cleanup is disabled in the configuration.
    pub fn cleanup(&self) -> Result<(), ServiceError> {
        if !self.shared.config.cleanup_enabled {
            debug!("cleanup disabled");
            return Ok(());
        }
        let Some(rt) = self.runtime().take() else {
            return Ok(());
        };
        self.shared.host.on_status(GpsStatusValue::EngineOff);
        shut_down(rt);
        self.shared.client.release_all()?;
        info!("GPS service cleaned up");
        Ok(())
    }

    /// Sets the interval between published fixes, in seconds.
    pub fn set_position_mode(&self, fix_frequency: u32) {
        let frequency = fix_frequency.clamp(1, MAX_FIX_FREQUENCY);
        debug!(requested = fix_frequency, frequency, "position mode");
        self.shared.fix_frequency.store(frequency, Ordering::Relaxed);
    }

    pub fn fix_frequency(&self) -> u32 {
        self.shared.fix_frequency.load(Ordering::Relaxed)
    }

    /// Sends UTC time assistance. `utc_ms` was valid at `reference_ms` of
    /// elapsed realtime.
    pub fn inject_time(
        &self,
        utc_ms: i64,
        reference_ms: i64,
        uncertainty_ms: u32,
    ) -> Result<u32, ServiceError> {
        if !self.is_initialized() {
            return Ok(0);
        }
        let info = XtraTimeInfo::new(utc_ms, reference_ms, elapsed_realtime_ms(), uncertainty_ms);
        Ok(self.shared.client.xtra_inject_time(&info)?)
    }

    /// Pushes an XTRA assistance blob to the engine.
    pub fn inject_xtra_data(&self, data: &[u8]) -> Result<u32, ServiceError> {
        if !self.is_initialized() {
            return Ok(0);
        }
        Ok(inject_xtra_data(&self.shared.client, data)?)
    }

    /// Asks the engine to request a fresh XTRA file.
    pub fn request_xtra_download(&self) -> Result<u32, ServiceError> {
        if !self.is_initialized() {
            return Err(ServiceError::NotInitialized);
        }
        Ok(self.shared.client.xtra_initiate_download()?)
    }

    pub fn query_xtra_validity(&self) -> Result<u32, ServiceError> {
        if !self.is_initialized() {
            return Err(ServiceError::NotInitialized);
        }
        Ok(self.shared.client.xtra_query_validity()?)
    }
}

/// Quits the control loop and joins both threads.
fn shut_down(rt: Runtime) {
    match rt.control.send(ControlCommand::Quit) {
        Ok(seq) => {
            if !rt.control.wait(seq, CONTROL_TIMEOUT) {
                warn!("control loop did not acknowledge quit");
            }
        },
        Err(e) => warn!("cannot send quit: {}", e),
    }
    if rt.control_thread.join().is_err() {
        error!("control thread panicked");
    }
    if rt.poll_thread.join().is_err() {
        error!("position thread panicked");
    }
}

impl<R: EngineRevision> Drop for GpsService<R> {
    fn drop(&mut self) {
        if let Some(rt) = self.runtime().take() {
            shut_down(rt);
        }
    }
}

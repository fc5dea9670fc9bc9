use std::{
    io::{self, ErrorKind, Read, Write},
    os::fd::AsRawFd,
    sync::{Arc, Condvar, Mutex, PoisonError},
    thread::{self, JoinHandle},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use mio::{
    unix::{pipe, SourceFd},
    Events, Interest, Poll, Token,
};
use tracing::{debug, error, info, warn};

use super::{timer::run_publish_timer, ServiceShared};
use crate::{
    config::FixSource,
    nmea::{SentenceParser, SentenceReader, TimeContext},
    revision::EngineRevision,
};

const CONTROL: Token = Token(0);
const DEVICE: Token = Token(1);

/// Byte stream carrying NMEA sentences. Must be in non-blocking mode.
pub trait DeviceStream: Read + AsRawFd + Send {}

impl<T: Read + AsRawFd + Send> DeviceStream for T {}

/// Commands understood by the control loop, one byte each on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum ControlCommand {
    Quit = 0,
    Start = 1,
    Stop = 2,
}

impl ControlCommand {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(ControlCommand::Quit),
            1 => Some(ControlCommand::Start),
            2 => Some(ControlCommand::Stop),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct CommandLog {
    sent: u64,
    done: u64,
}

/// Sending half of the control channel. Senders can wait until the loop has
/// executed their command.
pub(crate) struct ControlChannel {
    sender: Mutex<pipe::Sender>,
    log: Mutex<CommandLog>,
    cond: Condvar,
}

impl ControlChannel {
    fn new(sender: pipe::Sender) -> Self {
        Self {
            sender: Mutex::new(sender),
            log: Mutex::new(CommandLog::default()),
            cond: Condvar::new(),
        }
    }

    /// Queues `cmd`, returning its sequence number.
    pub(crate) fn send(&self, cmd: ControlCommand) -> io::Result<u64> {
        let mut sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match sender.write(&[cmd as u8]) {
                Ok(1) => break,
                Ok(_) => return Err(ErrorKind::WriteZero.into()),
                Err(e) if e.kind() == ErrorKind::Interrupted => {},
                Err(e) => return Err(e),
            }
        }
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.sent += 1;
        Ok(log.sent)
    }

    /// Waits until command `seq` has been executed. Returns `false` on timeout.
    pub(crate) fn wait(&self, seq: u64, timeout: Duration) -> bool {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        let (log, _) = self
            .cond
            .wait_timeout_while(log, timeout, |log| log.done < seq)
            .unwrap_or_else(PoisonError::into_inner);
        log.done >= seq
    }

    fn complete(&self) {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.done += 1;
        self.cond.notify_all();
    }
}

/// Opens the control pipe; the returned receiver goes to [`ControlLoop::new`].
pub(crate) fn control_pipe() -> io::Result<(Arc<ControlChannel>, pipe::Receiver)> {
    let (sender, receiver) = pipe::new()?;
    Ok((Arc::new(ControlChannel::new(sender)), receiver))
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

/// The control/ingest thread: session commands and device input, multiplexed
/// on one readiness poll.
pub(crate) struct ControlLoop<R: EngineRevision> {
    poll: Poll,
    receiver: pipe::Receiver,
    device: Option<Box<dyn DeviceStream>>,
    channel: Arc<ControlChannel>,
    shared: Arc<ServiceShared<R>>,
    reader: SentenceReader,
    parser: SentenceParser,
    timer: Option<JoinHandle<()>>,
}

impl<R: EngineRevision> ControlLoop<R> {
    pub(crate) fn new(
        mut receiver: pipe::Receiver,
        device: Option<Box<dyn DeviceStream>>,
        channel: Arc<ControlChannel>,
        shared: Arc<ServiceShared<R>>,
    ) -> io::Result<Self> {
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut receiver, CONTROL, Interest::READABLE)?;
        if let Some(device) = &device {
            let fd = device.as_raw_fd();
            poll.registry()
                .register(&mut SourceFd(&fd), DEVICE, Interest::READABLE)?;
        }
        let parser = SentenceParser::new(
            TimeContext::from_system_clock(),
            shared.config.measurement_precision,
        );
        Ok(Self {
            poll,
            receiver,
            device,
            channel,
            shared,
            reader: SentenceReader::new(),
            parser,
            timer: None,
        })
    }

    pub(crate) fn run(mut self) {
        let mut events = Events::with_capacity(4);
        debug!("control loop running");
        loop {
            if let Err(e) = self.poll.poll(&mut events, None) {
                if e.kind() == ErrorKind::Interrupted {
                    continue;
                }
                error!("control poll failed: {}", e);
                break;
            }
            for event in events.iter() {
                match event.token() {
                    CONTROL => {
                        if !self.drain_commands() {
                            self.shutdown();
                            return;
                        }
                    },
                    DEVICE => {
                        if event.is_error() {
                            warn!("device stream reported an error");
                        }
                        self.read_device();
                    },
                    _ => {},
                }
            }
        }
        self.shutdown();
    }

    /// Executes every queued command. Returns `false` when the loop must exit.
    fn drain_commands(&mut self) -> bool {
        let mut buf = [0u8; 16];
        loop {
            match self.receiver.read(&mut buf) {
                Ok(0) => {
                    debug!("control channel closed");
                    return false;
                },
                Ok(n) => {
                    for &b in &buf[..n] {
                        let keep_going = match ControlCommand::from_byte(b) {
                            Some(cmd) => self.execute(cmd),
                            None => {
                                warn!(byte = b, "unknown control command");
                                true
                            },
                        };
                        self.channel.complete();
                        if !keep_going {
                            return false;
                        }
                    }
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => return true,
                Err(e) if e.kind() == ErrorKind::Interrupted => {},
                Err(e) => {
                    error!("control channel read failed: {}", e);
                    return false;
                },
            }
        }
    }

    fn execute(&mut self, cmd: ControlCommand) -> bool {
        match cmd {
            ControlCommand::Quit => {
                info!("control loop quitting");
                self.shutdown();
                false
            },
            ControlCommand::Start => {
                if self.shared.signal.start() {
                    info!("session started");
                    if self.shared.config.fix_source == FixSource::Sentences {
                        self.spawn_timer();
                    }
                }
                true
            },
            ControlCommand::Stop => {
                if self.shared.signal.stop() {
                    info!("session stopping");
                    self.join_timer();
                    if let Err(e) = self.shared.client.end_session() {
                        warn!("end session failed: {}", e);
                    }
                }
                true
            },
        }
    }

    fn spawn_timer(&mut self) {
        let shared = Arc::clone(&self.shared);
        match thread::Builder::new()
            .name("gps-publish".into())
            .spawn(move || run_publish_timer(&shared))
        {
            Ok(handle) => self.timer = Some(handle),
            Err(e) => {
                error!("could not create publish timer: {}", e);
                self.shared.signal.stop();
            },
        }
    }

    fn join_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            if handle.join().is_err() {
                error!("publish timer panicked");
            }
        }
    }

    fn shutdown(&mut self) {
        self.shared.signal.quit();
        self.join_timer();
    }

    fn read_device(&mut self) {
        let mut buf = [0u8; 512];
        loop {
            let Some(device) = self.device.as_mut() else {
                return;
            };
            match device.read(&mut buf) {
                Ok(0) => {
                    info!("device stream closed");
                    let fd = device.as_raw_fd();
                    if let Err(e) = self.poll.registry().deregister(&mut SourceFd(&fd)) {
                        debug!("deregister device: {}", e);
                    }
                    self.device = None;
                    return;
                },
                Ok(n) => self.ingest(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == ErrorKind::Interrupted => {},
                Err(e) => {
                    warn!("device read failed: {}", e);
                    return;
                },
            }
        }
    }

    fn ingest(&mut self, data: &[u8]) {
        let mut it = self.reader.consume(data);
        while let Some(line) = it.next() {
            let parser = &mut self.parser;
            let kind = self.shared.aggregator.update(|state| parser.parse(line, state));
            if kind.is_some_and(|k| k.is_echoed()) {
                self.shared
                    .host
                    .on_nmea(now_ms(), &String::from_utf8_lossy(line));
            }
        }
    }
}

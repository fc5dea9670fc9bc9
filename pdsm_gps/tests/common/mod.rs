//! Shared fixtures: a scripted RPC channel and PD record builders.
#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{mpsc::Receiver, Mutex},
    time::{Duration, Instant},
};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use pdsm_gps::{EngineRevision, HostEvent, Leo, Program, RpcChannel, TransportError};

pub const PDSM: u32 = Leo::PDSM_PROGRAM.id;
pub const ATL: u32 = Leo::ATL_PROGRAM.id;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub program: u32,
    pub procedure: u32,
    pub args: Vec<u8>,
}

impl Call {
    pub fn words(&self) -> Vec<u32> {
        self.args.chunks(4).map(BigEndian::read_u32).collect()
    }
}

/// Records every call. Client init answers `0x1000 | role`; other calls
/// answer 0 unless a result was scripted for the procedure.
#[derive(Default)]
pub struct MockChannel {
    calls: Mutex<Vec<Call>>,
    scripted: Mutex<HashMap<u32, VecDeque<Result<u32, TransportError>>>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, procedure: u32, results: Vec<Result<u32, TransportError>>) {
        self.scripted
            .lock()
            .unwrap()
            .entry(procedure)
            .or_default()
            .extend(results);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn procedures(&self) -> Vec<(u32, u32)> {
        self.calls()
            .iter()
            .map(|c| (c.program, c.procedure))
            .collect()
    }

    pub fn calls_to(&self, procedure: u32) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == PDSM && c.procedure == procedure)
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl RpcChannel for MockChannel {
    fn call(&self, program: Program, procedure: u32, args: &[u8]) -> Result<u32, TransportError> {
        self.calls.lock().unwrap().push(Call {
            program: program.id,
            procedure,
            args: args.to_vec(),
        });
        if let Some(result) = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(&procedure)
            .and_then(VecDeque::pop_front)
        {
            return result;
        }
        if program.id == PDSM && procedure == Leo::PROCEDURES.client_init {
            return Ok(0x1000 | BigEndian::read_u32(args));
        }
        Ok(0)
    }
}

/// Fields of a PD event payload, written at the Leo word offsets.
#[derive(Debug, Clone, Default)]
pub struct PdPayload {
    pub event: u32,
    pub timestamp: u32,
    pub latitude: i64,
    pub longitude: i64,
    pub altitude: u32,
    pub speed: u32,
    pub heading: u32,
    pub hdop: u32,
    pub used_in_fix_mask: u32,
    /// (prn, elevation, azimuth * 100 + snr)
    pub svs: Vec<(u32, u32, u32)>,
}

impl PdPayload {
    pub fn to_words(&self) -> Vec<u32> {
        let layout = Leo::PD_LAYOUT;
        let mut words = vec![0u32; layout.sv_list + layout.sv_stride * self.svs.len()];
        words[layout.event] = self.event;
        words[layout.timestamp] = self.timestamp;
        words[layout.latitude_hi] = (self.latitude >> 32) as u32;
        words[layout.latitude_lo] = self.latitude as u32;
        words[layout.longitude_hi] = (self.longitude >> 32) as u32;
        words[layout.longitude_lo] = self.longitude as u32;
        words[layout.altitude] = self.altitude;
        words[layout.speed] = self.speed;
        words[layout.heading] = self.heading;
        words[layout.hdop] = self.hdop;
        words[layout.used_in_fix_mask] = self.used_in_fix_mask;
        words[layout.sv_count] = self.svs.len() as u32;
        for (i, &(prn, elevation, azimuth_snr)) in self.svs.iter().enumerate() {
            let base = layout.sv_list + i * layout.sv_stride;
            words[base] = prn;
            words[base + 1] = elevation;
            words[base + 2] = azimuth_snr;
        }
        words
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        words_to_bytes(&self.to_words())
    }
}

pub fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    let mut wtr = Vec::with_capacity(words.len() * 4);
    for &w in words {
        wtr.write_u32::<BigEndian>(w).unwrap();
    }
    wtr
}

/// Callback message: ten header words followed by `payload`.
pub fn callback_message(service: u32, procedure: u32, payload: &[u8]) -> Vec<u8> {
    let mut header = [0u32; 10];
    header[Leo::MESSAGE_LAYOUT.service_id] = service;
    header[Leo::MESSAGE_LAYOUT.procedure_id] = procedure;
    let mut msg = words_to_bytes(&header);
    msg.extend_from_slice(payload);
    msg
}

/// Extended-status payload with `svs` as (prn, snr tenths, azimuth, elevation).
pub fn ext_status_payload(svs: &[(u32, u32, u32, u32)]) -> Vec<u8> {
    let layout = Leo::EXT_LAYOUT;
    let mut words = vec![0u32; layout.sv_list + layout.sv_stride * svs.len()];
    words[layout.sv_count] = svs.len() as u32;
    for (i, &(prn, snr, azimuth, elevation)) in svs.iter().enumerate() {
        let base = layout.sv_list + i * layout.sv_stride;
        words[base + layout.sv_prn] = prn;
        words[base + layout.sv_snr] = snr;
        words[base + layout.sv_azimuth] = azimuth;
        words[base + layout.sv_elevation] = elevation;
    }
    words_to_bytes(&words)
}

/// Receives events until one matches `pred` or `timeout` passes.
pub fn wait_for(
    rx: &Receiver<HostEvent>,
    timeout: Duration,
    pred: impl Fn(&HostEvent) -> bool,
) -> Option<HostEvent> {
    let deadline = Instant::now() + timeout;
    loop {
        let left = deadline.checked_duration_since(Instant::now())?;
        match rx.recv_timeout(left) {
            Ok(ev) if pred(&ev) => return Some(ev),
            Ok(_) => {},
            Err(_) => return None,
        }
    }
}

/// Polls `check` until it holds or `timeout` passes.
pub fn eventually(timeout: Duration, check: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    check()
}

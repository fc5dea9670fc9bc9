use std::{marker::PhantomData, sync::Arc, thread, time::Duration};

use tracing::{debug, info, warn};

use super::{ClientIdentityTable, ClientRole, FailurePolicy, RpcChannel, XdrWriter};
use crate::{
    config::GpsConfig,
    constants::GET_POSITION_ATTEMPTS,
    error::TransportError,
    revision::{EngineRevision, Leo, Program},
    xtra::{XtraPart, XtraTimeInfo},
};

const BUSY_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Typed wrappers around the engine's remote procedures.
pub struct PdsmClient<R: EngineRevision = Leo> {
    channel: Arc<dyn RpcChannel>,
    ids: ClientIdentityTable,
    policy: FailurePolicy,
    session_timeout: u32,
    _revision: PhantomData<fn() -> R>,
}

impl<R: EngineRevision> PdsmClient<R> {
    pub fn new(channel: Arc<dyn RpcChannel>, policy: FailurePolicy, session_timeout: u32) -> Self {
        Self {
            channel,
            ids: ClientIdentityTable::default(),
            policy,
            session_timeout,
            _revision: PhantomData,
        }
    }

    pub fn identities(&self) -> &ClientIdentityTable {
        &self.ids
    }

    fn call(&self, program: Program, procedure: u32, args: &[u8]) -> Result<u32, TransportError> {
        match self.channel.call(program, procedure, args) {
            Ok(result) => {
                debug!(procedure, result, "rpc call");
                Ok(result)
            },
            Err(e) => Err(self.policy.escalate(e)),
        }
    }

    fn pdsm(&self, procedure: u32, args: &[u8]) -> Result<u32, TransportError> {
        self.call(R::PDSM_PROGRAM, procedure, args)
    }

    fn pdsm_words(&self, procedure: u32, words: &[u32]) -> Result<u32, TransportError> {
        self.pdsm(procedure, &XdrWriter::words(words))
    }

    /// Creates the engine client for `role` and records its id.
    pub fn client_init(&self, role: ClientRole) -> Result<u32, TransportError> {
        let id = self.pdsm_words(R::PROCEDURES.client_init, &[role.code()])?;
        self.ids.set(role, id);
        Ok(id)
    }

    pub fn client_release(&self, role: ClientRole) -> Result<u32, TransportError> {
        self.pdsm_words(R::PROCEDURES.client_release, &[self.ids.get(role)])
    }

    pub fn client_act(&self, role: ClientRole) -> Result<u32, TransportError> {
        self.pdsm_words(R::PROCEDURES.client_act, &[self.ids.get(role)])
    }

    pub fn client_deact(&self, role: ClientRole) -> Result<u32, TransportError> {
        self.pdsm_words(R::PROCEDURES.client_deact, &[self.ids.get(role)])
    }

    /// Event registration: `[client, 0, kind, 0, mask, 0]`.
    fn register(
        &self,
        procedure: u32,
        role: ClientRole,
        kind: u32,
        mask: u32,
    ) -> Result<u32, TransportError> {
        self.pdsm_words(procedure, &[self.ids.get(role), 0, kind, 0, mask, 0])
    }

    pub fn pd_reg(&self) -> Result<u32, TransportError> {
        let mask = R::REGISTRATION.pd_event_mask;
        self.register(R::PROCEDURES.pd_reg, ClientRole::Position, 0, mask)
    }

    pub fn pa_reg(&self) -> Result<u32, TransportError> {
        let mask = R::REGISTRATION.pa_event_mask;
        self.register(R::PROCEDURES.pa_reg, ClientRole::Position, 2, mask)
    }

    pub fn ext_status_reg(&self) -> Result<u32, TransportError> {
        let mask = R::REGISTRATION.ext_status_mask;
        self.register(R::PROCEDURES.ext_status_reg, ClientRole::Position, 1, mask)
    }

    pub fn xtra_reg(&self) -> Result<u32, TransportError> {
        let mask = R::REGISTRATION.xtra_event_mask;
        self.register(R::PROCEDURES.xtra_reg, ClientRole::Xtra, 3, mask)
    }

    pub fn lcs_reg(&self) -> Result<u32, TransportError> {
        let mask = R::REGISTRATION.lcs_event_mask;
        self.register(R::PROCEDURES.lcs_reg, ClientRole::NetworkInitiated, 7, mask)
    }

    pub fn atl_l2_proxy_reg(&self) -> Result<u32, TransportError> {
        let args = XdrWriter::words(&[1, 0, 0]);
        self.call(R::ATL_PROGRAM, R::PROCEDURES.atl_l2_proxy_reg, &args)
    }

    pub fn atl_dns_proxy_reg(&self) -> Result<u32, TransportError> {
        let args = XdrWriter::words(&[1, 0]);
        self.call(R::ATL_PROGRAM, R::PROCEDURES.atl_dns_proxy_reg, &args)
    }

    /// Registers and activates the position, XTRA and network-initiated
    /// clients, then applies the auto-download settings from `config`.
    pub fn register_all(&self, config: &GpsConfig) -> Result<(), TransportError> {
        self.client_init(ClientRole::Position)?;
        self.pd_reg()?;
        self.pa_reg()?;
        self.ext_status_reg()?;
        self.client_act(ClientRole::Position)?;

        self.client_init(ClientRole::Xtra)?;
        self.xtra_reg()?;
        self.client_act(ClientRole::Xtra)?;
        self.atl_l2_proxy_reg()?;
        self.atl_dns_proxy_reg()?;

        self.client_init(ClientRole::NetworkInitiated)?;
        self.lcs_reg()?;
        self.client_act(ClientRole::NetworkInitiated)?;

        info!(revision = R::NAME, "engine clients registered");

        if config.xtra_auto_download {
            self.xtra_set_auto_download(true, config.xtra_download_interval)?;
        }
        Ok(())
    }

    /// Deactivates, then releases, every client.
    pub fn release_all(&self) -> Result<(), TransportError> {
        for role in ClientRole::ALL {
            self.client_deact(role)?;
        }
        for role in ClientRole::ALL {
            self.client_release(role)?;
        }
        self.ids.clear();
        self.channel.unregister();
        Ok(())
    }

    fn get_position_args(&self) -> Vec<u8> {
        let mut words = [0u32; 29];
        words[2] = 1;
        words[3] = 1;
        words[4] = 1;
        words[5] = 0x3B9A_C9FF;
        words[6] = 1;
        words[25] = 1;
        words[26] = 50;
        words[27] = self.session_timeout;
        words[28] = self.ids.get(ClientRole::Position);
        XdrWriter::words(&words)
    }

    /// Requests one position fix; the answer arrives as PD events.
    ///
    /// A busy engine is retried a few times before the failure escalates.
    pub fn get_position(&self) -> Result<u32, TransportError> {
        let args = self.get_position_args();
        let procedure = R::PROCEDURES.get_position;
        let mut attempt = 1;
        loop {
            match self.channel.call(R::PDSM_PROGRAM, procedure, &args) {
                Err(TransportError::Busy { .. }) if attempt < GET_POSITION_ATTEMPTS => {
                    warn!(attempt, "engine busy, retrying position request");
                    attempt += 1;
                    thread::sleep(BUSY_RETRY_DELAY);
                },
                Err(e) => return Err(self.policy.escalate(e)),
                Ok(result) => return Ok(result),
            }
        }
    }

    pub fn end_session(&self) -> Result<u32, TransportError> {
        let id = self.ids.get(ClientRole::Position);
        self.pdsm_words(R::PROCEDURES.end_session, &[0, 0, 0, id])
    }

    fn xtra_header(&self) -> XdrWriter {
        XdrWriter::new()
            .u32(0)
            .i32(self.ids.get(ClientRole::Xtra) as i32)
            .u32(0)
    }

    pub fn xtra_set_data(&self, part: &XtraPart<'_>) -> Result<u32, TransportError> {
        let args = self
            .xtra_header()
            .u32(part.data.len() as u32)
            .bytes(part.data)
            .u8(part.part)
            .u8(part.total)
            .u32(1)
            .into_bytes();
        self.pdsm(R::PROCEDURES.xtra_set_data, &args)
    }

    pub fn xtra_initiate_download(&self) -> Result<u32, TransportError> {
        let args = self.xtra_header().into_bytes();
        self.pdsm(R::PROCEDURES.xtra_initiate_download, &args)
    }

    pub fn xtra_query_validity(&self) -> Result<u32, TransportError> {
        let args = self.xtra_header().into_bytes();
        self.pdsm(R::PROCEDURES.xtra_query_validity, &args)
    }

    pub fn xtra_set_auto_download(&self, enable: bool, interval_hours: u16) -> Result<u32, TransportError> {
        let args = self
            .xtra_header()
            .bool(enable)
            .u16(interval_hours)
            .into_bytes();
        self.pdsm(R::PROCEDURES.xtra_set_auto_download, &args)
    }

    pub fn xtra_inject_time(&self, info: &XtraTimeInfo) -> Result<u32, TransportError> {
        let args = self
            .xtra_header()
            .optional(Some(|w: XdrWriter| {
                w.u64(info.time_utc)
                    .u32(info.uncertainty)
                    .bool(info.ref_to_utc)
                    .bool(info.force)
            }))
            .into_bytes();
        self.pdsm(R::PROCEDURES.xtra_inject_time, &args)
    }
}

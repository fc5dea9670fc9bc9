//! Outbound calls to the engine's PDSM and ATL programs.

mod client;
mod xdr;

use std::sync::{Mutex, PoisonError};

use tracing::error;

pub use client::PdsmClient;
pub use xdr::XdrWriter;

use crate::{error::TransportError, revision::Program};

/// Request/response transport to the engine.
///
/// `args` is the XDR encoding of the procedure's arguments; the reply is the
/// single result word every procedure returns.
pub trait RpcChannel: Send + Sync {
    fn call(&self, program: Program, procedure: u32, args: &[u8]) -> Result<u32, TransportError>;

    /// Drops the callback registrations made for this channel.
    fn unregister(&self) {}
}

impl<F> RpcChannel for F
where
    F: Fn(Program, u32, &[u8]) -> Result<u32, TransportError> + Send + Sync,
{
    fn call(&self, program: Program, procedure: u32, args: &[u8]) -> Result<u32, TransportError> {
        (self)(program, procedure, args)
    }
}

/// Logical client roles registered with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ClientRole {
    Position = 0x2,
    NetworkInitiated = 0x4,
    Xtra = 0xB,
}

impl ClientRole {
    /// Registration order; teardown runs in the same order.
    pub const ALL: [ClientRole; 3] = [ClientRole::Position, ClientRole::Xtra, ClientRole::NetworkInitiated];

    pub fn code(self) -> u32 {
        self as u32
    }

    fn slot(self) -> usize {
        match self {
            ClientRole::Position => 0,
            ClientRole::Xtra => 1,
            ClientRole::NetworkInitiated => 2,
        }
    }
}

/// Engine-assigned client ids, filled in by `client_init`.
#[derive(Debug, Default)]
pub struct ClientIdentityTable {
    ids: Mutex<[Option<u32>; 3]>,
}

impl ClientIdentityTable {
    /// Id for `role`; zero before the role is registered.
    pub fn get(&self, role: ClientRole) -> u32 {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)[role.slot()].unwrap_or(0)
    }

    pub fn is_registered(&self, role: ClientRole) -> bool {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)[role.slot()].is_some()
    }

    pub(crate) fn set(&self, role: ClientRole, id: u32) {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)[role.slot()] = Some(id);
    }

    pub(crate) fn clear(&self) {
        *self.ids.lock().unwrap_or_else(PoisonError::into_inner) = [None; 3];
    }
}

/// What happens when the engine transport fails.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailurePolicy {
    /// Terminate the process. The engine state is unknown after a lost
    /// call, so a clean restart is the only recovery.
    #[default]
    Exit,
    /// Return the error to the caller.
    Propagate,
}

impl FailurePolicy {
    pub(crate) fn escalate(self, err: TransportError) -> TransportError {
        match self {
            FailurePolicy::Exit => {
                error!("engine transport failed, exiting: {}", err);
                std::process::exit(-1);
            },
            FailurePolicy::Propagate => err,
        }
    }
}

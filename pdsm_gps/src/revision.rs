//! Engine firmware revisions.
//!
//! Each revision numbers its remote procedures and lays out its records
//! differently. A revision is a tag type implementing [`EngineRevision`];
//! the service, client and dispatcher are generic over it.

use crate::{
    codec::AltitudeWrapRule,
    pdsm::{ExtRecordLayout, MessageLayout, PdRecordLayout},
};

/// Remote program and version a call is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Program {
    pub id: u32,
    pub version: u32,
}

/// Outbound procedure numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcedureTable {
    pub client_init: u32,
    pub client_release: u32,
    pub pd_reg: u32,
    pub pa_reg: u32,
    pub lcs_reg: u32,
    pub xtra_reg: u32,
    pub ext_status_reg: u32,
    pub client_act: u32,
    pub client_deact: u32,
    pub get_position: u32,
    pub end_session: u32,
    pub xtra_set_data: u32,
    pub xtra_initiate_download: u32,
    pub xtra_set_auto_download: u32,
    pub xtra_query_validity: u32,
    pub xtra_inject_time: u32,
    pub atl_l2_proxy_reg: u32,
    pub atl_dns_proxy_reg: u32,
}

/// Procedure numbers of inbound callback messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackProcedures {
    pub pd_event: u32,
    pub ext_status: u32,
    pub xtra_event: u32,
}

/// Event masks and arguments sent when the clients register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub pd_event_mask: u32,
    pub pa_event_mask: u32,
    pub lcs_event_mask: u32,
    pub xtra_event_mask: u32,
    pub ext_status_mask: u32,
}

/// Protocol description of one engine revision.
pub trait EngineRevision: Send + Sync + 'static {
    const NAME: &'static str;

    /// Program serving client requests.
    const PDSM_PROGRAM: Program;
    /// Program serving the assistance transport (ATL) registrations.
    const ATL_PROGRAM: Program;
    /// Service id of inbound PDSM callbacks.
    const PDSM_CALLBACK_SERVICE: u32;
    /// Service id of inbound ATL callbacks.
    const ATL_CALLBACK_SERVICE: u32;

    const PROCEDURES: ProcedureTable;
    const CALLBACKS: CallbackProcedures;
    const REGISTRATION: Registration;

    const MESSAGE_LAYOUT: MessageLayout;
    const PD_LAYOUT: PdRecordLayout;
    const EXT_LAYOUT: ExtRecordLayout;

    fn altitude_rule() -> AltitudeWrapRule {
        AltitudeWrapRule::default()
    }
}

/// Tag for the Leo engine revision
pub struct Leo;

impl EngineRevision for Leo {
    const NAME: &'static str = "leo";

    const PDSM_PROGRAM: Program = Program {
        id: 0x3000_005B,
        version: 0x0001_0001,
    };
    const ATL_PROGRAM: Program = Program {
        id: 0x3000_001D,
        version: 0x0001_0001,
    };
    const PDSM_CALLBACK_SERVICE: u32 = 0x3100_005B;
    const ATL_CALLBACK_SERVICE: u32 = 0x3100_001D;

    const PROCEDURES: ProcedureTable = ProcedureTable {
        client_init: 0x2,
        client_release: 0x3,
        pd_reg: 0x4,
        pa_reg: 0x5,
        lcs_reg: 0x6,
        xtra_reg: 0x7,
        ext_status_reg: 0x8,
        client_act: 0x9,
        client_deact: 0xA,
        get_position: 0xB,
        end_session: 0xC,
        xtra_set_data: 0x1A,
        xtra_initiate_download: 0x1B,
        xtra_set_auto_download: 0x1C,
        xtra_query_validity: 0x1D,
        xtra_inject_time: 0x1E,
        atl_l2_proxy_reg: 0x3,
        atl_dns_proxy_reg: 0x6,
    };

    const CALLBACKS: CallbackProcedures = CallbackProcedures {
        pd_event: 1,
        ext_status: 4,
        xtra_event: 5,
    };

    const REGISTRATION: Registration = Registration {
        pd_event_mask: 0xF3F0_FFFF,
        pa_event_mask: 0x07FF_EFE0,
        lcs_event_mask: 0x3F0,
        xtra_event_mask: 7,
        ext_status_mask: 4,
    };

    const MESSAGE_LAYOUT: MessageLayout = MessageLayout {
        service_id: 3,
        procedure_id: 5,
        payload: 10,
        xtra_filename: 0x50,
    };

    const PD_LAYOUT: PdRecordLayout = PdRecordLayout {
        event: 2,
        timestamp: 8,
        latitude_hi: 60,
        latitude_lo: 61,
        longitude_hi: 62,
        longitude_lo: 63,
        altitude: 64,
        speed: 66,
        heading: 67,
        hdop: 75,
        used_in_fix_mask: 77,
        sv_count: 82,
        sv_list: 83,
        sv_stride: 3,
        sv_prn: 0,
        sv_elevation: 1,
        sv_azimuth_snr: 2,
    };

    const EXT_LAYOUT: ExtRecordLayout = ExtRecordLayout {
        sv_count: 8,
        sv_list: 101,
        sv_stride: 12,
        sv_prn: 1,
        sv_snr: 2,
        sv_azimuth: 4,
        sv_elevation: 5,
    };
}

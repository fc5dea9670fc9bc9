#![cfg(feature = "serde")]

use pdsm_gps::{
    FixSource, GpsConfig, GpsStatusValue, HostEvent, LocationFix, LocationFlags, SatelliteStatus,
    SvInfo,
};

#[test]
fn host_events_survive_json() {
    let events = vec![
        HostEvent::Location(LocationFix {
            flags: LocationFlags::LAT_LONG | LocationFlags::ACCURACY,
            latitude: 48.1173,
            longitude: 11.5,
            accuracy: 9.0,
            timestamp: 1_308_140_445_500,
            ..Default::default()
        }),
        HostEvent::Status(GpsStatusValue::SessionBegin),
        HostEvent::SvStatus(SatelliteStatus {
            sv_list: vec![SvInfo {
                prn: 12,
                snr: 39.0,
                elevation: 7.0,
                azimuth: 344.0,
            }],
            used_in_fix_mask: 1 << 11,
            ..Default::default()
        }),
        HostEvent::XtraDownloadRequest,
    ];
    let json = serde_json::to_string(&events).unwrap();
    let back: Vec<HostEvent> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, events);
}

#[test]
fn config_serializes_by_field() {
    let config = GpsConfig::default().with_fix_source(FixSource::Rpc);
    let value = serde_json::to_value(&config).unwrap();
    assert_eq!(value["fix_source"], "Rpc");
    assert_eq!(value["session_timeout"], 2);
    let back: GpsConfig = serde_json::from_value(value).unwrap();
    assert_eq!(back, config);
}

mod common;

use std::sync::Arc;

use common::MockChannel;
use pdsm_gps::{
    xtra::inject_xtra_data, ClientRole, EngineRevision, FailurePolicy, Leo, PdsmClient,
    TransportError, XtraError, XtraFragments,
};
use proptest::prelude::*;

const SET_DATA: u32 = Leo::PROCEDURES.xtra_set_data;

fn client(channel: &Arc<MockChannel>) -> PdsmClient {
    let client = PdsmClient::new(channel.clone(), FailurePolicy::Propagate, 2);
    client.client_init(ClientRole::Xtra).unwrap();
    channel.clear();
    client
}

/// (xtra client id, data length, part, total) from a set-data call.
fn set_data_header(words: &[u32]) -> (u32, u32, u32, u32) {
    let n = words.len();
    (words[1], words[3], words[n - 3], words[n - 2])
}

#[test]
fn blob_is_sent_in_numbered_blocks() {
    let channel = Arc::new(MockChannel::new());
    let client = client(&channel);
    let data: Vec<u8> = (0..1000u32).map(|i| i as u8).collect();

    assert_eq!(inject_xtra_data(&client, &data).unwrap(), 0);

    let calls = channel.calls_to(SET_DATA);
    assert_eq!(calls.len(), 3);
    let headers: Vec<_> = calls.iter().map(|c| set_data_header(&c.words())).collect();
    assert_eq!(
        headers,
        [
            (0x100B, 400, 1, 3),
            (0x100B, 400, 2, 3),
            (0x100B, 200, 3, 3),
        ]
    );
    // Opaque data follows the header and its own length word
    assert_eq!(&calls[2].args[20..220], &data[800..]);
}

#[test]
fn rejected_block_stops_injection() {
    let channel = Arc::new(MockChannel::new());
    let client = client(&channel);
    channel.script(SET_DATA, vec![Ok(0), Ok(u32::MAX)]);

    let err = inject_xtra_data(&client, &[7u8; 1000]).unwrap_err();
    assert!(matches!(err, XtraError::Rejected { part: 2, total: 3 }));
    assert_eq!(channel.calls_to(SET_DATA).len(), 2);
}

#[test]
fn final_block_result_is_returned() {
    let channel = Arc::new(MockChannel::new());
    let client = client(&channel);
    channel.script(SET_DATA, vec![Ok(0), Ok(5)]);

    assert_eq!(inject_xtra_data(&client, &[1u8; 800]).unwrap(), 5);
}

#[test]
fn final_block_rejection_code_is_passed_through() {
    let channel = Arc::new(MockChannel::new());
    let client = client(&channel);
    channel.script(SET_DATA, vec![Ok(0), Ok(u32::MAX)]);

    assert_eq!(inject_xtra_data(&client, &[1u8; 800]).unwrap(), u32::MAX);
    assert_eq!(channel.calls_to(SET_DATA).len(), 2);
}

#[test]
fn transport_failure_names_the_block() {
    let channel = Arc::new(MockChannel::new());
    let client = client(&channel);
    channel.script(
        SET_DATA,
        vec![Err(TransportError::CallFailed {
            program: Leo::PDSM_PROGRAM.id,
            procedure: SET_DATA,
            reason: "timed out".into(),
        })],
    );

    let err = inject_xtra_data(&client, &[1u8; 10]).unwrap_err();
    assert!(matches!(err, XtraError::Transport { part: 1, .. }));
    assert_eq!(channel.calls_to(SET_DATA).len(), 1);
}

#[test]
fn empty_and_oversized_blobs_are_refused() {
    let channel = Arc::new(MockChannel::new());
    let client = client(&channel);

    assert!(matches!(inject_xtra_data(&client, &[]), Err(XtraError::Empty)));
    let huge = vec![0u8; 400 * 255 + 1];
    assert!(matches!(
        inject_xtra_data(&client, &huge),
        Err(XtraError::TooLarge { parts: 256 })
    ));
    assert!(channel.calls().is_empty());

    assert_eq!(XtraFragments::new(&vec![0u8; 400 * 255]).unwrap().total(), 255);
}

#[test]
fn busy_engine_is_retried() {
    let channel = Arc::new(MockChannel::new());
    let client: PdsmClient = PdsmClient::new(channel.clone(), FailurePolicy::Propagate, 2);
    let get_position = Leo::PROCEDURES.get_position;

    channel.script(
        get_position,
        vec![
            Err(TransportError::Busy { procedure: get_position }),
            Err(TransportError::Busy { procedure: get_position }),
        ],
    );
    assert_eq!(client.get_position().unwrap(), 0);
    assert_eq!(channel.calls_to(get_position).len(), 3);

    channel.clear();
    channel.script(
        get_position,
        (0..3)
            .map(|_| Err(TransportError::Busy { procedure: get_position }))
            .collect(),
    );
    assert!(matches!(
        client.get_position(),
        Err(TransportError::Busy { .. })
    ));
    assert_eq!(channel.calls_to(get_position).len(), 3);
}

#[test]
fn position_request_carries_session_timeout_and_client() {
    let channel = Arc::new(MockChannel::new());
    let client: PdsmClient = PdsmClient::new(channel.clone(), FailurePolicy::Propagate, 7);
    client.client_init(ClientRole::Position).unwrap();
    client.get_position().unwrap();

    let call = channel.calls_to(Leo::PROCEDURES.get_position).remove(0);
    let words = call.words();
    assert_eq!(words.len(), 29);
    assert_eq!(words[27], 7);
    assert_eq!(words[28], 0x1002);
}

proptest! {
    #[test]
    fn fragments_cover_the_blob(len in 1usize..=4000, block in 16usize..=500) {
        let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
        let fragments = XtraFragments::with_block_size(&data, block).unwrap();
        let total = fragments.total();
        prop_assert_eq!(usize::from(total), len.div_ceil(block));

        let parts: Vec<_> = fragments.collect();
        prop_assert_eq!(parts.len(), usize::from(total));
        for (i, part) in parts.iter().enumerate() {
            prop_assert_eq!(usize::from(part.part), i + 1);
            prop_assert_eq!(part.total, total);
            prop_assert!(part.data.len() <= block);
        }
        let joined: Vec<u8> = parts.iter().flat_map(|p| p.data.iter().copied()).collect();
        prop_assert_eq!(joined, data);
    }
}

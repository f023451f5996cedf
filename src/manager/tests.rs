//! Lifecycle tests for the link manager
//!
//! These drive the manager against the in-memory transport and check the
//! ordered event stream and state transitions end to end.

use super::*;
use crate::codec::decode_record;
use crate::transports::memory::MemoryTransport;
use crate::types::{LinkEvent, ServiceToken};
use crate::ErrorKind;
use futures::StreamExt;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const FRAME: &[u8] = b"ON,OFF,36.5,37.0,36.8,98.2";
const WAIT: Duration = Duration::from_secs(2);

async fn next_event(events: &mut LinkEvents) -> LinkEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for link event")
        .expect("event stream closed")
}

async fn wait_for_state(manager: &LinkManager, target: LinkState) {
    let mut updates = Box::pin(manager.state_updates());
    tokio::time::timeout(WAIT, async {
        while let Some(state) = updates.next().await {
            if state == target {
                return;
            }
        }
    })
    .await
    .expect("timed out waiting for link state");
}

#[tokio::test]
async fn reference_frame_reaches_the_subscriber() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut transport = MemoryTransport::new();
    let mut remote = transport.add_peer("HC-06");
    let (manager, mut events) = LinkManager::new(Arc::new(transport), LinkConfig::default());

    let peer = manager.connect().await.expect("connect");
    assert_eq!(peer.name(), "HC-06");

    let mut rig = remote.accept().await.expect("rig side");
    assert_eq!(next_event(&mut events).await, LinkEvent::Connected);
    assert_eq!(manager.state(), LinkState::Connected);

    rig.write_all(FRAME).await.expect("write");
    let event = next_event(&mut events).await;
    let record = event.record().expect("record event");
    assert_eq!(record.peltier_state, "ON");
    assert_eq!(record.pump_state, "OFF");
    assert_eq!(record.therm1_temp, "36.5");
    assert_eq!(record.therm2_temp, "37.0");
    assert_eq!(record.therm3_temp, "36.8");
    assert_eq!(record.ir_temp, "98.2");

    drop(rig);
    assert_eq!(next_event(&mut events).await, LinkEvent::Disconnected);
    assert_eq!(manager.state(), LinkState::Disconnected);
}

#[tokio::test]
async fn unknown_target_is_peer_not_found() {
    let mut transport = MemoryTransport::new();
    let _remote = transport.add_peer("HC-05");
    let transport = Arc::new(transport);
    let (manager, mut events) = LinkManager::new(transport.clone(), LinkConfig::default());

    let error = manager.connect().await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::PeerNotFound);
    assert_eq!(manager.state(), LinkState::Disconnected);
    assert_eq!(transport.open_attempts(), 0);
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn radio_off_refuses_to_connect() {
    let mut transport = MemoryTransport::new();
    let _remote = transport.add_peer("HC-06");
    transport.set_powered(false);
    let (manager, _events) = LinkManager::new(Arc::new(transport), LinkConfig::default());

    let error = manager.connect().await.unwrap_err();
    assert!(matches!(error, LinkError::AdapterUnavailable));
    assert_eq!(manager.state(), LinkState::Disconnected);
}

#[tokio::test]
async fn refused_connect_falls_back_to_disconnected() {
    let mut transport = MemoryTransport::new();
    transport.add_refusing_peer("HC-06");
    let (manager, mut events) = LinkManager::new(Arc::new(transport), LinkConfig::default());

    manager.connect().await.expect("attempt starts");
    wait_for_state(&manager, LinkState::Disconnected).await;
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn configured_service_token_is_used_to_open() {
    let token = ServiceToken::new("8ce255c0-200a-11e0-ac64-0800200c9a66");
    let mut transport = MemoryTransport::new();
    let mut remote = transport.add_peer_with_token("HC-06", token.clone());
    let config = LinkConfig { service_token: token.clone(), ..LinkConfig::default() };
    let (manager, mut events) = LinkManager::new(Arc::new(transport), config);

    let peer = manager.connect().await.expect("connect");
    assert_eq!(peer.token(), &token);
    let _rig = remote.accept().await.expect("rig side");
    assert_eq!(next_event(&mut events).await, LinkEvent::Connected);
}

#[tokio::test]
async fn wrong_service_token_never_connects() {
    let mut transport = MemoryTransport::new();
    let _remote = transport.add_peer("HC-06");
    let transport = Arc::new(transport);
    let config =
        LinkConfig { service_token: ServiceToken::new("not-the-rig-uuid"), ..LinkConfig::default() };
    let (manager, mut events) = LinkManager::new(transport.clone(), config);

    manager.connect().await.expect("attempt starts");
    wait_for_state(&manager, LinkState::Disconnected).await;
    assert_eq!(transport.open_attempts(), 1);
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn timeout_bounds_a_hung_handshake() {
    let mut transport = MemoryTransport::new();
    transport.add_unreachable_peer("HC-06");
    let config = LinkConfig { connect_timeout_ms: Some(20), ..LinkConfig::default() };
    let (manager, _events) = LinkManager::new(Arc::new(transport), config);

    manager.connect().await.expect("attempt starts");
    assert_eq!(manager.state(), LinkState::Connecting);
    wait_for_state(&manager, LinkState::Disconnected).await;
}

#[tokio::test]
async fn disconnect_twice_emits_one_event() {
    let mut transport = MemoryTransport::new();
    let mut remote = transport.add_peer("HC-06");
    let (manager, mut events) = LinkManager::new(Arc::new(transport), LinkConfig::default());

    manager.connect().await.expect("connect");
    let mut rig = remote.accept().await.expect("rig side");
    assert_eq!(next_event(&mut events).await, LinkEvent::Connected);

    assert!(manager.disconnect().await);
    assert!(!manager.disconnect().await);

    assert_eq!(next_event(&mut events).await, LinkEvent::Disconnected);
    assert!(events.try_recv().is_none());
    assert_eq!(manager.state(), LinkState::Disconnected);

    // The blocked read was interrupted and the stream released.
    let mut buf = [0u8; 1];
    assert_eq!(rig.read(&mut buf).await.expect("eof"), 0);
}

#[tokio::test]
async fn disconnect_while_connecting_cancels_the_attempt() {
    let mut transport = MemoryTransport::new();
    transport.add_unreachable_peer("HC-06");
    let (manager, mut events) = LinkManager::new(Arc::new(transport), LinkConfig::default());

    manager.connect().await.expect("attempt starts");
    assert_eq!(manager.state(), LinkState::Connecting);

    assert!(manager.disconnect().await);
    assert_eq!(manager.state(), LinkState::Disconnected);
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn new_connect_supersedes_a_pending_one() {
    let mut transport = MemoryTransport::new();
    transport.add_unreachable_peer("P1");
    let mut p2 = transport.add_peer("P2");
    let (manager, mut events) = LinkManager::new(Arc::new(transport), LinkConfig::default());

    manager.connect_to("P1").await.expect("first attempt");
    manager.connect_to("P2").await.expect("second attempt");

    let _rig = p2.accept().await.expect("P2 opened");
    assert_eq!(next_event(&mut events).await, LinkEvent::Connected);
    assert_eq!(manager.state(), LinkState::Connected);
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn new_connect_supersedes_a_live_session() {
    let mut transport = MemoryTransport::new();
    let mut p1 = transport.add_peer("P1");
    let mut p2 = transport.add_peer("P2");
    let (manager, mut events) = LinkManager::new(Arc::new(transport), LinkConfig::default());

    manager.connect_to("P1").await.expect("P1");
    let mut first = p1.accept().await.expect("P1 opened");
    assert_eq!(next_event(&mut events).await, LinkEvent::Connected);

    manager.connect_to("P2").await.expect("P2");
    let mut second = p2.accept().await.expect("P2 opened");

    // P1's stream is closed before the new attempt starts.
    let mut buf = [0u8; 1];
    assert_eq!(first.read(&mut buf).await.expect("eof"), 0);
    assert!(first.write_all(FRAME).await.is_err());

    assert_eq!(next_event(&mut events).await, LinkEvent::Disconnected);
    assert_eq!(next_event(&mut events).await, LinkEvent::Connected);

    second.write_all(FRAME).await.expect("write");
    let expected = decode_record(FRAME).expect("valid");
    assert_eq!(next_event(&mut events).await, LinkEvent::RecordReceived(expected));
}

#[tokio::test]
async fn partial_frame_before_close_is_never_published() {
    let mut transport = MemoryTransport::new();
    let mut remote = transport.add_peer("HC-06");
    let (manager, mut events) = LinkManager::new(Arc::new(transport), LinkConfig::default());

    manager.connect().await.expect("connect");
    let mut rig = remote.accept().await.expect("rig side");
    assert_eq!(next_event(&mut events).await, LinkEvent::Connected);

    for _ in 0..3 {
        rig.write_all(FRAME).await.expect("write");
    }
    rig.write_all(&FRAME[..7]).await.expect("write");
    drop(rig);

    for _ in 0..3 {
        assert!(next_event(&mut events).await.record().is_some());
    }
    assert_eq!(next_event(&mut events).await, LinkEvent::Disconnected);
    assert_eq!(manager.state(), LinkState::Disconnected);
}

#[tokio::test]
async fn toggle_alternates_connect_and_disconnect() {
    let mut transport = MemoryTransport::new();
    let mut remote = transport.add_peer("HC-06");
    let (manager, mut events) = LinkManager::new(Arc::new(transport), LinkConfig::default());

    assert!(manager.toggle().await.expect("connect").is_active());
    let _rig = remote.accept().await.expect("rig side");
    assert_eq!(next_event(&mut events).await, LinkEvent::Connected);

    assert_eq!(manager.toggle().await.expect("disconnect"), LinkState::Disconnected);
    assert_eq!(next_event(&mut events).await, LinkEvent::Disconnected);
}

#[tokio::test]
async fn reconnect_after_remote_close_starts_a_fresh_session() {
    let mut transport = MemoryTransport::new();
    let mut remote = transport.add_peer("HC-06");
    let (manager, mut events) = LinkManager::new(Arc::new(transport), LinkConfig::default());

    manager.connect().await.expect("connect");
    drop(remote.accept().await.expect("rig side"));
    assert_eq!(next_event(&mut events).await, LinkEvent::Connected);
    assert_eq!(next_event(&mut events).await, LinkEvent::Disconnected);

    manager.connect().await.expect("reconnect");
    let mut rig = remote.accept().await.expect("rig side again");
    assert_eq!(next_event(&mut events).await, LinkEvent::Connected);
    rig.write_all(FRAME).await.expect("write");
    assert!(next_event(&mut events).await.record().is_some());
}

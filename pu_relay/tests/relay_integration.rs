//! Relay integration tests: a real relay on a loopback port with real
//! relay transports on both sides.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::{SinkExt, StreamExt};
use http_body_util::BodyExt;
use pocket_uno::{
    MatchConfig, Profile, Session, SessionEvent,
    net::{
        ConnectionError, HOST_PEER, IdGenerator, RandomIds, Recipient, SequentialIds, Transport,
        TransportEvent, relay::RelayTransport,
    },
};
use pu_relay::{
    api::{RelayState, create_router},
    config::RelayConfig,
};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tower::ServiceExt;

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Starts a relay on an ephemeral port and returns its WebSocket URL.
async fn spawn_relay() -> String {
    spawn_relay_with(RelayConfig::default()).await
}

async fn spawn_relay_with(config: RelayConfig) -> String {
    let app = create_router(RelayState::new(config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/ws")
}

async fn recv<T: Transport>(transport: &mut T) -> TransportEvent {
    timeout(STEP_TIMEOUT, transport.recv())
        .await
        .expect("no event within timeout")
        .expect("transport closed")
}

#[tokio::test]
async fn test_health_reports_rooms() {
    let app = create_router(RelayState::new(RelayConfig::default()));
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["rooms"]["open"], 0);
}

#[tokio::test]
async fn test_host_and_joiner_exchange_data() {
    let url = spawn_relay().await;
    let ids: Arc<dyn IdGenerator> = Arc::new(SequentialIds::new(0));
    let mut host = RelayTransport::host(&url, ids).await.unwrap();
    assert_eq!(host.room_code(), "AAAA");

    let mut joiner = RelayTransport::join(&url, "AAAA").await.unwrap();
    assert_eq!(recv(&mut host).await, TransportEvent::Connected(1));
    assert_eq!(joiner.peers(), vec![HOST_PEER]);

    joiner.send(Recipient::All, "hello host").await.unwrap();
    assert_eq!(
        recv(&mut host).await,
        TransportEvent::Message {
            from: 1,
            text: "hello host".into()
        }
    );

    host.send(Recipient::Peer(1), "hello joiner").await.unwrap();
    assert_eq!(
        recv(&mut joiner).await,
        TransportEvent::Message {
            from: HOST_PEER,
            text: "hello joiner".into()
        }
    );

    drop(host);
    assert_eq!(
        recv(&mut joiner).await,
        TransportEvent::Disconnected(HOST_PEER)
    );
}

#[tokio::test]
async fn test_unknown_and_taken_rooms() {
    let url = spawn_relay().await;
    assert!(matches!(
        RelayTransport::join(&url, "ZZZZ").await,
        Err(ConnectionError::RoomNotFound(code)) if code == "ZZZZ"
    ));

    let _first = RelayTransport::host(&url, Arc::new(SequentialIds::new(0)))
        .await
        .unwrap();
    assert!(matches!(
        RelayTransport::host(&url, Arc::new(SequentialIds::new(0))).await,
        Err(ConnectionError::RoomTaken(code)) if code == "AAAA"
    ));
}

#[tokio::test]
async fn test_bad_frames_get_an_error() {
    let url = spawn_relay().await;
    let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

    ws.send(Message::Text("not json".into())).await.unwrap();
    let reply = timeout(STEP_TIMEOUT, ws.next()).await.unwrap().unwrap().unwrap();
    let json: Value = serde_json::from_str(reply.to_text().unwrap()).unwrap();
    assert_eq!(json["op"], "error");
    assert_eq!(json["code"], "bad_frame");

    // Sending before a handshake is out of place too.
    ws.send(Message::Text(r#"{"op":"send","data":"x"}"#.into()))
        .await
        .unwrap();
    let reply = timeout(STEP_TIMEOUT, ws.next()).await.unwrap().unwrap().unwrap();
    let json: Value = serde_json::from_str(reply.to_text().unwrap()).unwrap();
    assert_eq!(json["code"], "bad_frame");
}

#[tokio::test]
async fn test_session_over_relay() {
    let url = spawn_relay().await;
    let ids: Arc<dyn IdGenerator> = Arc::new(SequentialIds::new(5));
    let link = RelayTransport::host(&url, Arc::clone(&ids)).await.unwrap();
    let code = link.room_code().to_string();
    let mut host = Session::host(link, ids, Profile::new("Ada", 0));

    let link = RelayTransport::join(&url, &code).await.unwrap();
    let mut joiner = Session::join(link, Arc::new(RandomIds::new()), Profile::new("Bo", 1));

    let step = STEP_TIMEOUT;
    assert!(matches!(
        timeout(step, host.next_event()).await.unwrap().unwrap(),
        SessionEvent::PeerConnected { peer: 1, .. }
    ));
    assert!(matches!(
        timeout(step, joiner.next_event()).await.unwrap().unwrap(),
        SessionEvent::Welcomed(_)
    ));
    assert_eq!(
        timeout(step, host.next_event()).await.unwrap().unwrap(),
        SessionEvent::RosterUpdated
    );
    assert_eq!(
        timeout(step, joiner.next_event()).await.unwrap().unwrap(),
        SessionEvent::RosterUpdated
    );

    host.start_match(&MatchConfig::default()).await.unwrap();
    assert_eq!(
        timeout(step, joiner.next_event()).await.unwrap().unwrap(),
        SessionEvent::MatchStarted
    );

    host.draw_card().await.unwrap();
    assert!(matches!(
        timeout(step, joiner.next_event()).await.unwrap().unwrap(),
        SessionEvent::Applied(_)
    ));
    assert_eq!(joiner.state().players(), host.state().players());
    assert_eq!(joiner.state().current_player_index(), 1);
}

#[tokio::test]
async fn test_flooding_host_is_slowed_down_not_dropped() {
    let url = spawn_relay_with(RelayConfig {
        frames_per_second: 3,
        ..RelayConfig::default()
    })
    .await;
    let mut host = RelayTransport::host(&url, Arc::new(SequentialIds::new(0)))
        .await
        .unwrap();
    let mut joiner = RelayTransport::join(&url, host.room_code()).await.unwrap();
    assert_eq!(recv(&mut host).await, TransportEvent::Connected(1));

    for i in 0..5 {
        host.send(Recipient::All, &format!("cmd{i}")).await.unwrap();
    }
    for i in 0..5 {
        assert_eq!(
            recv(&mut joiner).await,
            TransportEvent::Message {
                from: HOST_PEER,
                text: format!("cmd{i}")
            }
        );
    }
}

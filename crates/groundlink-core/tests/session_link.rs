// Session lifecycle tests against an in-process bridge.
//
// A real tokio-tungstenite server stands in for the robot bridge so the
// whole path is exercised: connect, handshake burst, topic dispatch,
// teardown, reconnect.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use groundlink_core::{Bridge, BridgeConfig, Notice};
use groundlink_proto::topics;

const WAIT: Duration = Duration::from_secs(5);

async fn bind() -> (TcpListener, BridgeConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let config = BridgeConfig {
        host: "127.0.0.1".into(),
        port,
        reconnect_delay: Duration::from_millis(100),
        drain_interval: Duration::from_millis(5),
        ..BridgeConfig::default()
    };
    (listener, config)
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    timeout(WAIT, tokio_tungstenite::accept_async(stream))
        .await
        .unwrap()
        .unwrap()
}

async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        let message = timeout(WAIT, ws.next()).await.unwrap().unwrap().unwrap();
        if let Message::Text(text) = message {
            return text.to_string();
        }
    }
}

async fn send_json(ws: &mut WebSocketStream<TcpStream>, value: serde_json::Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

/// Poll until `predicate` holds or the deadline passes.
async fn wait_for(mut predicate: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !predicate() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn handshake_burst_arrives_in_order() {
    let (listener, config) = bind().await;
    let bridge = Bridge::new(config);
    bridge.connect();

    let mut ws = accept(&listener).await;

    let ops: Vec<String> = [
        next_text(&mut ws).await,
        next_text(&mut ws).await,
        next_text(&mut ws).await,
    ]
    .iter()
    .map(|raw| {
        serde_json::from_str::<serde_json::Value>(raw).unwrap()["op"]
            .as_str()
            .unwrap()
            .to_owned()
    })
    .collect();

    assert_eq!(ops, ["broadcast", "get_nodes", "get_presets"]);

    bridge.shutdown().await;
}

#[tokio::test]
async fn presets_callback_populates_cache() {
    let (listener, config) = bind().await;
    let bridge = Bridge::new(config);
    bridge.connect();

    let mut ws = accept(&listener).await;
    send_json(
        &mut ws,
        json!({
            "op": "get_presets_callback",
            "presets": ["default", "comp"],
            "active_preset": "default"
        }),
    )
    .await;

    let cache = bridge.cache().clone();
    wait_for(|| cache.presets().is_some()).await;

    let presets = cache.presets().unwrap();
    assert_eq!(presets.presets, vec!["default", "comp"]);
    assert_eq!(presets.active_preset, "default");

    bridge.shutdown().await;
}

#[tokio::test]
async fn disconnect_clears_state_and_reconnects_within_backoff() {
    let (listener, config) = bind().await;
    let bridge = Bridge::new(config);
    bridge.connect();

    let mut ws = accept(&listener).await;

    // Populate caches and leave a correlation token pending.
    send_json(
        &mut ws,
        json!({
            "op": "data",
            "topic": topics::DEVICE_STATE,
            "device": "autonav_serial_can",
            "state": 3
        }),
    )
    .await;
    bridge.conbus_read(24, 0xFF);

    let cache = bridge.cache().clone();
    wait_for(|| cache.device_state("autonav_serial_can").is_some()).await;
    assert!(!cache.is_empty());

    // Kill the connection out from under the client.
    drop(ws);

    wait_for(|| cache.is_empty()).await;

    // A new connection attempt lands within the fixed backoff window
    // (100ms configured; generous slack for CI).
    let reconnect = timeout(Duration::from_secs(2), accept(&listener)).await;
    assert!(reconnect.is_ok(), "client did not reconnect in time");

    bridge.shutdown().await;
}

#[tokio::test]
async fn disconnect_notice_fires_exactly_once_per_disconnect() {
    let (listener, config) = bind().await;
    let bridge = Bridge::new(config);
    let mut notices = bridge.notices();
    bridge.connect();

    let ws = accept(&listener).await;

    // First session opens.
    assert_eq!(
        timeout(WAIT, notices.recv()).await.unwrap().unwrap(),
        Notice::Connected
    );
    assert_eq!(
        timeout(WAIT, notices.recv()).await.unwrap().unwrap(),
        Notice::UpdatingData
    );

    drop(ws);

    // Exactly one Disconnected, then nothing until the next session
    // opens (the reconnect loop keeps failing quietly once we stop
    // accepting).
    assert_eq!(
        timeout(WAIT, notices.recv()).await.unwrap().unwrap(),
        Notice::Disconnected
    );

    // Let the client cycle through a couple of failed reconnects.
    let _second = accept(&listener).await;
    assert_eq!(
        timeout(WAIT, notices.recv()).await.unwrap().unwrap(),
        Notice::Connected
    );

    bridge.shutdown().await;
}

#[tokio::test]
async fn echoed_write_is_suppressed_on_the_wire_path() {
    let (listener, config) = bind().await;
    let bridge = Bridge::new(config);
    bridge.connect();

    let mut ws = accept(&listener).await;

    // Drain the handshake burst.
    for _ in 0..3 {
        next_text(&mut ws).await;
    }

    // Client pushes a config edit; the frame carries a token.
    bridge.update_config("autonav_nav_astar", json!({"waypoint_delay": 9.0}));
    let raw = next_text(&mut ws).await;
    let sent: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let token = sent["iterator"].as_u64().unwrap();

    // Bridge reflects the edit back as an ordinary data update carrying
    // the same token: the client must swallow it.
    send_json(
        &mut ws,
        json!({
            "op": "data",
            "topic": topics::CONFIGURATION,
            "device": "autonav_nav_astar",
            "json": "{\"waypoint_delay\": 9.0}",
            "iterator": token
        }),
    )
    .await;

    // The echo never lands in the cache.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let cache = bridge.cache().clone();
    assert_eq!(cache.config("autonav_nav_astar"), None);

    // A later untagged update applies normally.
    send_json(
        &mut ws,
        json!({
            "op": "data",
            "topic": topics::CONFIGURATION,
            "device": "autonav_nav_astar",
            "json": "{\"waypoint_delay\": 10.0}"
        }),
    )
    .await;

    wait_for(|| cache.config("autonav_nav_astar").is_some()).await;
    assert_eq!(
        cache.config("autonav_nav_astar").unwrap()["waypoint_delay"],
        json!(10.0)
    );

    bridge.shutdown().await;
}

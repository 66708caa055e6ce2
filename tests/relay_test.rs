//! End-to-end tests for the WebSocket room relay.

use std::time::Duration;

use frame_relay::relay::MemberCounts;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

mod common;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(server: &common::TestServer, path_and_query: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{}{}", server.addr, path_and_query))
        .await
        .expect("relay upgrade failed");
    ws
}

async fn wait_for_members(server: &common::TestServer, room: &str, controllers: usize, viewers: usize) {
    let registry = server.registry.clone();
    let room = room.to_owned();
    let expected = Some(MemberCounts {
        controllers,
        viewers,
    });
    assert!(
        common::eventually(|| registry.member_counts(&room) == expected).await,
        "room {room} never reached {controllers} controllers / {viewers} viewers"
    );
}

/// Next data frame, skipping control frames.
async fn next_data(ws: &mut Client) -> Message {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("no frame within timeout")
            .expect("stream ended")
            .expect("transport error");
        if message.is_text() || message.is_binary() {
            return message;
        }
    }
}

async fn assert_silent(ws: &mut Client) {
    let outcome = tokio::time::timeout(Duration::from_millis(200), async {
        loop {
            match ws.next().await {
                Some(Ok(m)) if m.is_text() || m.is_binary() => return m,
                Some(Ok(_)) => continue,
                other => panic!("unexpected stream state: {other:?}"),
            }
        }
    })
    .await;
    assert!(outcome.is_err(), "unexpected frame: {outcome:?}");
}

#[tokio::test]
async fn controller_and_viewer_fan_out() {
    let server = common::start_server(common::test_config()).await;

    let mut c1 = connect(&server, "/?type=controller&room=r").await;
    let mut c2 = connect(&server, "/?type=controller&room=r").await;
    let mut v1 = connect(&server, "/?type=viewer&room=r").await;
    let mut v2 = connect(&server, "/?type=viewer&room=r").await;
    wait_for_members(&server, "r", 2, 2).await;

    c1.send(Message::text("next-slide")).await.unwrap();
    assert_eq!(next_data(&mut v1).await, Message::text("next-slide"));
    assert_eq!(next_data(&mut v2).await, Message::text("next-slide"));
    assert_silent(&mut c2).await;

    v1.send(Message::text("ready")).await.unwrap();
    for controller in [&mut c1, &mut c2] {
        let Message::Text(text) = next_data(controller).await else {
            panic!("viewer envelope must be a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value, serde_json::json!({"from": "viewer", "payload": "ready"}));
    }
    assert_silent(&mut v2).await;

    server.shutdown.trigger();
}

#[tokio::test]
async fn controller_binary_stays_binary() {
    let server = common::start_server(common::test_config()).await;

    let mut controller = connect(&server, "/?room=bin").await;
    let mut viewer = connect(&server, "/?type=viewer&room=bin").await;
    wait_for_members(&server, "bin", 1, 1).await;

    let bytes = vec![0u8, 159, 146, 150, 255];
    controller.send(Message::binary(bytes.clone())).await.unwrap();
    assert_eq!(next_data(&mut viewer).await, Message::binary(bytes));

    server.shutdown.trigger();
}

#[tokio::test]
async fn rooms_are_isolated() {
    let server = common::start_server(common::test_config()).await;

    let mut controller_a = connect(&server, "/?type=controller&room=a").await;
    let mut viewer_a = connect(&server, "/?type=viewer&room=a").await;
    let mut viewer_b = connect(&server, "/?type=viewer&room=b").await;
    wait_for_members(&server, "a", 1, 1).await;
    wait_for_members(&server, "b", 0, 1).await;

    controller_a.send(Message::text("only-a")).await.unwrap();
    assert_eq!(next_data(&mut viewer_a).await, Message::text("only-a"));
    assert_silent(&mut viewer_b).await;

    server.shutdown.trigger();
}

#[tokio::test]
async fn empty_room_is_removed_after_last_disconnect() {
    let server = common::start_server(common::test_config()).await;

    let mut controller = connect(&server, "/?room=gc").await;
    let mut viewer = connect(&server, "/?type=viewer&room=gc").await;
    wait_for_members(&server, "gc", 1, 1).await;

    viewer.close(None).await.unwrap();
    wait_for_members(&server, "gc", 1, 0).await;

    controller.close(None).await.unwrap();
    let registry = server.registry.clone();
    assert!(common::eventually(|| !registry.contains_room("gc")).await);
    assert_eq!(registry.room_count(), 0);

    server.shutdown.trigger();
}

#[tokio::test]
async fn dropped_socket_deregisters() {
    let server = common::start_server(common::test_config()).await;

    let viewer = connect(&server, "/?type=viewer&room=drop").await;
    wait_for_members(&server, "drop", 0, 1).await;
    assert_eq!(server.connections.active_count(), 1);

    drop(viewer);
    let registry = server.registry.clone();
    assert!(common::eventually(|| !registry.contains_room("drop")).await);
    let connections = server.connections.clone();
    assert!(common::eventually(|| connections.active_count() == 0).await);

    server.shutdown.trigger();
}

#[tokio::test]
async fn any_path_and_defaults_join_default_room_as_controller() {
    let server = common::start_server(common::test_config()).await;

    let mut controller = connect(&server, "/some/deep/path").await;
    let mut viewer = connect(&server, "/elsewhere?type=viewer").await;
    wait_for_members(&server, "default", 1, 1).await;

    controller.send(Message::text("hello")).await.unwrap();
    assert_eq!(next_data(&mut viewer).await, Message::text("hello"));

    server.shutdown.trigger();
}

#[tokio::test]
async fn unknown_type_is_a_controller() {
    let server = common::start_server(common::test_config()).await;

    let _peer = connect(&server, "/?type=projector&room=odd").await;
    wait_for_members(&server, "odd", 1, 0).await;

    server.shutdown.trigger();
}

#[tokio::test]
async fn shutdown_sends_close_frame() {
    let server = common::start_server(common::test_config()).await;

    let mut viewer = connect(&server, "/?type=viewer&room=bye").await;
    wait_for_members(&server, "bye", 0, 1).await;

    server.shutdown.trigger();

    let close = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(message) = viewer.next().await {
            if let Ok(Message::Close(frame)) = message {
                return frame;
            }
        }
        None
    })
    .await
    .expect("no close frame before timeout");

    let frame = close.expect("close frame without payload");
    assert_eq!(frame.code, CloseCode::Away);
}

#[tokio::test]
async fn upgrades_on_api_routes_join_the_relay() {
    let server = common::start_server(common::test_config()).await;

    let mut viewer = connect(&server, "/health?type=viewer&room=api").await;
    let mut controller = connect(&server, "/proxy?room=api").await;
    wait_for_members(&server, "api", 1, 1).await;

    controller.send(Message::text("via-api-path")).await.unwrap();
    assert_eq!(next_data(&mut viewer).await, Message::text("via-api-path"));

    server.shutdown.trigger();
}

#[tokio::test]
async fn peer_close_is_answered() {
    let server = common::start_server(common::test_config()).await;

    let mut viewer = connect(&server, "/?type=viewer&room=handshake").await;
    wait_for_members(&server, "handshake", 0, 1).await;

    viewer.send(Message::Close(None)).await.unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(2), viewer.next())
        .await
        .expect("no close reply before timeout");
    assert!(
        matches!(reply, Some(Ok(Message::Close(_)))),
        "expected a close reply, got {reply:?}"
    );

    let registry = server.registry.clone();
    assert!(common::eventually(|| !registry.contains_room("handshake")).await);

    server.shutdown.trigger();
}

//! End-to-end tests for the event channel against a loopback server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use mv_client::ws::{ConnectionState, WsClient, WsConfig};
use mv_client::TokenStore;
use mv_protocol::rest::TokenPair;
use mv_protocol::ws::{MessageType, WsMessage};

fn authed_tokens() -> TokenStore {
    let tokens = TokenStore::in_memory();
    tokens.set(TokenPair {
        access_token: "test-access".to_string(),
        refresh_token: "test-refresh".to_string(),
        token_type: "bearer".to_string(),
        expires_in: 3600,
    });
    tokens
}

async fn next_message(ws: &mut WebSocketStream<TcpStream>) -> Option<WsMessage> {
    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                return Some(serde_json::from_str(&text).expect("client sent malformed JSON"))
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
    None
}

async fn wait_for_state(client: &WsClient, wanted: ConnectionState) {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if client.state() == wanted {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {wanted:?}, got {:?}", client.state()));
}

#[tokio::test(flavor = "multi_thread")]
async fn subscriptions_replay_after_abnormal_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (replayed_tx, mut replayed_rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        // First session: wait for both subscribes, then die without a
        // close handshake.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut seen = 0;
        while seen < 2 {
            match next_message(&mut ws).await {
                Some(msg) if msg.kind == MessageType::Subscribe => seen += 1,
                Some(_) => {}
                None => panic!("first session ended before both subscribes arrived"),
            }
        }
        drop(ws);

        // Second session: report what the client replays.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for _ in 0..2 {
            let msg = next_message(&mut ws).await.expect("expected replayed subscribe");
            assert_eq!(msg.kind, MessageType::Subscribe);
            replayed_tx
                .send(msg.payload_channel().unwrap().to_string())
                .unwrap();
        }
        // Hold the connection open until the client goes away
        while ws.next().await.is_some() {}
    });

    let client = WsClient::new(
        WsConfig::new(format!("ws://127.0.0.1:{port}/ws")),
        authed_tokens(),
    );
    client.subscribe("task:T1");
    client.subscribe("task:T2");
    client.connect();
    wait_for_state(&client, ConnectionState::Connected).await;

    let mut replayed = Vec::new();
    for _ in 0..2 {
        let channel = tokio::time::timeout(Duration::from_secs(10), replayed_rx.recv())
            .await
            .expect("timed out waiting for replay")
            .unwrap();
        replayed.push(channel);
    }
    replayed.sort();
    assert_eq!(replayed, vec!["task:T1", "task:T2"]);
    assert_eq!(client.state(), ConnectionState::Connected);

    client.disconnect();
}

#[tokio::test(flavor = "multi_thread")]
async fn normal_server_close_does_not_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (again_tx, mut again_rx) = mpsc::unbounded_channel::<()>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "done".into(),
        })))
        .await
        .unwrap();
        while ws.next().await.is_some() {}

        // Any further accept means the client reconnected when it shouldn't
        if listener.accept().await.is_ok() {
            let _ = again_tx.send(());
        }
    });

    let client = WsClient::new(
        WsConfig::new(format!("ws://127.0.0.1:{port}/ws")),
        authed_tokens(),
    );
    client.connect();
    wait_for_state(&client, ConnectionState::Disconnected).await;

    // A first reconnect attempt would land within ~2s; give it 4
    let reconnected = tokio::time::timeout(Duration::from_secs(4), again_rx.recv()).await;
    assert!(reconnected.is_err(), "client reconnected after a normal close");
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test(flavor = "multi_thread")]
async fn disconnect_during_handshake_cancels_the_attempt() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    // Accept TCP right away but stall the WebSocket handshake, so the
    // client's connect attempt is still in flight when disconnect() lands.
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(600)).await;
                if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                    while ws.next().await.is_some() {}
                }
            });
        }
    });

    let client = WsClient::new(
        WsConfig::new(format!("ws://127.0.0.1:{port}/ws")),
        authed_tokens(),
    );
    let states = Arc::new(Mutex::new(Vec::new()));
    let states_inner = Arc::clone(&states);
    let _guard = client.on_state_change(move |state| {
        states_inner.lock().unwrap().push(state);
    });

    client.connect();
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.disconnect();

    // Long enough for the stalled handshake to resolve and a session to
    // start if the stale attempt were still honored
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(
        !states.lock().unwrap().contains(&ConnectionState::Connected),
        "a session started after disconnect()"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_connect_calls_open_one_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let accepted = Arc::new(AtomicUsize::new(0));

    let accepted_inner = Arc::clone(&accepted);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            accepted_inner.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                    while ws.next().await.is_some() {}
                }
            });
        }
    });

    let client = WsClient::new(
        WsConfig::new(format!("ws://127.0.0.1:{port}/ws")),
        authed_tokens(),
    );

    let barrier = Arc::new(tokio::sync::Barrier::new(8));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            client.connect();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    wait_for_state(&client, ConnectionState::Connected).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        accepted.load(Ordering::SeqCst),
        1,
        "racing connect() calls must collapse into one connection"
    );

    client.disconnect();
}

#[tokio::test(flavor = "multi_thread")]
async fn retry_passes_through_connecting_before_the_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    // First connection dies before the handshake; the second is served.
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
        let (stream, _) = listener.accept().await.unwrap();
        if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
            while ws.next().await.is_some() {}
        }
    });

    let client = WsClient::new(
        WsConfig::new(format!("ws://127.0.0.1:{port}/ws")),
        authed_tokens(),
    );
    let states = Arc::new(Mutex::new(Vec::new()));
    let states_inner = Arc::clone(&states);
    let _guard = client.on_state_change(move |state| {
        states_inner.lock().unwrap().push(state);
    });

    client.connect();
    wait_for_state(&client, ConnectionState::Connected).await;

    let seen = states.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Reconnecting,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ],
        "each retry must re-enter Connecting before the session starts"
    );

    client.disconnect();
}

#[tokio::test(flavor = "multi_thread")]
async fn inbound_frames_reach_typed_handlers() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut data = serde_json::Map::new();
        data.insert("task_id".to_string(), serde_json::json!("T1"));
        data.insert("progress".to_string(), serde_json::json!(42));
        let frame = WsMessage::new(MessageType::TaskProgress, data);
        ws.send(Message::Text(serde_json::to_string(&frame).unwrap()))
            .await
            .unwrap();
        while ws.next().await.is_some() {}
    });

    let client = WsClient::new(
        WsConfig::new(format!("ws://127.0.0.1:{port}/ws")),
        authed_tokens(),
    );
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<WsMessage>();
    let _guard = client.on(MessageType::TaskProgress, move |msg| {
        let _ = seen_tx.send(msg.clone());
        Ok(())
    });

    client.connect();
    let msg = tokio::time::timeout(Duration::from_secs(10), seen_rx.recv())
        .await
        .expect("timed out waiting for dispatched frame")
        .unwrap();
    assert_eq!(msg.kind, MessageType::TaskProgress);
    assert_eq!(msg.data.get("progress"), Some(&serde_json::json!(42)));

    client.disconnect();
}

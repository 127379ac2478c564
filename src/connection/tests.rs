//! Socket task behaviour against in-memory peers.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use proptest::prelude::*;
use rstest::rstest;
use serde_json::json;
use tracing_test::traced_test;

use super::{
    Connection,
    ConnectionError,
    ConnectionEvent,
    ConnectionEvents,
    ConnectionOptions,
    ConnectionState,
    test_support::{Peer, QueuedTransport, StalledTransport},
};
use crate::{
    frame::{Frame, kind},
    transport::TransportError,
};

const QUIET: ConnectionOptions = ConnectionOptions {
    heartbeat_interval: Duration::from_secs(3600),
};

async fn open_connected(options: ConnectionOptions) -> (Connection, ConnectionEvents, Peer) {
    let (transport, peer) = QueuedTransport::with_peer();
    let (connection, mut events) = Connection::open("ws://rtm.test", transport, options);
    assert!(matches!(events.recv().await, Some(ConnectionEvent::Open)));
    (connection, events, peer)
}

fn reply_to(call: &Frame) -> Frame {
    let mut reply = Frame::new(kind::REPLY);
    if let Some(call_id) = call.call_id() {
        reply = reply.with_call_id(call_id);
    }
    if let Some(n) = call.field("n") {
        reply = reply.with_field("n", n.clone());
    }
    reply
}

#[tokio::test]
async fn open_reports_connected() {
    let (connection, _events, _peer) = open_connected(QUIET).await;

    assert_eq!(connection.state(), ConnectionState::Connected);
    assert_eq!(connection.endpoint(), "ws://rtm.test");
}

#[tokio::test]
async fn call_ids_start_at_zero_and_increase() {
    let (connection, _events, mut peer) = open_connected(QUIET).await;

    let first = connection.send(Frame::new(kind::MESSAGE));
    let second = connection.send(Frame::new(kind::MESSAGE));
    let server = async {
        let a = peer.next_call().await.expect("first call");
        let b = peer.next_call().await.expect("second call");
        peer.push(&reply_to(&b));
        peer.push(&reply_to(&a));
        (a.call_id(), b.call_id())
    };

    let (first, second, ids) = tokio::join!(first, second, server);

    assert_eq!(ids, (Some(0), Some(1)));
    assert_eq!(first.expect("first reply").call_id(), Some(0));
    assert_eq!(second.expect("second reply").call_id(), Some(1));
    assert_eq!(connection.pending_calls(), 0);
}

#[tokio::test]
async fn explicit_call_id_is_kept() {
    let (connection, _events, mut peer) = open_connected(QUIET).await;

    let call = connection.send(Frame::new(kind::MESSAGE).with_call_id(41));
    let server = async {
        let frame = peer.next_call().await.expect("call");
        peer.push(&reply_to(&frame));
        frame.call_id()
    };
    let (reply, seen) = tokio::join!(call, server);

    assert_eq!(seen, Some(41));
    assert_eq!(reply.expect("reply").call_id(), Some(41));
}

async fn exchange_in_order(order: Vec<usize>) -> Vec<(i64, Option<i64>)> {
    let (connection, _events, mut peer) = open_connected(QUIET).await;
    let count = order.len();

    let calls = join_all(
        (0..count).map(|n| connection.send(Frame::new(kind::MESSAGE).with_field("n", n))),
    );
    let server = async {
        let mut received = Vec::with_capacity(count);
        for _ in 0..count {
            received.push(peer.next_call().await.expect("call"));
        }
        for &index in &order {
            peer.push(&reply_to(&received[index]));
        }
    };

    let (replies, ()) = tokio::join!(calls, server);
    replies
        .into_iter()
        .enumerate()
        .map(|(n, reply)| {
            let reply = reply.expect("reply");
            (
                i64::try_from(n).expect("small index"),
                reply.field("n").and_then(serde_json::Value::as_i64),
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn replies_reach_their_callers_in_any_order(
        order in (1usize..8).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed to build tokio runtime");

        rt.block_on(async {
            for (sent, echoed) in exchange_in_order(order).await {
                prop_assert_eq!(Some(sent), echoed);
            }
            Ok(())
        })?;
    }
}

#[traced_test]
#[tokio::test]
async fn duplicate_call_id_keeps_earlier_caller_waiting() {
    let (connection, _events, mut peer) = open_connected(QUIET).await;

    let mut first = Box::pin(connection.send(Frame::new(kind::MESSAGE).with_call_id(5)));
    assert!(futures::poll!(&mut first).is_pending());
    let second = connection.send(Frame::new(kind::MESSAGE).with_call_id(5));
    let server = async {
        peer.next_call().await.expect("first call");
        let call = peer.next_call().await.expect("second call");
        peer.push(&reply_to(&call));
    };

    let (reply, ()) = tokio::join!(second, server);
    assert_eq!(reply.expect("reply").call_id(), Some(5));
    assert!(logs_contain("duplicate call id"));
    assert!(futures::poll!(&mut first).is_pending());

    connection.close();
    assert!(matches!(first.await, Err(ConnectionError::Closed)));
}

#[traced_test]
#[tokio::test]
async fn reply_for_unknown_call_id_is_dropped() {
    let (_connection, mut events, peer) = open_connected(QUIET).await;

    peer.push(&Frame::new(kind::REPLY).with_call_id(42));
    peer.push(&Frame::new(kind::MESSAGE).with_field("text", "after"));

    match events.recv().await {
        Some(ConnectionEvent::Message(frame)) => {
            assert_eq!(frame.field("text"), Some(&json!("after")));
        }
        other => panic!("expected message event, got {other:?}"),
    }
    assert!(logs_contain("reply for unknown call id dropped"));
}

#[rstest]
#[case::pong(kind::PONG)]
#[case::ok(kind::OK)]
#[tokio::test]
async fn control_frames_are_not_forwarded(#[case] noise: &str) {
    let (_connection, mut events, peer) = open_connected(QUIET).await;

    peer.push(&Frame::new(noise));
    peer.push(&Frame::new(kind::CHANNEL_MESSAGE));

    match events.recv().await {
        Some(ConnectionEvent::Message(frame)) => assert_eq!(frame.kind(), kind::CHANNEL_MESSAGE),
        other => panic!("expected channel message event, got {other:?}"),
    }
}

#[rstest]
#[case::string(r#"{"type":"message","call_id":"abc","text":"hi"}"#)]
#[case::negative(r#"{"type":"channel_message","call_id":-1,"text":"hi"}"#)]
#[tokio::test]
async fn pushes_with_foreign_call_ids_are_forwarded(#[case] text: &str) {
    let (_connection, mut events, peer) = open_connected(QUIET).await;

    peer.push_text(text);

    match events.recv().await {
        Some(ConnectionEvent::Message(frame)) => {
            assert_eq!(frame.call_id(), None);
            assert_eq!(frame.field("text"), Some(&json!("hi")));
            assert!(frame.field("call_id").is_some());
        }
        other => panic!("expected message event, got {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_frame_is_reported_and_connection_stays_open() {
    let (connection, mut events, peer) = open_connected(QUIET).await;

    peer.push_text("not json");

    match events.recv().await {
        Some(ConnectionEvent::Error(ConnectionError::Decode { text, .. })) => {
            assert_eq!(text, "not json");
        }
        other => panic!("expected decode error, got {other:?}"),
    }
    assert_eq!(connection.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn heartbeats_bypass_the_pending_registry() {
    let options = ConnectionOptions {
        heartbeat_interval: Duration::from_secs(1),
    };
    let (connection, _events, mut peer) = open_connected(options).await;

    for _ in 0..3 {
        let frame = peer.next_frame().await.expect("heartbeat");
        assert_eq!(frame.kind(), kind::PING);
        assert_eq!(frame.call_id(), None);
    }
    assert_eq!(connection.pending_calls(), 0);
}

#[tokio::test]
async fn close_walks_through_closing_to_closed() {
    let (connection, mut events, mut peer) = open_connected(QUIET).await;

    connection.close();
    assert_eq!(connection.state(), ConnectionState::Closing);

    assert!(matches!(events.recv().await, Some(ConnectionEvent::Close)));
    assert_eq!(connection.state(), ConnectionState::Closed);
    assert!(peer.next_call().await.is_none());
    assert!(events.recv().await.is_none(), "close is the last event");
}

#[traced_test]
#[tokio::test]
async fn second_close_is_ignored() {
    let (connection, mut events, _peer) = open_connected(QUIET).await;

    connection.close();
    connection.close();

    assert!(matches!(events.recv().await, Some(ConnectionEvent::Close)));
    assert!(events.recv().await.is_none());
    assert!(logs_contain("close() ignored"));
}

#[tokio::test]
async fn send_requires_open_connection() {
    let (connection, mut events, _peer) = open_connected(QUIET).await;
    connection.close();
    assert!(matches!(events.recv().await, Some(ConnectionEvent::Close)));

    let err = connection
        .send(Frame::new(kind::MESSAGE))
        .await
        .expect_err("send on closed connection");

    assert!(matches!(err, ConnectionError::NotOpen(ConnectionState::Closed)));
}

#[tokio::test]
async fn send_before_open_fails() {
    let (connection, _events) = Connection::open("ws://rtm.test", Arc::new(StalledTransport), QUIET);

    let err = connection
        .send(Frame::new(kind::MESSAGE))
        .await
        .expect_err("send while initial");

    assert!(matches!(err, ConnectionError::NotOpen(ConnectionState::Initial)));
}

#[tokio::test]
async fn failed_handshake_reports_error_then_close() {
    let transport = Arc::new(QueuedTransport::default());
    let (connection, mut events) = Connection::open("ws://rtm.test", transport, QUIET);

    assert!(matches!(
        events.recv().await,
        Some(ConnectionEvent::Error(ConnectionError::Transport(TransportError::Closed)))
    ));
    assert!(matches!(events.recv().await, Some(ConnectionEvent::Close)));
    assert_eq!(connection.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn close_before_open_skips_open_event() {
    let (connection, mut events) = Connection::open("ws://rtm.test", Arc::new(StalledTransport), QUIET);

    connection.close();

    assert!(matches!(events.recv().await, Some(ConnectionEvent::Close)));
    assert!(events.recv().await.is_none());
    assert_eq!(connection.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn peer_hang_up_fails_pending_calls() {
    let (connection, mut events, mut peer) = open_connected(QUIET).await;

    let call = connection.send(Frame::new(kind::MESSAGE));
    let server = async {
        peer.next_call().await.expect("call");
        peer.hang_up();
    };
    let (result, ()) = tokio::join!(call, server);

    assert!(matches!(result, Err(ConnectionError::Closed)));
    assert!(matches!(events.recv().await, Some(ConnectionEvent::Close)));
    assert_eq!(connection.pending_calls(), 0);
}

#[tokio::test]
async fn socket_error_is_reported_before_close() {
    let (connection, mut events, peer) = open_connected(QUIET).await;

    peer.fail(TransportError::Io(std::io::Error::other("reset")));

    assert!(matches!(
        events.recv().await,
        Some(ConnectionEvent::Error(ConnectionError::Transport(TransportError::Io(_))))
    ));
    assert!(matches!(events.recv().await, Some(ConnectionEvent::Close)));
    assert_eq!(connection.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn abandoned_call_reply_is_discarded_silently() {
    let (connection, mut events, mut peer) = open_connected(QUIET).await;

    let timed_out = tokio::time::timeout(
        Duration::from_millis(10),
        connection.send(Frame::new(kind::MESSAGE)),
    )
    .await;
    assert!(timed_out.is_err());
    assert!(connection.is_pending(0), "entry stays until the reply or close");

    let call = peer.next_call().await.expect("call");
    peer.push(&reply_to(&call));
    peer.push(&Frame::new(kind::MESSAGE));

    assert!(matches!(events.recv().await, Some(ConnectionEvent::Message(_))));
    assert!(!connection.is_pending(0));
}

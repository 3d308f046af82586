//! Message flow tests against a scripted room.

use crate::common_helpers::{eventually, spawn_mock_session, wait_for_state, wait_until};
use bytes::Bytes;
use chat_session::{ConnectionState, MessageRole, SessionHandle};
use chat_test_utils::{MockRoom, MockRoomConnector};
use common::room::{DataPacketKind, RoomEvent};
use std::sync::Arc;

async fn connected_session() -> (SessionHandle, Arc<MockRoom>) {
    let connector = MockRoomConnector::builder()
        .with_local_identity("bob")
        .with_remote_identities(["ai-agent"])
        .auto_connected()
        .build();
    let session = spawn_mock_session(&connector);
    session.join("bob").await.unwrap();
    wait_for_state(&session, ConnectionState::Connected).await;
    (session, connector.last_room().unwrap())
}

#[tokio::test]
async fn test_agent_message_is_attributed_to_agent() {
    let (session, room) = connected_session().await;

    room.emit_data(Some("ai-agent"), "hello").await;

    let snapshot = wait_until(&session, |s| s.messages.len() == 2).await;
    let message = snapshot.messages.last().unwrap();
    assert_eq!(message.role, MessageRole::Agent);
    assert_eq!(message.body, "hello");
    assert_eq!(message.sender, "ai-agent");
}

#[tokio::test]
async fn test_roles_for_other_senders() {
    let (session, room) = connected_session().await;

    room.emit_data(Some("carol"), "hey all").await;
    room.emit_data(None, "room notice").await;

    let snapshot = wait_until(&session, |s| s.messages.len() == 3).await;
    assert_eq!(snapshot.messages[1].role, MessageRole::Other);
    assert_eq!(snapshot.messages[1].sender, "carol");
    assert_eq!(snapshot.messages[2].role, MessageRole::Other);
    assert_eq!(snapshot.messages[2].sender, "unknown");
}

#[tokio::test]
async fn test_events_are_applied_in_delivery_order() {
    let (session, room) = connected_session().await;

    for i in 0..20 {
        room.emit_data(Some("ai-agent"), &format!("reply {i}")).await;
    }

    let snapshot = wait_until(&session, |s| s.messages.len() == 21).await;
    let bodies: Vec<&str> = snapshot.messages[1..].iter().map(|m| m.body.as_str()).collect();
    let expected: Vec<String> = (0..20).map(|i| format!("reply {i}")).collect();
    assert_eq!(bodies, expected);
}

#[tokio::test]
async fn test_undecodable_payload_is_dropped() {
    let (session, room) = connected_session().await;

    room.emit(RoomEvent::DataReceived {
        payload: Bytes::from_static(&[0xc3, 0x28]),
        sender_identity: Some("ai-agent".to_string()),
    })
    .await;
    room.emit_data(Some("ai-agent"), "after").await;

    let snapshot = wait_until(&session, |s| s.messages.len() >= 2).await;
    assert_eq!(
        snapshot.transcript(),
        vec![
            (MessageRole::System, "Connected to chat room!"),
            (MessageRole::Agent, "after"),
        ]
    );
    assert_eq!(snapshot.error, None);
}

#[tokio::test]
async fn test_send_appends_and_publishes_reliably() {
    let (session, room) = connected_session().await;

    session.send("  hi  ").await.unwrap();

    let snapshot = session.snapshot();
    let message = snapshot.messages.last().unwrap();
    assert_eq!(message.role, MessageRole::User);
    assert_eq!(message.body, "hi");
    assert_eq!(message.sender, "bob");

    eventually(|| room.published_text() == vec!["hi"]).await;
    assert_eq!(room.published_kinds(), vec![DataPacketKind::Reliable]);
}

#[tokio::test]
async fn test_blank_send_is_ignored() {
    let (session, room) = connected_session().await;

    session.send("   ").await.unwrap();
    session.send("real").await.unwrap();

    eventually(|| room.published_text() == vec!["real"]).await;
    assert_eq!(session.snapshot().messages.len(), 2);
}

#[tokio::test]
async fn test_failed_send_removes_exactly_that_message() {
    let (session, room) = connected_session().await;

    session.send("delivered").await.unwrap();
    eventually(|| room.published_text() == vec!["delivered"]).await;

    room.fail_publishes("data channel closed");
    session.send("lost").await.unwrap();

    let snapshot = wait_until(&session, |s| s.error.is_some()).await;
    assert_eq!(
        snapshot.error.as_deref(),
        Some("Failed to send message: publish failed: data channel closed")
    );
    assert_eq!(
        snapshot.transcript(),
        vec![
            (MessageRole::System, "Connected to chat room!"),
            (MessageRole::User, "delivered"),
        ]
    );
    assert_eq!(snapshot.connection_state, ConnectionState::Connected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_sends_are_published_in_send_order() {
    let (session, room) = connected_session().await;

    let expected: Vec<String> = (0..500).map(|i| format!("message {i}")).collect();
    for text in &expected {
        session.send(text.as_str()).await.unwrap();
    }

    eventually(|| room.published_text().len() == expected.len()).await;
    assert_eq!(room.published_text(), expected);

    let snapshot = session.snapshot();
    let bodies: Vec<&str> = snapshot.messages[1..].iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, expected);
}

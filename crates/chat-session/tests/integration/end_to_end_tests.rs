//! End-to-end tests: real Token Issuer over HTTP, in-memory room service,
//! and a scripted agent participant.

use crate::common_helpers::{spawn_session, wait_for_state, wait_until};
use bytes::Bytes;
use chat_session::{ConnectionState, HttpTokenSource, MessageRole, SessionConfig};
use chat_test_utils::{
    config_from, test_credentials, InMemoryRoomService, TestTokenServer, TEST_API_KEY, TEST_WS_URL,
};
use chrono::Utc;
use common::room::{ConnectOptions, DataPacketKind, RoomConnector, RoomEvent, AGENT_IDENTITY};
use common::room_token::{sign_room_token, ROOM_NAME};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

fn room_service() -> InMemoryRoomService {
    InMemoryRoomService::new(test_credentials().api_secret, TEST_WS_URL)
}

fn token_source(server: &TestTokenServer) -> Arc<HttpTokenSource> {
    Arc::new(
        HttpTokenSource::new(&SessionConfig {
            token_endpoint: server.token_url(),
            request_timeout: Duration::from_secs(5),
            ..SessionConfig::default()
        })
        .unwrap(),
    )
}

/// Join `room` as the agent and answer every "hi" with "hi back".
async fn spawn_echo_agent(room: &InMemoryRoomService) -> JoinHandle<()> {
    let token = sign_room_token(
        &test_credentials(),
        AGENT_IDENTITY,
        ROOM_NAME,
        Utc::now().timestamp(),
    )
    .unwrap();
    let mut connection = room
        .connect(TEST_WS_URL, &token, ConnectOptions::default())
        .await
        .unwrap();

    tokio::spawn(async move {
        while let Some(event) = connection.events.recv().await {
            match event {
                RoomEvent::DataReceived { payload, .. } if payload.as_ref() == b"hi" => {
                    connection
                        .room
                        .publish_data(Bytes::from_static(b"hi back"), DataPacketKind::Reliable)
                        .await
                        .unwrap();
                }
                RoomEvent::Disconnected => break,
                _ => {}
            }
        }
    })
}

#[tokio::test]
async fn test_join_send_and_receive_agent_reply() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn_configured().await?;
    let room = room_service();
    let _agent = spawn_echo_agent(&room).await;

    let session = spawn_session(token_source(&server), Arc::new(room.clone()));

    session.join("bob").await?;
    let snapshot = wait_for_state(&session, ConnectionState::Connected).await;
    assert_eq!(snapshot.participants, vec!["bob", "ai-agent"]);

    session.send("hi").await?;
    let snapshot = wait_until(&session, |s| s.messages.len() == 3).await;

    assert_eq!(
        snapshot.transcript(),
        vec![
            (MessageRole::System, "Connected to chat room!"),
            (MessageRole::User, "hi"),
            (MessageRole::Agent, "hi back"),
        ]
    );
    assert_eq!(snapshot.error, None);
    Ok(())
}

#[tokio::test]
async fn test_two_users_see_each_other() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn_configured().await?;
    let room = room_service();

    let bob = spawn_session(token_source(&server), Arc::new(room.clone()));
    bob.join("bob").await?;
    wait_for_state(&bob, ConnectionState::Connected).await;

    let carol = spawn_session(token_source(&server), Arc::new(room.clone()));
    carol.join("carol").await?;
    wait_for_state(&carol, ConnectionState::Connected).await;

    wait_until(&bob, |s| s.participants.contains(&"carol".to_string())).await;

    carol.send("hello bob").await?;
    let snapshot = wait_until(&bob, |s| s.messages.len() == 2).await;
    let message = snapshot.messages.last().unwrap();
    assert_eq!(message.role, MessageRole::Other);
    assert_eq!(message.sender, "carol");
    assert_eq!(message.body, "hello bob");

    carol.disconnect().await?;
    let snapshot = wait_until(&bob, |s| s.participants.len() == 1).await;
    assert_eq!(snapshot.participants, vec!["bob"]);
    Ok(())
}

#[tokio::test]
async fn test_room_closing_resets_session() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn_configured().await?;
    let room = room_service();
    let session = spawn_session(token_source(&server), Arc::new(room.clone()));

    session.join("bob").await?;
    wait_for_state(&session, ConnectionState::Connected).await;

    room.close_room();

    let snapshot = wait_for_state(&session, ConnectionState::Idle).await;
    assert!(snapshot.messages.is_empty());
    assert!(snapshot.participants.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_misconfigured_issuer_surfaces_connect_error() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn(config_from(&[("LIVEKIT_API_KEY", TEST_API_KEY)])).await?;
    let room = room_service();
    let session = spawn_session(token_source(&server), Arc::new(room.clone()));

    session.join("bob").await?;
    let snapshot = wait_until(&session, |s| s.error.is_some()).await;

    assert_eq!(snapshot.connection_state, ConnectionState::Idle);
    assert_eq!(
        snapshot.error.as_deref(),
        Some("Failed to connect: token request returned 500: Missing LiveKit configuration")
    );
    assert!(room.participant_identities().is_empty());
    Ok(())
}

//! Shared helpers for session integration tests.

#![allow(dead_code)]

use chat_session::{
    ConnectionState, SessionActor, SessionConfig, SessionHandle, SessionSnapshot, TokenSource,
};
use chat_test_utils::{MockRoomConnector, StaticTokenSource};
use common::room::RoomConnector;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const WAIT: Duration = Duration::from_secs(5);

/// Spawn a session with `tokens` and `connector`.
pub fn spawn_session(
    tokens: Arc<dyn TokenSource>,
    connector: Arc<dyn RoomConnector>,
) -> SessionHandle {
    let (handle, _task) = SessionActor::spawn(
        &SessionConfig::default(),
        tokens,
        connector,
        CancellationToken::new(),
    );
    handle
}

/// Spawn a session against a mock connector with a fixed token.
pub fn spawn_mock_session(connector: &MockRoomConnector) -> SessionHandle {
    spawn_session(
        Arc::new(StaticTokenSource::fixed("header.payload.signature", "wss://mock.test")),
        Arc::new(connector.clone()),
    )
}

/// Wait until a snapshot satisfies `predicate` and return it.
pub async fn wait_until(
    handle: &SessionHandle,
    mut predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut rx = handle.subscribe();
    let snapshot = tokio::time::timeout(WAIT, rx.wait_for(|s| predicate(s)))
        .await
        .expect("timed out waiting for session state")
        .expect("session actor stopped")
        .clone();
    snapshot
}

pub async fn wait_for_state(handle: &SessionHandle, state: ConnectionState) -> SessionSnapshot {
    wait_until(handle, |s| s.connection_state == state).await
}

/// Wait until `connector` has handed out `count` connections.
pub async fn wait_for_connects(connector: &MockRoomConnector, count: usize) {
    tokio::time::timeout(WAIT, async {
        while connector.connect_count() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for connect call");
}

/// Poll `condition` until it holds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never became true");
}

//! The agent and a user session talking through the in-memory room service,
//! with the user's token minted by a real Token Issuer.

use chat_agent::bot::welcome_message;
use chat_agent::generator::mock::MockGenerator;
use chat_agent::{AgentConfig, ChatAgent, ChatBot};
use chat_session::{
    ConnectionState, HttpTokenSource, MessageRole, SessionActor, SessionConfig, SessionHandle,
    SessionSnapshot,
};
use chat_test_utils::{
    test_credentials, InMemoryRoomService, TestTokenServer, TEST_API_KEY, TEST_API_SECRET,
    TEST_WS_URL,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

fn agent_config() -> AgentConfig {
    let vars: HashMap<String, String> = [
        ("GEMINI_API_KEY", "unused-in-tests"),
        ("LIVEKIT_API_KEY", TEST_API_KEY),
        ("LIVEKIT_API_SECRET", TEST_API_SECRET),
        ("LIVEKIT_URL", TEST_WS_URL),
        ("AGENT_WELCOME_DELAY_MS", "0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    AgentConfig::from_vars(&vars).unwrap()
}

struct Harness {
    _server: TestTokenServer,
    room: InMemoryRoomService,
    generator: Arc<MockGenerator>,
    bot_cancel: CancellationToken,
    bot_task: JoinHandle<()>,
    session: SessionHandle,
}

async fn start(generator: MockGenerator) -> Result<Harness, anyhow::Error> {
    let server = TestTokenServer::spawn_configured().await?;
    let room = InMemoryRoomService::new(test_credentials().api_secret, TEST_WS_URL);

    let generator = Arc::new(generator);
    let agent = Arc::new(ChatAgent::new(generator.clone()));
    let bot = ChatBot::connect(&agent_config(), &room, agent).await?;
    let bot_cancel = CancellationToken::new();
    let bot_task = tokio::spawn(bot.run(bot_cancel.clone()));

    let tokens = Arc::new(HttpTokenSource::new(&SessionConfig {
        token_endpoint: server.token_url(),
        ..SessionConfig::default()
    })?);
    let (session, _task) = SessionActor::spawn(
        &SessionConfig::default(),
        tokens,
        Arc::new(room.clone()),
        CancellationToken::new(),
    );

    Ok(Harness {
        _server: server,
        room,
        generator,
        bot_cancel,
        bot_task,
        session,
    })
}

async fn wait_until(
    session: &SessionHandle,
    mut predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut rx = session.subscribe();
    let snapshot = tokio::time::timeout(WAIT, rx.wait_for(|s| predicate(s)))
        .await
        .expect("timed out waiting for session state")
        .expect("session actor stopped")
        .clone();
    snapshot
}

#[tokio::test]
async fn test_user_is_welcomed_and_answered() -> Result<(), anyhow::Error> {
    let harness = start(MockGenerator::echoing()).await?;

    harness.session.join("bob").await?;
    let snapshot = wait_until(&harness.session, |s| s.messages.len() == 2).await;
    assert_eq!(snapshot.connection_state, ConnectionState::Connected);
    assert_eq!(snapshot.participants, vec!["bob", "ai-agent"]);
    assert_eq!(
        snapshot.transcript(),
        vec![
            (MessageRole::System, "Connected to chat room!"),
            (MessageRole::Agent, welcome_message("bob").as_str()),
        ]
    );

    harness.session.send("hi").await?;
    let snapshot = wait_until(&harness.session, |s| s.messages.len() == 4).await;
    assert_eq!(snapshot.transcript()[2], (MessageRole::User, "hi"));
    assert_eq!(snapshot.transcript()[3], (MessageRole::Agent, "🤖 hi back"));
    assert_eq!(snapshot.messages[3].sender, "ai-agent");

    harness.bot_cancel.cancel();
    harness.bot_task.await?;
    Ok(())
}

#[tokio::test]
async fn test_agent_remembers_earlier_exchanges() -> Result<(), anyhow::Error> {
    let harness = start(MockGenerator::echoing()).await?;

    harness.session.join("bob").await?;
    wait_until(&harness.session, |s| s.messages.len() == 2).await;

    harness.session.send("my name is bob").await?;
    wait_until(&harness.session, |s| s.messages.len() == 4).await;
    harness.session.send("what is my name?").await?;
    wait_until(&harness.session, |s| s.messages.len() == 6).await;

    let prompts = harness.generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("conversation history"));
    assert!(prompts[1]
        .contains("- User said: 'my name is bob', You responded: 'my name is bob back'"));
    assert!(prompts[1].contains("Current message from bob: what is my name?"));

    harness.bot_cancel.cancel();
    harness.bot_task.await?;
    Ok(())
}

#[tokio::test]
async fn test_generation_failure_reaches_user_as_apology() -> Result<(), anyhow::Error> {
    let harness = start(MockGenerator::failing("model overloaded")).await?;

    harness.session.join("bob").await?;
    wait_until(&harness.session, |s| s.messages.len() == 2).await;

    harness.session.send("hi").await?;
    let snapshot = wait_until(&harness.session, |s| s.messages.len() == 4).await;
    assert_eq!(
        snapshot.transcript()[3],
        (
            MessageRole::Agent,
            "🤖 Sorry, I encountered an error: model overloaded"
        )
    );

    harness.bot_cancel.cancel();
    harness.bot_task.await?;
    Ok(())
}

#[tokio::test]
async fn test_stopping_the_agent_removes_it_from_presence() -> Result<(), anyhow::Error> {
    let harness = start(MockGenerator::echoing()).await?;

    harness.session.join("bob").await?;
    wait_until(&harness.session, |s| s.participants.len() == 2).await;

    harness.bot_cancel.cancel();
    tokio::time::timeout(WAIT, harness.bot_task).await??;

    let snapshot = wait_until(&harness.session, |s| s.participants.len() == 1).await;
    assert_eq!(snapshot.participants, vec!["bob"]);
    assert_eq!(harness.room.participant_identities(), vec!["bob"]);
    Ok(())
}

#[tokio::test]
async fn test_closed_room_stops_the_agent() -> Result<(), anyhow::Error> {
    let harness = start(MockGenerator::echoing()).await?;

    harness.room.close_room();
    tokio::time::timeout(WAIT, harness.bot_task).await??;
    assert!(!harness.bot_cancel.is_cancelled());
    Ok(())
}

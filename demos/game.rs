//! In-process word guessing game
//!
//! Run with: cargo run --example game [SECONDS]
//!
//! Starts a round service and a chat service over two rooms, rotates rounds
//! every few seconds and lets two scripted players guess until SECONDS have
//! passed (default 12) or Ctrl+C is pressed.
//!
//! Set `RUST_LOG=wordcast=debug` for registry and round traffic.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wordcast::{
    ChatEvent, ChatService, ConnectionId, ContentProvider, GameConfig, InMemoryContentProvider,
    RoomKey, RoundService, StaticRoomDirectory,
};

const ROOMS: &str = r#"[
    {"name": "Animals", "key": "animals"},
    {"name": "Kitchen", "key": "kitchen"}
]"#;

const CATALOG: &str = r#"[
    {
        "item_id": "p1",
        "content_url": "https://images.example/p1.jpg",
        "keywords": [
            {"keyword": "cat", "primary_confidence": 97.5},
            {"keyword": "box", "primary_confidence": 81.0},
            {"keyword": "cardboard", "secondary_confidence": 64.0},
            {"keyword": "cute", "primary_confidence": 99.0, "suggested_by_user": true}
        ]
    },
    {
        "item_id": "p2",
        "content_url": "https://images.example/p2.jpg",
        "keywords": [
            {"keyword": "dog", "primary_confidence": 95.0},
            {"keyword": "ball", "primary_confidence": 72.0},
            {"keyword": "tennis ball", "primary_confidence": 70.0}
        ]
    },
    {
        "item_id": "p3",
        "content_url": "https://images.example/p3.jpg",
        "keywords": [
            {"keyword": "cup", "primary_confidence": 88.0},
            {"keyword": "coffee", "primary_confidence": 86.5},
            {"keyword": "box", "primary_confidence": 12.0}
        ]
    }
]"#;

const GUESSES: &[&str] = &["hello", "cat", "dog", "cat", "cup", "anyone?", "ball", "coffee", "box"];

/// Print everything a player receives
fn spawn_viewer(
    name: &'static str,
    mut events: mpsc::Receiver<ChatEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ChatEvent::Round(round) => {
                    println!(
                        "[{name}] new round: {} ({} keywords)",
                        round.content_url,
                        round.keywords.len()
                    );
                }
                ChatEvent::Message(message) => {
                    println!("[{name}] {}: {}", message.sender_name, message.text);
                }
            }
        }
    })
}

/// Submit scripted guesses at a steady pace
async fn play(chat: Arc<ChatService>, room: RoomKey, id: ConnectionId, offset: usize) {
    let mut ticker = tokio::time::interval(Duration::from_millis(700));
    for guess in GUESSES.iter().cycle().skip(offset) {
        ticker.tick().await;
        match chat.submit_guess(&room, &id, guess).await {
            Ok(reply) if reply.matched => tracing::debug!(connection = %id, guess, "Matched"),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(connection = %id, error = %e, "Guess rejected");
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let seconds = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<u64>()?,
        None => 12,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wordcast=info".parse()?)
                .add_directive("game=debug".parse()?),
        )
        .init();

    let config = GameConfig::default().round_interval(Duration::from_secs(4));
    let directory = StaticRoomDirectory::from_json(ROOMS)?;
    let provider: Arc<dyn ContentProvider> = Arc::new(InMemoryContentProvider::from_json(CATALOG)?);

    let rounds = Arc::new(RoundService::bootstrap(&directory, provider, config.clone()).await?);
    let chat = Arc::new(ChatService::bootstrap(&directory, rounds.as_ref(), config).await?);
    let schedule = rounds.spawn_schedule();

    let room = RoomKey::new("animals");
    let cancel = CancellationToken::new();
    let alice = ConnectionId::generate();
    let bob = ConnectionId::generate();

    let alice_events = chat.subscribe(&room, alice.clone(), "alice", cancel.child_token()).await?;
    let bob_events = chat.subscribe(&room, bob.clone(), "bob", cancel.child_token()).await?;

    let viewers = [spawn_viewer("alice", alice_events), spawn_viewer("bob", bob_events)];
    let players = [
        tokio::spawn(play(Arc::clone(&chat), room.clone(), alice, 0)),
        tokio::spawn(play(Arc::clone(&chat), room.clone(), bob, 4)),
    ];

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => println!("\nShutting down..."),
    }

    cancel.cancel();
    for player in players {
        player.abort();
    }
    schedule.shutdown().await;
    for viewer in viewers {
        let _ = viewer.await;
    }

    Ok(())
}

//! Round lifecycle
//!
//! Per room, the round engine cycles `Idle -> Active -> Active -> ...`: a
//! room is idle until its first successful tick and then always has a round
//! in play, replaced wholesale on every tick.
//!
//! ```text
//!   interval task (per room)      RoundManager::tick()
//!          │                              │
//!          └──────────────► ContentProvider::random_item()
//!                           ContentProvider::keywords_for()
//!                                         │
//!                           publish_round(): under the room guard
//!                             install_round() + snapshot
//!                                         │
//!                           fan-out to viewers and downstream services
//! ```

pub mod manager;
pub mod provider;
pub mod state;

pub use manager::{publish_round, RoundManager, ScheduleHandle, TickReport};
pub use provider::{
    CatalogEntry, ContentItem, ContentProvider, InMemoryContentProvider, KeywordCandidate,
    KeywordSelection,
};
pub use state::{Round, RoundBoard, RoundHolder, RoundPayload, RoundPhase};

//! Model module - Mirrored server state and the observable data behind the UI
//!
//! - `pubsub`: Synchronous change notification used by every observable below
//! - `types`: Core type definitions (tracks, queue snapshots, server status)
//! - `list`: Selectable, filterable list
//! - `browser`: Lazily loaded library tree and its navigation
//! - `service`: Service collaborator traits and outgoing commands
//! - `mpd_client`: MPD protocol implementation of the service
//! - `sync`: Sync engine and the mirrored status
//! - `playback`: Elapsed time extrapolation
//! - `message`: Timed user messages
//! - `prompt`: Filter box text

mod pubsub;
pub(crate) mod types;
mod list;
mod browser;
pub(crate) mod service;
mod mpd_client;
mod sync;
mod playback;
mod message;
mod prompt;

pub use pubsub::{PubSub, Subscriber};

pub use types::{OptionValue, PlaybackOption, PlayerState, QueuedTrack, Subsystem};

pub use list::{ListEvent, ReactiveList};

pub use browser::{BrowseAction, Browser, BrowserEvent, Target};

pub use service::{MusicService, ServiceCommand};

pub use mpd_client::MpdClient;

pub use sync::{Status, StatusEvent, SyncEngine};

pub use message::{Message, MessageCenter, MessageEvent, Severity};

pub use prompt::Prompt;

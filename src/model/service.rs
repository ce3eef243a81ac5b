//! Service collaborator seam
//!
//! [`MusicService`] is everything the sync engine needs from the remote
//! playback server. The MPD implementation lives in `mpd_client`; tests use
//! `test_utils::FakeService`.

use crate::error::ServiceError;

use super::types::{DirEntry, OptionValue, QueueChange, ServerStatus, Subsystem, Track};

/// An outgoing command, carrying the subsystems it is expected to change
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceCommand {
    /// Start playback, at a queue position when given
    Play(Option<usize>),
    PlayId(u32),
    Pause(bool),
    Toggle,
    Stop,
    Next,
    Previous,
    SetOption(OptionValue),
    Clear,
    /// Remove the given queue positions
    Delete(Vec<usize>),
    /// Append a file or directory (by URI) to the queue
    Add(String),
    /// Append a single file and start playing it
    AddAndPlay(String),
    LoadPlaylist(String),
    /// Rescan the library, optionally below a path
    Update(Option<String>),
    Password(String),
}

impl ServiceCommand {
    pub fn affects(&self) -> &'static [Subsystem] {
        match self {
            Self::Play(_)
            | Self::PlayId(_)
            | Self::Pause(_)
            | Self::Toggle
            | Self::Stop
            | Self::Next
            | Self::Previous => &[Subsystem::Player],
            Self::SetOption(_) => &[Subsystem::Options],
            Self::Add(_) | Self::LoadPlaylist(_) => &[Subsystem::Playlist],
            Self::Clear | Self::Delete(_) | Self::AddAndPlay(_) => {
                &[Subsystem::Playlist, Subsystem::Player]
            }
            Self::Update(_) => &[Subsystem::Update],
            Self::Password(_) => &[],
        }
    }

    /// Short name used in log records
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play(_) => "play",
            Self::PlayId(_) => "playid",
            Self::Pause(_) => "pause",
            Self::Toggle => "toggle",
            Self::Stop => "stop",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::SetOption(_) => "option",
            Self::Clear => "clear",
            Self::Delete(_) => "delete",
            Self::Add(_) => "add",
            Self::AddAndPlay(_) => "addplay",
            Self::LoadPlaylist(_) => "load",
            Self::Update(_) => "update",
            Self::Password(_) => "password",
        }
    }
}

/// Remote playback service.
///
/// The connection has two phases: waiting (an `idle` request is outstanding and
/// only `end_wait` may be sent) and command mode (everything else). Callers are
/// responsible for ending the wait before issuing anything else.
#[allow(async_fn_in_trait)]
pub trait MusicService {
    fn is_connected(&self) -> bool;

    async fn connect(&mut self) -> Result<(), ServiceError>;

    fn disconnect(&mut self);

    /// Ask to be told about the next change
    async fn begin_wait(&mut self) -> Result<(), ServiceError>;

    /// Cancel or collect the outstanding wait, returning the changed subsystems
    async fn end_wait(&mut self) -> Result<Vec<Subsystem>, ServiceError>;

    /// Resolves once the outstanding wait has something to report
    async fn wait_readable(&self);

    async fn status(&mut self) -> Result<ServerStatus, ServiceError>;

    async fn queue_listing(&mut self) -> Result<Vec<Track>, ServiceError>;

    /// Position/identity pairs of everything that changed since `version`
    async fn queue_diff(&mut self, version: u32) -> Result<Vec<QueueChange>, ServiceError>;

    async fn track_by_id(&mut self, id: u32) -> Result<Track, ServiceError>;

    async fn list_directory(&mut self, path: &str) -> Result<Vec<DirEntry>, ServiceError>;

    async fn execute(&mut self, command: &ServiceCommand) -> Result<(), ServiceError>;
}

/// Lists one level of the library. Implemented by the sync engine, which
/// takes care of ending the wait first.
#[allow(async_fn_in_trait)]
pub trait DirectoryLister {
    async fn list_directory(&mut self, path: &str) -> Result<Vec<DirEntry>, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::PlaybackOption;

    #[test]
    fn commands_record_affected_subsystems() {
        assert_eq!(ServiceCommand::Next.affects(), &[Subsystem::Player]);
        assert_eq!(
            ServiceCommand::SetOption(OptionValue::Flag(PlaybackOption::Random, true)).affects(),
            &[Subsystem::Options]
        );
        assert_eq!(
            ServiceCommand::AddAndPlay("a.flac".into()).affects(),
            &[Subsystem::Playlist, Subsystem::Player]
        );
        assert!(ServiceCommand::Password("x".into()).affects().is_empty());
    }
}

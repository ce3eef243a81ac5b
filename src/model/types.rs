//! Core type definitions shared by the service client, the sync engine and the UI

use std::rc::Rc;

/// A song as reported by the server. Shared as `Rc<Track>`; pointer identity
/// is what the UI uses to recognise "the same queued item".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Track {
    pub file: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    /// Length in seconds
    pub duration: u32,
    /// Server-assigned queue identity, `None` outside the queue
    pub id: Option<u32>,
}

impl Track {
    /// Title falling back to the file name, the way most clients show untagged files
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            self.file.rsplit('/').next().unwrap_or(&self.file)
        } else {
            &self.title
        }
    }

    pub fn search_fields(&self) -> [&str; 5] {
        [
            self.display_title(),
            &self.artist,
            &self.album,
            &self.genre,
            &self.file,
        ]
    }
}

/// A track at a queue position
#[derive(Clone, Debug)]
pub struct QueuedTrack {
    pub pos: usize,
    pub track: Rc<Track>,
}

impl QueuedTrack {
    pub fn new(pos: usize, track: Rc<Track>) -> Self {
        Self { pos, track }
    }

    pub fn same_track(&self, other: &QueuedTrack) -> bool {
        Rc::ptr_eq(&self.track, &other.track)
    }
}

/// Version-stamped copy of the server queue
#[derive(Clone, Debug, Default)]
pub struct QueueSnapshot {
    pub tracks: Vec<QueuedTrack>,
    pub version: u32,
}

impl QueueSnapshot {
    pub fn new(tracks: Vec<QueuedTrack>, version: u32) -> Self {
        Self { tracks, version }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&QueuedTrack> {
        self.tracks.get(pos)
    }

    /// Sum of all track lengths in seconds
    pub fn total_duration(&self) -> u64 {
        self.tracks.iter().map(|t| t.track.duration as u64).sum()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayerState {
    Play,
    Pause,
    #[default]
    Stop,
}

impl PlayerState {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "play" => Some(Self::Play),
            "pause" => Some(Self::Pause),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Play => ">",
            Self::Pause => "||",
            Self::Stop => "[]",
        }
    }
}

/// Boolean playback options
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaybackOption {
    Random,
    Repeat,
    Single,
    Consume,
}

impl PlaybackOption {
    pub fn name(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Repeat => "repeat",
            Self::Single => "single",
            Self::Consume => "consume",
        }
    }
}

/// One option together with its new value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionValue {
    Flag(PlaybackOption, bool),
    Crossfade(u32),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub random: bool,
    pub repeat: bool,
    pub single: bool,
    pub consume: bool,
    /// Crossfade in seconds
    pub crossfade: u32,
}

impl Options {
    pub fn flag(&self, option: PlaybackOption) -> bool {
        match option {
            PlaybackOption::Random => self.random,
            PlaybackOption::Repeat => self.repeat,
            PlaybackOption::Single => self.single,
            PlaybackOption::Consume => self.consume,
        }
    }

    /// Every option whose value in `other` differs from `self`, carrying the new value
    pub fn diff(&self, other: &Options) -> Vec<OptionValue> {
        let mut changed: Vec<OptionValue> = [
            PlaybackOption::Random,
            PlaybackOption::Repeat,
            PlaybackOption::Single,
            PlaybackOption::Consume,
        ]
        .into_iter()
        .filter(|o| self.flag(*o) != other.flag(*o))
        .map(|o| OptionValue::Flag(o, other.flag(o)))
        .collect();

        if self.crossfade != other.crossfade {
            changed.push(OptionValue::Crossfade(other.crossfade));
        }
        changed
    }
}

/// Position and identity of the current song
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueuePlace {
    pub pos: usize,
    pub id: u32,
}

/// Snapshot of the server's `status` response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServerStatus {
    pub state: PlayerState,
    pub song: Option<QueuePlace>,
    pub queue_version: u32,
    pub queue_length: usize,
    pub options: Options,
    /// Seconds into the current song
    pub elapsed: Option<f64>,
    pub duration: Option<f64>,
}

/// One entry of a queue diff: the song now at `pos` has identity `id`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueChange {
    pub pos: usize,
    pub id: u32,
}

/// One entry of a directory listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirEntry {
    Directory(String),
    File(Track),
    Playlist(String),
}

/// Changed-subsystem tag reported when a wait ends
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Playlist,
    Player,
    Options,
    Database,
    Update,
    Mixer,
    Output,
    StoredPlaylist,
    Other(String),
}

impl Subsystem {
    pub fn parse(value: &str) -> Self {
        match value {
            "playlist" => Self::Playlist,
            "player" => Self::Player,
            "options" => Self::Options,
            "database" => Self::Database,
            "update" => Self::Update,
            "mixer" => Self::Mixer,
            "output" => Self::Output,
            "stored_playlist" => Self::StoredPlaylist,
            other => Self::Other(other.to_string()),
        }
    }

    /// Processing order: queue first, then player, then options
    pub fn rank(&self) -> u8 {
        match self {
            Self::Playlist => 0,
            Self::Player => 1,
            Self::Options => 2,
            Self::Database => 3,
            Self::Update => 4,
            Self::StoredPlaylist => 5,
            Self::Mixer => 6,
            Self::Output => 7,
            Self::Other(_) => 8,
        }
    }
}

//! Test fixtures shared by the unit tests.
//!
//! - [`FakeService`]: scripted in-memory playback server with a call log
//! - [`FakeLibrary`]: directory listings keyed by path
//! - [`Recorder`]: subscriber collecting every event it receives
//! - [`connected_engine`]: sync engine already holding a full snapshot
//! - track builders

use std::cell::RefCell;
use std::collections::HashMap;
use std::future;
use std::rc::Rc;

use crate::error::{ServiceError, ServiceResult};
use crate::model::service::DirectoryLister;
use crate::model::types::{DirEntry, QueueChange, ServerStatus, Track};
use crate::model::{MusicService, ServiceCommand, Subscriber, Subsystem, SyncEngine};

/// A queued track with a predictable file path
pub fn track(id: u32, title: &str, artist: &str, album: &str) -> Track {
    Track {
        file: format!("{artist}/{album}/{title}.flac"),
        title: title.to_string(),
        artist: artist.to_string(),
        album: album.to_string(),
        genre: "Rock".to_string(),
        duration: 180,
        id: Some(id),
    }
}

/// `count` queued tracks with ids starting at `first_id`
pub fn tracks(first_id: u32, count: usize) -> Vec<Track> {
    (0..count as u32)
        .map(|i| {
            let id = first_id + i;
            track(id, &format!("Song {id}"), "Artist", "Album")
        })
        .collect()
}

/// A library file entry outside the queue
pub fn library_file(path: &str, title: &str) -> DirEntry {
    DirEntry::File(Track {
        file: path.to_string(),
        title: title.to_string(),
        artist: "Artist".to_string(),
        duration: 200,
        ..Track::default()
    })
}

pub struct Recorder<E>(RefCell<Vec<E>>);

impl<E: Clone + 'static> Recorder<E> {
    pub fn new() -> Rc<Self> {
        Rc::new(Self(RefCell::new(Vec::new())))
    }

    pub fn take(&self) -> Vec<E> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

impl<E: Clone> Subscriber<E> for Recorder<E> {
    fn on_event(&self, event: &E) {
        self.0.borrow_mut().push(event.clone());
    }
}

/// In-memory stand-in for the playback server.
///
/// Every call is appended to `calls`. Issuing anything other than `end_wait`
/// while a wait is outstanding fails, as it would on a real connection.
#[derive(Default)]
pub struct FakeService {
    pub connected: bool,
    pub waiting: bool,
    pub status: ServerStatus,
    pub queue: Vec<Track>,
    pub diff: Vec<QueueChange>,
    pub pending_idle: Vec<Subsystem>,
    pub library: HashMap<String, Vec<DirEntry>>,
    pub executed: Vec<ServiceCommand>,
    pub calls: Vec<String>,
    pub fetched_ids: Vec<u32>,
    pub fail_connect: bool,
    pub fail_status: bool,
    pub fail_transport: bool,
    pub reject_commands: bool,
}

impl FakeService {
    /// Connected server holding `queue` at `version`
    pub fn with_queue(queue: Vec<Track>, version: u32) -> Self {
        Self {
            status: ServerStatus {
                queue_version: version,
                queue_length: queue.len(),
                ..ServerStatus::default()
            },
            queue,
            ..Self::default()
        }
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls.iter().any(|c| c == name)
    }

    fn enter(&mut self, name: &str) -> ServiceResult<()> {
        self.calls.push(name.to_string());
        if self.fail_transport {
            self.connected = false;
            self.waiting = false;
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
        }
        if !self.connected {
            return Err(ServiceError::NotConnected);
        }
        if self.waiting && name != "end_wait" {
            return Err(ServiceError::Protocol(format!("{name} issued while waiting")));
        }
        Ok(())
    }
}

fn ack(command: &str, message: &str) -> ServiceError {
    ServiceError::Ack {
        code: 50,
        command: command.to_string(),
        message: message.to_string(),
    }
}

impl MusicService for FakeService {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> ServiceResult<()> {
        self.calls.push("connect".to_string());
        if self.fail_connect {
            return Err(std::io::Error::from(std::io::ErrorKind::ConnectionRefused).into());
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.calls.push("disconnect".to_string());
        self.connected = false;
        self.waiting = false;
    }

    async fn begin_wait(&mut self) -> ServiceResult<()> {
        self.enter("begin_wait")?;
        self.waiting = true;
        Ok(())
    }

    async fn end_wait(&mut self) -> ServiceResult<Vec<Subsystem>> {
        self.enter("end_wait")?;
        self.waiting = false;
        Ok(std::mem::take(&mut self.pending_idle))
    }

    async fn wait_readable(&self) {
        if self.waiting && !self.pending_idle.is_empty() {
            return;
        }
        future::pending::<()>().await
    }

    async fn status(&mut self) -> ServiceResult<ServerStatus> {
        self.enter("status")?;
        if self.fail_status {
            return Err(ack("status", "status unavailable"));
        }
        Ok(self.status.clone())
    }

    async fn queue_listing(&mut self) -> ServiceResult<Vec<Track>> {
        self.enter("queue_listing")?;
        Ok(self.queue.clone())
    }

    async fn queue_diff(&mut self, _version: u32) -> ServiceResult<Vec<QueueChange>> {
        self.enter("queue_diff")?;
        Ok(self.diff.clone())
    }

    async fn track_by_id(&mut self, id: u32) -> ServiceResult<Track> {
        self.enter("track_by_id")?;
        self.fetched_ids.push(id);
        self.queue
            .iter()
            .find(|t| t.id == Some(id))
            .cloned()
            .ok_or_else(|| ack("playlistid", "No such song"))
    }

    async fn list_directory(&mut self, path: &str) -> ServiceResult<Vec<DirEntry>> {
        self.enter("list_directory")?;
        self.library
            .get(path)
            .cloned()
            .ok_or_else(|| ack("lsinfo", "No such directory"))
    }

    async fn execute(&mut self, command: &ServiceCommand) -> ServiceResult<()> {
        self.enter("execute")?;
        if self.reject_commands {
            return Err(ack(command.name(), "rejected"));
        }
        self.executed.push(command.clone());
        Ok(())
    }
}

/// Engine connected to `service` with its call log cleared
pub async fn connected_engine(service: FakeService) -> SyncEngine<FakeService> {
    let mut engine = SyncEngine::new(service);
    engine.connect(None).await.unwrap();
    engine.service_mut().calls.clear();
    engine
}

/// Library listings keyed by path, counting every listing request
#[derive(Default)]
pub struct FakeLibrary {
    pub entries: HashMap<String, Vec<DirEntry>>,
    pub requests: Vec<String>,
}

impl FakeLibrary {
    pub fn with(entries: &[(&str, Vec<DirEntry>)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(path, entries)| (path.to_string(), entries.clone()))
                .collect(),
            requests: Vec::new(),
        }
    }
}

impl DirectoryLister for FakeLibrary {
    async fn list_directory(&mut self, path: &str) -> ServiceResult<Vec<DirEntry>> {
        self.requests.push(path.to_string());
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| ack("lsinfo", "No such directory"))
    }
}

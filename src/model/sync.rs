//! State synchronization with the playback server
//!
//! [`SyncEngine`] owns the connection and keeps [`Status`], a read-only
//! mirror of the server's queue, current track, player state and options.
//! The connection alternates between waiting for changes and command mode;
//! the engine ends any outstanding wait before it issues anything else and
//! keeps the tags that wait returned for the next [`SyncEngine::sync`].

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use crate::error::{ServiceError, ServiceResult, SyncError};

use super::playback::PlaybackTiming;
use super::pubsub::PubSub;
use super::service::{DirectoryLister, MusicService, ServiceCommand};
use super::types::{
    DirEntry, OptionValue, Options, PlayerState, QueueSnapshot, QueuedTrack, ServerStatus,
    Subsystem, Track,
};

#[derive(Clone, Debug)]
pub enum StatusEvent {
    PlaylistChanged(Rc<QueueSnapshot>),
    CurrentTrackChanged(Option<QueuedTrack>),
    StateChanged(PlayerState),
    OptionChanged(OptionValue),
    ConnectionChanged(bool),
}

impl StatusEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlaylistChanged(_) => "playlist",
            Self::CurrentTrackChanged(_) => "current",
            Self::StateChanged(_) => "state",
            Self::OptionChanged(_) => "option",
            Self::ConnectionChanged(_) => "connection",
        }
    }
}

/// Mirror of the server state. Only the sync engine writes to it.
pub struct Status {
    queue: RefCell<Rc<QueueSnapshot>>,
    current: RefCell<Option<QueuedTrack>>,
    state: Cell<PlayerState>,
    options: Cell<Options>,
    timing: Cell<PlaybackTiming>,
    connected: Cell<bool>,
    pub events: PubSub<StatusEvent>,
}

impl Status {
    fn new() -> Self {
        Self {
            queue: RefCell::new(Rc::new(QueueSnapshot::default())),
            current: RefCell::new(None),
            state: Cell::new(PlayerState::Stop),
            options: Cell::new(Options::default()),
            timing: Cell::new(PlaybackTiming::default()),
            connected: Cell::new(false),
            events: PubSub::new(),
        }
    }

    pub fn queue(&self) -> Rc<QueueSnapshot> {
        self.queue.borrow().clone()
    }

    pub fn current(&self) -> Option<QueuedTrack> {
        self.current.borrow().clone()
    }

    pub fn state(&self) -> PlayerState {
        self.state.get()
    }

    pub fn options(&self) -> Options {
        self.options.get()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    pub fn elapsed_ms(&self, now: Instant) -> u32 {
        self.timing.get().current_position_ms(now)
    }

    pub fn duration_ms(&self) -> u32 {
        self.timing.get().duration_ms
    }

    fn emit(&self, event: StatusEvent) {
        match &event {
            StatusEvent::PlaylistChanged(queue) => {
                tracing::debug!(event = event.name(), length = queue.len(), "Status changed")
            }
            StatusEvent::CurrentTrackChanged(current) => tracing::debug!(
                event = event.name(),
                file = current.as_ref().map(|c| c.track.file.as_str()),
                "Status changed"
            ),
            StatusEvent::StateChanged(state) => {
                tracing::debug!(event = event.name(), state = ?state, "Status changed")
            }
            StatusEvent::OptionChanged(value) => {
                tracing::debug!(event = event.name(), value = ?value, "Status changed")
            }
            StatusEvent::ConnectionChanged(connected) => {
                tracing::debug!(event = event.name(), connected = *connected, "Status changed")
            }
        }
        self.events.notify(&event);
    }

    fn set_queue(&self, snapshot: QueueSnapshot) {
        let snapshot = Rc::new(snapshot);
        *self.queue.borrow_mut() = snapshot.clone();
        self.emit(StatusEvent::PlaylistChanged(snapshot));
    }

    /// Current track at the status' position; fires only when the track identity changes
    fn resolve_current(&self, status: &ServerStatus) {
        let resolved = status
            .song
            .and_then(|place| self.queue.borrow().get(place.pos).cloned());

        let changed = match (&*self.current.borrow(), &resolved) {
            (None, None) => false,
            (Some(old), Some(new)) => !old.same_track(new),
            _ => true,
        };

        *self.current.borrow_mut() = resolved.clone();
        if changed {
            self.emit(StatusEvent::CurrentTrackChanged(resolved));
        }
    }

    fn apply_player(&self, status: &ServerStatus) {
        let mut timing = self.timing.get();
        timing.apply_status(Instant::now(), status);
        self.timing.set(timing);

        if self.state.get() != status.state {
            self.state.set(status.state);
            self.emit(StatusEvent::StateChanged(status.state));
        }
    }

    fn apply_options(&self, options: Options) {
        let changed = self.options.get().diff(&options);
        self.options.set(options);
        for value in changed {
            self.emit(StatusEvent::OptionChanged(value));
        }
    }

    fn set_connected(&self, connected: bool) {
        if self.connected.get() != connected {
            self.connected.set(connected);
            self.emit(StatusEvent::ConnectionChanged(connected));
        }
    }
}

pub struct SyncEngine<S> {
    service: S,
    status: Rc<Status>,
    /// Changed subsystems not yet processed
    pending: Vec<Subsystem>,
    waiting: bool,
}

impl<S: MusicService> SyncEngine<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            status: Rc::new(Status::new()),
            pending: Vec::new(),
            waiting: false,
        }
    }

    pub fn status(&self) -> Rc<Status> {
        self.status.clone()
    }

    #[cfg(test)]
    pub fn service(&self) -> &S {
        &self.service
    }

    #[cfg(test)]
    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    pub fn is_connected(&self) -> bool {
        self.service.is_connected() && self.status.is_connected()
    }

    #[cfg(test)]
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Resolves once the server has reported a change. Never resolves unless waiting.
    pub async fn connection_ready(&self) {
        self.service.wait_readable().await
    }

    /// Connect, authenticate when a password is given, and take a full snapshot
    pub async fn connect(&mut self, password: Option<&str>) -> Result<(), SyncError> {
        self.waiting = false;
        self.service.connect().await.map_err(|e| {
            tracing::warn!(error = %e, "Connect failed");
            SyncError::Connection(e)
        })?;

        if let Some(password) = password {
            self.service
                .execute(&ServiceCommand::Password(password.to_string()))
                .await
                .map_err(|e| self.failure(e))?;
        }

        self.status.set_connected(true);
        self.reinitialize().await
    }

    /// Replace every mirrored value with a fresh full snapshot
    pub async fn reinitialize(&mut self) -> Result<(), SyncError> {
        self.end_wait().await?;
        self.pending.clear();

        let status = self.service.status().await.map_err(|e| self.fetch_failure(e))?;
        let listing = self
            .service
            .queue_listing()
            .await
            .map_err(|e| self.fetch_failure(e))?;

        let tracks = listing
            .into_iter()
            .enumerate()
            .map(|(pos, track)| QueuedTrack::new(pos, Rc::new(track)))
            .collect();
        self.status
            .set_queue(QueueSnapshot::new(tracks, status.queue_version));
        self.status.resolve_current(&status);
        self.status.apply_player(&status);
        self.status.apply_options(status.options);

        tracing::info!(
            version = status.queue_version,
            length = status.queue_length,
            "Synchronized full state"
        );
        Ok(())
    }

    pub async fn begin_wait(&mut self) -> Result<(), SyncError> {
        if !self.is_connected() || self.waiting {
            return Ok(());
        }
        self.service.begin_wait().await.map_err(|e| self.failure(e))?;
        self.waiting = true;
        Ok(())
    }

    /// End the outstanding wait, keeping whatever it reported for the next sync
    pub async fn end_wait(&mut self) -> Result<(), SyncError> {
        self.end_wait_raw().await.map_err(|e| self.failure(e))
    }

    async fn end_wait_raw(&mut self) -> ServiceResult<()> {
        if !self.waiting {
            return Ok(());
        }
        self.waiting = false;
        let tags = self.service.end_wait().await?;
        self.add_pending(&tags);
        Ok(())
    }

    fn add_pending(&mut self, tags: &[Subsystem]) {
        for tag in tags {
            if !self.pending.contains(tag) {
                self.pending.push(tag.clone());
            }
        }
    }

    /// Process every pending change and return the processed tags
    pub async fn sync(&mut self) -> Result<Vec<Subsystem>, SyncError> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        self.end_wait().await?;

        let mut tags = std::mem::take(&mut self.pending);
        if tags.is_empty() {
            return Ok(tags);
        }
        tags.sort_by_key(Subsystem::rank);

        if let Err(e) = self.process(&tags).await {
            if matches!(e, SyncError::StatusFetch(_)) {
                self.add_pending(&tags);
            }
            return Err(e);
        }
        Ok(tags)
    }

    async fn process(&mut self, tags: &[Subsystem]) -> Result<(), SyncError> {
        let needs_status = tags.iter().any(|t| {
            matches!(
                t,
                Subsystem::Playlist | Subsystem::Player | Subsystem::Options
            )
        });
        if !needs_status {
            tracing::debug!(?tags, "Changes need no status");
            return Ok(());
        }

        let status = self.service.status().await.map_err(|e| self.fetch_failure(e))?;
        for tag in tags {
            match tag {
                Subsystem::Playlist => {
                    self.reconcile_queue(&status).await?;
                    self.status.resolve_current(&status);
                }
                Subsystem::Player => {
                    self.status.apply_player(&status);
                    self.status.resolve_current(&status);
                }
                Subsystem::Options => self.status.apply_options(status.options),
                other => tracing::trace!(tag = ?other, "Ignoring change"),
            }
        }
        Ok(())
    }

    /// Bring the local queue to the server's version with as few fetches as possible
    async fn reconcile_queue(&mut self, status: &ServerStatus) -> Result<(), SyncError> {
        let local = self.status.queue();
        if status.queue_version == local.version {
            return Ok(());
        }

        let changes = self
            .service
            .queue_diff(local.version)
            .await
            .map_err(|e| self.fetch_failure(e))?;

        let held: HashMap<u32, Rc<Track>> = local
            .tracks
            .iter()
            .filter_map(|q| q.track.id.map(|id| (id, q.track.clone())))
            .collect();

        let first = changes.first().map_or(status.queue_length, |c| c.pos);
        let contiguous = first <= local.len()
            && changes
                .iter()
                .enumerate()
                .all(|(i, change)| change.pos == first + i);

        let mut tracks = Vec::new();
        let mut fetched = 0usize;
        if contiguous {
            tracks.extend(local.tracks.iter().take(first).cloned());
            for change in &changes {
                let track = match held.get(&change.id) {
                    Some(track) => track.clone(),
                    None => {
                        fetched += 1;
                        let track = self
                            .service
                            .track_by_id(change.id)
                            .await
                            .map_err(|e| self.fetch_failure(e))?;
                        Rc::new(track)
                    }
                };
                tracks.push(QueuedTrack::new(change.pos, track));
            }
            tracks.truncate(status.queue_length);
        }

        if !contiguous || tracks.len() != status.queue_length {
            tracing::debug!(
                version = status.queue_version,
                "Queue diff does not apply, fetching full listing"
            );
            let listing = self
                .service
                .queue_listing()
                .await
                .map_err(|e| self.fetch_failure(e))?;
            tracks = listing
                .into_iter()
                .enumerate()
                .map(|(pos, track)| {
                    let track = track
                        .id
                        .and_then(|id| held.get(&id).cloned())
                        .unwrap_or_else(|| Rc::new(track));
                    QueuedTrack::new(pos, track)
                })
                .collect();
        }

        tracing::debug!(
            from = local.version,
            to = status.queue_version,
            changes = changes.len(),
            fetched,
            length = tracks.len(),
            "Reconciled queue"
        );
        self.status
            .set_queue(QueueSnapshot::new(tracks, status.queue_version));
        Ok(())
    }

    /// Send `command`, ending any outstanding wait first
    pub async fn issue(&mut self, command: &ServiceCommand) -> Result<(), SyncError> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        self.end_wait().await?;
        self.add_pending(command.affects());
        self.service
            .execute(command)
            .await
            .map_err(|e| self.failure(e))
    }

    #[cfg(test)]
    pub fn disconnect(&mut self) {
        self.mark_lost();
    }

    fn mark_lost(&mut self) {
        self.service.disconnect();
        self.waiting = false;
        self.pending.clear();
        self.status.set_connected(false);
    }

    /// Classify a command-phase failure; transport failures drop the connection
    fn failure(&mut self, error: ServiceError) -> SyncError {
        if error.is_fatal() {
            tracing::warn!(error = %error, "Lost connection");
            self.mark_lost();
            SyncError::Connection(error)
        } else {
            SyncError::Execution(error)
        }
    }

    fn fetch_failure(&mut self, error: ServiceError) -> SyncError {
        match self.failure(error) {
            SyncError::Execution(e) => SyncError::StatusFetch(e),
            other => other,
        }
    }
}

impl<S: MusicService> DirectoryLister for SyncEngine<S> {
    async fn list_directory(&mut self, path: &str) -> ServiceResult<Vec<DirEntry>> {
        if !self.is_connected() {
            return Err(ServiceError::NotConnected);
        }
        let result = match self.end_wait_raw().await {
            Ok(()) => self.service.list_directory(path).await,
            Err(e) => Err(e),
        };
        result.map_err(|e| {
            if e.is_fatal() {
                self.mark_lost();
            }
            e
        })
    }
}

//! Playback control methods

use crate::error::{CommandError, SyncError};
use crate::model::{MusicService, OptionValue, ServiceCommand, Target};

use super::commands::Action;
use super::App;

impl<S: MusicService> App<S> {
    /// Run one action. Failures come back for the caller to show.
    pub(crate) async fn perform(&mut self, action: Action) -> Result<(), CommandError> {
        match action {
            Action::Quit => {
                tracing::info!("Quit requested");
                self.should_quit = true;
                Ok(())
            }
            Action::Play(position) => self.send(ServiceCommand::Play(position)).await,
            Action::Toggle => self.send(ServiceCommand::Toggle).await,
            Action::Pause => self.send(ServiceCommand::Pause(true)).await,
            Action::Stop => self.send(ServiceCommand::Stop).await,
            Action::Next => self.send(ServiceCommand::Next).await,
            Action::Previous => self.send(ServiceCommand::Previous).await,
            Action::SetOption(option, switch) => {
                let value = switch.apply(self.status.options().flag(option));
                self.send(ServiceCommand::SetOption(OptionValue::Flag(option, value)))
                    .await
            }
            Action::Crossfade(seconds) => {
                self.send(ServiceCommand::SetOption(OptionValue::Crossfade(seconds)))
                    .await
            }
            Action::Clear => self.send(ServiceCommand::Clear).await,
            Action::Delete(positions) => self.delete(positions).await,
            Action::Add(uri) => self.send(ServiceCommand::Add(uri)).await,
            Action::Update(path) => {
                self.send(ServiceCommand::Update(path)).await?;
                self.info("Updating library");
                Ok(())
            }
            Action::PlaySelected => self.play_selected().await,
            Action::BrowserAdd => self.add_selected().await,
            action => self.navigate(action).await,
        }
    }

    pub(super) async fn send(&mut self, command: ServiceCommand) -> Result<(), CommandError> {
        tracing::debug!(command = command.name(), "Sending command");
        self.engine
            .issue(&command)
            .await
            .map_err(|e| match e {
                SyncError::NotConnected => CommandError::NotConnected,
                e => CommandError::Execution(Self::format_error(&e)),
            })
    }

    /// Delete `positions`, or the selected queue row when none are given
    async fn delete(&mut self, positions: Vec<usize>) -> Result<(), CommandError> {
        let positions = if positions.is_empty() {
            match self.view.queue.list().selected() {
                Some(item) => vec![item.pos],
                None => return Ok(()),
            }
        } else {
            positions
        };
        self.send(ServiceCommand::Delete(positions)).await
    }

    async fn play_selected(&mut self) -> Result<(), CommandError> {
        let Some(item) = self.view.queue.list().selected() else {
            return Ok(());
        };
        match item.track.id {
            Some(id) => self.send(ServiceCommand::PlayId(id)).await,
            None => self.send(ServiceCommand::Play(Some(item.pos))).await,
        }
    }

    /// Append the selected library entry to the queue
    async fn add_selected(&mut self) -> Result<(), CommandError> {
        match self.browser.selected_target() {
            Some(Target::File(path)) | Some(Target::Directory(path)) => {
                self.send(ServiceCommand::Add(path.clone())).await?;
                self.info(format!("Added {}", path));
                Ok(())
            }
            Some(Target::Playlist(name)) => self.send(ServiceCommand::LoadPlaylist(name)).await,
            None => Ok(()),
        }
    }
}

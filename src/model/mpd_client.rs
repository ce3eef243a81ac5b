//! MPD text-protocol client
//!
//! Implements [`MusicService`] over a tokio TCP connection. Responses are
//! `key: value` lines terminated by `OK`; failures come back as a single
//! `ACK [code@index] {command} message` line.

use std::future;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::{ServiceError, ServiceResult};

use super::service::{MusicService, ServiceCommand};
use super::types::{
    DirEntry, OptionValue, Options, PlayerState, QueueChange, QueuePlace, ServerStatus, Subsystem,
    Track,
};

const GREETING: &str = "OK MPD ";

type Pair = (String, String);

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

pub struct MpdClient {
    address: String,
    connection: Option<Connection>,
    waiting: bool,
}

impl MpdClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            address: format!("{host}:{port}"),
            connection: None,
            waiting: false,
        }
    }

    async fn send(&mut self, line: &str) -> ServiceResult<()> {
        let connection = self.connection.as_mut().ok_or(ServiceError::NotConnected)?;
        tracing::trace!(command = %redact(line), "Sending");
        connection.writer.write_all(line.as_bytes()).await?;
        connection.writer.write_all(b"\n").await?;
        Ok(())
    }

    async fn read_response(&mut self) -> ServiceResult<Vec<Pair>> {
        let connection = self.connection.as_mut().ok_or(ServiceError::NotConnected)?;
        let mut pairs = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            if connection.reader.read_line(&mut line).await? == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line == "OK" {
                return Ok(pairs);
            }
            if line.starts_with("ACK ") {
                return Err(parse_ack(line));
            }
            match parse_pair(line) {
                Some((key, value)) => pairs.push((key.to_string(), value.to_string())),
                None => return Err(ServiceError::Protocol(format!("malformed line: {line}"))),
            }
        }
    }

    /// Send one command and collect its response. Fatal errors drop the connection.
    async fn command(&mut self, line: &str) -> ServiceResult<Vec<Pair>> {
        if self.waiting {
            return Err(ServiceError::Protocol(
                "command issued while waiting for changes".to_string(),
            ));
        }
        let result = match self.send(line).await {
            Ok(()) => self.read_response().await,
            Err(e) => Err(e),
        };
        result.map_err(|e| self.check(e))
    }

    async fn command_list(&mut self, lines: &[String]) -> ServiceResult<()> {
        let mut batch = String::from("command_list_begin\n");
        for line in lines {
            batch.push_str(line);
            batch.push('\n');
        }
        batch.push_str("command_list_end");
        self.command(&batch).await.map(|_| ())
    }

    fn check(&mut self, error: ServiceError) -> ServiceError {
        if error.is_fatal() {
            tracing::warn!(address = %self.address, error = %error, "Connection lost");
            self.disconnect();
        }
        error
    }
}

impl MusicService for MpdClient {
    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    async fn connect(&mut self) -> ServiceResult<()> {
        self.disconnect();
        tracing::info!(address = %self.address, "Connecting");

        let stream = TcpStream::connect(&self.address).await?;
        let (read, write) = stream.into_split();
        let mut reader = BufReader::new(read);

        let mut greeting = String::new();
        reader.read_line(&mut greeting).await?;
        let Some(version) = greeting.trim_end().strip_prefix(GREETING) else {
            return Err(ServiceError::Protocol(format!(
                "unexpected greeting: {}",
                greeting.trim_end()
            )));
        };

        tracing::info!(address = %self.address, protocol = %version, "Connected");
        self.connection = Some(Connection {
            reader,
            writer: write,
        });
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            tracing::info!(address = %self.address, "Disconnected");
        }
        self.waiting = false;
    }

    async fn begin_wait(&mut self) -> ServiceResult<()> {
        if self.waiting {
            return Ok(());
        }
        self.send("idle").await.map_err(|e| self.check(e))?;
        self.waiting = true;
        Ok(())
    }

    async fn end_wait(&mut self) -> ServiceResult<Vec<Subsystem>> {
        if !self.waiting {
            return Ok(Vec::new());
        }
        self.waiting = false;
        // The server ignores noidle when the idle response is already on its way
        let result = match self.send("noidle").await {
            Ok(()) => self.read_response().await,
            Err(e) => Err(e),
        };
        let pairs = result.map_err(|e| self.check(e))?;
        Ok(parse_subsystems(&pairs))
    }

    async fn wait_readable(&self) {
        match &self.connection {
            Some(connection) if self.waiting => {
                if !connection.reader.buffer().is_empty() {
                    return;
                }
                // Errors surface on the next read
                let _ = connection.reader.get_ref().readable().await;
            }
            _ => future::pending::<()>().await,
        }
    }

    async fn status(&mut self) -> ServiceResult<ServerStatus> {
        let pairs = self.command("status").await?;
        parse_status(&pairs)
    }

    async fn queue_listing(&mut self) -> ServiceResult<Vec<Track>> {
        let pairs = self.command("playlistinfo").await?;
        Ok(split_records(pairs, &["file"])
            .iter()
            .map(|r| parse_track(r))
            .collect())
    }

    async fn queue_diff(&mut self, version: u32) -> ServiceResult<Vec<QueueChange>> {
        let pairs = self.command(&format!("plchangesposid {version}")).await?;
        parse_changes(pairs)
    }

    async fn track_by_id(&mut self, id: u32) -> ServiceResult<Track> {
        let pairs = self.command(&format!("playlistid {id}")).await?;
        split_records(pairs, &["file"])
            .first()
            .map(|r| parse_track(r))
            .ok_or_else(|| ServiceError::Protocol(format!("no song with id {id}")))
    }

    async fn list_directory(&mut self, path: &str) -> ServiceResult<Vec<DirEntry>> {
        let pairs = self.command(&format!("lsinfo {}", quote(path))).await?;
        Ok(parse_directory(pairs))
    }

    async fn execute(&mut self, command: &ServiceCommand) -> ServiceResult<()> {
        tracing::debug!(command = command.name(), "Executing");
        match command {
            ServiceCommand::Delete(positions) => {
                let mut positions = positions.clone();
                // Highest first so earlier deletions do not shift later ones
                positions.sort_unstable_by(|a, b| b.cmp(a));
                positions.dedup();
                let lines: Vec<String> = positions.iter().map(|p| format!("delete {p}")).collect();
                self.command_list(&lines).await
            }
            ServiceCommand::AddAndPlay(uri) => {
                let pairs = self.command(&format!("addid {}", quote(uri))).await?;
                let id = pairs
                    .iter()
                    .find(|(k, _)| k == "Id")
                    .and_then(|(_, v)| v.parse::<u32>().ok())
                    .ok_or_else(|| ServiceError::Protocol("addid returned no id".to_string()))?;
                self.command(&format!("playid {id}")).await.map(|_| ())
            }
            other => {
                let line = command_line(other);
                self.command(&line).await.map(|_| ())
            }
        }
    }
}

// ============================================================================
// Protocol encoding and parsing
// ============================================================================

fn command_line(command: &ServiceCommand) -> String {
    match command {
        ServiceCommand::Play(None) => "play".to_string(),
        ServiceCommand::Play(Some(pos)) => format!("play {pos}"),
        ServiceCommand::PlayId(id) => format!("playid {id}"),
        ServiceCommand::Pause(paused) => format!("pause {}", u8::from(*paused)),
        ServiceCommand::Toggle => "pause".to_string(),
        ServiceCommand::Stop => "stop".to_string(),
        ServiceCommand::Next => "next".to_string(),
        ServiceCommand::Previous => "previous".to_string(),
        ServiceCommand::SetOption(OptionValue::Flag(option, on)) => {
            format!("{} {}", option.name(), u8::from(*on))
        }
        ServiceCommand::SetOption(OptionValue::Crossfade(seconds)) => {
            format!("crossfade {seconds}")
        }
        ServiceCommand::Clear => "clear".to_string(),
        ServiceCommand::Add(uri) => format!("add {}", quote(uri)),
        ServiceCommand::LoadPlaylist(name) => format!("load {}", quote(name)),
        ServiceCommand::Update(None) => "update".to_string(),
        ServiceCommand::Update(Some(path)) => format!("update {}", quote(path)),
        ServiceCommand::Password(secret) => format!("password {}", quote(secret)),
        // Sent as a command list and as two commands by `execute`
        ServiceCommand::Delete(positions) => match positions.first() {
            Some(pos) => format!("delete {pos}"),
            None => "delete".to_string(),
        },
        ServiceCommand::AddAndPlay(uri) => format!("addid {}", quote(uri)),
    }
}

fn redact(line: &str) -> &str {
    if line.starts_with("password ") {
        "password ***"
    } else {
        line
    }
}

/// Quote an argument, escaping backslashes and double quotes
pub fn quote(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

pub fn parse_pair(line: &str) -> Option<(&str, &str)> {
    line.split_once(": ")
}

/// `ACK [50@0] {play} No such song`
pub fn parse_ack(line: &str) -> ServiceError {
    let rest = line.strip_prefix("ACK ").unwrap_or(line);

    let (code, rest) = match rest.strip_prefix('[').and_then(|r| r.split_once(']')) {
        Some((inner, rest)) => {
            let code = inner
                .split_once('@')
                .and_then(|(c, _)| c.parse().ok())
                .unwrap_or(0);
            (code, rest.trim_start())
        }
        None => (0, rest),
    };

    let (command, message) = match rest.strip_prefix('{').and_then(|r| r.split_once('}')) {
        Some((command, message)) => (command.to_string(), message.trim_start().to_string()),
        None => (String::new(), rest.to_string()),
    };

    ServiceError::Ack {
        code,
        command,
        message,
    }
}

/// Group a flat response into records, starting a new record at every key in `starters`
pub fn split_records(pairs: Vec<Pair>, starters: &[&str]) -> Vec<Vec<Pair>> {
    let mut records: Vec<Vec<Pair>> = Vec::new();
    for pair in pairs {
        if starters.contains(&pair.0.as_str()) || records.is_empty() {
            records.push(Vec::new());
        }
        if let Some(record) = records.last_mut() {
            record.push(pair);
        }
    }
    records
}

pub fn parse_track(record: &[Pair]) -> Track {
    let mut track = Track::default();
    for (key, value) in record {
        match key.as_str() {
            "file" => track.file = value.clone(),
            "Title" => track.title = value.clone(),
            "Artist" => track.artist = value.clone(),
            "Album" => track.album = value.clone(),
            "Genre" => track.genre = value.clone(),
            "Time" => track.duration = value.parse().unwrap_or(track.duration),
            "duration" => {
                if let Ok(seconds) = value.parse::<f64>() {
                    track.duration = seconds.round() as u32;
                }
            }
            "Id" => track.id = value.parse().ok(),
            _ => {}
        }
    }
    track
}

fn flag(value: &str) -> bool {
    value != "0"
}

fn number<T: std::str::FromStr>(key: &str, value: &str) -> ServiceResult<T> {
    value
        .parse()
        .map_err(|_| ServiceError::Protocol(format!("bad value for {key}: {value}")))
}

pub fn parse_status(pairs: &[Pair]) -> ServiceResult<ServerStatus> {
    let mut status = ServerStatus::default();
    let mut options = Options::default();
    let mut song_pos: Option<usize> = None;
    let mut song_id: Option<u32> = None;

    for (key, value) in pairs {
        match key.as_str() {
            "state" => {
                status.state = PlayerState::parse(value)
                    .ok_or_else(|| ServiceError::Protocol(format!("bad state: {value}")))?
            }
            "song" => song_pos = Some(number(key, value)?),
            "songid" => song_id = Some(number(key, value)?),
            "playlist" => status.queue_version = number(key, value)?,
            "playlistlength" => status.queue_length = number(key, value)?,
            "random" => options.random = flag(value),
            "repeat" => options.repeat = flag(value),
            "single" => options.single = flag(value),
            "consume" => options.consume = flag(value),
            "xfade" => options.crossfade = number(key, value)?,
            "elapsed" => status.elapsed = value.parse().ok(),
            "duration" => status.duration = value.parse().ok(),
            // Older servers only report "elapsed:total" in whole seconds
            "time" => {
                if let Some((elapsed, total)) = value.split_once(':') {
                    status.elapsed = status.elapsed.or(elapsed.parse().ok());
                    status.duration = status.duration.or(total.parse().ok());
                }
            }
            _ => {}
        }
    }

    status.options = options;
    status.song = match (song_pos, song_id) {
        (Some(pos), Some(id)) => Some(QueuePlace { pos, id }),
        _ => None,
    };
    Ok(status)
}

pub fn parse_changes(pairs: Vec<Pair>) -> ServiceResult<Vec<QueueChange>> {
    split_records(pairs, &["cpos"])
        .iter()
        .map(|record| -> ServiceResult<QueueChange> {
            let mut pos = None;
            let mut id = None;
            for (key, value) in record {
                match key.as_str() {
                    "cpos" => pos = Some(number(key, value)?),
                    "Id" => id = Some(number(key, value)?),
                    _ => {}
                }
            }
            match (pos, id) {
                (Some(pos), Some(id)) => Ok(QueueChange { pos, id }),
                _ => Err(ServiceError::Protocol("incomplete change record".to_string())),
            }
        })
        .collect()
}

pub fn parse_directory(pairs: Vec<Pair>) -> Vec<DirEntry> {
    split_records(pairs, &["directory", "file", "playlist"])
        .into_iter()
        .filter_map(|record| {
            let (key, value) = record.first()?;
            match key.as_str() {
                "directory" => Some(DirEntry::Directory(value.clone())),
                "playlist" => Some(DirEntry::Playlist(value.clone())),
                "file" => Some(DirEntry::File(parse_track(&record))),
                _ => None,
            }
        })
        .collect()
}

pub fn parse_subsystems(pairs: &[Pair]) -> Vec<Subsystem> {
    pairs
        .iter()
        .filter(|(k, _)| k == "changed")
        .map(|(_, v)| Subsystem::parse(v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    fn pairs(lines: &[(&str, &str)]) -> Vec<Pair> {
        lines
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_status() {
        let status = parse_status(&pairs(&[
            ("volume", "80"),
            ("repeat", "1"),
            ("random", "0"),
            ("single", "oneshot"),
            ("consume", "0"),
            ("playlist", "12"),
            ("playlistlength", "4"),
            ("xfade", "3"),
            ("state", "pause"),
            ("song", "2"),
            ("songid", "17"),
            ("elapsed", "12.5"),
            ("duration", "200.0"),
        ]))
        .unwrap();

        assert_eq!(status.state, PlayerState::Pause);
        assert_eq!(status.song, Some(QueuePlace { pos: 2, id: 17 }));
        assert_eq!(status.queue_version, 12);
        assert_eq!(status.queue_length, 4);
        assert!(status.options.repeat && status.options.single);
        assert!(!status.options.random);
        assert_eq!(status.options.crossfade, 3);
        assert_eq!(status.elapsed, Some(12.5));
    }

    #[test]
    fn status_without_song_has_no_place() {
        let status = parse_status(&pairs(&[("state", "stop"), ("playlist", "1")])).unwrap();
        assert_eq!(status.song, None);
        assert!(parse_status(&pairs(&[("state", "dancing")])).is_err());
    }

    #[test]
    fn splits_track_records() {
        let records = split_records(
            pairs(&[
                ("file", "a.flac"),
                ("Title", "A"),
                ("Id", "5"),
                ("file", "b.flac"),
                ("Time", "61"),
            ]),
            &["file"],
        );
        assert_eq!(records.len(), 2);

        let a = parse_track(&records[0]);
        assert_eq!((a.title.as_str(), a.id), ("A", Some(5)));
        let b = parse_track(&records[1]);
        assert_eq!((b.file.as_str(), b.duration, b.id), ("b.flac", 61, None));
    }

    #[test]
    fn parses_directory_listing() {
        let entries = parse_directory(pairs(&[
            ("directory", "Rock"),
            ("Last-Modified", "2020-01-01T00:00:00Z"),
            ("file", "Rock/song.mp3"),
            ("Title", "Song"),
            ("playlist", "Mix"),
        ]));
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], DirEntry::Directory("Rock".into()));
        assert!(matches!(&entries[1], DirEntry::File(t) if t.title == "Song"));
        assert_eq!(entries[2], DirEntry::Playlist("Mix".into()));
    }

    #[test]
    fn parses_changes() {
        let changes =
            parse_changes(pairs(&[("cpos", "3"), ("Id", "101"), ("cpos", "4"), ("Id", "102")]))
                .unwrap();
        assert_eq!(
            changes,
            vec![QueueChange { pos: 3, id: 101 }, QueueChange { pos: 4, id: 102 }]
        );
        assert!(parse_changes(pairs(&[("cpos", "3")])).is_err());
    }

    #[test]
    fn parses_ack() {
        match parse_ack("ACK [50@0] {play} No such song") {
            ServiceError::Ack {
                code,
                command,
                message,
            } => {
                assert_eq!(code, 50);
                assert_eq!(command, "play");
                assert_eq!(message, "No such song");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn quotes_arguments() {
        assert_eq!(quote(r#"a "b" \c"#), r#""a \"b\" \\c""#);
    }

    #[test]
    fn encodes_commands() {
        assert_eq!(command_line(&ServiceCommand::Play(Some(3))), "play 3");
        assert_eq!(command_line(&ServiceCommand::Toggle), "pause");
        assert_eq!(
            command_line(&ServiceCommand::SetOption(OptionValue::Crossfade(4))),
            "crossfade 4"
        );
        assert_eq!(
            command_line(&ServiceCommand::Add("My Music/a.flac".into())),
            "add \"My Music/a.flac\""
        );
        assert_eq!(redact("password \"hunter2\""), "password ***");
    }

    /// Scripted server answering each expected request with a canned reply
    async fn serve(script: Vec<(&'static str, &'static str)>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut reader = BufReader::new(read);
            write.write_all(b"OK MPD 0.23.5\n").await.unwrap();
            for (expected, reply) in script {
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                assert_eq!(line.trim_end(), expected);
                write.write_all(reply.as_bytes()).await.unwrap();
            }
        });
        port
    }

    #[tokio::test]
    async fn talks_to_a_server() {
        let port = serve(vec![
            ("status", "state: play\nplaylist: 3\nplaylistlength: 1\nOK\n"),
            ("play 7", "ACK [50@0] {play} Bad song index\n"),
            ("idle", ""),
            ("noidle", "changed: player\nchanged: mixer\nOK\n"),
        ])
        .await;

        let mut client = MpdClient::new("127.0.0.1", port);
        client.connect().await.unwrap();
        assert!(client.is_connected());

        let status = client.status().await.unwrap();
        assert_eq!(status.state, PlayerState::Play);
        assert_eq!(status.queue_version, 3);

        let err = client.execute(&ServiceCommand::Play(Some(7))).await.unwrap_err();
        assert_eq!(err.to_string(), "Bad song index");
        assert!(client.is_connected());

        client.begin_wait().await.unwrap();
        assert!(client.status().await.is_err());
        let tags = client.end_wait().await.unwrap();
        assert_eq!(tags, vec![Subsystem::Player, Subsystem::Mixer]);
    }

    #[tokio::test]
    async fn eof_drops_the_connection() {
        let port = serve(vec![("status", "state: play\n")]).await;
        let mut client = MpdClient::new("127.0.0.1", port);
        client.connect().await.unwrap();

        let err = client.status().await.unwrap_err();
        assert!(matches!(err, ServiceError::Connection(_)));
        assert!(!client.is_connected());
    }
}

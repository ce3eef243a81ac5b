//! Command line, completion and the verb registry
//!
//! The buffer splits on its first unescaped space into a verb and an argument
//! tail (`\ ` escapes a space). Verbs parse their arguments into an
//! [`Action`]; the app executes actions, so parsing never touches the server.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::CommandError;
use crate::model::{PlaybackOption, PubSub};

use super::states::{Mode, ModeArgs};

/// Everything a key binding or a command line can ask the app to do
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,

    // Player control
    Play(Option<usize>),
    Toggle,
    Pause,
    Stop,
    Next,
    Previous,
    SetOption(PlaybackOption, Switch),
    Crossfade(u32),

    // Queue editing
    Clear,
    /// Delete the given queue positions, or the selection when empty
    Delete(Vec<usize>),
    Add(String),
    Update(Option<String>),

    // Main view
    Select { index: isize, relative: bool },
    PlaySelected,
    Search(String),
    EndSearch,
    BrowserEnter,
    BrowserUp,
    BrowserAdd,

    // Modes
    SwitchMode(Mode, ModeArgs),
    Leave,

    // Command line editing
    Complete { forward: bool },
    CycleMatch { forward: bool },
    Execute,
    DeleteChar,

    // Filter box editing
    AcceptFilter,
    CancelFilter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
    Toggle,
}

impl Switch {
    pub fn apply(self, current: bool) -> bool {
        match self {
            Switch::On => true,
            Switch::Off => false,
            Switch::Toggle => !current,
        }
    }
}

/// Completion candidate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub description: String,
}

impl Candidate {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

pub trait Command {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Candidates for argument `index`, which currently reads `partial`
    fn autocomplete(&self, _index: usize, _partial: &str) -> Vec<Candidate> {
        Vec::new()
    }

    fn parse(&self, args: &[String]) -> Result<Action, CommandError>;
}

// ============================================================================
// Commands
// ============================================================================

/// Verb without arguments
struct Simple {
    name: &'static str,
    description: &'static str,
    action: Action,
}

impl Command for Simple {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn parse(&self, _args: &[String]) -> Result<Action, CommandError> {
        Ok(self.action.clone())
    }
}

/// `random|repeat|single|consume [on|off|toggle]`
struct OptionCommand {
    option: PlaybackOption,
    description: &'static str,
}

const SWITCHES: [(&str, &str); 3] = [
    ("on", "Enable"),
    ("off", "Disable"),
    ("toggle", "Flip the current value"),
];

impl Command for OptionCommand {
    fn name(&self) -> &'static str {
        self.option.name()
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn autocomplete(&self, index: usize, partial: &str) -> Vec<Candidate> {
        if index != 0 {
            return Vec::new();
        }
        SWITCHES
            .iter()
            .filter(|(name, _)| name.starts_with(partial))
            .map(|(name, description)| Candidate::new(*name, *description))
            .collect()
    }

    fn parse(&self, args: &[String]) -> Result<Action, CommandError> {
        let switch = match args.first().map(String::as_str) {
            None | Some("toggle") => Switch::Toggle,
            Some("on") | Some("1") => Switch::On,
            Some("off") | Some("0") => Switch::Off,
            Some(other) => {
                return Err(CommandError::InvalidArgument {
                    arg: other.to_string(),
                    description: "expected on, off or toggle".to_string(),
                });
            }
        };
        Ok(Action::SetOption(self.option, switch))
    }
}

struct Crossfade;

impl Command for Crossfade {
    fn name(&self) -> &'static str {
        "crossfade"
    }

    fn description(&self) -> &'static str {
        "Set crossfade in seconds"
    }

    fn parse(&self, args: &[String]) -> Result<Action, CommandError> {
        let arg = args.first().ok_or_else(|| CommandError::MissingArgument {
            verb: self.name().to_string(),
        })?;
        arg.parse::<u32>()
            .map(Action::Crossfade)
            .map_err(|_| CommandError::InvalidArgument {
                arg: arg.clone(),
                description: "expected a number of seconds".to_string(),
            })
    }
}

fn position(arg: &str) -> Result<usize, CommandError> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(CommandError::InvalidArgument {
            arg: arg.to_string(),
            description: "expected a queue position".to_string(),
        }),
    }
}

/// `play [position]`
struct Play;

impl Command for Play {
    fn name(&self) -> &'static str {
        "play"
    }

    fn description(&self) -> &'static str {
        "Start playing, optionally at a queue position"
    }

    fn parse(&self, args: &[String]) -> Result<Action, CommandError> {
        args.first()
            .map(|arg| position(arg))
            .transpose()
            .map(Action::Play)
    }
}

/// `delete [position...]`
struct Delete;

impl Command for Delete {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn description(&self) -> &'static str {
        "Remove songs from the queue"
    }

    fn parse(&self, args: &[String]) -> Result<Action, CommandError> {
        args.iter()
            .map(|arg| position(arg))
            .collect::<Result<Vec<_>, _>>()
            .map(Action::Delete)
    }
}

/// `add <uri>`
struct Add;

impl Command for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn description(&self) -> &'static str {
        "Append a file or directory to the queue"
    }

    fn parse(&self, args: &[String]) -> Result<Action, CommandError> {
        if args.is_empty() {
            return Err(CommandError::MissingArgument {
                verb: self.name().to_string(),
            });
        }
        Ok(Action::Add(args.join(" ")))
    }
}

/// `search [words...]`
struct SearchCommand;

impl Command for SearchCommand {
    fn name(&self) -> &'static str {
        "search"
    }

    fn description(&self) -> &'static str {
        "Filter the current view"
    }

    fn parse(&self, args: &[String]) -> Result<Action, CommandError> {
        if args.is_empty() {
            Ok(Action::EndSearch)
        } else {
            Ok(Action::Search(args.join(" ")))
        }
    }
}

/// `update [path]`
struct Update;

impl Command for Update {
    fn name(&self) -> &'static str {
        "update"
    }

    fn description(&self) -> &'static str {
        "Rescan the music library"
    }

    fn parse(&self, args: &[String]) -> Result<Action, CommandError> {
        Ok(Action::Update(
            (!args.is_empty()).then(|| args.join(" ")),
        ))
    }
}

/// A bare number selects that (1-based) row of the main view
struct NumberCommand;

impl Command for NumberCommand {
    fn name(&self) -> &'static str {
        "#"
    }

    fn description(&self) -> &'static str {
        "Select a row"
    }

    fn parse(&self, args: &[String]) -> Result<Action, CommandError> {
        let arg = args.first().ok_or_else(|| CommandError::MissingArgument {
            verb: self.name().to_string(),
        })?;
        let n: isize = arg.parse().map_err(|_| CommandError::InvalidArgument {
            arg: arg.clone(),
            description: "expected a row number".to_string(),
        })?;
        Ok(Action::Select {
            index: n.saturating_sub(1),
            relative: false,
        })
    }
}

// ============================================================================
// Registry
// ============================================================================

pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Box<dyn Command>>,
    number: NumberCommand,
}

impl CommandRegistry {
    pub fn empty() -> Self {
        Self {
            commands: BTreeMap::new(),
            number: NumberCommand,
        }
    }

    pub fn new() -> Self {
        let mut registry = Self::empty();
        let simple = [
            ("clear", "Clear the queue", Action::Clear),
            ("next", "Play next song in queue", Action::Next),
            ("pause", "Pause playback", Action::Pause),
            ("playpause", "Toggle play/pause", Action::Toggle),
            ("previous", "Play previous song in queue", Action::Previous),
            ("q", "Quit", Action::Quit),
            ("quit", "Quit", Action::Quit),
            ("stop", "Stop playing", Action::Stop),
        ];
        for (name, description, action) in simple {
            registry.register(Box::new(Simple {
                name,
                description,
                action,
            }));
        }

        let options = [
            (PlaybackOption::Consume, "Remove songs from the queue once played"),
            (PlaybackOption::Random, "Play the queue in random order"),
            (PlaybackOption::Repeat, "Start over at the end of the queue"),
            (PlaybackOption::Single, "Stop after the current song"),
        ];
        for (option, description) in options {
            registry.register(Box::new(OptionCommand {
                option,
                description,
            }));
        }

        registry.register(Box::new(Crossfade));
        registry.register(Box::new(Play));
        registry.register(Box::new(Delete));
        registry.register(Box::new(Add));
        registry.register(Box::new(SearchCommand));
        registry.register(Box::new(Update));
        registry
    }

    pub fn register(&mut self, command: Box<dyn Command>) {
        self.commands.insert(command.name(), command);
    }

    pub fn get(&self, verb: &str) -> Option<&dyn Command> {
        self.commands.get(verb).map(|c| c.as_ref())
    }

    /// Registered verbs starting with `prefix`, in name order
    pub fn verbs_with_prefix(&self, prefix: &str) -> Vec<Candidate> {
        self.commands
            .values()
            .filter(|c| c.name().starts_with(prefix))
            .map(|c| Candidate::new(c.name(), c.description()))
            .collect()
    }

    pub fn parse(&self, verb: &str, args: &[String]) -> Result<Action, CommandError> {
        if !verb.is_empty() && verb.chars().all(|c| c.is_ascii_digit()) {
            return self.number.parse(&[verb.to_string()]);
        }
        self.get(verb)
            .ok_or_else(|| CommandError::UnknownVerb(verb.to_string()))?
            .parse(args)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Line splitting
// ============================================================================

/// Split at the first unescaped space into the verb and the raw tail
pub fn split_verb(line: &str) -> (String, Option<&str>) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ' ' => return (unescape(&line[..i]), Some(&line[i + 1..])),
            _ => {}
        }
    }
    (unescape(line), None)
}

/// Split on unescaped spaces, dropping empty tokens
pub fn split_args(tail: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in tail.chars() {
        match c {
            _ if escaped => {
                current.push(c);
                escaped = false;
            }
            '\\' => escaped = true,
            ' ' => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

fn unescape(token: &str) -> String {
    split_args(token).join(" ")
}

pub fn escape(token: &str) -> String {
    token.replace('\\', "\\\\").replace(' ', "\\ ")
}

/// Byte offset where the last token of `line` starts
fn last_token_start(line: &str) -> usize {
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ' ' => start = i + 1,
            _ => {}
        }
    }
    start
}

fn ends_with_separator(line: &str) -> bool {
    line.ends_with(' ') && last_token_start(line) == line.len()
}

// ============================================================================
// Command line
// ============================================================================

/// Candidates being cycled through, plus the text that was typed.
///
/// The cursor ranges over `[-1, len-1]`; -1 stands for the typed text itself,
/// shown as the first entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matches {
    prefix: String,
    candidates: Vec<Candidate>,
    cursor: isize,
}

impl Matches {
    pub fn new(prefix: &str, mut candidates: Vec<Candidate>) -> Self {
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            prefix: prefix.to_string(),
            candidates,
            cursor: -1,
        }
    }

    /// The typed text followed by every candidate
    pub fn entries(&self) -> Vec<Candidate> {
        let mut entries = vec![Candidate::new(self.prefix.clone(), "")];
        entries.extend(self.candidates.iter().cloned());
        entries
    }

    #[cfg(test)]
    pub fn cursor(&self) -> isize {
        self.cursor
    }

    /// Index of the selected entry in [`Matches::entries`]
    pub fn position(&self) -> usize {
        (self.cursor + 1) as usize
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn next(&mut self) {
        self.cursor = if self.cursor + 1 >= self.candidates.len() as isize {
            -1
        } else {
            self.cursor + 1
        };
    }

    pub fn prev(&mut self) {
        self.cursor = if self.cursor <= -1 {
            self.candidates.len() as isize - 1
        } else {
            self.cursor - 1
        };
    }

    pub fn current(&self) -> &str {
        usize::try_from(self.cursor)
            .ok()
            .and_then(|i| self.candidates.get(i))
            .map_or(self.prefix.as_str(), |c| c.name.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandLineEvent {
    Changed,
    MatchesChanged,
    MatchSelected,
}

#[derive(Default)]
pub struct CommandLine {
    buffer: RefCell<String>,
    matches: RefCell<Option<Matches>>,
    pub events: PubSub<CommandLineEvent>,
}

impl CommandLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.buffer.borrow().clone()
    }

    pub fn matches(&self) -> Option<Matches> {
        self.matches.borrow().clone()
    }

    pub fn push(&self, c: char) {
        self.buffer.borrow_mut().push(c);
        self.edited();
    }

    pub fn push_str(&self, s: &str) {
        self.buffer.borrow_mut().push_str(s);
        self.edited();
    }

    pub fn pop(&self) {
        self.buffer.borrow_mut().pop();
        self.edited();
    }

    pub fn clear(&self) {
        self.buffer.borrow_mut().clear();
        self.edited();
    }

    fn edited(&self) {
        self.discard_matches();
        self.events.notify(&CommandLineEvent::Changed);
    }

    fn discard_matches(&self) {
        if self.matches.borrow_mut().take().is_some() {
            self.events.notify(&CommandLineEvent::MatchesChanged);
        }
    }

    fn replace_last_token(&self, text: &str) {
        let mut buffer = self.buffer.borrow_mut();
        let start = last_token_start(&buffer);
        buffer.truncate(start);
        buffer.push_str(&escape(text));
    }

    /// Complete the token under the cursor, or move to the next/previous match
    pub fn complete(&self, registry: &CommandRegistry, forward: bool) {
        if self.matches.borrow().is_some() {
            self.cycle(forward);
            return;
        }

        let line = self.text();
        let (verb, tail) = split_verb(&line);
        let (partial, candidates) = match tail {
            None if !line.ends_with(' ') => (verb.clone(), registry.verbs_with_prefix(&verb)),
            _ => {
                let Some(command) = registry.get(&verb) else {
                    return;
                };
                let mut args = split_args(tail.unwrap_or(""));
                let (index, partial) = if ends_with_separator(&line) {
                    (args.len(), String::new())
                } else {
                    let partial = args.pop().unwrap_or_default();
                    (args.len(), partial)
                };
                (partial.clone(), command.autocomplete(index, &partial))
            }
        };

        match candidates.len() {
            0 => {}
            1 => {
                self.replace_last_token(&candidates[0].name);
                self.events.notify(&CommandLineEvent::Changed);
            }
            _ => {
                let mut matches = Matches::new(&partial, candidates);
                matches.next();
                self.replace_last_token(matches.current());
                *self.matches.borrow_mut() = Some(matches);
                self.events.notify(&CommandLineEvent::MatchesChanged);
                self.events.notify(&CommandLineEvent::Changed);
            }
        }
    }

    /// Step through the active matches. Does nothing without matches.
    pub fn cycle(&self, forward: bool) {
        let current = {
            let mut matches = self.matches.borrow_mut();
            let Some(matches) = matches.as_mut() else {
                return;
            };
            if forward {
                matches.next();
            } else {
                matches.prev();
            }
            matches.current().to_string()
        };
        self.replace_last_token(&current);
        self.events.notify(&CommandLineEvent::MatchSelected);
        self.events.notify(&CommandLineEvent::Changed);
    }

    /// Parse the buffer into an action. `Ok(None)` for a blank line.
    pub fn parse(&self, registry: &CommandRegistry) -> Result<Option<Action>, CommandError> {
        let line = self.text();
        let (verb, tail) = split_verb(line.trim_start());
        if verb.is_empty() {
            return Ok(None);
        }
        let args = split_args(tail.unwrap_or(""));
        registry.parse(&verb, &args).map(Some)
    }
}

//! Line-oriented console for driving a helper session from a terminal.

use std::time::Duration;

use lifeline_config::schema::InteractionMode;
use lifeline_session::{
    AlertOutcome, AudioClip, AudioError, AudioExchange, HelperSession, LinkState, LogEntry,
    Origin, ALERT_PROMPT,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

const DEFAULT_PTT_SECS: u64 = 3;

const HELP: &str = "\
Commands:
  say <text>     send a chat message
  ptt [secs]     record and send a voice clip (hold mode: for secs, default 3)
  hold           start recording
  release        stop recording and send
  locate         send a fresh position
  alert          send an emergency alert (asks first)
  log            show the conversation so far
  status         show link, audio and position state
  help           show this help
  quit           leave the session";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Say(String),
    Ptt(Option<u64>),
    Hold,
    Release,
    Locate,
    Alert,
    Log,
    Status,
    Help,
    Quit,
}

/// Parse one input line. `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "say" => {
            if rest.is_empty() {
                return Err("usage: say <text>".into());
            }
            Command::Say(rest.to_string())
        }
        "ptt" => match rest {
            "" => Command::Ptt(None),
            secs => match secs.parse::<u64>() {
                Ok(n) if n > 0 => Command::Ptt(Some(n)),
                _ => return Err(format!("invalid duration: {secs}")),
            },
        },
        "hold" => Command::Hold,
        "release" => Command::Release,
        "locate" => Command::Locate,
        "alert" => Command::Alert,
        "log" => Command::Log,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {other} (try 'help')")),
    };
    Ok(Some(command))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn describe(entry: &LogEntry) -> String {
    let stamp = entry.created_at().format("%H:%M:%S");
    let who = match entry.origin() {
        Origin::Local => "you",
        Origin::Remote => "owner",
    };
    match entry {
        LogEntry::Chat(chat) => format!("[{stamp}] {who}: {}", chat.body),
        LogEntry::Audio(clip) => format!("[{stamp}] {who}: voice clip ({} bytes)", clip.len()),
    }
}

fn report_clip(result: Result<Option<AudioClip>, AudioError>) {
    match result {
        Ok(Some(clip)) => println!("Voice clip recorded ({} bytes)", clip.len()),
        Ok(None) => println!("Recording..."),
        Err(e) => println!("Voice clip failed: {e}"),
    }
}

/// Pending automatic release for a timed `ptt`. At most one at a time.
#[derive(Default)]
struct ReleaseTimer(Option<JoinHandle<()>>);

impl ReleaseTimer {
    fn schedule(&mut self, audio: AudioExchange, after: Duration) {
        self.cancel();
        self.0 = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            report_clip(audio.release().await);
        }));
    }

    fn cancel(&mut self) {
        if let Some(timer) = self.0.take() {
            timer.abort();
        }
    }
}

impl Drop for ReleaseTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct Console<'a> {
    session: &'a HelperSession,
    mode: InteractionMode,
    awaiting_alert: bool,
    release_timer: ReleaseTimer,
}

impl<'a> Console<'a> {
    fn new(session: &'a HelperSession, mode: InteractionMode) -> Self {
        Self {
            session,
            mode,
            awaiting_alert: false,
            release_timer: ReleaseTimer::default(),
        }
    }

    /// Returns `false` when the user asked to leave.
    async fn handle_line(&mut self, line: &str) -> bool {
        if self.awaiting_alert {
            self.awaiting_alert = false;
            let confirmed = is_yes(line);
            match self.session.alert().trigger(&|_: &str| confirmed) {
                AlertOutcome::Sent => println!("Alert sent"),
                AlertOutcome::Cancelled => println!("Alert cancelled"),
            }
            return true;
        }

        let command = match parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => return true,
            Err(msg) => {
                println!("{msg}");
                return true;
            }
        };

        // Any manual audio command supersedes a timed release.
        if matches!(command, Command::Ptt(_) | Command::Hold | Command::Release) {
            self.release_timer.cancel();
        }

        match command {
            Command::Say(text) => {
                if let Err(e) = self.session.chat().send(&text) {
                    println!("Not sent: {e}");
                }
            }
            Command::Ptt(secs) => self.push_to_talk(secs).await,
            Command::Hold => {
                if let Err(e) = self.session.audio().press().await {
                    println!("Cannot record: {e}");
                } else {
                    println!("Recording... type 'release' to send");
                }
            }
            Command::Release => report_clip(self.session.audio().release().await),
            Command::Locate => match self.session.location().locate_once(false).await {
                Ok(sample) => println!(
                    "Position {:.5}, {:.5}",
                    sample.latitude, sample.longitude
                ),
                Err(e) => println!("Location failed: {e}"),
            },
            Command::Alert => {
                self.awaiting_alert = true;
                println!("{ALERT_PROMPT} [y/N]");
            }
            Command::Log => {
                for entry in self.session.log().snapshot() {
                    println!("{}", describe(&entry));
                }
            }
            Command::Status => self.print_status(),
            Command::Help => println!("{HELP}"),
            Command::Quit => return false,
        }
        true
    }

    async fn push_to_talk(&mut self, secs: Option<u64>) {
        let session = self.session;
        let audio = session.audio();
        match self.mode {
            InteractionMode::Toggle => report_clip(audio.toggle().await),
            InteractionMode::Hold => {
                let secs = secs.unwrap_or(DEFAULT_PTT_SECS);
                if let Err(e) = audio.press().await {
                    println!("Cannot record: {e}");
                    return;
                }
                println!("Recording for {secs}s...");
                self.release_timer
                    .schedule(audio.clone(), Duration::from_secs(secs));
            }
        }
    }

    fn print_status(&self) {
        let connection = self.session.connection();
        println!("Room:     {}", self.session.room_token());
        if connection.is_unreachable() {
            println!("Link:     unreachable");
        } else {
            println!("Link:     {:?}", connection.link_state());
        }
        println!("Audio:    {:?}", self.session.audio().state());
        match self.session.location().latest() {
            Some(sample) => println!(
                "Position: {:.5}, {:.5} at {}",
                sample.latitude,
                sample.longitude,
                sample.captured_at.format("%H:%M:%S")
            ),
            None => println!("Position: unknown"),
        }
        if let Some(e) = self.session.location().last_error() {
            println!("Location: {e}");
        }
    }
}

/// Read commands from stdin until `quit`, end of input or Ctrl-C.
///
/// Remote messages and link changes are printed as they arrive.
pub async fn run(session: &HelperSession, mode: InteractionMode) -> lifeline_common::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut entries = session.log().subscribe();
    let mut link = session.connection().watch_link_state();
    let mut entries_open = true;
    let mut link_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut console = Console::new(session, mode);

    println!("Joined room {}. Type 'help' for commands.", session.room_token());

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !console.handle_line(&line).await {
                        break;
                    }
                }
                None => break,
            },
            entry = entries.recv(), if entries_open => match entry {
                Ok(entry) if entry.origin() == Origin::Remote => println!("{}", describe(&entry)),
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "Console fell behind the log"),
                Err(RecvError::Closed) => entries_open = false,
            },
            changed = link.changed(), if link_open => match changed {
                Ok(()) => {
                    let state = *link.borrow_and_update();
                    match state {
                        LinkState::Joined => println!("* connected"),
                        LinkState::Disconnected if session.connection().is_unreachable() => {
                            println!("* relay unreachable")
                        }
                        LinkState::Disconnected => println!("* connection lost, retrying"),
                        LinkState::Connecting => {}
                    }
                }
                Err(_) => link_open = false,
            },
            _ = &mut shutdown => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }
    Ok(())
}

//! Line-oriented game client: reads commands from stdin, drives a
//! [`Session`] and prints the match as it changes.

use anyhow::Result;
use log::{debug, warn};
use pocket_uno::{
    MatchConfig, Session, SessionError, SessionEvent,
    game::PresentationQueue,
    net::Transport,
};
use std::time::Duration;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::Instant,
};

use crate::commands::{ClientCommand, HELP_TEXT, parse_command};

/// Whether the input loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// What woke the input loop up.
enum Input {
    Line(Option<String>),
    Event(Result<SessionEvent, SessionError>),
    Tick,
}

pub struct GameClient<T: Transport> {
    session: Session<T>,
    config: MatchConfig,
    presentation: PresentationQueue,
    started: Instant,
}

impl<T: Transport> GameClient<T> {
    pub fn new(session: Session<T>, config: MatchConfig) -> Self {
        Self {
            session,
            config,
            presentation: PresentationQueue::new(),
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Runs a parsed command against the session.
    pub async fn execute(&mut self, command: ClientCommand) -> Result<Flow, SessionError> {
        match command {
            ClientCommand::Play { card_index, color } => {
                self.session.play_card(card_index, color).await?
            }
            ClientCommand::Draw => self.session.draw_card().await?,
            ClientCommand::Uno => self.session.press_uno().await?,
            ClientCommand::Start => self.session.start_match(&self.config).await?,
            ClientCommand::Help => println!("{HELP_TEXT}"),
            ClientCommand::Quit => return Ok(Flow::Quit),
        }
        self.schedule_moves();
        Ok(Flow::Continue)
    }

    /// Processes one session event. Returns `Flow::Quit` once the other
    /// side is gone for good.
    pub fn handle_event(&mut self, event: SessionEvent) -> Flow {
        match &event {
            SessionEvent::Ignored => return Flow::Continue,
            SessionEvent::Closed => {
                println!("Connection closed.");
                return Flow::Quit;
            }
            SessionEvent::PeerLeft { player: None, .. } if !self.session.is_host() => {
                println!("The host left the game.");
                return Flow::Quit;
            }
            SessionEvent::Rejected { .. } => warn!("{event}"),
            _ => debug!("{event}"),
        }
        println!("* {event}");
        self.schedule_moves();
        Flow::Continue
    }

    /// Waits for the next session event and processes it.
    pub async fn next_event(&mut self) -> Result<SessionEvent, SessionError> {
        let event = self.session.next_event().await?;
        self.handle_event(event.clone());
        Ok(event)
    }

    fn schedule_moves(&mut self) {
        let moves = self.session.drain_events();
        if !moves.is_empty() {
            let now = self.elapsed();
            self.presentation.schedule(now, moves);
        }
    }

    /// The local player's picture of the match.
    #[must_use]
    pub fn render(&self) -> String {
        match self.session.view() {
            Some(view) => view.to_string(),
            None => {
                let mut out = String::from("lobby:\n");
                for entry in self.session.roster() {
                    let host = if entry.is_host { " (host)" } else { "" };
                    out.push_str(&format!("  {}{host}\n", entry.name));
                }
                if self.session.is_host() {
                    out.push_str("type 'start' once everybody is in\n");
                }
                out
            }
        }
    }

    /// Reads stdin until `quit`, EOF or the session closes.
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("{HELP_TEXT}\n");
        println!("{}", self.render());

        loop {
            let due = self.presentation.next_due();
            let started = self.started;
            let input = tokio::select! {
                line = lines.next_line() => Input::Line(line?),
                event = self.session.next_event() => Input::Event(event),
                () = wait_until(started, due) => Input::Tick,
            };

            let flow = match input {
                Input::Line(None) => Flow::Quit,
                Input::Line(Some(line)) if line.trim().is_empty() => continue,
                Input::Line(Some(line)) => match parse_command(&line) {
                    Ok(command) => match self.execute(command).await {
                        Ok(flow) => {
                            if flow == Flow::Continue && command != ClientCommand::Help {
                                println!("{}", self.render());
                            }
                            flow
                        }
                        Err(e) => {
                            eprintln!("Error: {e}");
                            Flow::Continue
                        }
                    },
                    Err(e) => {
                        eprintln!("Error: {e}");
                        Flow::Continue
                    }
                },
                Input::Event(Ok(event)) => {
                    let flow = self.handle_event(event);
                    if flow == Flow::Continue {
                        println!("{}", self.render());
                    }
                    flow
                }
                Input::Event(Err(e)) => {
                    eprintln!("Connection error: {e}");
                    Flow::Quit
                }
                Input::Tick => {
                    let now = self.elapsed();
                    for moved in self.presentation.pop_due(now) {
                        println!("  {moved}");
                    }
                    Flow::Continue
                }
            };

            if flow == Flow::Quit {
                break;
            }
        }

        println!("Disconnecting...");
        Ok(())
    }
}

/// Sleeps until the next presentation event is due, or forever.
async fn wait_until(started: Instant, due: Option<Duration>) {
    match due {
        Some(due) => tokio::time::sleep_until(started + due).await,
        None => std::future::pending().await,
    }
}

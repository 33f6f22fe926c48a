//! Synchronization layer: keeps one [`GameState`] per participant in step
//! by replaying the same commands everywhere.
//!
//! Local commands are applied optimistically and then broadcast. The host
//! is authoritative: it checks that a joiner only acts for its own seat,
//! applies the command and relays it to every other joiner. Joiners only
//! accept commands that arrive from the host.

use log::{debug, info, warn};
use std::{collections::BTreeMap, collections::VecDeque, fmt, sync::Arc};
use thiserror::Error;

use crate::{
    game::{
        CardMoved, Color, GameState, MatchConfig, MatchView, MoveError, Phase, PlayerId, Profile,
        RosterEntry,
        constants::{MAX_PLAYERS, MIN_PLAYERS},
    },
    net::{
        Command, HOST_PEER, IdGenerator, Message, PeerId, ProtocolError, Recipient, Role,
        Transport, TransportError, TransportEvent,
        messages::{DrawCard, GameStart, PlayCard, PlayerConnected, PlayerList, PressUno},
    },
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("only the host can do that")]
    NotHost,
    #[error("not seated in a match")]
    NotStarted,
    #[error("invalid match config: {0}")]
    Config(String),
}

/// What happened while processing one transport event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionEvent {
    /// Host: a joiner opened a channel and was assigned a player id.
    PeerConnected { peer: PeerId, player: PlayerId },
    /// Joiner: the host assigned us a player id.
    Welcomed(PlayerId),
    RosterUpdated,
    MatchStarted,
    /// A remote command was replayed against the local state.
    Applied(Command),
    /// A remote command the local rule engine refused.
    Rejected { command: Command, error: MoveError },
    PeerLeft {
        peer: PeerId,
        player: Option<PlayerId>,
    },
    /// Nothing to do: unknown tag, malformed record or out-of-place message.
    Ignored,
    /// The channel is gone for good.
    Closed,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerConnected { peer, player } => write!(f, "peer {peer} connected as {player}"),
            Self::Welcomed(id) => write!(f, "joined as {id}"),
            Self::RosterUpdated => write!(f, "lobby updated"),
            Self::MatchStarted => write!(f, "match started"),
            Self::Applied(command) => write!(f, "{command}"),
            Self::Rejected { command, error } => write!(f, "rejected \"{command}\": {error}"),
            Self::PeerLeft { player: Some(player), .. } => write!(f, "{player} left"),
            Self::PeerLeft { peer, .. } => write!(f, "peer {peer} left"),
            Self::Ignored => write!(f, "ignored"),
            Self::Closed => write!(f, "connection closed"),
        }
    }
}

pub struct Session<T: Transport> {
    transport: T,
    ids: Arc<dyn IdGenerator>,
    profile: Profile,
    local_id: Option<PlayerId>,
    roster: Vec<RosterEntry>,
    /// Host only: which player each connection speaks for.
    peers: BTreeMap<PeerId, PlayerId>,
    state: GameState,
}

impl<T: Transport> Session<T> {
    /// A host session over a hosting transport. The host seats itself
    /// first in the roster.
    pub fn host(transport: T, ids: Arc<dyn IdGenerator>, profile: Profile) -> Self {
        let local_id = ids.player_id();
        let roster = vec![RosterEntry::new(local_id.clone(), &profile, true)];
        Self {
            transport,
            ids,
            profile,
            local_id: Some(local_id),
            roster,
            peers: BTreeMap::new(),
            state: GameState::new(),
        }
    }

    /// A joiner session; the player id arrives with `PLAYER_CONNECTED`.
    pub fn join(transport: T, ids: Arc<dyn IdGenerator>, profile: Profile) -> Self {
        Self {
            transport,
            ids,
            profile,
            local_id: None,
            roster: Vec::new(),
            peers: BTreeMap::new(),
            state: GameState::new(),
        }
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.transport.role()
    }

    #[must_use]
    pub fn is_host(&self) -> bool {
        self.role() == Role::Host
    }

    #[must_use]
    pub fn local_id(&self) -> Option<&PlayerId> {
        self.local_id.as_ref()
    }

    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    #[must_use]
    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Local seat in the running match.
    #[must_use]
    pub fn local_seat(&self) -> Option<usize> {
        self.local_id
            .as_ref()
            .and_then(|id| self.state.player_index(id))
    }

    /// The match as the local player sees it.
    #[must_use]
    pub fn view(&self) -> Option<MatchView> {
        self.local_seat().map(|seat| self.state.view_for(seat))
    }

    /// Presentation events recorded since the last drain.
    pub fn drain_events(&mut self) -> VecDeque<CardMoved> {
        self.state.drain_events()
    }

    /// Host only: deals a new match to the current roster and announces it
    /// with the deck seed.
    pub async fn start_match(&mut self, config: &MatchConfig) -> Result<(), SessionError> {
        if !self.is_host() {
            return Err(SessionError::NotHost);
        }
        config.validate().map_err(SessionError::Config)?;
        if !config.accepts(self.roster.len()) {
            return Err(MoveError::InvalidRoster {
                min: MIN_PLAYERS,
                max: config.max_players,
                actual: self.roster.len(),
            }
            .into());
        }

        let seed = self.ids.seed();
        let mut state = GameState::new();
        state.start_match(config.variant, self.roster.clone(), config.rules, seed)?;
        self.state = state;

        let start = Message::GameStart(GameStart {
            variant: config.variant,
            rules: config.rules,
            players: self.roster.clone(),
            seed,
        });
        self.broadcast(Recipient::All, &start).await
    }

    pub async fn play_card(
        &mut self,
        card_index: usize,
        chosen_color: Option<Color>,
    ) -> Result<(), SessionError> {
        let seat = self.local_seat().ok_or(SessionError::NotStarted)?;
        self.submit(Command::Play(PlayCard {
            player_index: seat,
            card_index,
            chosen_color,
        }))
        .await
    }

    pub async fn draw_card(&mut self) -> Result<(), SessionError> {
        let player_id = self.seated_id()?;
        self.submit(Command::Draw(DrawCard { player_id })).await
    }

    pub async fn press_uno(&mut self) -> Result<(), SessionError> {
        let caller_id = self.seated_id()?;
        self.submit(Command::PressUno(PressUno { caller_id })).await
    }

    fn seated_id(&self) -> Result<PlayerId, SessionError> {
        self.local_seat().ok_or(SessionError::NotStarted)?;
        self.local_id.clone().ok_or(SessionError::NotStarted)
    }

    /// Applies a local command, then tells everybody else.
    async fn submit(&mut self, command: Command) -> Result<(), SessionError> {
        command.apply(&mut self.state)?;
        debug!("local: {command}");
        self.broadcast(Recipient::All, &Message::from(command)).await
    }

    async fn broadcast(&mut self, to: Recipient, message: &Message) -> Result<(), SessionError> {
        let text = message.encode()?;
        self.transport.send(to, &text).await?;
        Ok(())
    }

    /// Sends to a single peer. Returns `false` when the peer is already
    /// gone; its `Disconnected` event follows on the transport.
    async fn send_to(&mut self, peer: PeerId, message: &Message) -> Result<bool, SessionError> {
        match self.broadcast(Recipient::Peer(peer), message).await {
            Ok(()) => Ok(true),
            Err(SessionError::Transport(TransportError::UnknownPeer(_) | TransportError::Closed)) => {
                warn!("peer {peer} left before we could reach it");
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    /// Waits for the next transport event and processes it.
    pub async fn next_event(&mut self) -> Result<SessionEvent, SessionError> {
        let Some(event) = self.transport.recv().await else {
            info!("transport closed");
            return Ok(SessionEvent::Closed);
        };
        match event {
            TransportEvent::Connected(peer) => self.on_connected(peer).await,
            TransportEvent::Disconnected(peer) => self.on_disconnected(peer).await,
            TransportEvent::Message { from, text } => {
                let message = match Message::decode(&text) {
                    Ok(Some(message)) => message,
                    Ok(None) => return Ok(SessionEvent::Ignored),
                    Err(error) => {
                        warn!("dropping message from peer {from}: {error}");
                        return Ok(SessionEvent::Ignored);
                    }
                };
                match message.into_command() {
                    Ok(command) => self.on_command(from, command).await,
                    Err(control) => self.on_control(from, control).await,
                }
            }
        }
    }

    async fn on_connected(&mut self, peer: PeerId) -> Result<SessionEvent, SessionError> {
        if !self.is_host() {
            return Ok(SessionEvent::Ignored);
        }
        let player = self.ids.player_id();
        self.peers.insert(peer, player.clone());
        info!("peer {peer} connected, assigned {player}");
        let welcome = Message::PlayerConnected(PlayerConnected {
            player_id: player.clone(),
        });
        if !self.send_to(peer, &welcome).await? {
            self.peers.remove(&peer);
            return Ok(SessionEvent::PeerLeft {
                peer,
                player: Some(player),
            });
        }
        Ok(SessionEvent::PeerConnected { peer, player })
    }

    async fn on_disconnected(&mut self, peer: PeerId) -> Result<SessionEvent, SessionError> {
        if !self.is_host() {
            info!("host left");
            return Ok(SessionEvent::PeerLeft { peer, player: None });
        }
        let Some(id) = self.peers.remove(&peer) else {
            debug!("peer {peer} was already gone");
            return Ok(SessionEvent::Ignored);
        };
        info!("{id} (peer {peer}) left");
        if self.state.phase() == Phase::Lobby {
            self.roster.retain(|entry| entry.id != id);
            self.send_roster().await?;
        }
        Ok(SessionEvent::PeerLeft {
            peer,
            player: Some(id),
        })
    }

    async fn on_control(&mut self, from: PeerId, message: Message) -> Result<SessionEvent, SessionError> {
        match (self.role(), message) {
            (Role::Host, Message::HelloIAm(profile)) => {
                let Some(id) = self.peers.get(&from).cloned() else {
                    warn!("hello from unknown peer {from}");
                    return Ok(SessionEvent::Ignored);
                };
                if self.state.phase() != Phase::Lobby {
                    warn!("{id} said hello after the match started");
                    return Ok(SessionEvent::Ignored);
                }
                let profile = Profile::new(&profile.name, profile.avatar);
                let seated = self.roster.len();
                match self.roster.iter_mut().find(|entry| entry.id == id) {
                    Some(entry) => {
                        entry.name = profile.name;
                        entry.avatar = profile.avatar;
                    }
                    None if seated >= MAX_PLAYERS => {
                        warn!("lobby is full, not seating {id}");
                        return Ok(SessionEvent::Ignored);
                    }
                    None => self.roster.push(RosterEntry::new(id, &profile, false)),
                }
                self.send_roster().await?;
                Ok(SessionEvent::RosterUpdated)
            }
            (Role::Joiner, message) if from != HOST_PEER => {
                warn!("ignoring {message} from non-host peer {from}");
                Ok(SessionEvent::Ignored)
            }
            (Role::Joiner, Message::PlayerConnected(PlayerConnected { player_id })) => {
                info!("host assigned us {player_id}");
                self.local_id = Some(player_id.clone());
                let hello = Message::HelloIAm(self.profile.clone());
                self.send_to(HOST_PEER, &hello).await?;
                Ok(SessionEvent::Welcomed(player_id))
            }
            (Role::Joiner, Message::UpdatePlayerList(PlayerList { players })) => {
                self.roster = players;
                Ok(SessionEvent::RosterUpdated)
            }
            (Role::Joiner, Message::GameStart(start)) => {
                let mut state = GameState::new();
                if let Err(error) =
                    state.start_match(start.variant, start.players.clone(), start.rules, start.seed)
                {
                    warn!("couldn't start announced match: {error}");
                    return Ok(SessionEvent::Ignored);
                }
                self.roster = start.players;
                self.state = state;
                info!("match started: {} players, seed {}", self.roster.len(), start.seed);
                Ok(SessionEvent::MatchStarted)
            }
            (role, message) => {
                warn!("{role} ignoring unexpected {message} from peer {from}");
                Ok(SessionEvent::Ignored)
            }
        }
    }

    async fn on_command(&mut self, from: PeerId, command: Command) -> Result<SessionEvent, SessionError> {
        match self.role() {
            Role::Host => {
                let sender = self.peers.get(&from).and_then(|id| self.state.player_index(id));
                if sender.is_none() || command.seat(&self.state) != sender {
                    warn!("peer {from} tried to act for another seat: {command}");
                    return Ok(SessionEvent::Rejected {
                        command,
                        error: MoveError::InvalidPlayer,
                    });
                }
            }
            Role::Joiner if from != HOST_PEER => {
                warn!("ignoring command from non-host peer {from}");
                return Ok(SessionEvent::Ignored);
            }
            Role::Joiner => {}
        }

        if let Err(error) = command.apply(&mut self.state) {
            warn!("rejected remote command \"{command}\": {error}");
            return Ok(SessionEvent::Rejected { command, error });
        }
        debug!("replayed: {command}");
        if self.is_host() {
            self.broadcast(Recipient::AllExcept(from), &Message::from(command.clone()))
                .await?;
        }
        Ok(SessionEvent::Applied(command))
    }

    async fn send_roster(&mut self) -> Result<(), SessionError> {
        let list = Message::UpdatePlayerList(PlayerList {
            players: self.roster.clone(),
        });
        self.broadcast(Recipient::All, &list).await
    }
}

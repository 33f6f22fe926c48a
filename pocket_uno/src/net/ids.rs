//! Injectable id sources for room codes, player ids, connection ids and
//! match seeds.

use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};

use super::{super::game::PlayerId, transport::PeerId};

pub const ROOM_CODE_LENGTH: usize = 4;

pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Prefix that turns a short room code into the relay rendezvous id.
pub const RENDEZVOUS_PREFIX: &str = "pocket-uno-";

pub trait IdGenerator: Send + Sync {
    /// A fresh short room code shown to the host's players.
    fn room_code(&self) -> String;

    fn player_id(&self) -> PlayerId;

    /// A connection id; never [`super::transport::HOST_PEER`].
    fn connection_id(&self) -> PeerId;

    /// Deck seed for a new match.
    fn seed(&self) -> u64;
}

/// Production ids from the thread RNG.
#[derive(Debug)]
pub struct RandomIds {
    next_connection: AtomicU32,
}

impl RandomIds {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_connection: AtomicU32::new(1),
        }
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for RandomIds {
    fn room_code(&self) -> String {
        let mut rng = rand::rng();
        (0..ROOM_CODE_LENGTH)
            .map(|_| {
                let index = rng.random_range(0..ROOM_CODE_ALPHABET.len());
                char::from(ROOM_CODE_ALPHABET[index])
            })
            .collect()
    }

    fn player_id(&self) -> PlayerId {
        PlayerId::new(&format!("player-{:08x}", rand::rng().random::<u32>()))
    }

    fn connection_id(&self) -> PeerId {
        self.next_connection.fetch_add(1, Ordering::Relaxed)
    }

    fn seed(&self) -> u64 {
        rand::rng().random()
    }
}

/// Deterministic ids for tests: `p1`, `p2`, ... and a fixed seed.
#[derive(Debug)]
pub struct SequentialIds {
    seed: u64,
    next_room: AtomicU32,
    next_player: AtomicU32,
    next_connection: AtomicU32,
}

impl SequentialIds {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            next_room: AtomicU32::new(0),
            next_player: AtomicU32::new(1),
            next_connection: AtomicU32::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn room_code(&self) -> String {
        let mut n = self.next_room.fetch_add(1, Ordering::Relaxed) as usize;
        let mut code = [ROOM_CODE_ALPHABET[0]; ROOM_CODE_LENGTH];
        for slot in code.iter_mut().rev() {
            *slot = ROOM_CODE_ALPHABET[n % ROOM_CODE_ALPHABET.len()];
            n /= ROOM_CODE_ALPHABET.len();
        }
        code.iter().map(|&b| char::from(b)).collect()
    }

    fn player_id(&self) -> PlayerId {
        let n = self.next_player.fetch_add(1, Ordering::Relaxed);
        PlayerId::new(&format!("p{n}"))
    }

    fn connection_id(&self) -> PeerId {
        self.next_connection.fetch_add(1, Ordering::Relaxed)
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}

#[must_use]
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LENGTH && code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b))
}

/// Uppercases and trims typed input; `None` if it can't be a room code.
#[must_use]
pub fn normalize_room_code(input: &str) -> Option<String> {
    let code = input.trim().to_ascii_uppercase();
    is_valid_room_code(&code).then_some(code)
}

#[must_use]
pub fn rendezvous_id(code: &str) -> String {
    format!("{RENDEZVOUS_PREFIX}{code}")
}

/// Inverse of [`rendezvous_id`].
#[must_use]
pub fn room_code_of(rendezvous: &str) -> Option<&str> {
    rendezvous
        .strip_prefix(RENDEZVOUS_PREFIX)
        .filter(|code| is_valid_room_code(code))
}

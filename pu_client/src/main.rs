//! A terminal client for pocket_uno.
//!
//! Hosts or joins a room over the relay, or directly over TCP, and plays
//! from the keyboard.

use anyhow::{Context, Result, bail};
use log::info;
use pico_args::Arguments;
use pocket_uno::{
    MatchConfig, Profile, Rules, Session, Variant,
    net::{
        IdGenerator, RandomIds, Transport,
        ids::normalize_room_code,
        relay::RelayTransport,
        stream::StreamTransport,
    },
};
use std::sync::Arc;

use pu_client::game_client::GameClient;

const HELP: &str = "\
Play pocket_uno from the terminal

USAGE:
  pu_client host [OPTIONS]
  pu_client join [CODE] [OPTIONS]

OPTIONS:
  --relay URL           Relay WebSocket URL  [default: env POCKET_UNO_RELAY or ws://127.0.0.1:7878/ws]
  --tcp ADDR            Skip the relay: host listens on ADDR, joiner dials ADDR
  --name NAME           Display name  [default: env POCKET_UNO_NAME or your username]
  --avatar N            Avatar index  [default: 0]
  --variant NAME        classic, no-mercy or flip  [default: env POCKET_UNO_VARIANT or classic]

RULE FLAGS (host only):
  --no-stacking         Penalty cards can't be stacked
  --seven-zero          7 swaps hands, 0 rotates hands
  --jump-in             Identical cards may be played out of turn
  --forced-play         Drawing is only allowed without a playable card

FLAGS:
  -h, --help            Print help information
";

const DEFAULT_RELAY: &str = "ws://127.0.0.1:7878/ws";

enum Mode {
    Host,
    Join { code: Option<String> },
}

struct Args {
    mode: Mode,
    relay: String,
    tcp: Option<String>,
    profile: Profile,
    config: MatchConfig,
}

fn env_or(key: &str, default: impl FnOnce() -> String) -> String {
    std::env::var(key).unwrap_or_else(|_| default())
}

fn parse_args() -> Result<Args> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let mode = match pargs.subcommand()?.as_deref() {
        Some("host") => Mode::Host,
        Some("join") => Mode::Join { code: None },
        Some(other) => bail!("unknown mode '{other}', expected 'host' or 'join'"),
        None => bail!("missing mode, expected 'host' or 'join' (see --help)"),
    };

    let relay = pargs
        .opt_value_from_str("--relay")?
        .unwrap_or_else(|| env_or("POCKET_UNO_RELAY", || DEFAULT_RELAY.to_string()));
    let tcp: Option<String> = pargs.opt_value_from_str("--tcp")?;
    let name = pargs
        .opt_value_from_str("--name")?
        .unwrap_or_else(|| env_or("POCKET_UNO_NAME", whoami::username));
    let avatar: u8 = pargs.opt_value_from_str("--avatar")?.unwrap_or(0);
    let variant: Variant = match pargs.opt_value_from_str::<_, String>("--variant")? {
        Some(name) => name.parse()?,
        None => env_or("POCKET_UNO_VARIANT", || "classic".to_string()).parse()?,
    };
    let rules = Rules {
        stacking: !pargs.contains("--no-stacking"),
        seven_zero: pargs.contains("--seven-zero"),
        jump_in: pargs.contains("--jump-in"),
        forced_play: pargs.contains("--forced-play"),
    };

    let mode = match mode {
        Mode::Join { .. } => Mode::Join {
            code: pargs.opt_free_from_str()?,
        },
        host => host,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        bail!("unexpected arguments: {remaining:?}");
    }

    Ok(Args {
        mode,
        relay,
        tcp,
        profile: Profile::new(&name, avatar),
        config: MatchConfig::new(variant, rules),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();
    env_logger::builder().format_target(false).init();

    let args = parse_args()?;
    let ids: Arc<dyn IdGenerator> = Arc::new(RandomIds::new());

    match (args.mode, args.tcp) {
        (Mode::Host, Some(addr)) => {
            let link = StreamTransport::host(addr.as_str(), Arc::clone(&ids))
                .await
                .with_context(|| format!("Failed to listen on {addr}"))?;
            println!("Hosting on {}. Joiners use --tcp {}", link.local_addr(), link.local_addr());
            play(Session::host(link, ids, args.profile), args.config).await
        }
        (Mode::Host, None) => {
            let link = RelayTransport::host(&args.relay, Arc::clone(&ids))
                .await
                .with_context(|| format!("Failed to open a room on {}", args.relay))?;
            println!("Room code: {}", link.room_code());
            play(Session::host(link, ids, args.profile), args.config).await
        }
        (Mode::Join { .. }, Some(addr)) => {
            let link = StreamTransport::join(addr.as_str())
                .await
                .with_context(|| format!("Failed to connect to {addr}"))?;
            play(Session::join(link, ids, args.profile), args.config).await
        }
        (Mode::Join { code }, None) => {
            let Some(code) = code.as_deref().and_then(normalize_room_code) else {
                bail!("join needs a 4-character room code (or --tcp ADDR)");
            };
            let link = RelayTransport::join(&args.relay, &code)
                .await
                .with_context(|| format!("Failed to join room {code}"))?;
            play(Session::join(link, ids, args.profile), args.config).await
        }
    }
}

async fn play<T: Transport>(session: Session<T>, config: MatchConfig) -> Result<()> {
    info!("playing as {} ({})", session.profile().name, session.role());
    GameClient::new(session, config).run().await
}

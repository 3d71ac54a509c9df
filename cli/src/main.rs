// SPDX-License-Identifier: MIT OR Apache-2.0

//! Onitama CLI - play from a terminal
//!
//! Headless front end over the session layer: hot-seat play, a game
//! against the AI (optionally with training rankings), or a remote game
//! through a TCP relay, which this binary can also run. Logs go to stderr so
//! they never mix with the board.

mod render;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use onitama_core::agents::{Agent, Difficulty};
use onitama_core::{Action, Card, Engine, StandardRules};
use onitama_network::config::{default_config_path, load_config};
use onitama_network::{
    ConnectionStatus, GameSession, LocalSession, RemoteSession, SessionConfig, SessionEvent, SinglePlayerSession,
    TcpConnector, TcpRelay,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncBufReadExt;
use tokio::signal;
use tokio::sync::broadcast;

/// How often worker replies and relay traffic are collected
const PUMP_INTERVAL: Duration = Duration::from_millis(50);

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(name = "onitama", about = "Onitama command-line client", version)]
struct Args {
    /// Who plays Blue
    #[clap(short, long, value_enum, default_value = "ai")]
    mode: Mode,

    /// AI strength, overrides the config file
    #[clap(short, long)]
    difficulty: Option<Difficulty>,

    /// AI search strategy, overrides the config file
    #[clap(short, long)]
    agent: Option<Agent>,

    /// Room to join in `join` mode
    #[clap(short, long, required_if_eq("mode", "join"))]
    room: Option<String>,

    /// Relay address, overrides `server_url` from the config file
    #[clap(long)]
    server: Option<String>,

    /// Config file location
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Fixed deck shuffle
    #[clap(long)]
    seed: Option<u64>,

    /// Enable debug logging
    #[clap(long)]
    debug: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Two players at one keyboard
    Local,
    /// Play Red against the AI
    Ai,
    /// Against the AI, with move rankings on hints
    Training,
    /// Open a room on the relay and wait for an opponent
    Host,
    /// Join a room on the relay
    Join,
    /// Run the relay server
    Relay,
}

/// The session being played, with the extra handling each mode needs
enum Table {
    Local(LocalSession),
    Solo(SinglePlayerSession),
    Remote(RemoteSession),
}

impl Table {
    fn session(&mut self) -> &mut dyn GameSession {
        match self {
            Table::Local(session) => session,
            Table::Solo(session) => session,
            Table::Remote(session) => session,
        }
    }

    /// Deliver AI work or relay traffic; returns whether anything arrived
    fn pump(&mut self) -> bool {
        match self {
            Table::Local(_) => false,
            Table::Solo(session) => session.pump() > 0,
            Table::Remote(session) => {
                let now = Instant::now();
                let before = session.status();
                let handled = session.pump(now);
                session.tick(now);
                handled > 0 || session.status() != before
            }
        }
    }
}

/// A parsed line of input
#[derive(Debug, PartialEq)]
enum Command {
    Move { card: Card, src: onitama_core::Point, dst: onitama_core::Point, reveal: bool },
    Discard(Card),
    Hint { card: Card, src: onitama_core::Point },
    Cards,
    Undo,
    Reset,
    Help,
    Quit,
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(args: &Args) -> Result<SessionConfig> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let mut config = load_config(&path).with_context(|| format!("loading {}", path.display()))?;
    if let Some(difficulty) = args.difficulty {
        config.difficulty = difficulty;
    }
    if args.agent.is_some() {
        config.agent = args.agent;
    }
    if let Some(server) = &args.server {
        config.server_url = server.clone();
    }
    if args.seed.is_some() {
        config.game.seed = args.seed;
    }
    Ok(config)
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let config = load_settings(&args)?;
    tracing::info!(mode = ?args.mode, difficulty = %config.difficulty, agent = %config.agent(), "Starting");
    let engine: Arc<dyn Engine> = Arc::new(StandardRules::new(config.game.clone()));
    let connector = || Box::new(TcpConnector::new(&config.server_url, tokio::runtime::Handle::current()));

    let table = match args.mode {
        Mode::Local => Table::Local(LocalSession::new(engine)),
        Mode::Ai => Table::Solo(SinglePlayerSession::new(engine, &config)?),
        Mode::Training => Table::Solo(SinglePlayerSession::training(engine, &config)?),
        Mode::Host => Table::Remote(RemoteSession::host(engine, connector(), &config, Instant::now())?),
        Mode::Join => {
            let room = args.room.as_deref().context("join needs --room")?;
            Table::Remote(RemoteSession::join(engine, connector(), room, &config, Instant::now())?)
        }
        Mode::Relay => return run_relay(&config.server_url).await,
    };

    run_game_loop(table).await
}

/// Serve relay rooms until Ctrl+C
async fn run_relay(address: &str) -> Result<()> {
    let address = address.strip_prefix("tcp://").unwrap_or(address);
    let relay = TcpRelay::bind(address)
        .await
        .with_context(|| format!("binding relay to {}", address))?;
    println!("Relay listening on {}", relay.local_addr()?);
    tokio::select! {
        result = relay.run() => result.context("relay stopped")?,
        _ = signal::ctrl_c() => println!("\nReceived Ctrl+C, shutting down"),
    }
    Ok(())
}

/// Run the main game loop
async fn run_game_loop(mut table: Table) -> Result<()> {
    let mut events = table.session().subscribe();
    let mut stdin_lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut pump = tokio::time::interval(PUMP_INTERVAL);

    print_help();
    print_game_state(table.session());

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                println!("\nReceived Ctrl+C, shutting down");
                break;
            }

            _ = pump.tick() => {
                if table.pump() {
                    print_events(&mut events);
                    print_room(&table);
                    print_game_state(table.session());
                }
            }

            result = stdin_lines.next_line() => {
                let line = match result {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        eprintln!("Error reading input: {}", e);
                        continue;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                };
                if command == Command::Quit {
                    break;
                }
                execute(&mut table, command);
                print_events(&mut events);
            }
        }
    }

    Ok(())
}

fn execute(table: &mut Table, command: Command) {
    match command {
        Command::Move { card, src, dst, reveal } => {
            let action = Action::Move {
                card,
                src,
                dst,
                reveal_requested: reveal,
            };
            submit(table, action);
        }
        Command::Discard(card) => submit(table, Action::Discard { card }),
        Command::Hint { card, src } => {
            let session = table.session();
            let Some(state) = session.state() else {
                println!("No game yet");
                return;
            };
            let lit = session.highlight(Some(src), Some(card));
            let rankings = match table {
                Table::Solo(solo) => solo.rankings(),
                Table::Local(_) | Table::Remote(_) => None,
            };
            let scores = rankings.as_deref().map(|r| (r, card, src));
            println!("{}", render::render_board(&state, lit, scores));
            if lit.is_empty() {
                println!("{} cannot move from {}", card, render::format_square(src));
            } else {
                let squares: Vec<String> = lit.iter().map(render::format_square).collect();
                println!("{} from {}: {}", card, render::format_square(src), squares.join(" "));
            }
        }
        Command::Cards => {
            if let Some(state) = table.session().state() {
                for card in state.hands.red.iter().chain(state.hands.blue.iter()) {
                    println!("{:12} {:?}", card.to_string(), card.moves());
                }
            }
        }
        Command::Undo => {
            let session = table.session();
            if session.can_undo() && session.undo() {
                print_game_state(session);
            } else {
                println!("Nothing to undo");
            }
        }
        Command::Reset => match table.session().reset() {
            Ok(()) => print_game_state(table.session()),
            Err(e) => eprintln!("{}", e),
        },
        Command::Help => print_help(),
        Command::Quit => {}
    }
}

fn submit(table: &mut Table, action: Action) {
    let session = table.session();
    match session.submit_action(action) {
        Ok(outcome) => {
            tracing::debug!(?action, ?outcome, "Submitted");
            print_game_state(session);
        }
        Err(e) => eprintln!("Rejected: {}", e),
    }
}

fn parse_command(line: &str) -> Result<Command> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let card = |idx: usize| -> Result<Card> {
        let word = words.get(idx).ok_or_else(|| anyhow!("Missing card name"))?;
        word.parse::<Card>().map_err(|e| anyhow!(e))
    };
    let square = |idx: usize| {
        words
            .get(idx)
            .ok_or_else(|| anyhow!("Missing square"))
            .and_then(|word| render::parse_square(word))
    };

    match words.first().map(|w| w.to_ascii_lowercase()).as_deref() {
        Some("move" | "m") => Ok(Command::Move {
            card: card(1)?,
            src: square(2)?,
            dst: square(3)?,
            reveal: matches!(words.get(4), Some(&"reveal")),
        }),
        Some("discard" | "d") => Ok(Command::Discard(card(1)?)),
        Some("hint" | "h") => Ok(Command::Hint {
            card: card(1)?,
            src: square(2)?,
        }),
        Some("cards" | "c") => Ok(Command::Cards),
        Some("undo" | "u") => Ok(Command::Undo),
        Some("reset") => Ok(Command::Reset),
        Some("help" | "?") => Ok(Command::Help),
        Some("quit" | "q" | "exit") => Ok(Command::Quit),
        Some(other) => Err(anyhow!("Unknown command {:?}, try help", other)),
        None => Err(anyhow!("Empty command")),
    }
}

/// Room id to share while the host waits for an opponent
fn print_room(table: &Table) {
    if let Table::Remote(session) = table {
        if session.status() == ConnectionStatus::Waiting {
            if let Some(room) = session.room_id() {
                println!("Room {}: run `onitama --mode join --room {}` to play", room, room);
            }
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  move <card> <from> <to> [reveal]   e.g. move tiger c1 c3");
    println!("  discard <card>                     when no move is possible");
    println!("  hint <card> <from>                 show where a piece can go");
    println!("  cards | undo | reset | help | quit");
}

fn print_game_state(session: &dyn GameSession) {
    match session.state() {
        Some(state) => {
            let last = state.last_move.map(|m| (m.src, m.dst));
            println!("\n{}", render::render_board(&state, Default::default(), None));
            if let Some((src, dst)) = last {
                println!("Last move: {} -> {}", render::format_square(src), render::format_square(dst));
            }
            print!("{}", render::render_cards(&state));
        }
        None => println!("Waiting for a game"),
    }
}

fn print_events(events: &mut broadcast::Receiver<SessionEvent>) {
    loop {
        match events.try_recv() {
            Ok(SessionEvent::Error(message)) => eprintln!("! {}", message),
            Ok(SessionEvent::Started { against }) => println!("New game against {}", against),
            Ok(SessionEvent::Finished { winner, against }) => {
                println!("Game over: {} wins (against {})", winner, against)
            }
            Ok(SessionEvent::Connection(status)) => println!("Connection: {}", status),
            Ok(SessionEvent::Snapshot(_)) | Ok(SessionEvent::Rankings(_)) => {}
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Dropped session events");
            }
            Err(_) => break,
        }
    }
}

//! seqctl - inspect, migrate and dry-run declarative songs

mod config;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::Config;
use seq_core::{
    Sequencer, Status, TimeContext, TimelineEventKind, VirtualClock, flatten_timeline,
    group_by_channel,
};
use seq_engine::RecordingBackend;
use seq_song::{Song, load_song, migrate_song_file, migrate_songs_dir};

#[derive(Parser)]
#[command(name = "seqctl")]
#[command(about = "Declarative music sequencer tools", long_about = None)]
struct Cli {
    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a song, print a summary and any validation issues
    Check {
        song: PathBuf,
    },

    /// Print every note and pattern marker on the absolute timeline
    Timeline {
        song: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Rewrite legacy events in the current format
    Migrate {
        /// Song file or directory of songs (default: songs_dir from config)
        path: Option<PathBuf>,

        /// Output file when migrating a single song (default: in place)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Play a song against a virtual clock and print every trigger
    Simulate {
        song: PathBuf,

        /// How long to run (default: the song's length)
        #[arg(short, long)]
        seconds: Option<f64>,

        /// Loop regardless of the song's setting
        #[arg(short = 'l', long = "loop")]
        looping: bool,
    },

    /// Show the config file, or write it with current values
    Config {
        #[arg(long)]
        save: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load();
    init_logging(&config, cli.verbose);
    tracing::debug!(path = ?Config::config_path(), "config loaded");

    match cli.command {
        Commands::Check { song } => check(&song),
        Commands::Timeline { song, json } => timeline(&song, json),
        Commands::Migrate { path, output } => {
            let path = path
                .or_else(|| config.songs_dir.clone())
                .context("no path given and no songs_dir configured")?;
            migrate(&path, output.as_deref())
        }
        Commands::Simulate {
            song,
            seconds,
            looping,
        } => simulate(&song, seconds, looping, &config),
        Commands::Config { save } => show_config(&config, save),
    }
}

fn init_logging(config: &Config, verbose: u8) {
    let default = match verbose {
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open(path: &Path) -> anyhow::Result<Song> {
    load_song(path).with_context(|| format!("loading {}", path.display()))
}

fn check(path: &Path) -> anyhow::Result<()> {
    let song = open(path)?;
    let time = TimeContext::new(song.bpm, song.beats_per_bar);
    let length = song.length_in_beats();

    println!("{}", song.display_title());
    println!("  tempo        {}", tempo_line(&song));
    println!(
        "  length       {length} beats ({:.1} bars, {:.2}s){}",
        time.beats_to_bars(length),
        time.beats_to_seconds(length),
        if song.looping { ", looping" } else { "" }
    );
    println!("  channels     {}", song.channels.len());
    println!("  instruments  {}", song.instruments.len());
    println!("  patterns     {}", song.patterns.len());
    println!("  sequence     {}", song.sequence.len());

    let issues = song.validate();
    if issues.is_empty() {
        println!("no issues");
        return Ok(());
    }
    for issue in &issues {
        println!("  - {issue}");
    }
    bail!("{} validation issue(s) in {}", issues.len(), path.display())
}

fn tempo_line(song: &Song) -> String {
    format!("{} bpm, {} beats per bar", song.bpm, song.beats_per_bar)
}

fn timeline(path: &Path, json: bool) -> anyhow::Result<()> {
    let song = open(path)?;
    let events = flatten_timeline(&song);
    let lanes = group_by_channel(&song, &events);

    if json {
        println!("{}", serde_json::to_string_pretty(&lanes)?);
        return Ok(());
    }

    let time = TimeContext::new(song.bpm, song.beats_per_bar);
    for lane in &lanes {
        println!("{}", lane.channel_id);
        for event in &lane.events {
            let detail = match &event.kind {
                TimelineEventKind::Note { instrument_id, .. } => instrument_id.as_str(),
                TimelineEventKind::Pattern { .. } => "pattern",
            };
            println!(
                "  {:>10}  {:<12} {:<10} {:>6.3} beats{}",
                time.format_position(event.start_beat).to_string(),
                event.label(),
                detail,
                event.duration,
                if event.is_nested { "  (nested)" } else { "" }
            );
        }
    }
    Ok(())
}

fn migrate(path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    if path.is_dir() {
        if output.is_some() {
            bail!("--output only applies to a single song");
        }
        let migrated = migrate_songs_dir(path)
            .with_context(|| format!("migrating {}", path.display()))?;
        for file in &migrated {
            println!("migrated {}", file.display());
        }
        println!("{} song(s) migrated", migrated.len());
        return Ok(());
    }

    let output = output.unwrap_or(path);
    migrate_song_file(path, output).with_context(|| format!("migrating {}", path.display()))?;
    println!("migrated {} -> {}", path.display(), output.display());
    Ok(())
}

fn simulate(path: &Path, seconds: Option<f64>, looping: bool, config: &Config) -> anyhow::Result<()> {
    let song = open(path)?;
    let mut sequencer = Sequencer::new(VirtualClock::default(), RecordingBackend::new());
    sequencer.load_song(song)?;
    if looping {
        sequencer.set_looping(true);
    }

    let step = Duration::from_millis(config.poll_interval_ms.max(1)).as_secs_f64();
    let limit = seconds.unwrap_or_else(|| {
        sequencer
            .time_context()
            .beats_to_seconds(sequencer.song_length())
            + step
    });

    sequencer.start();
    let mut elapsed = 0.0;
    while elapsed < limit {
        sequencer.clock_mut().advance(step);
        elapsed += step;

        for trigger in sequencer.backend().triggers() {
            println!(
                "{:>9.3}s  {:<8} {:?} gen {}{}",
                trigger.time,
                trigger.note.to_string(),
                trigger.kind,
                trigger.generator,
                trigger
                    .velocity
                    .map(|v| format!(" vel {v:.2}"))
                    .unwrap_or_default()
            );
        }
        sequencer.backend().clear_triggers();

        if let Some(Status::Ended { time }) = sequencer.poll() {
            println!("end of song at {time:.3}s");
            break;
        }
    }

    println!(
        "{} at {}",
        if sequencer.is_playing() { "playing" } else { "stopped" },
        sequencer.musical_position()
    );
    sequencer.cleanup();
    Ok(())
}

fn show_config(config: &Config, save: bool) -> anyhow::Result<()> {
    if save {
        let path = config.save()?;
        println!("wrote {}", path.display());
        return Ok(());
    }
    match Config::config_path() {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config directory"),
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

//! WordLens - camera word lookup CLI
//!
//! Looks words up in the English dictionary, and drives the capture ->
//! recognition -> lookup pipeline over replayed still images.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use wordlens_capture::ReplayOpener;
use wordlens_core::colored_logger::init_colored_logger;
use wordlens_core::config::Config;
use wordlens_core::events::{self, ScanEvent};
use wordlens_core::scanner::Scanner;
use wordlens_core::session::LookupSession;
use wordlens_db::{find_links, Dictionary, DictionaryEntry, DictionarySearch, LinkSpan, NewEntry};
use wordlens_ocr::ScriptedRecognizer;

#[derive(Parser)]
#[command(name = "wordlens")]
#[command(about = "Point a camera at English text and look the word up")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Look a word up, including inflected forms and abbreviations
    Lookup {
        /// Word to look up
        word: String,
    },

    /// Check the dictionary installation
    Check,

    /// Build a dictionary from a tab-separated word list (word<TAB>meaning)
    Import {
        /// Word list to read
        input: PathBuf,

        /// Dictionary to write (defaults to the installed dictionary path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the scanner over still images with scripted detections
    Replay {
        /// Image file or directory of images
        source: PathBuf,

        /// JSON file with the detection results to replay
        #[arg(short, long)]
        detections: PathBuf,

        /// Preview size as WIDTHxHEIGHT (defaults to the upright frame size)
        #[arg(long, value_parser = parse_view)]
        view: Option<(u32, u32)>,

        /// Turn the flash on
        #[arg(long)]
        flash: bool,

        /// Turn zoom on
        #[arg(long)]
        zoom: bool,
    },
}

fn parse_view(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(|c: char| c == 'x' || c == 'X')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", value))?;
    let width = width.trim().parse().map_err(|e| format!("bad width: {}", e))?;
    let height = height.trim().parse().map_err(|e| format!("bad height: {}", e))?;
    Ok((width, height))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    match cli.command {
        Commands::Replay { .. } => init_colored_logger(level)?,
        _ => FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .compact()
            .init(),
    }

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Lookup { word } => {
            cmd_lookup(&config, &word)?;
        }
        Commands::Check => {
            cmd_check(&config)?;
        }
        Commands::Import { input, output } => {
            cmd_import(&config, &input, output)?;
        }
        Commands::Replay { source, detections, view, flash, zoom } => {
            cmd_replay(config, source, detections, view, flash, zoom)?;
        }
    }

    Ok(())
}

/// Open the installed dictionary, installing the bundled copy on first run
fn open_dictionary(config: &Config) -> Result<Dictionary> {
    let path = config.resolve_dictionary_path();

    if let Some(bundled) = config.resolve_bundled_path() {
        Dictionary::install(&bundled, &path).context("failed to install bundled dictionary")?;
    }

    Dictionary::open(&path).with_context(|| format!("failed to open dictionary at {:?}", path))
}

fn print_entry(entry: &DictionaryEntry, links: &[LinkSpan]) {
    println!("{}", entry.word);
    for definition in entry.definitions() {
        println!("  {}", definition);
    }

    if !links.is_empty() {
        let words: Vec<&str> = links.iter().map(|link| link.text.as_str()).collect();
        println!("  see also: {}", words.join(", "));
    }
    println!();
}

fn cmd_lookup(config: &Config, word: &str) -> Result<()> {
    let search = DictionarySearch::new(Arc::new(open_dictionary(config)?));

    match search.search(word) {
        Some(entry) => {
            let links = find_links(&entry, &search);
            print_entry(&entry, &links);
        }
        None => println!("no entry for {:?}", word),
    }

    Ok(())
}

fn cmd_check(config: &Config) -> Result<()> {
    println!("checking dictionary...\n");

    let path = config.resolve_dictionary_path();
    println!("  dictionary: {:?}", path);

    match config.resolve_bundled_path() {
        Some(bundled) => println!("  bundled:    {:?}", bundled),
        None => println!("  bundled:    not found"),
    }

    if !path.exists() {
        println!("  status:     not installed");
        println!();
        println!("run 'wordlens import <WORDLIST>' or ship ejdict.sqlite3 next to the executable");
        return Ok(());
    }

    let dictionary = Dictionary::open(&path)?;
    println!("  entries:    {}", dictionary.entry_count()?);
    println!();
    println!("all checks passed!");

    Ok(())
}

fn cmd_import(config: &Config, input: &Path, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| config.resolve_dictionary_path());
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read word list {:?}", input))?;

    let mut skipped = 0usize;
    let entries: Vec<NewEntry> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match line.split_once('\t') {
            Some((word, mean)) if !word.trim().is_empty() => Some(NewEntry::new(word.trim(), mean.trim())),
            _ => {
                skipped += 1;
                None
            }
        })
        .collect();

    if skipped > 0 {
        warn!("skipped {} malformed lines", skipped);
    }

    let dictionary = Dictionary::create(&output)?;
    let inserted = dictionary.insert_entries(&entries)?;

    println!("imported {} entries into {:?}", inserted, output);
    println!("dictionary now holds {} entries", dictionary.entry_count()?);
    Ok(())
}

fn cmd_replay(
    config: Config,
    source: PathBuf,
    detections: PathBuf,
    view: Option<(u32, u32)>,
    flash: bool,
    zoom: bool,
) -> Result<()> {
    let recognizer = ScriptedRecognizer::from_file(&detections)
        .with_context(|| format!("failed to load detections from {:?}", detections))?;
    let dictionary = open_dictionary(&config)?;
    let mut session = LookupSession::new(DictionarySearch::new(Arc::new(dictionary)));

    let runtime = tokio::runtime::Runtime::new()?;
    let (tx, mut rx) = events::channel();
    let mut scanner = Scanner::new(
        config.capture.clone(),
        &config.cursor,
        Arc::new(recognizer),
        runtime.handle().clone(),
        tx,
    );

    // Setup signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        info!("received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    info!("replaying {:?}", source);
    scanner.start(&ReplayOpener::new(&source))?;

    let settings = scanner
        .capture_settings()
        .context("scanner started without capture settings")?;
    let (view_width, view_height) = view.unwrap_or(if settings.rotation.is_transposed() {
        (settings.size.height, settings.size.width)
    } else {
        (settings.size.width, settings.size.height)
    });
    scanner.set_preview_geometry(view_width, view_height);

    if flash && !scanner.toggle_flash(true)? {
        println!("flash not supported");
    }
    if zoom && !scanner.toggle_zoom(true)? {
        println!("zoom not supported");
    }

    println!("scanning... press Ctrl+C to stop\n");

    while running.load(Ordering::SeqCst) {
        let next = runtime.block_on(tokio::time::timeout(Duration::from_millis(200), rx.recv()));
        match next {
            Ok(Some(ScanEvent::Recognized(text))) => {
                debug!("recognized {:?}", text);
                if let Some(entry) = session.on_recognized(&text).cloned() {
                    let links = session.links();
                    print_entry(&entry, &links);
                }
            }
            Ok(Some(ScanEvent::NoDetection)) => {}
            Ok(Some(ScanEvent::Control(event))) => debug!("control event: {:?}", event),
            Ok(None) => break,
            Err(_elapsed) => {}
        }
    }

    let stats = scanner.stats();
    scanner.stop();
    if let Some(stats) = stats {
        info!(
            "{} frames processed, {} recognized, {} failed",
            stats.processed(),
            stats.recognized(),
            stats.failed()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_view() {
        assert_eq!(parse_view("480x640"), Ok((480, 640)));
        assert_eq!(parse_view("1080X1920"), Ok((1080, 1920)));
        assert!(parse_view("480").is_err());
        assert!(parse_view("ax640").is_err());
    }

    #[test]
    fn test_cli_parses_replay() {
        let cli = Cli::try_parse_from([
            "wordlens", "replay", "frames", "--detections", "script.json", "--view", "480x640", "--flash",
        ])
        .unwrap();

        match cli.command {
            Commands::Replay { source, view, flash, zoom, .. } => {
                assert_eq!(source, PathBuf::from("frames"));
                assert_eq!(view, Some((480, 640)));
                assert!(flash);
                assert!(!zoom);
            }
            _ => panic!("expected replay"),
        }
    }
}

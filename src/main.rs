//! lyric-player - command line front end
//!
//! Lists, inspects, converts and plays lyric files against a simulated
//! playback clock.

mod cli;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lyric_player::features::import::decode_with_fallback;
use lyric_player::features::lyrics::{
    DEFAULT_CUE_MS, InterpolatedClock, LyricSet, Notifiable, PlaybackClock, SyncController,
    SyncDriver, SyncNotification, TransportEvent, parse_lyrics,
};
use lyric_player::features::{AudioRef, LyricsLibrary, PlayerBundle, Settings, find_lyrics_for_audio};
use lyric_player::utils::format_time;

use cli::{Cli, Command, RATE_RANGE};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let settings = load_settings(&cli)?;
    let library = LyricsLibrary::from_settings(&settings.library);

    match cli.command {
        Command::List => {
            for name in library.list_files() {
                println!("{}", name);
            }
        }
        Command::Show { file } => show(&library, &file)?,
        Command::Play {
            file,
            duration_ms,
            tick_ms,
            rate,
            seek_ms,
            realtime,
        } => {
            let text = read_lyrics(&library, &file)?;
            let options = PlayOptions {
                duration_ms,
                tick_ms: tick_ms.unwrap_or(settings.player.tick_interval_ms).max(1),
                rate,
                seek_ms,
                realtime,
            };
            play(&settings, &text, &options);
        }
        Command::Convert {
            file,
            to,
            output,
            encoding,
        } => {
            let set = parse_lyrics(&read_lyrics(&library, &file)?);
            let converted = set.to_format(to.into());
            match output {
                Some(output) => {
                    let encoding = encoding.unwrap_or_else(|| settings.save.encoding.clone());
                    let saved = library
                        .try_save(&converted, &output, to.into(), &encoding)
                        .context("convert")?;
                    println!("{}", library.output_dir().join(saved).display());
                }
                None => print!("{}", converted),
            }
        }
        Command::Bundle { audio, lyrics } => {
            let lyrics = match lyrics {
                Some(file) => Some(read_lyrics(&library, &file)?),
                None => find_lyrics_for_audio(&audio),
            };
            let name = audio
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .with_context(|| format!("not a file path: {}", audio.display()))?;
            let bundle = PlayerBundle::new(AudioRef::new(name), lyrics)
                .with_settings(&settings.player);
            println!("{}", serde_json::to_string_pretty(&bundle.to_host_ui())?);
        }
        Command::Fingerprint { file } => {
            if let Some(message) = library.validate_message(&file) {
                bail!(message);
            }
            println!("{}", library.fingerprint(&file));
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from_file(path)
            .with_context(|| format!("load settings {}", path.display()))?,
        None => Settings::load(),
    };
    if let Some(dir) = &cli.input_dir {
        settings.library.input_dir = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        settings.library.output_dir = dir.clone();
    }
    Ok(settings)
}

/// Read lyric text from a path on disk or, failing that, a library name
fn read_lyrics(library: &LyricsLibrary, file: &str) -> Result<String> {
    let path = PathBuf::from(file);
    if path.is_file() {
        return read_lyrics_path(library, &path);
    }
    library.try_load(file).map_err(Into::into)
}

fn read_lyrics_path(library: &LyricsLibrary, path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let decoded = decode_with_fallback(&bytes, library.encodings())
        .with_context(|| format!("decode {}", path.display()))?;
    Ok(decoded.text)
}

fn show(library: &LyricsLibrary, file: &str) -> Result<()> {
    let set = parse_lyrics(&read_lyrics(library, file)?);
    println!("format: {} ({} entries)", set.format(), set.len());

    let metadata = set.metadata();
    if !metadata.is_empty() {
        let tags = [
            ("title", &metadata.title),
            ("artist", &metadata.artist),
            ("album", &metadata.album),
            ("by", &metadata.author),
        ];
        for (key, value) in tags {
            if let Some(value) = value {
                println!("{}: {}", key, value);
            }
        }
        if metadata.offset_ms != 0 {
            println!("offset: {} ms", metadata.offset_ms);
        }
        for (key, value) in &metadata.extra {
            println!("{}: {}", key, value);
        }
    }

    for entry in set.entries() {
        let end = entry
            .end_time_ms
            .map(format_time)
            .unwrap_or_else(|| "--:--.--".to_string());
        println!(
            "[{} - {}] {}",
            format_time(entry.start_time_ms),
            end,
            entry.text.replace('\n', " / ")
        );
    }
    Ok(())
}

struct PlayOptions {
    duration_ms: Option<u64>,
    tick_ms: u64,
    rate: f64,
    seek_ms: Option<f64>,
    realtime: bool,
}

/// Prints each active line change
#[derive(Debug, Default)]
struct TerminalView {
    changes: usize,
}

impl Notifiable for TerminalView {
    fn on_active_changed(&mut self, notification: &SyncNotification) {
        self.changes += 1;
        let time = format_time(notification.position_ms);
        match &notification.entry {
            Some(entry) => println!("{}  {}", time, entry.text.replace('\n', " / ")),
            None => println!("{}  ({:?}, no active line)", time, notification.cause),
        }
    }
}

/// Track length when none is given: the last explicit end, or a cue past
/// the last start
fn natural_duration(set: &LyricSet) -> u64 {
    set.entries()
        .iter()
        .map(|e| {
            e.end_time_ms
                .unwrap_or_else(|| e.start_time_ms.saturating_add(DEFAULT_CUE_MS))
        })
        .max()
        .unwrap_or(0)
}

fn play(settings: &Settings, text: &str, options: &PlayOptions) {
    let controller = SyncController::with_tail_policy(settings.player.tail_policy);
    let mut driver = SyncDriver::new(controller, InterpolatedClock::new(), TerminalView::default());
    driver.load_lyrics(text);

    let duration_ms = options
        .duration_ms
        .unwrap_or_else(|| natural_duration(driver.controller().lyrics()));
    let tick = Duration::from_millis(options.tick_ms);
    // Time the track takes at the slowest accepted rate, plus a tick
    let slowest = options.rate.max(*RATE_RANGE.start());
    let wall_limit = Duration::try_from_secs_f64(duration_ms as f64 / 1000.0 / slowest)
        .unwrap_or(Duration::MAX)
        .saturating_add(tick);

    let start = Instant::now();
    let mut now = start;
    driver.dispatch(TransportEvent::RateChange(options.rate), now);
    driver.dispatch(TransportEvent::Resume, now);
    if let Some(seek_ms) = options.seek_ms {
        driver.dispatch(TransportEvent::Seek(seek_ms), now);
    }

    loop {
        driver.poll(now);
        if driver.clock().position_ms(now) >= duration_ms as f64 {
            driver.dispatch(TransportEvent::Ended, now);
            break;
        }
        if let Some(wait) = driver.controller().time_until_next_change() {
            tracing::debug!("next line change in {:?}", wait);
        }
        if options.realtime {
            std::thread::sleep(tick);
            now = Instant::now();
        } else {
            now += tick;
        }
        if now.duration_since(start) > wall_limit {
            tracing::warn!("playback rate {} never reaches the end", options.rate);
            break;
        }
    }

    tracing::info!(
        "Played {} over {} ({} line changes)",
        driver.controller().lyrics().format(),
        format_time(duration_ms),
        driver.view().changes
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyric_player::features::lyrics::{LyricEntry, LyricsFormat};

    fn options(rate: f64) -> PlayOptions {
        PlayOptions {
            duration_ms: Some(5000),
            tick_ms: 100,
            rate,
            seek_ms: None,
            realtime: false,
        }
    }

    #[test]
    fn test_natural_duration() {
        let set = parse_lyrics("[00:01.00]a\n[00:03.00]b");
        assert_eq!(natural_duration(&set), 3000 + DEFAULT_CUE_MS);

        let set = LyricSet::new(vec![LyricEntry::new(1000, "timed").with_end(9000)], LyricsFormat::Srt);
        assert_eq!(natural_duration(&set), 9000);

        assert_eq!(natural_duration(&LyricSet::empty()), 0);
    }

    #[test]
    fn test_natural_duration_saturates() {
        let set = LyricSet::new(vec![LyricEntry::new(u64::MAX - 1, "far away")], LyricsFormat::Lrc);
        assert_eq!(natural_duration(&set), u64::MAX);
    }

    #[test]
    fn test_play_stops_at_any_rate() {
        let text = "[00:01.00]Hello\n[00:03.00]World";
        for rate in [1.0, 0.0625, 1e-20, 0.0, -1.0] {
            play(&Settings::default(), text, &options(rate));
        }
    }
}

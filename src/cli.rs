use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use lyric_player::LyricsFormat;

#[derive(Debug, Parser, Clone)]
#[command(name = "lyric-player")]
#[command(about = "Synchronized LRC/SRT lyric player")]
pub struct Cli {
    /// Override settings file path.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the lyric input directory.
    #[arg(long, global = true)]
    pub input_dir: Option<PathBuf>,

    /// Override the lyric output directory.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List lyric files in the input directory.
    List,

    /// Parse a lyric file and print its entries.
    Show {
        /// Library file name or path.
        file: String,
    },

    /// Play lyrics against a simulated clock.
    Play {
        /// Library file name or path.
        file: String,

        /// Track length; defaults to just past the last line.
        #[arg(long)]
        duration_ms: Option<u64>,

        /// Clock polling interval; defaults to the configured interval.
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Playback rate.
        #[arg(long, default_value_t = 1.0, value_parser = parse_rate)]
        rate: f64,

        /// Seek here before playing.
        #[arg(long)]
        seek_ms: Option<f64>,

        /// Sleep between ticks instead of simulating time.
        #[arg(long)]
        realtime: bool,
    },

    /// Convert a lyric file to another format.
    Convert {
        /// Library file name or path.
        file: String,

        /// Target format.
        #[arg(long, value_enum)]
        to: TargetFormat,

        /// Save into the output directory under this name instead of printing.
        #[arg(long)]
        output: Option<String>,

        /// Encoding used when saving; defaults to the configured encoding.
        #[arg(long)]
        encoding: Option<String>,
    },

    /// Print the host UI payload for an audio file.
    Bundle {
        /// Audio file path.
        audio: PathBuf,

        /// Lyric file name or path; defaults to lyrics found next to or inside the audio.
        #[arg(long)]
        lyrics: Option<String>,
    },

    /// Print the change fingerprint of a library file.
    Fingerprint {
        /// Library file name.
        file: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetFormat {
    Lrc,
    Srt,
}

impl From<TargetFormat> for LyricsFormat {
    fn from(format: TargetFormat) -> Self {
        match format {
            TargetFormat::Lrc => LyricsFormat::Lrc,
            TargetFormat::Srt => LyricsFormat::Srt,
        }
    }
}

/// Slowest and fastest playback rates `play` accepts
pub const RATE_RANGE: std::ops::RangeInclusive<f64> = 0.0625..=16.0;

fn parse_rate(value: &str) -> Result<f64, String> {
    let rate: f64 = value
        .parse()
        .map_err(|_| format!("`{}` is not a number", value))?;
    if !RATE_RANGE.contains(&rate) {
        return Err(format!(
            "rate must be between {} and {}",
            RATE_RANGE.start(),
            RATE_RANGE.end()
        ));
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn play_rate(args: &[&str]) -> Result<f64, clap::Error> {
        let mut argv = vec!["lyric-player", "play", "song.lrc"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv)?.command {
            Command::Play { rate, .. } => Ok(rate),
            other => panic!("parsed {:?}", other),
        }
    }

    #[test_case(&[], 1.0)]
    #[test_case(&["--rate", "2"], 2.0)]
    #[test_case(&["--rate", "0.0625"], 0.0625)]
    fn test_rate_accepted(args: &[&str], expected: f64) {
        assert_eq!(play_rate(args).unwrap(), expected);
    }

    #[test_case("0")]
    #[test_case("1e-20")]
    #[test_case("-1")]
    #[test_case("17")]
    #[test_case("NaN")]
    #[test_case("fast")]
    fn test_rate_rejected(rate: &str) {
        assert!(play_rate(&["--rate", rate]).is_err());
    }
}

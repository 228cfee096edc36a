//! Command-line parsing.

use std::path::PathBuf;
use std::str::FromStr;

use crate::settings::CliSettings;

pub const USAGE: &str = "Usage: wavpipe [options] <wav_file>

Options:
  --settings <file>        settings file (default: user config dir)
  --save-settings          write the effective settings back to the settings file
  --chunk-size <n>         bytes per chunk (default 4000)
  --queue-capacity <n>     chunks buffered between reader and recognizer (default 100)
  --header-bytes <n>       bytes skipped at the start of the file (default 44)
  --sample-rate <hz>       sample rate of the PCM payload (default 16000)
  --recognizer <name>      energy | stub (default energy)
  --quiet                  no progress line, warnings only
  -h, --help               show this help";

#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub wav_file: PathBuf,
    pub settings_path: Option<PathBuf>,
    pub save_settings: bool,
    pub chunk_size: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub header_bytes: Option<u64>,
    pub sample_rate: Option<u32>,
    pub recognizer: Option<String>,
    pub quiet: bool,
}

#[derive(Debug, PartialEq)]
pub enum Parsed {
    Run(Args),
    Help,
}

impl Args {
    /// Flags win over whatever the settings file and environment said.
    pub fn apply_to(&self, settings: &mut CliSettings) {
        if let Some(v) = self.chunk_size {
            settings.chunk_size = v;
        }
        if let Some(v) = self.queue_capacity {
            settings.queue_capacity = v;
        }
        if let Some(v) = self.header_bytes {
            settings.header_bytes = v;
        }
        if let Some(v) = self.sample_rate {
            settings.sample_rate = v;
        }
        if let Some(v) = &self.recognizer {
            settings.recognizer = v.clone();
        }
        if self.quiet {
            settings.show_progress = false;
        }
        settings.normalize();
    }
}

fn value<I: Iterator<Item = String>>(it: &mut I, flag: &str) -> Result<String, String> {
    it.next().ok_or_else(|| format!("missing value for {flag}"))
}

fn number<T: FromStr, I: Iterator<Item = String>>(it: &mut I, flag: &str) -> Result<T, String> {
    let raw = value(it, flag)?;
    raw.parse::<T>()
        .map_err(|_| format!("invalid value for {flag}: {raw}"))
}

pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Parsed, String> {
    let mut out = Args::default();
    let mut wav_file: Option<PathBuf> = None;

    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--settings" => out.settings_path = Some(PathBuf::from(value(&mut it, &arg)?)),
            "--save-settings" => out.save_settings = true,
            "--chunk-size" => out.chunk_size = Some(number(&mut it, &arg)?),
            "--queue-capacity" => out.queue_capacity = Some(number(&mut it, &arg)?),
            "--header-bytes" => out.header_bytes = Some(number(&mut it, &arg)?),
            "--sample-rate" => out.sample_rate = Some(number(&mut it, &arg)?),
            "--recognizer" => out.recognizer = Some(value(&mut it, &arg)?),
            "--quiet" | "-q" => out.quiet = true,
            "--help" | "-h" => return Ok(Parsed::Help),
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(format!("unknown argument: {other}"));
            }
            path => {
                if wav_file.is_some() {
                    return Err(format!("unexpected extra argument: {path}"));
                }
                wav_file = Some(PathBuf::from(path));
            }
        }
    }

    out.wav_file = wav_file.ok_or_else(|| "missing <wav_file>".to_string())?;
    Ok(Parsed::Run(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Parsed, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn positional_file_with_defaults() {
        let Parsed::Run(args) = parse(&["speech.wav"]).unwrap() else {
            panic!("expected run");
        };
        assert_eq!(args.wav_file, PathBuf::from("speech.wav"));
        assert_eq!(args.chunk_size, None);
        assert!(!args.quiet);
    }

    #[test]
    fn flags_in_any_order() {
        let Parsed::Run(args) = parse(&[
            "--queue-capacity",
            "4",
            "in.wav",
            "--chunk-size",
            "1024",
            "--recognizer",
            "stub",
            "--quiet",
        ])
        .unwrap() else {
            panic!("expected run");
        };
        assert_eq!(args.queue_capacity, Some(4));
        assert_eq!(args.chunk_size, Some(1024));
        assert_eq!(args.recognizer.as_deref(), Some("stub"));
        assert!(args.quiet);
        assert_eq!(args.wav_file, PathBuf::from("in.wav"));
    }

    #[test]
    fn help_short_circuits() {
        assert_eq!(parse(&["--chunk-size", "7", "-h"]).unwrap(), Parsed::Help);
    }

    #[test]
    fn errors_are_reported() {
        assert_eq!(parse(&[]).unwrap_err(), "missing <wav_file>");
        assert_eq!(
            parse(&["a.wav", "--chunk-size"]).unwrap_err(),
            "missing value for --chunk-size"
        );
        assert_eq!(
            parse(&["a.wav", "--sample-rate", "fast"]).unwrap_err(),
            "invalid value for --sample-rate: fast"
        );
        assert_eq!(
            parse(&["a.wav", "--verbose"]).unwrap_err(),
            "unknown argument: --verbose"
        );
        assert_eq!(
            parse(&["a.wav", "b.wav"]).unwrap_err(),
            "unexpected extra argument: b.wav"
        );
    }

    #[test]
    fn flags_override_settings() {
        let Parsed::Run(args) = parse(&["x.wav", "--chunk-size", "0", "--quiet"]).unwrap() else {
            panic!("expected run");
        };
        let mut settings = CliSettings::default();
        args.apply_to(&mut settings);
        assert_eq!(settings.chunk_size, 1);
        assert!(!settings.show_progress);
    }
}

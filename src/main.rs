//! aacspeak entry point
//!
//! Composition root for the speech subsystem: loads `~/.aacboard.cfg`,
//! detects backends, builds one `SpeechController` and runs a single
//! command against it.
//!
//! ```text
//! aacspeak [--debug] [--local] [--config PATH] [--voice NAME]
//!          (--test | --voices | --info | --rate R | --pitch P | TEXT...)
//! ```

use aacboard::config::Config;
use aacboard::speech::{EngineSelector, SpeakOutcome, SpeechController, SpeechNotice};
use aacboard::{AacError, Result};
use log::{debug, error, info};
use std::process;
use std::time::Duration;

/// Longest time to wait for one utterance to finish
const SPEAK_TIMEOUT: Duration = Duration::from_secs(60);

/// What the user asked for
#[derive(Debug, PartialEq)]
enum Command {
    Speak(String),
    Test,
    Voices,
    Info,
    Rate(f32),
    Pitch(f32),
}

#[derive(Debug)]
struct Options {
    debug: bool,
    local_only: bool,
    config: Option<String>,
    voice: Option<String>,
    command: Command,
}

fn main() {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: aacspeak [--debug] [--local] [--config PATH] [--voice NAME] (--test | --voices | --info | --rate R | --pitch P | TEXT...)");
            process::exit(2);
        }
    };

    init_logging(options.debug);

    if let Err(e) = run(options) {
        error!("Fatal error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(debug_mode: bool) {
    if debug_mode {
        // Debug mode: write to aacspeak.log
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("aacspeak.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open aacspeak.log for debug logging: {}", e);
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }
        info!("aacspeak version {} starting (debug mode)", aacboard::VERSION);
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Error)
            .init();
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Options> {
    let mut debug = false;
    let mut local_only = false;
    let mut config = None;
    let mut voice = None;
    let mut command = None;
    let mut words = Vec::new();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--debug" | "-d" => debug = true,
            "--local" => local_only = true,
            "--config" => {
                config = Some(args.next().ok_or("--config needs a path")?);
            }
            "--voice" => {
                voice = Some(args.next().ok_or("--voice needs a voice id or name")?);
            }
            "--test" => command = Some(Command::Test),
            "--voices" => command = Some(Command::Voices),
            "--info" => command = Some(Command::Info),
            "--rate" => command = Some(Command::Rate(parse_number(args.next(), "--rate")?)),
            "--pitch" => command = Some(Command::Pitch(parse_number(args.next(), "--pitch")?)),
            _ => words.push(arg),
        }
    }

    let command = match command {
        Some(command) => command,
        None if !words.is_empty() => Command::Speak(words.join(" ")),
        None => return Err(AacError::Config("nothing to do".to_string())),
    };

    Ok(Options {
        debug,
        local_only,
        config,
        voice,
        command,
    })
}

fn parse_number(value: Option<String>, flag: &str) -> Result<f32> {
    let value = value.ok_or_else(|| AacError::Config(format!("{} needs a value", flag)))?;
    value
        .parse()
        .map_err(|_| AacError::Config(format!("{} expects a number, got {:?}", flag, value)))
}

fn run(options: Options) -> Result<()> {
    let config = match &options.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!("Config loaded from {:?}", config.path());

    let mut engine = config.engine_options();
    if options.local_only {
        engine.prefer_service = false;
    }
    debug!("Engine options: {:?}", engine);

    let selector = EngineSelector::detect(&engine);
    let mut speech = SpeechController::new(Box::new(config), selector);
    if let Some(voice) = &options.voice {
        debug!("Voice requested: {}", voice);
        speech.set_voice(Some(voice));
    }

    match options.command {
        Command::Info => {
            println!("{}", speech.engine_info());
            println!("Rate: {}", speech.settings().rate);
            println!("Pitch: {}", speech.settings().pitch);
        }
        Command::Voices => {
            // Warm-up already loaded the catalog; drop its ready notice
            speech.poll_events();
            println!("{}", serde_json::to_string_pretty(&speech.available_voices())?);
        }
        Command::Rate(rate) => {
            speech.set_rate(rate)?;
            println!("Rate set to {}", rate);
        }
        Command::Pitch(pitch) => {
            speech.set_pitch(pitch)?;
            println!("Pitch set to {}", pitch);
        }
        Command::Test => {
            let outcome = speech.test();
            finish(&mut speech, outcome)?;
        }
        Command::Speak(text) => {
            let outcome = speech.speak(&text);
            finish(&mut speech, outcome)?;
        }
    }

    Ok(())
}

/// Wait for the utterance to play out and turn a terminal failure into an error
fn finish(speech: &mut SpeechController, outcome: SpeakOutcome) -> Result<()> {
    match outcome {
        SpeakOutcome::Ignored => return Ok(()),
        SpeakOutcome::Unavailable => {
            return Err(AacError::BackendUnavailable(speech.engine_info()));
        }
        SpeakOutcome::Failed { reason, .. } => return Err(AacError::Playback(reason)),
        SpeakOutcome::Dispatched { .. } | SpeakOutcome::FailedOver { .. } => {}
    }

    for notice in speech.wait_idle(SPEAK_TIMEOUT) {
        match notice {
            SpeechNotice::FailedOver { .. } => {
                eprintln!("Voice service failed, using {}", speech.engine_info());
            }
            SpeechNotice::Failed { reason, .. } => return Err(AacError::Playback(reason)),
            _ => {}
        }
    }
    Ok(())
}

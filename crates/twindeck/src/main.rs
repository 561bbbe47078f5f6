use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use twindeck_core::{enumerate_audio_devices, get_default_audio_device, ConfigManager, Settings};
use twindeck_dj::{
    estimate_bpm_for, AudioEngineConfig, DeckAudioEngine, DeckId, Decoder, Library, MixBus,
    PlaybackEngine, SpectrogramBuilder, SymphoniaDecoder,
};

/// Two-deck audio player with tempo estimation and spectrogram rendering.
#[derive(Parser, Debug)]
#[command(name = "twindeck")]
#[command(about = "Twindeck two-deck player")]
struct Args {
    /// Configuration file (default: config.json in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate the BPM of one or more files
    Bpm {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Render a spectrogram as a PPM image
    Spectrogram {
        file: PathBuf,

        /// Image width in pixels (default from settings)
        #[arg(long)]
        width: Option<usize>,

        /// Image height in pixels (default from settings)
        #[arg(long)]
        height: Option<usize>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Play a file on deck A, optionally another on deck B
    Play {
        file: PathBuf,

        /// File for deck B
        #[arg(long)]
        deck_b: Option<PathBuf>,

        /// Gain for both decks (0.0 - 1.0)
        #[arg(long, default_value = "1.0")]
        gain: f64,

        /// Speed ratio for both decks (0 < ratio <= 100)
        #[arg(long, default_value = "1.0")]
        speed: f64,

        /// Loop the tracks
        #[arg(long = "loop", default_value = "false")]
        looping: bool,
    },

    /// Manage the track library
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },

    /// List audio output devices
    Devices,
}

#[derive(Subcommand, Debug)]
enum LibraryAction {
    /// Import files or directories
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },
    /// List the tracks
    List,
    /// Remove a track by row number
    Remove { row: usize },
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = ConfigManager::new(args.config);
    let settings = config.load()?;

    let decoder: Arc<dyn Decoder> = Arc::new(SymphoniaDecoder::new());

    match args.command {
        Command::Bpm { files } => {
            for file in files {
                let bpm = estimate_bpm_for(decoder.as_ref(), &path_locator(&file));
                println!("{:>7.2}  {}", bpm, file.display());
            }
        }
        Command::Spectrogram {
            file,
            width,
            height,
            output,
        } => {
            let width = width.unwrap_or(settings.spectrogram_width as usize);
            let height = height.unwrap_or(settings.spectrogram_height as usize);

            let image = SpectrogramBuilder::new().build_for(
                decoder.as_ref(),
                &path_locator(&file),
                width,
                height,
            );
            image.write_ppm(BufWriter::new(File::create(&output)?))?;
            println!("Wrote {}x{} spectrogram to {}", width, height, output.display());
        }
        Command::Play {
            file,
            deck_b,
            gain,
            speed,
            looping,
        } => play(&settings, decoder, &file, deck_b.as_deref(), gain, speed, looping)?,
        Command::Library { action } => library(&settings, decoder.as_ref(), action)?,
        Command::Devices => {
            let default = get_default_audio_device();
            for device in enumerate_audio_devices().map_err(|e| anyhow::anyhow!(e))? {
                let marker = if device.is_default || device.name == default {
                    "*"
                } else {
                    " "
                };
                println!("{} {} ({} ch)", marker, device.name, device.max_channels);
            }
        }
    }

    Ok(())
}

fn path_locator(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn play(
    settings: &Settings,
    decoder: Arc<dyn Decoder>,
    file: &Path,
    deck_b_file: Option<&Path>,
    gain: f64,
    speed: f64,
    looping: bool,
) -> Result<(), anyhow::Error> {
    let mut decks = vec![(PlaybackEngine::new(DeckId::A, Arc::clone(&decoder)), file)];
    if let Some(path) = deck_b_file {
        decks.push((PlaybackEngine::new(DeckId::B, Arc::clone(&decoder)), path));
    }

    let audio_config = AudioEngineConfig::from_settings(settings);
    let mut bus = MixBus::new(
        audio_config.channels as usize,
        audio_config.sample_rate,
        audio_config.buffer_size as usize,
    );

    for (deck, path) in &mut decks {
        deck.load_track(&path_locator(*path))?;
        deck.set_gain(gain)?;
        deck.set_speed(speed)?;
        deck.set_looping(looping);
        bus.add_input(deck.source());
    }

    let mut engine = DeckAudioEngine::new(audio_config);
    engine.start(bus)?;

    for (deck, _) in &decks {
        deck.start();
    }

    while decks.iter().any(|(deck, _)| deck.is_playing()) {
        thread::sleep(Duration::from_millis(500));
        for (deck, _) in &decks {
            let status = deck.status();
            log::info!(
                "Deck {}: {:?} {} ({:.0}%)",
                status.id,
                status.mode,
                status.time_display(),
                status.position_relative * 100.0
            );
        }
    }

    engine.stop();
    Ok(())
}

fn library(
    settings: &Settings,
    decoder: &dyn Decoder,
    action: LibraryAction,
) -> Result<(), anyhow::Error> {
    let mut library = Library::open(&settings.library_path)?;

    match action {
        LibraryAction::Add { paths, recursive } => {
            for path in paths {
                if path.is_dir() {
                    library.add_directory(&path, decoder, recursive);
                } else if let Err(e) = library.add_track(&path, decoder) {
                    log::warn!("Skipping {:?}: {}", path, e);
                }
            }
            library.save()?;
        }
        LibraryAction::List => {
            for (row, track) in library.tracks().iter().enumerate() {
                println!(
                    "{:>3}  {:<40} {:>6} {:>5}  {}",
                    row,
                    track.title,
                    track.duration_display(),
                    track.bpm_display(),
                    track.artist
                );
            }
        }
        LibraryAction::Remove { row } => match library.remove(row) {
            Some(track) => {
                library.save()?;
                println!("Removed {} ({})", track.title, track.url);
            }
            None => anyhow::bail!("No track at row {}", row),
        },
    }

    Ok(())
}

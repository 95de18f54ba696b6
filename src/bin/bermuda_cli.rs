//! Bermuda CLI - resource inspection and headless runs
//!
//! Commands: scan, decode, wgp, spr, mov, scn, dlg, save, avi, run
//! Outputs JSON to stdout
//! Returns non-zero on failure, 2 when the input is not a valid resource

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bermuda_core::{
    avi,
    bitmap::{palette_to_rgb, write_tga},
    decoder::{decode_lzss, decode_zlib},
    dialogue::{parse_dlg, Dialogue},
    fs::DataFs,
    hashing::{bitmap_digest, sha256_hex},
    logging::{self, Profile},
    resource::{load_mov, load_spr, load_wgp},
    run_headless,
    saveload::SaveState,
    text::{decode_latin1, strip_comments},
    EngineConfig, EngineError, Game, HeadlessStub, RunRequest,
};

#[derive(Parser)]
#[command(name = "bermuda-cli")]
#[command(about = "Bermuda Syndrome engine CLI - resource inspection and headless runs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON engine configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Game data directory, overrides the configuration
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Logging profile, overrides the configuration
    #[arg(long, value_enum)]
    log_profile: Option<LogProfile>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogProfile {
    Development,
    Production,
    Test,
}

impl From<LogProfile> for Profile {
    fn from(p: LogProfile) -> Self {
        match p {
            LogProfile::Development => Profile::Development,
            LogProfile::Production => Profile::Production,
            LogProfile::Test => Profile::Test,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Codec {
    Lzss,
    Zlib,
}

#[derive(Subcommand)]
enum Commands {
    /// List the files of the data directory
    Scan,

    /// Decompress an LZSS or zlib resource
    Decode {
        #[arg(long, value_enum, default_value = "lzss")]
        codec: Codec,
        input: PathBuf,
        output: PathBuf,
    },

    /// Describe a WGP background, optionally converting it to TGA
    Wgp {
        input: PathBuf,
        #[arg(long)]
        tga: Option<PathBuf>,
    },

    /// Describe a SPR sprite bank
    Spr { input: PathBuf },

    /// Describe a MOV animation
    Mov { input: PathBuf },

    /// Parse a scene of the data directory and list its objects
    Scn { name: String },

    /// Parse a DLG dialogue script
    Dlg {
        input: PathBuf,
        /// List the choices offered for this id
        #[arg(long)]
        id: Option<String>,
    },

    /// Describe a save state
    Save { input: PathBuf },

    /// Describe an AVI cutscene
    Avi { input: PathBuf },

    /// Run the game headless
    Run {
        #[arg(short, long, default_value_t = 100)]
        frames: u64,

        #[arg(long)]
        skip_intro: bool,

        #[arg(long)]
        seed: Option<u16>,

        /// JSON payload (RunRequest), overrides the other flags
        #[arg(short, long)]
        payload: Option<String>,
    },
}

fn read_file(path: &Path) -> Result<Vec<u8>, EngineError> {
    std::fs::read(path).map_err(|source| EngineError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), EngineError> {
    std::fs::write(path, data).map_err(|source| EngineError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn load_config(cli: &Cli) -> Result<EngineConfig, EngineError> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(data) = &cli.data {
        config.data_path = data.clone();
    }
    if let Some(profile) = cli.log_profile {
        config.log_profile = profile.into();
    }
    Ok(config)
}

fn execute(command: &Commands, config: EngineConfig) -> Result<serde_json::Value, EngineError> {
    Ok(match command {
        Commands::Scan => {
            let fs = DataFs::new(&config.data_path);
            let files: Vec<&str> = fs.list().collect();
            let startup_scene = ["-01.SCN", "_01.SCN"].into_iter().find(|n| fs.exists(n));
            json!({
                "root": config.data_path,
                "count": files.len(),
                "startup_scene": startup_scene,
                "demo": fs.exists("-00.SCN"),
                "files": files,
            })
        }

        Commands::Decode { codec, input, output } => {
            let data = read_file(input)?;
            let decoded = match codec {
                Codec::Lzss => decode_lzss(&data)?,
                Codec::Zlib => decode_zlib(&data)?,
            };
            write_file(output, &decoded)?;
            json!({
                "input_size": data.len(),
                "output_size": decoded.len(),
                "sha256": sha256_hex(&decoded),
            })
        }

        Commands::Wgp { input, tga } => {
            let bg = load_wgp(&read_file(input)?)?;
            if let Some(path) = tga {
                let rgb = palette_to_rgb(&bg.palette);
                let pixels: Vec<[u8; 3]> = bg.bitmap.to_top_down().iter().map(|&c| rgb[c as usize]).collect();
                let mut out = Vec::new();
                write_tga(&mut out, &pixels, bg.bitmap.width(), bg.bitmap.height())
                    .map_err(|source| EngineError::Io { path: path.display().to_string(), source })?;
                write_file(path, &out)?;
            }
            json!({
                "width": bg.bitmap.width(),
                "height": bg.bitmap.height(),
                "pitch": bg.bitmap.pitch,
                "sha256": bitmap_digest(&bg.bitmap.bits, &bg.palette),
            })
        }

        Commands::Spr { input } => {
            let bank = load_spr(&read_file(input)?)?;
            let motions: Vec<_> = bank
                .motions
                .iter()
                .map(|frames| frames.iter().map(|f| f.hdr).collect::<Vec<_>>())
                .collect();
            json!({
                "compression": bank.compression,
                "frames": bank.frames_count(),
                "motions": motions,
            })
        }

        Commands::Mov { input } => {
            let mov = load_mov(&read_file(input)?)?;
            json!({
                "movie": mov,
                "script_size": mov.script.len(),
                "script_sha256": sha256_hex(&mov.script),
            })
        }

        Commands::Scn { name } => {
            let mut game = Game::new(config, HeadlessStub::default())?;
            game.load_scene(name)?;
            let animations: Vec<_> = game.animation_names().collect();
            let bag: Vec<_> = game.bag_objects().collect();
            json!({
                "scene": game.scene_name(),
                "scene_number": game.scene_number(),
                "animations": animations,
                "objects": game.objects(),
                "next_scenes": game.next_scenes(),
                "bag": bag,
                "music_track": game.music_track(),
            })
        }

        Commands::Dlg { input, id } => {
            let mut data = read_file(input)?;
            strip_comments(&mut data);
            let entries = parse_dlg(&decode_latin1(&data))?;
            let mut output = json!({ "entries": entries });
            if let Some(id) = id {
                let mut dialogue = Dialogue::new(entries);
                dialogue.setup(id);
                output["choices"] = json!(dialogue.choices().collect::<Vec<_>>());
                output["sprite_index"] = json!(dialogue.sprite_index);
            }
            output
        }

        Commands::Save { input } => {
            let data = read_file(input)?;
            let state = SaveState::read(&data, true)?;
            json!({
                "summary": state.summary(),
                "sha256": sha256_hex(&data),
            })
        }

        Commands::Avi { input } => {
            let (header, audio_chunks, video_chunks) = avi::scan(&read_file(input)?)?;
            json!({
                "header": header,
                "audio_chunks": audio_chunks,
                "video_chunks": video_chunks,
            })
        }

        Commands::Run { frames, skip_intro, seed, payload } => {
            let request = match payload {
                Some(payload) => serde_json::from_str(payload)?,
                None => RunRequest {
                    frames: *frames,
                    skip_intro: *skip_intro,
                    seed: *seed,
                    inputs: Vec::new(),
                },
            };
            serde_json::to_value(run_headless(config, &request)?)?
        }
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(r#"{{"error": "Failed to load config: {}"}}"#, e);
            return ExitCode::FAILURE;
        }
    };
    logging::init(config.log_profile);

    match execute(&cli.command, config) {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(s) => {
                println!("{}", s);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!(r#"{{"error": "{}"}}"#, e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            let output = json!({
                "success": false,
                "kind": e.kind(),
                "error": e.to_string(),
            });
            println!("{}", output);
            match e {
                EngineError::Decode(_) | EngineError::Resource(_) | EngineError::Parse(_) | EngineError::Save(_) | EngineError::Avi(_) => {
                    ExitCode::from(2)
                }
                _ => ExitCode::FAILURE,
            }
        }
    }
}

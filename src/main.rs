mod annotate;
mod build_info;
mod codec;
mod config;
mod controller;
mod convert;
mod error;
mod event_source;
mod file_io;
mod geometry;
mod label_writer;
mod logging;
mod render;
mod session;
mod settings;
mod voc;

#[allow(unused_imports)]
use log::{debug, info, warn, error};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use clap::{Args, Parser, Subcommand};

use crate::annotate::Annotator;
use crate::build_info::BuildInfo;
use crate::config::Config;
use crate::error::Result;
use crate::event_source::{EventSource, ScriptSource, StdinSource};
use crate::session::EditMode;
use crate::settings::UserSettings;

#[derive(Parser, Debug)]
#[command(
    name = "boxskater",
    version = BuildInfo::build_string(),
    about = "Draw bounding boxes over an image folder and write YOLO labels, or convert VOC XML records"
)]
struct Cli {
    /// Settings file (default: <config dir>/boxskater/settings.yaml)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Debug output even in release builds (RUST_LOG still wins)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Write the buffered log lines to <data dir>/boxskater/logs/debug.log on exit
    #[arg(long, global = true)]
    export_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Annotate images one by one, reading pointer events and commands
    Annotate(AnnotateArgs),
    /// Convert every XML record in a directory into a label file
    Convert(ConvertArgs),
    /// Write a commented settings file with the defaults
    #[command(name = "init-settings")]
    InitSettings {
        /// Destination (default: the settings path)
        path: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct AnnotateArgs {
    #[arg(long)]
    image_dir: Option<PathBuf>,
    #[arg(long)]
    label_dir: Option<PathBuf>,
    /// Class name given to every drawn box; must be in the class map
    #[arg(long)]
    class: Option<String>,
    #[arg(long, value_enum)]
    mode: Option<EditMode>,
    /// Append the drag angle to each label line
    #[arg(long)]
    rotated: bool,
    #[arg(long)]
    max_width: Option<u32>,
    #[arg(long)]
    max_height: Option<u32>,
    /// Replay events from a YAML/JSON file instead of reading stdin
    #[arg(long)]
    script: Option<PathBuf>,
    /// Keep this image file updated with the current boxes
    #[arg(long)]
    preview: Option<PathBuf>,
}

impl AnnotateArgs {
    fn apply(&self, settings: &mut UserSettings) {
        if let Some(dir) = &self.image_dir {
            settings.image_dir = dir.to_string_lossy().into_owned();
        }
        if let Some(dir) = &self.label_dir {
            settings.label_dir = dir.to_string_lossy().into_owned();
        }
        if let Some(class) = &self.class {
            settings.annotate_class = class.clone();
        }
        if let Some(mode) = self.mode {
            settings.edit_mode = mode;
        }
        if self.rotated {
            settings.rotated = true;
        }
        if let Some(width) = self.max_width {
            settings.max_display_width = width;
        }
        if let Some(height) = self.max_height {
            settings.max_display_height = height;
        }
    }
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Directory holding the .xml records
    #[arg(long)]
    xml_dir: Option<PathBuf>,
    /// Directory receiving the label files
    #[arg(long)]
    label_dir: Option<PathBuf>,
}

impl ConvertArgs {
    fn apply(&self, settings: &mut UserSettings) {
        if let Some(dir) = &self.xml_dir {
            settings.xml_dir = dir.to_string_lossy().into_owned();
        }
        if let Some(dir) = &self.label_dir {
            settings.label_dir = dir.to_string_lossy().into_owned();
        }
    }
}

fn run_annotate(settings_path: Option<&Path>, args: AnnotateArgs) -> Result<()> {
    let mut settings = UserSettings::load(settings_path);
    args.apply(&mut settings);
    let config = Config::from_settings(&settings)?;
    debug!("Config: {:?}", config);

    logging::setup_interrupt_handler();

    let mut source: Box<dyn EventSource> = match &args.script {
        Some(path) => Box::new(ScriptSource::from_file(path, &config.keys)?),
        None => {
            info!(
                "Reading events from stdin: `press X Y`, `move X Y`, `release X Y`, `{}` save, `{}` reset, `{}` quit",
                config.keys.save, config.keys.reset, config.keys.quit
            );
            Box::new(StdinSource::spawn(config.keys.clone())?)
        }
    };

    let annotator = Annotator::new(&config, args.preview, logging::interrupt_flag());
    annotator.run(source.as_mut())?;
    Ok(())
}

fn run_convert(settings_path: Option<&Path>, args: ConvertArgs) -> Result<()> {
    let mut settings = UserSettings::load(settings_path);
    args.apply(&mut settings);
    let config = Config::from_settings(&settings)?;

    let report = convert::process_all_files(&config.xml_dir, &config.label_dir, &config.classes)?;
    if report.failed_records > 0 {
        warn!("{} record(s) could not be converted", report.failed_records);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let settings_path = cli.settings.as_deref();
    match cli.command {
        Commands::Annotate(args) => run_annotate(settings_path, args),
        Commands::Convert(args) => run_convert(settings_path, args),
        Commands::InitSettings { path } => {
            let path = path
                .or_else(|| settings_path.map(Path::to_path_buf))
                .unwrap_or_else(UserSettings::settings_path);
            UserSettings::default().write_new(&path)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let shared_log_buffer = logging::setup_logger(cli.verbose);
    logging::setup_panic_hook(Arc::clone(&shared_log_buffer));
    logging::setup_signal_crash_handler();

    debug!("boxskater {}", BuildInfo::display_version());
    debug!("{}", BuildInfo::detailed_info().replace('\n', ", "));

    let export_logs = cli.export_logs;
    let code = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            1
        }
    };

    if export_logs {
        if let Err(e) = logging::export_debug_logs(&shared_log_buffer) {
            eprintln!("Failed to export debug logs: {}", e);
        }
    }

    std::process::exit(code);
}

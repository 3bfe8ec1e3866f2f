use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use la_app::batch;
use la_app::cli::{Cli, SourceKind};
use la_app::live::{LiveLoop, StopReason};
use la_app::pipeline::Converter;
use la_app::resources::{Resources, Startup, startup};
use la_core::config::AppConfig;
use la_core::error::CoreError;
use la_export::{ExportMode, ExportTarget, export};
use la_source::webcam::{CaptureSettings, WebcamSource};

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Source, config, police et dossier de travail, avant toute lecture
    let Startup {
        source,
        config,
        resources,
    } = startup(&cli)?;

    match &source {
        SourceKind::Image(path) => run_image(&cli, &config, &resources, &source, path),
        SourceKind::Video(path) => run_video(&cli, &config, &resources, &source, path),
        SourceKind::Webcam => run_webcam(&config),
    }
}

fn run_image(
    cli: &Cli,
    config: &AppConfig,
    resources: &Resources,
    source: &SourceKind,
    path: &Path,
) -> Result<()> {
    let mode = cli.export_mode()?;
    let converter = Converter::new(config.ramp()?);
    let canvas = converter.convert_image(path, config.image_budget)?;

    let base = cli.output_base(source);
    let target = ExportTarget::from_mode(mode, Path::new(&base), Some(resources.rasterizer()))?;
    let stdout = std::io::stdout();
    if let Some(written) = export(&canvas, &target, &mut stdout.lock())? {
        println!("Export : {}", written.display());
    }
    Ok(())
}

fn run_video(
    cli: &Cli,
    config: &AppConfig,
    resources: &Resources,
    source: &SourceKind,
    path: &Path,
) -> Result<()> {
    if let Ok(mode) = cli.export_mode()
        && cli.mode.is_some()
        && mode != ExportMode::Image
    {
        log::warn!("--mode ignoré pour une vidéo : les frames sont rendues en images.");
    }
    let base = cli.output_base(source);

    let report = batch::run_video(path, config, resources.rasterizer(), &base, !cli.no_video)?;
    println!(
        "{} frames exportées dans {}",
        report.frames.len(),
        resources.work_dir().display()
    );
    if let Some(video) = report.video {
        println!(
            "Vidéo : {} ({:.2} fps)",
            video.display(),
            report.decomposed.output_fps()
        );
    }
    Ok(())
}

fn run_webcam(config: &AppConfig) -> Result<()> {
    println!("Bienvenue dans lumascii en direct !");
    println!(
        "La webcam ({}) est convertie en art ASCII en temps réel. Ctrl+C pour arrêter.",
        config.device
    );
    print!("Appuyez sur Entrée pour commencer...");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;

    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("Installation du gestionnaire Ctrl+C")?;

    let settings = CaptureSettings {
        device: config.device.clone(),
        width: config.capture_width,
        height: config.capture_height,
        fps: 1000u64.checked_div(config.delay_ms).unwrap_or(30).max(1) as u32,
    };
    let camera = WebcamSource::open(settings)?;
    let mut live = LiveLoop::new(
        camera,
        Converter::new(config.ramp()?),
        std::io::stdout(),
        config.live_budget,
        Duration::from_millis(config.delay_ms),
        stop,
    );

    match live.run()? {
        StopReason::Interrupted | StopReason::FrameLimit => {
            println!("\nArrêt du programme.");
            Ok(())
        }
        StopReason::CaptureFailed(msg) => Err(CoreError::CaptureFailure(msg).into()),
    }
}

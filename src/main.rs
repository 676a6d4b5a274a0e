use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use log::{error, info, warn};
use plex_preview_generator::catalog::{MediaCatalog, PlexCatalog, SectionKind};
use plex_preview_generator::component::{
    Dispatcher, FfmpegTranscoder, JobContext, ResourcePool, RunSummary,
};
use plex_preview_generator::config::{Settings, parse_error_exit_code};
use plex_preview_generator::init;
use plex_preview_generator::signal::setup_shutdown_signal;
use plex_preview_generator::tools::{TempRootGuard, check_required_tools};
use std::process;
use std::sync::atomic::Ordering;

fn main() {
    init::init();
    let settings = match Settings::try_parse() {
        Ok(settings) => settings,
        Err(e) => match parse_error_exit_code(&e) {
            0 => e.exit(),
            code => {
                let _ = e.print();
                error!("設定無效: {}", e.kind());
                process::exit(code);
            }
        },
    };

    match run(&settings) {
        Ok(summary) => print_summary(&summary),
        Err(e) => {
            error!("{e:#}");
            eprintln!("{} {e:#}", style("錯誤:").red().bold());
            process::exit(1);
        }
    }
}

fn run(settings: &Settings) -> Result<RunSummary> {
    let ffmpeg_path = check_required_tools()?;
    settings.validate()?;

    let shutdown_signal = setup_shutdown_signal();
    let pool = ResourcePool::detect(settings.gpu_threads, settings.cpu_threads);
    let transcoder =
        FfmpegTranscoder::new(&ffmpeg_path, settings.frame_interval, settings.thumbnail_quality);
    let catalog = PlexCatalog::new(
        &settings.plex_url,
        &settings.plex_token,
        settings.request_timeout(),
    )?;

    // 開始與結束時都清空暫存資料夾
    let _tmp_root = TempRootGuard::acquire(&settings.tmp_folder)?;

    let context = JobContext {
        settings,
        pool: &pool,
        extractor: &transcoder,
    };
    let dispatcher = Dispatcher::new(
        settings.worker_count(),
        &catalog,
        context,
        shutdown_signal.clone(),
    )?;

    let sections = catalog.sections().context("無法取得 Plex 媒體庫列表")?;
    let mut summary = RunSummary::default();

    for section in &sections {
        if shutdown_signal.load(Ordering::SeqCst) {
            break;
        }
        if section.kind == SectionKind::Unsupported {
            info!("略過不支援的媒體庫: {}", section.title);
            continue;
        }

        match dispatcher.run_section(section) {
            Ok(section_summary) => summary += section_summary,
            Err(e) => warn!("{e:#}"),
        }
    }

    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", style("預覽產生完成").green().bold());
    println!("  {} {}", style("已產生:").green(), summary.installed);
    println!("  {} {}", style("已略過:").yellow(), summary.skipped);
    println!("  {} {}", style("失敗:").red(), summary.failed);
}

//! slot-analyze - parking-slot occupancy and dwell analysis for one video
//!
//! Prints a JSON (or CSV) report on stdout. On failure prints a JSON error
//! envelope instead and exits with status 1. Logs and progress go to stderr.

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use slot_occupancy::{
    parse_slot_config, AnalysisMode, ErrorEnvelope, LotContext, OutputFormat, ProcessorConfig,
    VideoProcessor,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video file to analyse (mp4, avi, mov, wmv, flv, mkv) or a stub:// video.
    #[arg(long, alias = "video_path")]
    video_path: String,
    /// Slot configuration as a JSON array.
    #[arg(long, alias = "slot_config")]
    slot_config: String,
    /// Analysis to run.
    #[arg(long, alias = "analysis_type", value_enum, default_value_t = AnalysisMode::Full)]
    analysis_type: AnalysisMode,
    /// Report format on stdout.
    #[arg(long, alias = "output_format", value_enum, default_value_t = OutputFormat::Json)]
    output_format: OutputFormat,
    /// Detection model (ONNX); overrides SLOT_OCCUPANCY_MODEL_PATH.
    #[arg(long, alias = "model_path")]
    model_path: Option<PathBuf>,
    /// Parking lot the video belongs to, for log context.
    #[arg(long, alias = "parking_lot_id")]
    parking_lot_id: Option<i64>,
    /// Seed for synthetic detections.
    #[arg(long)]
    seed: Option<u64>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    match run(&args, &ui) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("video processing failed: {:#}", err);
            let envelope = ErrorEnvelope::new(format!("{:#}", err), Some(&args.video_path));
            match serde_json::to_string(&envelope) {
                Ok(body) => println!("{}", body),
                Err(e) => eprintln!("failed to encode error envelope: {}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, ui: &ui::Ui) -> Result<String> {
    let slots = {
        let _stage = ui.stage("Parse slot configuration");
        parse_slot_config(&args.slot_config)?
    };

    let mut processor = {
        let _stage = ui.stage("Load detector");
        let mut config = ProcessorConfig::load()?;
        if let Some(path) = &args.model_path {
            config.model_path = Some(path.clone());
        }
        VideoProcessor::from_config(&config, args.seed).with_observer(ui.observer())
    };
    let info = processor.detector().model_info();
    log::info!(
        "detector: {} ({:?}), confidence {:.2}, nms {:.2}",
        info.backend,
        info.mode,
        info.confidence_threshold,
        info.nms_threshold
    );

    let report = processor.process_video(&args.video_path, &slots, args.analysis_type)?;

    if let Some(lot_id) = args.parking_lot_id {
        let lot = LotContext::from_report(format!("lot {}", lot_id), &report);
        log::info!(
            "{}: {}/{} slots available ({:.1}% occupied)",
            lot.name,
            lot.available_slots,
            lot.total_slots,
            lot.occupancy_rate
        );
    }

    let _stage = ui.stage("Render report");
    Ok(report.render(args.output_format)?)
}

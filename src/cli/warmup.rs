//! `warmup` subcommand: pre-load the configured model so a subsequent
//! `transcribe` call (or, in a long-lived process embedding this crate,
//! the first real request) doesn't pay cold-start cost. Per 4.5, warm-up
//! failures are logged, not fatal.

use crate::cli::args::WarmupArgs;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::orchestrator::PipelineOrchestrator;

pub fn run(args: WarmupArgs) -> i32 {
    match run_inner(&args) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("[callscribe] error: {}", e);
            e.exit_code()
        }
    }
}

fn run_inner(args: &WarmupArgs) -> Result<(), PipelineError> {
    let mut cfg = PipelineConfig::default();
    cfg.apply_env_overrides()?;

    if let Some(ref path) = args.config {
        cfg = crate::config::load_config_file(path)?;
    }
    if let Some(model) = args.model {
        cfg.model_size = model;
    }
    if let Some(ref path) = args.model_path {
        cfg.model_path = Some(path.clone());
    }

    let orchestrator = PipelineOrchestrator::new(cfg)?;
    orchestrator.warm_up();
    orchestrator.warm_up_diarization();
    Ok(())
}

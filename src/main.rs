use clap::Parser;
use shadow_rs::shadow;
use std::{path::PathBuf, process::ExitCode};
use tracing_subscriber::EnvFilter;
use ui_log_analyzer::{
    reader::DEFAULT_CHUNK_SIZE, run, AggMode, Config, OutputFormat, RunOutcome, REPORT_SIZE,
};

shadow!(build);

#[derive(Parser, Debug)]
#[command(about, version, long_version = build::CLAP_LONG_VERSION)]
struct Cli {
    /// Log file to analyse (default: newest file in --log-dir)
    #[clap(long)]
    log_path: Option<PathBuf>,

    #[clap(long, default_value = "./log")]
    log_dir: PathBuf,

    #[clap(long, default_value = "./reports")]
    report_dir: PathBuf,

    /// HTML template (default: <report-dir>/report.html)
    #[clap(long)]
    template: Option<PathBuf>,

    #[clap(long, default_value_t = REPORT_SIZE)]
    report_size: usize,

    /// Lines read per batch
    #[clap(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    #[clap(long, value_enum, default_value_t = AggMode::Mean)]
    agg_type: AggMode,

    /// json or html; anything else writes html
    #[clap(long, default_value = "html")]
    fmt: String,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = Config::with_dirs(&self.log_dir, &self.report_dir);
        if let Some(template) = self.template {
            config.template_path = template;
        }
        config.log_path = self.log_path;
        config.report_size = self.report_size;
        config.chunk_size = self.chunk_size;
        config.agg_mode = self.agg_type;
        config.format = OutputFormat::from_name(&self.fmt);
        config
    }
}

fn main() -> ExitCode {
    std::env::set_var(
        "RUST_LOG",
        format!("info,{}", std::env::var("RUST_LOG").unwrap_or_default()),
    );
    let enable_color = std::env::var("NO_COLOR").is_err();
    tracing_subscriber::fmt()
        .with_thread_ids(true)
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(enable_color)
        .init();

    let args = Cli::parse();
    tracing::debug!("{:?}", args);
    let config = args.into_config();

    match run(&config) {
        Ok(RunOutcome::Written(path)) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::AlreadyExists(path)) => {
            println!("report already exists: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

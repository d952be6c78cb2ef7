use log::info;
use meta_ads_probe::config::Config;
use meta_ads_probe::{cli, run};
use std::io;
use std::process;

#[tokio::main(flavor = "current_thread")] // probes run strictly one after another
async fn main() -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    let version_flag = matches.get_flag("version");

    cli::init_logging(log_level.as_deref());

    if version_flag {
        println!("meta-ads-probe {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    if let Some(required) = cli::required_permissions_override(&matches) {
        cfg.required_permissions = required;
    }

    match run(&cfg, cli::run_options(&matches), io::stdout()).await {
        Ok(report) => {
            info!(
                "probe finished: {} steps, {} skipped, rate limit {}/{}",
                report.steps.len(),
                report.skipped().count(),
                report.final_state.points_used,
                report.final_state.points_total
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("error: {:#}", anyhow::Error::from(e));
            process::exit(1);
        }
    }
}

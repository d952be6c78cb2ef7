use crate::config::parse_permission_list;
use crate::driver::DrillDownOptions;
use crate::report::ReportFormat;
use crate::RunOptions;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::BTreeSet;

pub fn build_cli() -> Command {
    Command::new("meta-ads-probe")
        .about("Probe the Meta Marketing API and report latency, rate-limit usage and cache hits per call")
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .num_args(1)
                .help("Override RUST_LOG level (e.g., info, debug)"),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Print version and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("trends")
                .long("trends")
                .help("Also probe the aggregate insight trend endpoints")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("required-permissions")
                .long("required-permissions")
                .num_args(1)
                .value_name("LIST")
                .help("Comma separated scopes the token must hold (overrides META_REQUIRED_PERMISSIONS)"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .num_args(1)
                .value_parser(["text", "json"])
                .default_value("text")
                .help("Report format written to stdout"),
        )
}

pub fn run_options(matches: &ArgMatches) -> RunOptions {
    let format = matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::parse(f))
        .unwrap_or_default();
    RunOptions {
        format,
        drill_down: DrillDownOptions {
            include_trends: matches.get_flag("trends"),
        },
    }
}

pub fn required_permissions_override(matches: &ArgMatches) -> Option<BTreeSet<String>> {
    matches
        .get_one::<String>("required-permissions")
        .map(|raw| parse_permission_list(raw))
}

pub fn init_logging(level: Option<&str>) {
    // Explicit level wins over RUST_LOG, which wins over the info default.
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(lvl) = level {
        builder.parse_filters(lvl);
    }
    builder.init();
}

use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;
use std::str::FromStr;

use feature_selector::config::{load_search_config, ModelType};
use feature_selector::io::CsvReaderConfig;
use feature_selector::runner::{run_search_on_file, write_report};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("FEATURE_SELECTOR_LOG", "error,feature_selector=info"))
        .init();

    let matches = Command::new("feature-selector")
        .version(clap::crate_version!())
        .about("Exhaustive and stepwise feature-subset selection")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Run a configured feature search over a CSV table")
                .arg(
                    Arg::new("config")
                        .help("Path to the search JSON configuration file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .help("Path to the input table (header row required)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("label")
                        .short('l')
                        .long("label")
                        .help("Name of the target column")
                        .default_value("y")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .arg(
                    Arg::new("groups")
                        .short('g')
                        .long("groups")
                        .help("Name of an integer column used for grouped cross-validation")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .arg(
                    Arg::new("delimiter")
                        .long("delimiter")
                        .help("Field delimiter of the input table")
                        .default_value(",")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .arg(
                    Arg::new("model_type")
                        .long("model-type")
                        .help("Override the model type from the JSON config.")
                        .value_parser(["linear", "logistic", "gbdt_classifier", "gbdt_regressor"])
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("confidence")
                        .long("confidence")
                        .help("Confidence level of the reported score intervals")
                        .default_value("0.95")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("Path to write the JSON report. Defaults to stdout.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => handle_run(run_matches),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_run(matches: &ArgMatches) -> Result<()> {
    let config_path = matches
        .get_one::<PathBuf>("config")
        .ok_or_else(|| anyhow!("Missing config path"))?;
    let data_path = matches
        .get_one::<PathBuf>("data")
        .ok_or_else(|| anyhow!("Missing data path"))?;
    log::info!("[FeatureSelector] Running search from config: {:?}", config_path);

    let mut config = load_search_config(config_path)?;
    if let Some(model_type) = matches.get_one::<String>("model_type") {
        config.estimator.model_type = ModelType::from_str(model_type)?;
    }

    let delimiter = match matches.get_one::<String>("delimiter").map(String::as_str) {
        Some("\\t") | Some("tab") => b'\t',
        Some(d) if d.len() == 1 => d.as_bytes()[0],
        Some(d) => return Err(anyhow!("Delimiter must be a single byte, got '{}'", d)),
        None => b',',
    };
    let reader = CsvReaderConfig {
        delimiter,
        label_column: matches
            .get_one::<String>("label")
            .cloned()
            .unwrap_or_else(|| "y".to_string()),
        group_column: matches.get_one::<String>("groups").cloned(),
        ..CsvReaderConfig::default()
    };
    let confidence = matches.get_one::<f64>("confidence").copied().unwrap_or(0.95);

    let report = match run_search_on_file(&config, data_path, &reader, confidence) {
        Ok(report) => report,
        Err(e) => {
            log::error!("Feature selection failed: {:#}", e);
            std::process::exit(1)
        }
    };
    if report.interrupted {
        log::warn!("Search was interrupted; the report covers the completed rounds only");
    }
    write_report(&report, matches.get_one::<PathBuf>("output_file").map(PathBuf::as_path))
}

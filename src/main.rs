use bounce_parser::batch::process_files;
use bounce_parser::{Config, Registry};
use clap::{Arg, Command};
use log::LevelFilter;
use serde_json::json;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let matches = Command::new("bounce-parser")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract and classify delivery failures from bounce emails")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(Config::default_path()),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Compile every configured pattern set and report")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-providers")
                .long("list-providers")
                .help("List the bounce providers in selection order")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .value_name("N")
                .help("Messages processed at once (overrides the configuration)")
                .value_parser(clap::value_parser!(usize))
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("reply-code")
                .long("reply-code")
                .value_name("CODE")
                .help("SMTP reply code known from the delivery log, applied to every record")
                .value_parser(clap::value_parser!(u16).range(200..600))
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("pretty")
                .long("pretty")
                .help("Pretty-print the JSON output")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("email")
                .value_name("EMAIL")
                .help("Decoded bounce message files to parse")
                .num_args(0..)
                .action(clap::ArgAction::Append),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(Config::default_path());

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    let registry = match Registry::from_config(&config) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error building bounce providers: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        println!("Configuration: {config_path}");
        println!("Number of providers: {}", registry.len());
        for (i, parser) in registry.iter().enumerate() {
            println!("  Provider {}: {}", i + 1, parser.name());
        }
        println!("All regex patterns compiled successfully.");
        return;
    }

    if matches.get_flag("list-providers") {
        for parser in registry.iter() {
            println!("{:<24} {}", parser.name(), parser.description());
        }
        return;
    }

    let files: Vec<String> = matches
        .get_many::<String>("email")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    if files.is_empty() {
        eprintln!("No input files given (see --help)");
        process::exit(2);
    }

    let concurrency = matches
        .get_one::<usize>("concurrency")
        .copied()
        .unwrap_or(config.concurrency);

    let reply_code = matches.get_one::<u16>("reply-code").copied();

    let outcomes = process_files(Arc::new(registry), files, concurrency, reply_code).await;

    let mut output = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        output.push(match outcome.result {
            Ok(report) => json!({ "file": outcome.label, "report": report }),
            Err(e) => json!({ "file": outcome.label, "error": e.to_string() }),
        });
    }

    let rendered = if matches.get_flag("pretty") {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    };

    match rendered {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Error serializing results: {e}");
            process::exit(1);
        }
    }
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path)
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Set pattern_dir to load additional pattern set modules.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

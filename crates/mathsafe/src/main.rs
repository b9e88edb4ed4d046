use anyhow::Result;
use log::LevelFilter;
use mathsafe::{CommandProcessor, PolicySource, Verdict};
use safecore::PolicyFilter;
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "Usage: mathsafe [--config <path>] <command> [args]

Commands:
  url <value>           Check a link target
  class <value>         Check a class name
  id <value>            Check an element id
  style <value>         Filter inline style text
  fontsize <value>      Check a fontsize attribute
  size <em>             Filter a size macro value
  require <name>        Check an extension name
  attr <name> <value>   Filter a MathML attribute
  show-config           Print the effective policy";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Info);
        logger.filter_module("mathsafe", LevelFilter::Debug);
        logger.filter_module("safecore", LevelFilter::Debug);
    }
    logger.init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "-h" || a == "--help") {
        println!("{}", USAGE);
        return Ok(ExitCode::SUCCESS);
    }

    let config_path = match args.iter().position(|a| a == "--config") {
        Some(index) => {
            if index + 1 >= args.len() {
                eprintln!("--config requires a path");
                return Ok(ExitCode::from(2));
            }
            let path = PathBuf::from(args.remove(index + 1));
            args.remove(index);
            Some(path)
        }
        None => None,
    };

    let source = match PolicySource::load(config_path.as_deref()).await {
        Ok(source) => source,
        Err(e) => {
            log::error!("Failed to load policy: {}", e);
            eprintln!("Failed to load policy: {}", e);
            return Ok(ExitCode::from(2));
        }
    };

    let processor = CommandProcessor::new(PolicyFilter::new(source.policy()));
    match processor.execute_command(&args) {
        Ok(Verdict::Accepted(value)) => {
            println!("{}", value);
            Ok(ExitCode::SUCCESS)
        }
        Ok(Verdict::Rejected) => {
            println!("rejected");
            Ok(ExitCode::from(1))
        }
        Ok(Verdict::Report(report)) => {
            println!("{}", report);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            Ok(ExitCode::from(2))
        }
    }
}

use clap::Parser;
use code_packager::cli::{self, Cli};
use code_packager::core::CoreConfigManager;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(e) = cli::init_logging(args.verbose, args.log_file.as_deref()) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }
    log::debug!("CodePackager: Starting with {args:?}");

    let config_manager = CoreConfigManager::new();
    let mut stdout = std::io::stdout().lock();
    match cli::run(&args, &config_manager, &mut stdout) {
        Ok(_) => ExitCode::SUCCESS,
        // The summary already said "No files to process."
        Err(e) if e.is_empty_set() => ExitCode::from(2),
        Err(e) => {
            log::error!("CodePackager: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

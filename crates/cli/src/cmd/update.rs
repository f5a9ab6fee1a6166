//! Update command implementation.

use vaultsync_core::config::ResolvedConfig;
use vaultsync_core::index::DocOutcome;

use crate::UpdateArgs;

pub fn run(rc: &ResolvedConfig, args: UpdateArgs) {
    let coordinator = super::open_coordinator(rc);

    let outcome = match coordinator.update_file_now(&args.path) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error updating {}: {}", args.path.display(), e);
            std::process::exit(1);
        }
    };

    match outcome {
        DocOutcome::Indexed => println!("Indexed: {}", args.path.display()),
        DocOutcome::Removed => println!("Removed: {}", args.path.display()),
        DocOutcome::Skipped => {
            eprintln!("Skipped {}: could not be read; previous index kept", args.path.display());
            std::process::exit(1);
        }
        DocOutcome::Ignored => {
            eprintln!("Not a tracked document: {}", args.path.display());
            std::process::exit(1);
        }
    }
}

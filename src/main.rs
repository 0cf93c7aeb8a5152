/// Archiver entry point.
///
/// No arguments: configuration comes from `archiver.toml` (optional, all
/// fields defaulted) and secrets from the environment / `.env`. Exit code
/// 0 on completion — including the nothing-to-do case — and 1 on decode
/// errors or an unhandled collaborator failure.

use std::path::Path;
use std::process::ExitCode;

use vlf_archiver::config::ArchiverConfig;
use vlf_archiver::firestore::FirestoreClient;
use vlf_archiver::logging::{self, LogLevel, Subsystem};
use vlf_archiver::pipeline::{print_summary, run};
use vlf_archiver::storage::S3Client;

const CONFIG_FILE: &str = "archiver.toml";

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    logging::init_logger(LogLevel::Info, None, false);

    let config = match ArchiverConfig::load(Path::new(CONFIG_FILE)) {
        Ok(config) => config,
        Err(e) => {
            logging::error(Subsystem::System, Some(CONFIG_FILE), &e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let store = match S3Client::from_env(&config.bucket) {
        Ok(store) => store,
        Err(e) => {
            logging::error(Subsystem::Storage, None, &e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let db = match FirestoreClient::from_env() {
        Ok(db) => db,
        Err(e) => {
            logging::error(Subsystem::Firestore, None, &e.to_string());
            return ExitCode::FAILURE;
        }
    };

    match run(&config, &store, &db) {
        Ok(summary) => {
            print_summary(&summary);
            if summary.is_success() {
                println!("Program finished.");
                ExitCode::SUCCESS
            } else {
                logging::error(
                    Subsystem::System,
                    None,
                    &format!("{} file(s) failed to decode", summary.decode_errors),
                );
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            logging::error(Subsystem::System, None, &e.to_string());
            ExitCode::FAILURE
        }
    }
}

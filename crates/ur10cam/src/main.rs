//! `ur10cam [config.json]`: opens the viewer window.

use std::process::ExitCode;

use ur10cam::ViewerOptions;

fn main() -> ExitCode {
    let _ = env_logger::try_init();

    let options = match std::env::args_os().nth(1) {
        Some(path) => match ViewerOptions::from_json_file(&path) {
            Ok(options) => options,
            Err(e) => {
                log::error!("failed to read config {}: {e}", path.to_string_lossy());
                return ExitCode::FAILURE;
            }
        },
        None => ViewerOptions::default(),
    };

    match ur10cam::run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("ur10cam exited with an error: {e}");
            ExitCode::FAILURE
        }
    }
}

use std::env;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use pacmon::runtime::session;
use pacmon::{
    install_interrupt_flag, logging, EnvConfig, InstallRequest, SessionOptions, TtyTerminal,
};

fn main() -> ExitCode {
    let config = EnvConfig::from_env();
    if let Some(path) = &config.debug_log {
        logging::init_file_logger(path);
    }

    // The argument boundary stays thin: everything after the program name is
    // a package name, no flags.
    let packages: Vec<String> = env::args().skip(1).collect();
    if packages.is_empty() {
        eprintln!("usage: pacmon <package>...");
        return ExitCode::from(2);
    }

    let request = InstallRequest::for_packages(&packages, config.command_override.as_deref());

    let interrupt = Arc::new(AtomicBool::new(false));
    let _watcher = match install_interrupt_flag(Arc::clone(&interrupt)) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            log::warn!("failed to install signal watcher: {err}");
            None
        }
    };

    let mut options = SessionOptions {
        interrupt,
        ..SessionOptions::default()
    };
    if let Some(height) = config.view_height {
        options.view_height = height;
    }
    if let Some(capacity) = config.log_capacity {
        options.log_capacity = capacity;
    }

    match session::run(Box::new(TtyTerminal::new()), request, options) {
        Ok(outcome) => ExitCode::from(outcome.exit_code.clamp(0, 255) as u8),
        Err(err) => {
            eprintln!("pacmon: {err}");
            ExitCode::FAILURE
        }
    }
}

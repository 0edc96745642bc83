use crate::error::{CliError, Result};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self},
    prelude::*,
};

/// Installs the global subscriber: compact output on stderr, optionally a
/// verbose copy to a file. Verbosity counts map -v/-vv/-vvv to
/// INFO/DEBUG/TRACE; the default shows warnings only so progress bars stay
/// clean.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let level_filter = if quiet {
        LevelFilter::OFF
    } else {
        match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let subscriber = tracing_subscriber::registry()
        .with(level_filter)
        .with(stderr_layer);

    match log_file {
        Some(path) => {
            let file = File::create(&path).map_err(CliError::Io)?;
            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true);
            subscriber.with(file_layer).init();
        }
        None => subscriber.init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Once;
    use tracing::{debug, info, warn};

    static INIT: Once = Once::new();

    fn install_once() {
        INIT.call_once(|| {
            setup_logging(3, false, None).expect("global subscriber should install");
        });
    }

    #[test]
    #[serial]
    fn global_subscriber_accepts_all_levels() {
        install_once();
        warn!("warn-level check");
        info!("info-level check");
        debug!("debug-level check");
    }

    #[test]
    #[serial]
    fn file_layer_captures_messages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let file = File::create(&path).unwrap();
        let layer = fmt::layer().with_writer(file).with_ansi(false);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            info!("written to the run log");
        });

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("written to the run log"));
    }

    #[test]
    #[serial]
    fn unwritable_log_file_is_an_io_error() {
        let dir_as_file = PathBuf::from("/");
        if cfg!(unix) {
            let result = setup_logging(0, false, Some(dir_as_file));
            assert!(matches!(result, Err(CliError::Io(_))));
        }
    }
}

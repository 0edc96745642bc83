use ensemble::engine::progress::{Progress, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use tracing::info;

/// Bridges engine progress events to an indicatif bar on stderr.
///
/// indicatif already suppresses drawing when stderr is not a terminal, so the
/// bridge only needs the explicit `--no-progress` switch.
pub struct ProgressUi {
    bar: Mutex<Option<ProgressBar>>,
    enabled: bool,
}

impl ProgressUi {
    pub fn new(enabled: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            enabled,
        }
    }

    pub fn reporter(&self) -> ProgressReporter<'_> {
        ProgressReporter::with_callback(Box::new(move |event| self.handle(event)))
    }

    fn handle(&self, event: Progress) {
        let mut bar = self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match event {
            Progress::PhaseStart { name } => info!(phase = name, "phase started"),
            Progress::PhaseFinish => {}
            Progress::TaskStart { total_steps } if self.enabled => {
                let style = ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} steps ({eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar());
                *bar = Some(ProgressBar::new(total_steps).with_style(style));
            }
            Progress::TaskStart { .. } => {}
            Progress::TaskProgress { completed_steps } => {
                if let Some(b) = bar.as_ref() {
                    b.set_position(completed_steps);
                }
            }
            Progress::TaskFinish => {
                if let Some(b) = bar.take() {
                    b.finish();
                }
            }
            Progress::Message(text) => {
                match bar.as_ref() {
                    Some(b) => b.println(&text),
                    None => info!("{text}"),
                }
            }
        }
    }
}

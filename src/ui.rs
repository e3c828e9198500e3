use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use slot_occupancy::ingest::VideoInfo;
use slot_occupancy::observe::{LogObserver, PassKind, RunObserver};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    disable_pretty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        Self {
            mode,
            is_tty,
            disable_pretty,
        }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool, disable_pretty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty, disable_pretty)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.disable_pretty,
                UiMode::Plain => false,
            }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Observer for a run: frame progress bars when pretty, log lines otherwise.
    pub fn observer(&self) -> Box<dyn RunObserver> {
        if self.use_pretty() {
            Box::new(ProgressObserver::default())
        } else {
            Box::new(LogObserver)
        }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

/// Per-pass frame progress bar on stderr.
#[derive(Default)]
pub struct ProgressObserver {
    bar: Option<ProgressBar>,
    interval: u64,
}

impl RunObserver for ProgressObserver {
    fn pass_started(&mut self, pass: PassKind, info: &VideoInfo, interval: u64) {
        let bar = ProgressBar::new(info.total_frames);
        bar.set_draw_target(ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template("{prefix:>10} [{bar:30}] {pos}/{len} frames {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_prefix(pass.label());
        self.interval = interval.max(1);
        self.bar = Some(bar);
    }

    fn frame_sampled(&mut self, _pass: PassKind, frame_index: u64, occupied_slots: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(frame_index + 1);
            bar.set_message(format!("{occupied_slots} occupied"));
        }
    }

    fn pass_finished(&mut self, pass: PassKind, frames_read: u64, processed_frames: u64) {
        if let Some(bar) = self.bar.take() {
            bar.set_position(frames_read);
            bar.finish_with_message(format!(
                "{} sampled every {} ({})",
                processed_frames,
                self.interval,
                pass.label()
            ));
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

use std::sync::Mutex;
use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::pipeline::{Step, StepObserver};
use crate::ui::icons::{CHECK, CROSS};

/// Terminal UI for a deploy run: one spinner per pipeline step.
///
/// Token acquisition and archive building run together, so steps are
/// tracked individually rather than as a single bar. When stdout is not a
/// terminal `indicatif` draws nothing and only the final summary lines from
/// `cmd::deploy` appear.
pub struct DeployUI {
    multi: MultiProgress,
    bars: Mutex<Vec<(Step, ProgressBar)>>,
}

impl Default for DeployUI {
    fn default() -> Self {
        Self::new()
    }
}

impl DeployUI {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(Vec::new()),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("  {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    /// Mark every step still spinning as failed.
    pub fn fail_pending(&self) {
        let Ok(bars) = self.bars.lock() else {
            return;
        };
        for (step, bar) in bars.iter() {
            if !bar.is_finished() {
                bar.finish_with_message(format!("{}{}", CROSS, style(step.label()).red()));
            }
        }
    }
}

impl StepObserver for DeployUI {
    fn started(&self, step: Step) {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(Self::spinner_style());
        bar.set_message(format!("{}...", step.label()));
        bar.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut bars) = self.bars.lock() {
            bars.push((step, bar));
        }
    }

    fn finished(&self, step: Step, detail: &str) {
        let Ok(bars) = self.bars.lock() else {
            return;
        };
        if let Some((_, bar)) = bars.iter().find(|(s, _)| *s == step) {
            bar.finish_with_message(format!(
                "{}{} {}",
                CHECK,
                step.label(),
                style(format!("({detail})")).dim()
            ));
        }
    }
}

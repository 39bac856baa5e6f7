use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_red, bright_yellow};

/// Spinner for one step of environment provisioning
pub struct PhaseProgress {
    pb: ProgressBar,
    label: String,
}

impl PhaseProgress {
    pub fn start(index: usize, total: usize, label: &str) -> Self {
        if index == 1 {
            eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        }
        let label = format!("Phase {index}/{total}: {label}");
        let pb = create_spinner(bright_yellow(&label).to_string());
        Self { pb, label }
    }

    pub fn finish(self) {
        self.pb
            .finish_with_message(bright_green(format!("{} ✓", self.label)).to_string());
    }

    pub fn fail(self) {
        self.pb
            .abandon_with_message(bright_red(format!("{} ✗", self.label)).to_string());
    }

    /// Announce a phase whose output is streamed instead of spun.
    pub fn announce(index: usize, total: usize, label: &str) {
        eprintln!(
            "  {}\n",
            bright_yellow(format!("Phase {index}/{total}: {label}"))
        );
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap(),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

//! Progress reporting for deployments

use colored::Colorize;
use endorse_application::DeployProgressNotifier;
use endorse_domain::DeploymentPhase;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;

fn phase_display_name(phase: &DeploymentPhase) -> &'static str {
    match phase {
        DeploymentPhase::ComputeVersion => "Computing version",
        DeploymentPhase::InstallPerOrg => "Installing",
        DeploymentPhase::AllFailed => "All installs failed",
        DeploymentPhase::InstantiateOnce => "Instantiating",
        DeploymentPhase::Done => "Done",
    }
}

/// Reports deployment progress with progress bars
pub struct ProgressReporter {
    multi: MultiProgress,
    phase_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            phase_bar: Mutex::new(None),
        }
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(bar) = self.phase_bar.lock() {
            if let Some(pb) = bar.as_ref() {
                f(pb);
            }
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DeployProgressNotifier for ProgressReporter {
    fn on_phase_start(&self, phase: &DeploymentPhase, total_tasks: usize) {
        let pb = self.multi.add(ProgressBar::new(total_tasks as u64));
        pb.set_style(Self::phase_style());
        pb.set_prefix(phase_display_name(phase));
        pb.set_message("Starting...");

        if let Ok(mut bar) = self.phase_bar.lock() {
            *bar = Some(pb);
        }
    }

    fn on_install_attempt(&self, organization: &str, attempt: usize) {
        self.with_bar(|pb| pb.set_message(format!("{} (attempt {})", organization, attempt)));
    }

    fn on_org_complete(&self, organization: &str, success: bool, attempts: usize) {
        self.with_bar(|pb| {
            let status = if success {
                format!("{} {}", "v".green(), organization)
            } else {
                format!("{} {} after {} attempts", "x".red(), organization, attempts)
            };
            pb.set_message(status);
            pb.inc(1);
        });
    }

    fn on_phase_complete(&self, phase: &DeploymentPhase) {
        let taken = self.phase_bar.lock().ok().and_then(|mut bar| bar.take());
        if let Some(pb) = taken {
            pb.set_position(pb.length().unwrap_or(0));
            pb.finish_with_message(format!("{}", "complete".green()));
        } else {
            let _ = self.multi.println(phase_display_name(phase));
        }
    }

    fn on_version_computed(&self, previous: &str, next: &str, upgrade: bool) {
        let action = if upgrade { "upgrade" } else { "first deployment" };
        let _ = self
            .multi
            .println(format!("{} -> {} ({})", previous.dimmed(), next.bold(), action));
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl DeployProgressNotifier for SimpleProgress {
    fn on_phase_start(&self, phase: &DeploymentPhase, total_tasks: usize) {
        println!(
            "{} {} ({} tasks)",
            "->".cyan(),
            phase_display_name(phase).bold(),
            total_tasks
        );
    }

    fn on_install_attempt(&self, organization: &str, attempt: usize) {
        if attempt > 1 {
            println!("  {} {} attempt {}", "~".yellow(), organization, attempt);
        }
    }

    fn on_org_complete(&self, organization: &str, success: bool, attempts: usize) {
        if success {
            println!("  {} {}", "v".green(), organization);
        } else {
            println!(
                "  {} {} (failed after {} attempts)",
                "x".red(),
                organization,
                attempts
            );
        }
    }

    fn on_phase_complete(&self, _phase: &DeploymentPhase) {}

    fn on_version_computed(&self, previous: &str, next: &str, _upgrade: bool) {
        println!("  {} -> {}", previous, next);
    }
}

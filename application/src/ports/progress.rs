//! Progress notification port
//!
//! Defines the interface for reporting progress during a deployment.

use endorse_domain::DeploymentPhase;

/// Callback for progress updates during a deployment
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console bars, plain text, etc.)
pub trait DeployProgressNotifier: Send + Sync {
    /// Called when a phase starts
    fn on_phase_start(&self, phase: &DeploymentPhase, total_tasks: usize);

    /// Called before each install attempt of an organization (1-based)
    fn on_install_attempt(&self, _organization: &str, _attempt: usize) {}

    /// Called when an organization finishes its install attempts
    fn on_org_complete(&self, organization: &str, success: bool, attempts: usize);

    /// Called when a phase completes
    fn on_phase_complete(&self, phase: &DeploymentPhase);

    /// Called once the next version is known.
    fn on_version_computed(&self, _previous: &str, _next: &str, _upgrade: bool) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl DeployProgressNotifier for NoProgress {
    fn on_phase_start(&self, _phase: &DeploymentPhase, _total_tasks: usize) {}
    fn on_org_complete(&self, _organization: &str, _success: bool, _attempts: usize) {}
    fn on_phase_complete(&self, _phase: &DeploymentPhase) {}
}

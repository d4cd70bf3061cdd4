//! Final summary and exit status.
//!
//! Only the resource load decides the exit status; provider registrations are
//! best effort and are reported without affecting it.

use std::io::{self, Write};

use crate::loader::{ResourceLoadOutcome, ResourceLoadReport};
use crate::output::{CYAN, GREEN, RED, RESET, YELLOW};
use crate::registrar::{RegistrationOutcome, RegistrationStatus};

#[derive(Debug, Clone)]
pub struct Report {
    registrations: Vec<RegistrationOutcome>,
    resources: ResourceLoadReport,
}

impl Report {
    /// Registrations are sorted by provider name for a stable listing.
    pub fn new(mut registrations: Vec<RegistrationOutcome>, resources: ResourceLoadReport) -> Self {
        registrations.sort_by(|a, b| a.provider.cmp(&b.provider));
        Self {
            registrations,
            resources,
        }
    }

    pub fn registrations(&self) -> &[RegistrationOutcome] {
        &self.registrations
    }

    pub fn resources(&self) -> &ResourceLoadReport {
        &self.resources
    }

    /// 0 iff the common resources loaded.
    pub fn exit_code(&self) -> i32 {
        if self.resources.outcome.is_success() {
            0
        } else {
            1
        }
    }

    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let registered = self.registrations.iter().filter(|o| o.is_registered()).count();
        let skipped = self.registrations.iter().filter(|o| o.is_skipped()).count();
        let failed = self.registrations.iter().filter(|o| o.is_failed()).count();

        writeln!(out, "{YELLOW}Credential registration{RESET}")?;
        for outcome in &self.registrations {
            let color = match outcome.status {
                RegistrationStatus::Registered(_) => GREEN,
                RegistrationStatus::Skipped(_) => YELLOW,
                RegistrationStatus::Failed(_) => RED,
            };
            writeln!(out, "{color}{outcome}{RESET}")?;
        }
        writeln!(
            out,
            "{registered} registered, {skipped} skipped, {failed} failed"
        )?;

        match &self.resources.outcome {
            ResourceLoadOutcome::Failure(failure) => {
                writeln!(
                    out,
                    "{RED}Error during resource loading: {failure} ({:.2} minutes){RESET}",
                    self.resources.elapsed_minutes()
                )?;
            }
            ResourceLoadOutcome::Success(counts) => {
                writeln!(
                    out,
                    "{CYAN}\nLoading completed ({:.2} minutes){RESET}",
                    self.resources.elapsed_minutes()
                )?;
                writeln!(out, "Registered Common specs")?;
                writeln!(
                    out,
                    "{GREEN}- Successful: {}{RESET}, Failed: {}",
                    counts.successful_specs, counts.failed_specs
                )?;
                writeln!(out, "Registered Common images")?;
                writeln!(
                    out,
                    "{GREEN}- Successful: {}{RESET}, Failed: {}",
                    counts.successful_images, counts.failed_images
                )?;
            }
        }

        Ok(())
    }

    /// Print to stdout and return the exit status.
    pub fn print(&self) -> i32 {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        // Nothing sensible to do if stdout is gone; the exit status still stands.
        let _ = self.render(&mut lock);
        self.exit_code()
    }
}

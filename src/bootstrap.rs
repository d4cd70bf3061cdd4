//! End-to-end bootstrap workflow.
//!
//! Pre-flight (configuration banner, credential files, health, confirmation),
//! then decryption, credential registration and the common resource load, in
//! that order. Fatal errors before registration stop the run without any
//! registration or resource-load request.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::config::{mask_secret, AppConfig};
use crate::control_plane::ControlPlane;
use crate::error::{InitError, Result};
use crate::gate::{self, Decryptor, SecretPrompt};
use crate::loader;
use crate::output::{self, GREEN, RED, RESET};
use crate::progress::TerminalProgress;
use crate::registrar::{self, RegistrationStatus};
use crate::report::Report;

pub struct Bootstrap<D, P> {
    config: AppConfig,
    client: Arc<dyn ControlPlane>,
    decryptor: D,
    prompt: P,
    tick: Duration,
    auto_confirm: bool,
}

impl<D: Decryptor, P: SecretPrompt> Bootstrap<D, P> {
    pub fn new(config: AppConfig, client: Arc<dyn ControlPlane>, decryptor: D, prompt: P) -> Self {
        Self {
            config,
            client,
            decryptor,
            prompt,
            tick: Duration::from_secs(1),
            auto_confirm: false,
        }
    }

    /// Skip the interactive "proceed?" question.
    pub fn auto_confirm(mut self, yes: bool) -> Self {
        self.auto_confirm = yes;
        self
    }

    /// Progress indicator period; one tick is one displayed second.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn print_configuration(&self) {
        output::print_warn(
            "Current Configuration\nPlease set the corresponding environment variables to make changes.",
        );
        output::print_kv("TUMBLEBUG_SERVER", &self.config.server);
        output::print_kv("TB_API_USERNAME", &mask_secret(&self.config.username));
        output::print_kv("TB_API_PASSWORD", &mask_secret(&self.config.password));
        output::print_kv("CRED_PATH", &self.config.cred_path.display().to_string());
        output::print_kv("CRED_FILE_NAME", &self.config.cred_file_name);
        output::print_kv(
            "expected completion time",
            &format!("{} seconds\n", self.config.expected_completion_secs),
        );
    }

    /// The credential directory and the encrypted container must both exist.
    pub fn check_credential_files(&self) -> Result<()> {
        if !self.config.cred_path.is_dir() {
            return Err(InitError::MissingCredentials(format!(
                "{} does not exist. Please run scripts/genCredential.sh first.",
                self.config.cred_path.display()
            )));
        }

        if !self.config.container_path().is_file() {
            let name = &self.config.cred_file_name;
            return Err(InitError::MissingCredentials(format!(
                "{name} does not exist. Please check if it has been generated.\n\
                 - This tool does not accept 'credentials.yaml'. For your security, it only accepts an encrypted file.\n\
                 - Please generate '{name}' using 'init/encCredential.sh'."
            )));
        }

        Ok(())
    }

    pub async fn check_health(&self) -> Result<()> {
        output::print_warn("Checking server health...");
        self.client.health_check().await?;
        output::print_success("Tumblebug Server is healthy.\n");
        Ok(())
    }

    /// Run the whole workflow and return the report. The caller prints it.
    pub async fn run(&mut self) -> Result<Report> {
        let started_at = Utc::now();
        info!(%started_at, server = %self.config.server, "bootstrap started");

        self.print_configuration();
        self.check_credential_files()?;
        self.check_health().await?;

        output::print_warn("Registering credentials and Loading common Specs and Images takes time");
        if !self.auto_confirm && !output::confirm("Do you want to proceed ?") {
            return Err(InitError::Cancelled);
        }

        let key_file = self.config.key_file_path();
        let document = gate::obtain_credential_document(
            &self.config.container_path(),
            Some(key_file.as_path()),
            self.config.password_attempts,
            &self.config.credential_holder,
            &self.decryptor,
            &mut self.prompt,
        )?;
        info!(providers = document.len(), "credential document ready");

        output::print_warn("\nRegistering all valid credentials for all cloud regions...");
        let registrations = registrar::register_all(
            Arc::new(document),
            Arc::clone(&self.client),
            &self.config.credential_holder,
            self.config.registration_concurrency,
            |outcome| {
                let color = match outcome.status {
                    RegistrationStatus::Registered(_) => GREEN,
                    _ => RED,
                };
                println!("{color}{outcome}{RESET}");
            },
        )
        .await;

        output::print_warn("\nLoading common Specs and Images...");
        let mut progress = TerminalProgress::stderr(self.config.expected_completion_secs);
        let resources =
            loader::load_resources_with_progress(Arc::clone(&self.client), self.tick, &mut progress)
                .await;

        info!(
            %started_at,
            finished_at = %Utc::now(),
            resources_loaded = resources.outcome.is_success(),
            "bootstrap finished"
        );
        Ok(Report::new(registrations, resources))
    }
}

//! Job orchestration.
//!
//! Ties the registry, file store, resolver, namer, builder and supervisor
//! together: one call per request, no shared mutable state between jobs.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clipforged_av::naming;
use clipforged_av::{
    resolve, CommandBuilder, CommandLine, DiskStore, FileStore, Job, Outcome, PreviewStore,
    Registry, RenderEnv, StoredPath, Supervisor,
};
use clipforged_common::DiagnosticId;

use crate::config::Config;

/// Separator between the argument vector and captured output in
/// diagnostic logs.
const LOG_OUTPUT_SEPARATOR: &str = "\n\n=== OUTPUT ===\n";

/// A processing request with its uploads already staged.
#[derive(Debug, Clone, Default)]
pub struct JobRequest {
    pub recipe: String,
    pub parameters: HashMap<String, String>,
    pub uploads: HashMap<String, StoredPath>,
    pub outname: Option<String>,
}

/// Result of an executed job.
#[derive(Debug)]
pub struct JobReport {
    pub job: Job,
    /// Bare output file name inside the output directory.
    pub output_name: String,
    /// Set when a diagnostic log was written.
    pub diagnostic_id: Option<DiagnosticId>,
}

impl JobReport {
    pub fn outcome(&self) -> &Outcome {
        &self.job.outcome
    }
}

/// Shared job engine.
pub struct Engine {
    registry: Registry,
    store: DiskStore,
    env: RenderEnv,
    supervisor: Supervisor,
    log_dir: PathBuf,
    timeout: Duration,
}

impl Engine {
    /// Build an engine from configuration, creating its directories.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let registry = Registry::builtin().context("Failed to build recipe registry")?;
        let store = DiskStore::open(&config.storage.upload_dir, &config.storage.output_dir)
            .context("Failed to prepare storage directories")?;
        let log_dir = config.storage.log_dir.clone();
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

        let env = RenderEnv {
            program: config.engine.ffmpeg(),
            fontfile: config.engine.fontfile.clone(),
        };

        tracing::info!(
            "Engine ready: {} recipes, ffmpeg at {:?}",
            registry.len(),
            env.program
        );

        Ok(Self {
            registry,
            store,
            env,
            supervisor: Supervisor::new(),
            log_dir,
            timeout: config.engine.timeout(),
        })
    }

    /// Replace the per-job deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the engine binary.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.env.program = program.into();
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn output_dir(&self) -> &Path {
        self.store.output_dir()
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Write upload bytes into the store under a store-chosen name.
    pub fn stage_upload(
        &self,
        slot: &str,
        declared_filename: &str,
        data: &mut dyn Read,
    ) -> clipforged_av::Result<StoredPath> {
        let stored = self.store.store(data, declared_filename, slot)?;
        tracing::debug!("Stored upload for {} at {}", slot, stored);
        Ok(stored)
    }

    /// Remove staged uploads of a request that will not run.
    pub fn discard_uploads(&self, uploads: &HashMap<String, StoredPath>) {
        for (slot, stored) in uploads {
            if let Err(e) = self.store.discard(stored) {
                tracing::warn!("Failed to discard upload for {} at {}: {}", slot, stored, e);
            }
        }
    }

    /// Render the command a request would run, without uploads or execution.
    ///
    /// Path slots are filled with placeholders; an `outname` parameter is
    /// honoured.
    pub fn preview(
        &self,
        recipe_name: &str,
        parameters: &HashMap<String, String>,
    ) -> clipforged_av::Result<CommandLine> {
        let recipe = self.registry.lookup(recipe_name)?;
        let store = PreviewStore::new(self.store.upload_dir(), self.store.output_dir());
        let uploads: HashMap<String, StoredPath> = recipe
            .slots
            .iter()
            .filter(|s| s.kind.is_path())
            .map(|s| (s.name.to_string(), store.placeholder(s.name)))
            .collect();

        let params = resolve(recipe, parameters, &uploads)?;
        let filename = naming::name(
            recipe,
            parameters.get("outname").map(String::as_str),
            None,
        )?;
        let output = store.reserve_output_path(&filename)?;
        CommandBuilder::new(&store, &self.env).build(recipe, &params, &output)
    }

    /// Resolve, build and run a request.
    ///
    /// Resolution and build failures return an error before anything runs.
    /// Execution results, including failures, come back in the report.
    pub async fn process(&self, request: &JobRequest) -> clipforged_av::Result<JobReport> {
        let recipe = self.registry.lookup(&request.recipe)?;
        let params = resolve(recipe, &request.parameters, &request.uploads)?;

        let primary_ext = recipe
            .primary_input()
            .and_then(|slot| request.uploads.get(slot.name))
            .and_then(StoredPath::extension);
        let output_name = naming::name(recipe, request.outname.as_deref(), primary_ext.as_deref())?;
        let output = self.store.reserve_output_path(&output_name)?;

        let command = match CommandBuilder::new(&self.store, &self.env).build(recipe, &params, &output)
        {
            Ok(command) => command,
            Err(e) => {
                remove_claimed_output(&output).await;
                return Err(e);
            }
        };
        tracing::debug!("Running {}: {}", recipe.name, command.to_display_string());

        let job = self
            .supervisor
            .execute(recipe.name, command, self.timeout)
            .await;

        let mut diagnostic_id = None;
        match &job.outcome {
            Outcome::Succeeded { output } => {
                tracing::info!(
                    "Job {} ({}) produced {:?} in {} ms",
                    job.id,
                    job.recipe,
                    output,
                    job.elapsed().num_milliseconds()
                );
            }
            Outcome::LaunchError { cause } => {
                tracing::warn!("Job {} ({}) could not start: {}", job.id, job.recipe, cause);
                remove_claimed_output(&output).await;
            }
            outcome => {
                tracing::warn!("Job {} ({}) {}", job.id, job.recipe, outcome);
                remove_claimed_output(&output).await;
                diagnostic_id = self.write_diagnostic_log(&job).await;
            }
        }

        Ok(JobReport {
            job,
            output_name,
            diagnostic_id,
        })
    }

    async fn write_diagnostic_log(&self, job: &Job) -> Option<DiagnosticId> {
        let captured = job.outcome.diagnostic_output()?;
        let id = DiagnosticId::new();
        let path = self.log_dir.join(id.log_file_name());
        let content = format!(
            "{}{}{}",
            job.command.to_display_string(),
            LOG_OUTPUT_SEPARATOR,
            captured
        );

        match tokio::fs::write(&path, content).await {
            Ok(()) => {
                tracing::warn!("Diagnostic log for job {} written to {:?}", job.id, path);
                Some(id)
            }
            Err(e) => {
                tracing::error!("Failed to write diagnostic log {:?}: {}", path, e);
                None
            }
        }
    }
}

/// Remove an output this job claimed through the store.
async fn remove_claimed_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed partial output {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial output {:?}: {}", path, e),
    }
}

mod cli;

use clipforged::{config, engine::Engine, engine::JobRequest, server};
use clipforged_av::Outcome;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "clipforged=trace,clipforged_av=trace,tower_http=debug".to_string()
        } else {
            "clipforged=info,clipforged_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(server::start_server(config))
        }
        Commands::Run {
            recipe,
            inputs,
            params,
            out,
            timeout,
        } => run_recipe(
            cli.config.as_deref(),
            recipe,
            inputs,
            params.into_iter().collect(),
            out,
            timeout,
        ),
        Commands::Recipes { json } => list_recipes(json),
        Commands::Preview {
            recipe,
            params,
            json,
        } => preview(cli.config.as_deref(), &recipe, params.into_iter().collect(), json),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate { file } => {
            let path = file.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("clipforged {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_recipe(
    config_path: Option<&Path>,
    recipe: String,
    inputs: Vec<(String, PathBuf)>,
    parameters: HashMap<String, String>,
    outname: Option<String>,
    timeout: Option<u64>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let mut engine = Engine::from_config(&config)?;
    if let Some(secs) = timeout {
        if secs == 0 {
            anyhow::bail!("Timeout cannot be 0");
        }
        engine = engine.with_timeout(Duration::from_secs(secs));
    }

    let mut request = JobRequest {
        recipe,
        parameters,
        outname,
        ..Default::default()
    };

    engine.registry().lookup(&request.recipe)?;

    if let Err(e) = stage_inputs(&engine, &mut request, inputs) {
        engine.discard_uploads(&request.uploads);
        return Err(e);
    }

    tracing::info!("Running recipe {}", request.recipe);

    let rt = tokio::runtime::Runtime::new()?;
    let report = match rt.block_on(engine.process(&request)) {
        Ok(report) => report,
        Err(e) => {
            engine.discard_uploads(&request.uploads);
            return Err(e.into());
        }
    };

    match report.outcome() {
        Outcome::Succeeded { output } => {
            println!("{}", output.display());
            Ok(())
        }
        outcome => {
            if let Some(id) = report.diagnostic_id {
                eprintln!(
                    "Diagnostic log: {}",
                    engine.log_dir().join(id.log_file_name()).display()
                );
            }
            anyhow::bail!("Job {} {}", report.job.id, outcome)
        }
    }
}

/// Copy local input files into the upload store.
fn stage_inputs(
    engine: &Engine,
    request: &mut JobRequest,
    inputs: Vec<(String, PathBuf)>,
) -> Result<()> {
    for (slot, path) in inputs {
        let declared = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Input has no usable file name: {:?}", path))?;
        let mut file = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open input file: {:?}", path))?;
        let stored = engine.stage_upload(&slot, declared, &mut file)?;
        request.uploads.insert(slot, stored);
    }
    Ok(())
}

fn list_recipes(json: bool) -> Result<()> {
    let registry = clipforged_av::Registry::builtin()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&registry.infos())?);
        return Ok(());
    }

    for recipe in registry.iter() {
        let slots: Vec<_> = recipe.slots.iter().map(|s| s.name).collect();
        println!("{:<42} {}", recipe.name, recipe.description);
        println!("{:<42} slots: {}", "", slots.join(", "));
    }

    Ok(())
}

fn preview(
    config_path: Option<&Path>,
    recipe: &str,
    parameters: HashMap<String, String>,
    json: bool,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let engine = Engine::from_config(&config)?;
    let command = engine.preview(recipe, &parameters)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&command.argv())?);
    } else {
        println!("{}", command.to_display_string());
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");

    let tools = clipforged_av::check_tools(&config.engine.ffmpeg());
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    let font = &config.engine.fontfile;
    if font.exists() {
        println!("✓ font - {}", font.display());
    } else {
        all_ok = false;
        println!("✗ font - {} (caption recipes will fail)", font.display());
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all recipes.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_config(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            print_config(&config);
        }
    }

    Ok(())
}

fn print_config(config: &config::Config) {
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Upload dir: {:?}", config.storage.upload_dir);
    println!("  Output dir: {:?}", config.storage.output_dir);
    println!("  Log dir: {:?}", config.storage.log_dir);
    println!("  Timeout: {}s", config.engine.timeout_secs);
    println!("  Font: {:?}", config.engine.fontfile);
}

//! Command-line interface for autopilot.
//!
//! Provides commands for creating projects, attaching specs, running
//! generation and optimization, and inspecting status, logs and generated
//! artifacts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::core::{GenerationService, TreeNode};
use crate::domain::{LogEntry, LogStep, Project, ProjectStatus, SpecSource};

/// autopilot - Spec-driven project generation engine
#[derive(Parser, Debug)]
#[command(name = "autopilot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new project
    New {
        /// Project name
        name: String,

        /// Tech stack label (e.g. "React + FastAPI")
        #[arg(short, long)]
        stack: String,
    },

    /// Attach a spec document (JSON or YAML) to a project
    Spec {
        /// Project ID (UUID)
        project_id: String,

        /// Spec file; `.yaml`/`.yml` is read as YAML, anything else as JSON
        file: PathBuf,
    },

    /// Generate a project from its spec
    Generate {
        /// Project ID (UUID)
        project_id: String,

        /// Return as soon as the run is accepted
        #[arg(long)]
        detach: bool,
    },

    /// Show the status of a project
    Status {
        /// Project ID (UUID)
        project_id: String,
    },

    /// List projects
    Projects {
        /// Maximum number of projects to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show a project's audit log
    Logs {
        /// Project ID (UUID)
        project_id: String,
    },

    /// Show the generated file tree
    Tree {
        /// Project ID (UUID)
        project_id: String,
    },

    /// Print a generated file
    Cat {
        /// Project ID (UUID)
        project_id: String,

        /// Path relative to the project's output directory
        path: String,
    },

    /// Rewrite generated files through the code optimizer
    Optimize {
        /// Project ID (UUID)
        project_id: String,

        /// Paths relative to the project's output directory
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Mark a run interrupted by a crash as failed
    Abandon {
        /// Project ID (UUID)
        project_id: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        if let Commands::Config = self.command {
            return show_config();
        }

        let service = GenerationService::from_config()?;

        match self.command {
            Commands::New { name, stack } => create_project(&service, &name, &stack).await,
            Commands::Spec { project_id, file } => {
                attach_spec(&service, &project_id, file).await
            }
            Commands::Generate { project_id, detach } => {
                generate(&service, &project_id, detach).await
            }
            Commands::Status { project_id } => show_status(&service, &project_id).await,
            Commands::Projects { limit } => list_projects(&service, limit).await,
            Commands::Logs { project_id } => show_logs(&service, &project_id).await,
            Commands::Tree { project_id } => show_tree(&service, &project_id).await,
            Commands::Cat { project_id, path } => cat_file(&service, &project_id, &path).await,
            Commands::Optimize { project_id, paths } => {
                optimize(&service, &project_id, &paths).await
            }
            Commands::Abandon { project_id } => abandon(&service, &project_id).await,
            Commands::Config => show_config(),
        }
    }
}

fn parse_project_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid project ID: {}", value))
}

async fn create_project(service: &GenerationService, name: &str, stack: &str) -> Result<()> {
    let project = service.create_project(name, stack).await?;

    println!("{}", project.id);
    eprintln!("Created project '{}' ({})", project.name, project.tech_stack);
    Ok(())
}

async fn attach_spec(service: &GenerationService, project_id: &str, file: PathBuf) -> Result<()> {
    let project_id = parse_project_id(project_id)?;
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read spec file: {}", file.display()))?;

    let project = service
        .attach_spec(project_id, SpecSource::from_path_content(&file, content))
        .await?;

    eprintln!("Spec attached; project is {}", project.status);
    Ok(())
}

async fn generate(service: &GenerationService, project_id: &str, detach: bool) -> Result<()> {
    let project_id = parse_project_id(project_id)?;

    if let Ok(cfg) = crate::config::config() {
        if !cfg.provider.has_api_key() {
            tracing::warn!("GROQ_API_KEY is not set; provider calls will fail");
        }
    }

    let handle = service.start_generation(project_id).await?;

    if detach {
        eprintln!("Generation started for {}", project_id);
        return Ok(());
    }

    handle.await.context("Generation task panicked")?;

    let project = service.get_project(project_id).await?;
    let entries = service.logs(project_id).await?;
    let generated = entries.iter().filter(|e| e.step != LogStep::Optimization);
    let succeeded = generated.clone().filter(|e| e.is_file_success()).count();
    let failed = generated.filter(|e| e.is_file_failure()).count();

    print_project(&project);
    println!("Files: {} generated, {} failed", succeeded, failed);

    if project.status == ProjectStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}

async fn show_status(service: &GenerationService, project_id: &str) -> Result<()> {
    let project = service.get_project(parse_project_id(project_id)?).await?;
    print_project(&project);
    Ok(())
}

fn print_project(project: &Project) {
    println!("Project ID: {}", project.id);
    println!("Name: {}", project.name);
    println!("Tech stack: {}", project.tech_stack);
    println!("Status: {}", project.status);
    if let Some(ref step) = project.current_step {
        println!("Current step: {}", step);
    }
    if let Some(code) = project.error_code {
        println!("Error code: {}", code);
    }
    println!("Created: {}", project.created_at);
    println!("Updated: {}", project.updated_at);
    if project.status.is_terminal() {
        println!("(attach a new spec to generate again)");
    }
}

async fn list_projects(service: &GenerationService, limit: usize) -> Result<()> {
    let projects = service.list_projects().await?;

    if projects.is_empty() {
        println!("No projects found");
        return Ok(());
    }

    println!("{:<38} {:<24} {:<12}", "PROJECT ID", "NAME", "STATUS");
    println!("{}", "-".repeat(76));

    for project in projects.into_iter().take(limit) {
        let name: String = project.name.chars().take(23).collect();
        println!("{:<38} {:<24} {:<12}", project.id, name, project.status.as_str());
    }

    Ok(())
}

async fn show_logs(service: &GenerationService, project_id: &str) -> Result<()> {
    let entries = service.logs(parse_project_id(project_id)?).await?;

    if entries.is_empty() {
        println!("No log entries");
        return Ok(());
    }

    for entry in &entries {
        print_entry(entry);
    }
    Ok(())
}

fn print_entry(entry: &LogEntry) {
    let code = entry
        .code
        .map(|c| format!(" [{}]", c))
        .unwrap_or_default();
    println!(
        "{} {:<14} {}{}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        entry.step.as_str(),
        entry.message,
        code
    );
}

async fn show_tree(service: &GenerationService, project_id: &str) -> Result<()> {
    let tree = service.artifact_tree(parse_project_id(project_id)?).await?;

    if tree.is_empty() {
        println!("(no generated files)");
        return Ok(());
    }

    print_tree(&tree, 0);
    Ok(())
}

fn print_tree(nodes: &[TreeNode], depth: usize) {
    for node in nodes {
        let suffix = if node.is_folder() { "/" } else { "" };
        println!("{}{}{}", "  ".repeat(depth), node.name, suffix);
        if let Some(ref children) = node.children {
            print_tree(children, depth + 1);
        }
    }
}

async fn cat_file(service: &GenerationService, project_id: &str, path: &str) -> Result<()> {
    let content = service
        .read_artifact(parse_project_id(project_id)?, path)
        .await?;
    print!("{}", content);
    Ok(())
}

async fn optimize(service: &GenerationService, project_id: &str, paths: &[String]) -> Result<()> {
    let report = service
        .optimize_artifacts(parse_project_id(project_id)?, paths)
        .await?;

    for file in &report.optimized {
        println!("✓ {} ({} bytes, {})", file.path, file.size_bytes, file.content_hash);
    }
    for (path, err) in &report.failed {
        println!("✗ {}: {}", path, err);
    }
    println!(
        "Optimized {} of {} files",
        report.optimized.len(),
        report.optimized.len() + report.failed.len()
    );

    if report.optimized.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

async fn abandon(service: &GenerationService, project_id: &str) -> Result<()> {
    let project = service.abandon(parse_project_id(project_id)?).await?;
    print_project(&project);
    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = crate::config::config()?;

    println!("Config file: {}", cfg.config_file.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "(none - using defaults)".to_string()));
    println!();
    println!("Paths:");
    println!("  Home (engine state): {}", cfg.home.display());
    println!("  Projects:            {}", cfg.projects_dir().display());
    println!("  Output:              {}", cfg.output.display());
    println!();
    println!("Provider:");
    println!("  API URL:  {}", cfg.provider.api_url);
    println!("  Model:    {}", cfg.provider.model);
    println!("  API key:  {}", cfg.provider.redacted_key());
    println!("  Max tokens: {}", cfg.provider.max_tokens);
    println!(
        "  Blueprint: timeout {}s, temperature {}",
        cfg.provider.blueprint_timeout_seconds, cfg.provider.blueprint_temperature
    );
    println!(
        "  Content:   timeout {}s, temperature {}",
        cfg.provider.content_timeout_seconds, cfg.provider.content_temperature
    );

    Ok(())
}

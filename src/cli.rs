use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use job_board::board::views::{
    format_date, format_from_now, format_salary_range, result_summary,
};
use job_board::board::{
    ApplicationDataService, ApplicationForm, ApplicationStore, BoardContext, FileKeyValueStore,
    Job, JobBoardApi, JobCatalog, JobFilter, JobId, JobType, KeyValueStore, MemoryKeyValueStore,
};
use job_board::config::{AppConfig, StorageBackend};
use job_board::error::AppError;
use job_board::telemetry;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "job-board",
    about = "Browse job postings and track submitted applications",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List postings, optionally narrowed by search term and pickers
    Jobs(JobsArgs),
    /// Show the full details of one posting
    Show {
        /// Posting identifier
        job_id: String,
    },
    /// Submit an application for a posting
    Apply(ApplyArgs),
    /// List submitted applications with their status
    Applications,
    /// Remove every stored application
    Clear,
}

#[derive(Args, Debug, Default)]
struct JobsArgs {
    /// Match against title, company or category
    #[arg(long)]
    search: Option<String>,
    /// Full-time, Part-time, Contract or Internship
    #[arg(long, value_parser = parse_job_type)]
    job_type: Option<JobType>,
    /// Exact category name
    #[arg(long)]
    category: Option<String>,
    /// Company location, partial match
    #[arg(long)]
    location: Option<String>,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    #[arg(long)]
    job_id: String,
    #[arg(long, default_value = "")]
    full_name: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
    /// Link to the resume
    #[arg(long, default_value = "")]
    resume: String,
    #[arg(long, default_value = "")]
    cover_letter: String,
}

fn parse_job_type(raw: &str) -> Result<JobType, String> {
    JobType::from_label(raw).ok_or_else(|| {
        let known: Vec<&str> = JobType::ALL.iter().map(|kind| kind.label()).collect();
        format!("unknown job type '{raw}' (expected one of {})", known.join(", "))
    })
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let catalog = Arc::new(JobCatalog::seeded()?);
    match config.storage.backend {
        StorageBackend::File => {
            let backend = Arc::new(FileKeyValueStore::new(config.storage.data_dir.clone()));
            execute(cli.command, &config, catalog, backend).await
        }
        StorageBackend::Memory => {
            let backend = Arc::new(MemoryKeyValueStore::new());
            execute(cli.command, &config, catalog, backend).await
        }
    }
}

async fn execute<S>(
    command: Command,
    config: &AppConfig,
    catalog: Arc<JobCatalog>,
    backend: Arc<S>,
) -> Result<(), AppError>
where
    S: KeyValueStore + 'static,
{
    let store = Arc::new(ApplicationStore::new(backend));
    let service = Arc::new(ApplicationDataService::from_config(
        catalog,
        store.clone(),
        &config.api,
    ));
    let context = BoardContext::new(service.clone());

    info!(environment = ?config.environment, backend = ?config.storage.backend, "job board ready");

    match command {
        Command::Jobs(args) => {
            context.initialize().await;
            let state = context.snapshot();
            if let Some(message) = state.error {
                println!("{message}");
                return Ok(());
            }

            let JobsArgs {
                search,
                job_type,
                category,
                location,
            } = args;
            let filter = JobFilter {
                search,
                job_type,
                category,
                location,
            };
            let jobs = context.filtered_jobs(&filter);
            println!("{}", result_summary(jobs.len()));
            if jobs.is_empty() {
                println!("No jobs match your search criteria");
            }
            for job in &jobs {
                render_job_line(job);
            }
        }
        Command::Show { job_id } => {
            let job_id = JobId::new(job_id);
            match service.job(&job_id).await? {
                Some(job) => render_job_detail(&job),
                None => return Err(AppError::JobNotFound(job_id)),
            }
        }
        Command::Apply(args) => {
            let job_id = JobId::new(args.job_id);
            if service.job(&job_id).await?.is_none() {
                return Err(AppError::JobNotFound(job_id));
            }

            let form = ApplicationForm {
                full_name: args.full_name,
                email: args.email,
                phone: args.phone,
                resume: args.resume,
                cover_letter: args.cover_letter,
            };
            let draft = form.validate(job_id)?;
            let application = context.submit(draft).await?;
            println!(
                "Application {} submitted for job {} -> status {}",
                application.id, application.job_id, application.status
            );
            println!(
                "You now have {} application(s) on file",
                context.snapshot().applications.len()
            );
        }
        Command::Applications => {
            context.refresh().await;
            let views = context.applied_jobs().await;
            if views.is_empty() {
                println!("No applications yet");
                return Ok(());
            }
            println!("My Applications");
            for view in &views {
                let company = view
                    .job
                    .as_ref()
                    .map(|job| job.company.name.as_str())
                    .unwrap_or("-");
                println!(
                    "- {} | {} | Applied on {} | {}",
                    view.job_title(),
                    company,
                    format_date(view.application.applied_at),
                    view.application.status
                );
            }
        }
        Command::Clear => {
            store.clear().await?;
            println!("Stored applications cleared");
        }
    }

    context.dispose();
    Ok(())
}

fn render_job_line(job: &Job) {
    println!(
        "[{}] {} | {} ({}) | {} | {} | Posted {}",
        job.id,
        job.title,
        job.company.name,
        job.company.location,
        job.job_type,
        format_salary_range(job),
        format_from_now(job.posted, Utc::now())
    );
}

fn render_job_detail(job: &Job) {
    println!("{} at {}", job.title, job.company.name);
    println!("Location: {}", job.company.location);
    println!("Type: {} | Category: {}", job.job_type, job.category);
    println!("Salary: {}", format_salary_range(job));
    println!("Posted {}", format_from_now(job.posted, Utc::now()));
    println!("\n{}", job.description);
    println!("\nRequirements:");
    for requirement in &job.requirements {
        println!("  - {requirement}");
    }
    println!("\nResponsibilities:");
    for responsibility in &job.responsibilities {
        println!("  - {responsibility}");
    }
}

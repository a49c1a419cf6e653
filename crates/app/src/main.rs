mod args;

use std::sync::Arc;

use codify_core::{Catalog, LessonId, LessonSession};
use dioxus::LaunchBuilder;
use dioxus::desktop::{Config as DesktopConfig, WindowBuilder};
use sandbox::Limits;
use serde::Serialize;
use services::{AppServices, ExecutionEngine, ProgressService, SubmissionService};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use ui::{App, UiApp, build_app_context};

use crate::args::{Args, Command, RunArgs, prepare_sqlite_file, print_usage};

struct DesktopApp {
    services: AppServices,
}

impl UiApp for DesktopApp {
    fn catalog(&self) -> &'static Catalog {
        self.services.catalog()
    }

    fn progress(&self) -> Arc<ProgressService> {
        self.services.progress()
    }

    fn submissions(&self) -> Arc<SubmissionService> {
        self.services.submissions()
    }
}

/// Plain run report printed by `run --json` without `--submit`.
#[derive(Serialize)]
struct RunReport<'a> {
    lesson_id: &'a LessonId,
    output: String,
    faulted: bool,
}

fn init_tracing(filter: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_new(filter)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

async fn open_services(args: &Args) -> Result<AppServices, Box<dyn std::error::Error>> {
    // Open + migrate SQLite here so core/services never touch the filesystem layout.
    prepare_sqlite_file(&args.db_url)?;
    let limits = Limits::default().with_time_budget(args.time_budget);
    let services = AppServices::new_sqlite(&args.db_url, limits).await?;
    info!(db_url = %args.db_url, "progress store ready");
    Ok(services)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = Args::parse(argv, |key| std::env::var(key).ok()).inspect_err(|_| print_usage())?;
    if args.command == Command::Help {
        print_usage();
        return Ok(());
    }
    init_tracing(&args.log_filter)?;

    match &args.command {
        Command::Ui => launch_ui(open_services(&args).await?),
        Command::Progress => print_progress(&open_services(&args).await?).await,
        Command::Reset => {
            open_services(&args).await?.progress().reset_all().await?;
            println!("Progress cleared.");
            Ok(())
        }
        Command::Lessons => {
            for lesson in Catalog::builtin().iter() {
                println!("{:<16} {}", lesson.id_str(), lesson.plain_title());
            }
            Ok(())
        }
        Command::Run(run_args) if run_args.submit => {
            submit_lesson(&open_services(&args).await?, run_args).await
        }
        Command::Run(run_args) => run_lesson(&args, run_args).await,
        Command::Help => Ok(()),
    }
}

fn launch_ui(services: AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let context = build_app_context(Arc::new(DesktopApp { services }));

    // On macOS, Dioxus/tao can default to an always-on-top window in some dev setups.
    let desktop_cfg = DesktopConfig::new().with_window(
        WindowBuilder::new()
            .with_title("Codify - Learn Python")
            .with_always_on_top(false),
    );

    LaunchBuilder::desktop()
        .with_cfg(desktop_cfg)
        .with_context(context)
        .launch(App);
    Ok(())
}

async fn print_progress(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = services.catalog();
    let progress = services.progress().get_all().await;
    for lesson in catalog.iter() {
        let icon = if progress.is_complete(&lesson.id()) { "✅" } else { "📘" };
        println!("{icon} {:<16} {}", lesson.id_str(), lesson.plain_title());
    }
    println!(
        "{} of {} lessons completed.",
        catalog.ids().filter(|id| progress.is_complete(id)).count(),
        catalog.len()
    );
    Ok(())
}

fn load_source(
    catalog: &Catalog,
    run_args: &RunArgs,
) -> Result<(LessonId, String), Box<dyn std::error::Error>> {
    let lesson_id = LessonId::new(run_args.lesson.as_str());
    let lesson = catalog.lesson(&lesson_id)?;
    let source = match &run_args.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => lesson.solution().to_string(),
    };
    Ok((lesson_id, source))
}

async fn run_lesson(args: &Args, run_args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::builtin();
    let (lesson_id, source) = load_source(catalog, run_args)?;
    let limits = Limits::default().with_time_budget(args.time_budget);
    let engine = ExecutionEngine::new(limits, catalog);
    let result = engine.execute(&source, &run_args.input).await?;

    if run_args.json {
        let report = RunReport {
            lesson_id: &lesson_id,
            output: result.captured_output(),
            faulted: result.is_faulted(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", result.captured_output());
    }
    Ok(())
}

async fn submit_lesson(
    services: &AppServices,
    run_args: &RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let (lesson_id, source) = load_source(services.catalog(), run_args)?;
    let mut session = LessonSession::new(lesson_id);
    session.set_code(source);
    session.set_simulated_input(run_args.input.as_str());

    let outcome = services.submissions().submit(&mut session).await?;
    if run_args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    print!("{}", outcome.output);
    if outcome.correct {
        println!("Correct! Well done! Lesson marked as complete.");
    } else {
        println!("Not quite right. Check your logic and the hint, then try again!");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

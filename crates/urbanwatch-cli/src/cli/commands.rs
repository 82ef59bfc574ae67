use super::render::{
    print_report_list, render_analytics, render_draft, render_location, render_report_detail,
    render_stats,
};
use super::setup::{
    AddArgs, Cli, Commands, DataCommands, DraftAction, MiscCommands, ReportCommands,
    ViewCommands,
};
use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use std::io::{IsTerminal, Read};
use std::path::Path;
use tracing_subscriber::EnvFilter;
use urbanwatch::api::UrbanApi;
use urbanwatch::draft::Draft;
use urbanwatch::error::UrbanError;
use urbanwatch::init::initialize;
use urbanwatch::location::{FixedPosition, NoPrecisePosition};
use urbanwatch::model::{ReportInput, ReportLocation, Status};
use urbanwatch::store::fs_backend::FsBackend;
use urbanwatch::views::{CategoryFilter, RadiusFilter, ReportQuery, SortMode};

type Api = UrbanApi<FsBackend>;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = initialize(cli.data.clone())?;
    let api = &ctx.api;

    match cli.command {
        Some(Commands::Report(cmd)) => match cmd {
            ReportCommands::Add(args) => handle_add(api, args).await,
            ReportCommands::Show { id, json } => handle_show(api, &id, json).await,
            ReportCommands::Status { id, status } => handle_status(api, &id, status).await,
            ReportCommands::Delete { id } => handle_delete(api, &id).await,
        },
        Some(Commands::View(cmd)) => match cmd {
            ViewCommands::List {
                category,
                radius,
                sort,
                json,
            } => handle_list(api, category, radius, sort, json).await,
            ViewCommands::Analytics { json } => handle_analytics(api, json).await,
            ViewCommands::Stats => handle_stats(api).await,
        },
        Some(Commands::Data(cmd)) => match cmd {
            DataCommands::Import { file } => handle_import(api, &file).await,
            DataCommands::Export { output } => handle_export(api, output.as_deref()).await,
            DataCommands::Clear { yes } => handle_clear(api, yes).await,
        },
        Some(Commands::Misc(cmd)) => match cmd {
            MiscCommands::Draft { action } => handle_draft(api, action).await,
            MiscCommands::Locate { at, cached } => handle_locate(api, at, cached).await,
            MiscCommands::Config => handle_config(api, &ctx.data_dir),
        },
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// Logs go to stderr so `--json` output stays machine readable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("urbanwatch=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn handle_add(api: &Api, args: AddArgs) -> Result<()> {
    let mut input = ReportInput::new().with_title(args.title);
    if let Some(description) = args.description {
        input = input.with_description(description);
    }
    if let Some(category) = args.category {
        input = input.with_category(category);
    }
    if let Some(priority) = args.priority {
        input = input.with_priority(priority);
    }
    if let Some(image) = args.image {
        input = input.with_image(image);
    }
    if let Some((latitude, longitude)) = args.at {
        let mut location = ReportLocation::new(latitude, longitude);
        location.address = args.address;
        location.city = args.city;
        input = input.with_location(location);
    }

    let outcome = api.save_report(input).await?;
    println!("Report {} saved.", outcome.report.id);
    for id in &outcome.evicted {
        eprintln!("Removed oldest report {} (limit reached).", id);
    }
    Ok(())
}

async fn handle_show(api: &Api, id: &str, json: bool) -> Result<()> {
    let report = api.require_report(id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let distance = api.distance_to(&report).await;
        print!("{}", render_report_detail(&report, distance));
    }
    Ok(())
}

async fn handle_status(api: &Api, id: &str, status: Status) -> Result<()> {
    match api.update_report_status(id, status).await? {
        Some(report) => {
            println!("Report {} is now {}.", report.id, report.status);
            Ok(())
        }
        None => Err(UrbanError::ReportNotFound(id.to_string()).into()),
    }
}

async fn handle_delete(api: &Api, id: &str) -> Result<()> {
    if !api.delete_report(id).await? {
        return Err(UrbanError::ReportNotFound(id.to_string()).into());
    }
    println!("Report {} deleted.", id);
    Ok(())
}

async fn handle_list(
    api: &Api,
    category: CategoryFilter,
    radius: RadiusFilter,
    sort: SortMode,
    json: bool,
) -> Result<()> {
    let query = ReportQuery::new()
        .with_category(category)
        .with_radius(radius)
        .with_sort(sort);
    let reports = api.query(&query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    let mut rows = Vec::with_capacity(reports.len());
    for report in reports {
        let distance = api.distance_to(&report).await;
        rows.push((report, distance));
    }
    print_report_list(&rows);
    Ok(())
}

async fn handle_analytics(api: &Api, json: bool) -> Result<()> {
    let analytics = api.analytics().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&analytics)?);
    } else {
        print!("{}", render_analytics(&analytics));
    }
    Ok(())
}

async fn handle_stats(api: &Api) -> Result<()> {
    println!("{}", render_stats(&api.dashboard_stats().await));
    Ok(())
}

async fn handle_import(api: &Api, file: &Path) -> Result<()> {
    let raw = if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?
    };
    let count = api.import_json(&raw).await?;
    println!("Imported {} reports.", count);
    Ok(())
}

async fn handle_export(api: &Api, output: Option<&Path>) -> Result<()> {
    let json = api.export_json().await?;
    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Exported to {}.", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn handle_clear(api: &Api, yes: bool) -> Result<()> {
    if !yes {
        if !std::io::stdin().is_terminal() {
            bail!("refusing to clear reports without --yes");
        }
        eprint!("Delete every report? [y/N] ");
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }
    api.clear_reports().await?;
    println!("All reports deleted.");
    Ok(())
}

async fn handle_draft(api: &Api, action: DraftAction) -> Result<()> {
    match action {
        DraftAction::Show => match api.load_draft().await {
            Some(draft) => print!("{}", render_draft(&draft)),
            None => println!("No draft."),
        },
        DraftAction::Set {
            title,
            description,
            category,
            priority,
            at,
        } => {
            let mut draft = api.load_draft().await.unwrap_or_default();
            if title.is_some() {
                draft.title = title;
            }
            if description.is_some() {
                draft.description = description;
            }
            if category.is_some() {
                draft.category = category;
            }
            if priority.is_some() {
                draft.priority = priority;
            }
            if let Some((latitude, longitude)) = at {
                draft.location = Some(ReportLocation::new(latitude, longitude));
            }
            save_draft_through_autosave(api, draft).await?;
            println!("Draft saved.");
        }
        DraftAction::Submit => match api.submit_draft().await? {
            Some(outcome) => println!("Report {} saved from draft.", outcome.report.id),
            None => println!("No draft to submit."),
        },
        DraftAction::Clear => {
            api.clear_draft().await?;
            println!("Draft cleared.");
        }
    }
    Ok(())
}

/// Goes through the autosave session so a draft without data clears the key
/// the same way the form does.
async fn save_draft_through_autosave(api: &Api, draft: Draft) -> Result<()> {
    let autosave = api.start_autosave();
    autosave.edit(draft)?;
    autosave.flush().await?;
    autosave.shutdown().await;
    Ok(())
}

async fn handle_locate(api: &Api, at: Option<(f64, f64)>, cached: bool) -> Result<()> {
    if cached {
        match api.get_cached_location().await {
            Some(fix) => println!("{}", render_location(&fix)),
            None => println!("No cached location."),
        }
        return Ok(());
    }

    let fix = match at {
        Some((latitude, longitude)) => {
            api.resolve_location(FixedPosition::new(latitude, longitude))
                .await?
        }
        None => api.resolve_location(NoPrecisePosition).await?,
    };
    println!("{}", render_location(&fix));
    Ok(())
}

fn handle_config(api: &Api, data_dir: &Path) -> Result<()> {
    println!("data_dir = {}", data_dir.display());
    println!("{}", serde_json::to_string_pretty(api.config())?);
    Ok(())
}

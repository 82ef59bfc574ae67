use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;
use urbanwatch::model::{Category, Priority, Status};
use urbanwatch::views::{CategoryFilter, RadiusFilter, SortMode};

/// `0.3.0` for tagged release builds, `0.3.0@abc1234 (2025-01-15 14:30)` otherwise.
fn version() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();
    VERSION.get_or_init(|| {
        let hash = env!("GIT_HASH");
        if env!("IS_RELEASE") == "true" || hash.is_empty() {
            return env!("CARGO_PKG_VERSION").to_string();
        }
        format!(
            "{}@{} ({})",
            env!("CARGO_PKG_VERSION"),
            hash,
            env!("GIT_COMMIT_DATE")
        )
    })
}

#[derive(Parser, Debug)]
#[command(name = "urbanwatch", bin_name = "urbanwatch", version = version())]
#[command(about = "Report and track urban issues from the command line", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Data directory (defaults to the OS data directory)
    #[arg(long, global = true, value_name = "DIR", help_heading = "Options")]
    pub data: Option<PathBuf>,

    /// Verbose output (debug logging to stderr)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Report(ReportCommands),

    #[command(flatten)]
    View(ViewCommands),

    #[command(flatten)]
    Data(DataCommands),

    #[command(flatten)]
    Misc(MiscCommands),
}

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// File a new report
    #[command(alias = "n", display_order = 1)]
    Add(AddArgs),

    /// Show one report
    #[command(alias = "v", display_order = 2)]
    Show {
        id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change the status of a report
    #[command(display_order = 3)]
    Status {
        id: String,

        /// pending, in_progress, resolved or rejected
        status: Status,
    },

    /// Delete a report
    #[command(alias = "rm", display_order = 4)]
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Short title, e.g. "Pothole on Rr. Agim Ramadani"
    #[arg(short, long)]
    pub title: String,

    #[arg(short, long)]
    pub description: Option<String>,

    /// infrastructure, environment, security or other
    #[arg(short, long)]
    pub category: Option<Category>,

    /// low, normal, high or urgent
    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// Photo URI
    #[arg(long)]
    pub image: Option<String>,

    /// Where the issue is, as LAT,LON
    #[arg(long, value_name = "LAT,LON", value_parser = parse_coordinates)]
    pub at: Option<(f64, f64)>,

    #[arg(long, requires = "at")]
    pub address: Option<String>,

    #[arg(long, requires = "at")]
    pub city: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ViewCommands {
    /// List reports, newest first by default
    #[command(alias = "ls", display_order = 10)]
    List {
        /// `all` or a category
        #[arg(short, long, default_value = "all")]
        category: CategoryFilter,

        /// Only reports within this many km of the cached location (5, 10 or 0 for any)
        #[arg(short, long, default_value = "0", value_parser = parse_radius)]
        radius: RadiusFilter,

        /// newest, urgent or nearest
        #[arg(short, long, default_value = "newest")]
        sort: SortMode,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Totals, status buckets, top categories and cities, last 7 days
    #[command(display_order = 11)]
    Analytics {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Dashboard counters
    #[command(display_order = 12)]
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum DataCommands {
    /// Replace all reports with a JSON array read from a file (`-` for stdin)
    #[command(display_order = 20)]
    Import { file: PathBuf },

    /// Write all reports as JSON
    #[command(display_order = 21)]
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete every report
    #[command(display_order = 22)]
    Clear {
        /// Skip the confirmation check
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum MiscCommands {
    /// Inspect or edit the saved draft
    #[command(display_order = 30)]
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },

    /// Resolve and cache the current location
    #[command(display_order = 31)]
    Locate {
        /// Use these coordinates as the precise position
        #[arg(long, value_name = "LAT,LON", value_parser = parse_coordinates)]
        at: Option<(f64, f64)>,

        /// Only show the cached location
        #[arg(long, conflicts_with = "at")]
        cached: bool,
    },

    /// Show the effective configuration
    #[command(display_order = 32)]
    Config,
}

#[derive(Subcommand, Debug)]
pub enum DraftAction {
    /// Print the saved draft
    Show,

    /// Update fields of the saved draft
    Set {
        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        category: Option<Category>,

        #[arg(short, long)]
        priority: Option<Priority>,

        #[arg(long, value_name = "LAT,LON", value_parser = parse_coordinates)]
        at: Option<(f64, f64)>,
    },

    /// Save the draft as a report and clear it
    Submit,

    /// Throw the draft away
    Clear,
}

pub fn parse_coordinates(s: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got {:?}", s))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude: {:?}", lat))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude: {:?}", lon))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("coordinates out of range: {},{}", lat, lon));
    }
    Ok((lat, lon))
}

pub fn parse_radius(s: &str) -> Result<RadiusFilter, String> {
    let km: u32 = s.parse().map_err(|_| format!("invalid radius: {:?}", s))?;
    if !RadiusFilter::SELECTORS.contains(&km) {
        return Err(format!("radius must be one of 5, 10 or 0, got {}", km));
    }
    Ok(RadiusFilter::from_selector(km))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_flags() {
        let cli = Cli::try_parse_from([
            "urbanwatch",
            "list",
            "--category",
            "environment",
            "--radius",
            "5",
            "--sort",
            "nearest",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::View(ViewCommands::List {
                category,
                radius,
                sort,
                json,
            })) => {
                assert_eq!(category, CategoryFilter::Only(Category::Environment));
                assert_eq!(radius, RadiusFilter::Within(5.0));
                assert_eq!(sort, SortMode::Nearest);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(Cli::try_parse_from(["urbanwatch", "list", "--radius", "7"]).is_err());
        assert!(Cli::try_parse_from(["urbanwatch", "list", "--category", "Roads"]).is_err());
        assert!(Cli::try_parse_from(["urbanwatch", "status", "x", "done"]).is_err());
        assert!(Cli::try_parse_from(["urbanwatch", "status", "x", "resolvd"]).is_err());
        assert!(Cli::try_parse_from(["urbanwatch", "add", "-t", "x", "-c", "Roads"]).is_err());
        assert!(Cli::try_parse_from(["urbanwatch", "add", "-t", "x", "-p", "critical"]).is_err());
        assert!(
            Cli::try_parse_from(["urbanwatch", "draft", "set", "-c", "lighting"]).is_err()
        );
    }

    #[test]
    fn tags_parse_exactly() {
        let cli = Cli::try_parse_from(["urbanwatch", "status", "x", "in_progress"]).unwrap();
        match cli.command {
            Some(Commands::Report(ReportCommands::Status { id, status })) => {
                assert_eq!(id, "x");
                assert_eq!(status, Status::InProgress);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from([
            "urbanwatch", "add", "-t", "Bin", "-c", "security", "-p", "urgent",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Report(ReportCommands::Add(args))) => {
                assert_eq!(args.category, Some(Category::Security));
                assert_eq!(args.priority, Some(Priority::Urgent));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn coordinates() {
        assert_eq!(parse_coordinates("42.6629, 21.1655"), Ok((42.6629, 21.1655)));
        assert!(parse_coordinates("42.6629").is_err());
        assert!(parse_coordinates("95,0").is_err());
    }

    #[test]
    fn global_data_flag() {
        let cli = Cli::try_parse_from(["urbanwatch", "stats", "--data", "/tmp/uw"]).unwrap();
        assert_eq!(cli.data, Some(PathBuf::from("/tmp/uw")));
    }
}

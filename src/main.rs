//! CLI entry point for the subject track viewer.
//!
//! Provides one-shot subcommands for listing subjects and dates, rendering a
//! day's track to figure JSON, and exporting it as CSV, plus an interactive
//! mode that feeds one event per input line into a session.

use anyhow::{Result, bail};
use cattracks::config::Config;
use cattracks::dashboard::Dashboard;
use cattracks::export::{self, DEFAULT_FILE_NAME};
use cattracks::logging;
use cattracks::render::{
    DEFAULT_COLOR, DEFAULT_DENSITY_MIDPOINT, DEFAULT_ZOOM, MAX_DENSITY_MIDPOINT, Style, TileLayer,
};
use cattracks::session::{Event, Session, View};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "cattracks")]
#[command(about = "Browse GPS tracks of tracked subjects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the names of all searchable subjects
    Subjects,
    /// List the dates with tracking data for a subject
    Dates {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Render a subject's track for one date to figure JSON
    Show {
        #[command(flatten)]
        selection: Selection,

        #[command(flatten)]
        render: RenderArgs,

        /// File to write the figure JSON to
        #[arg(short, long, default_value = "figure.json")]
        output: PathBuf,
    },
    /// Export a subject's filtered track for one date as CSV
    Export {
        #[command(flatten)]
        selection: Selection,

        #[arg(short, long, default_value = DEFAULT_FILE_NAME)]
        output: PathBuf,

        /// Gzip compress the CSV
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Read events from stdin, one per line
    Repl,
}

#[derive(Args)]
struct Selection {
    #[arg(value_name = "NAME")]
    name: String,

    /// Date to show (YYYY-MM-DD); defaults to the earliest available
    #[arg(short, long)]
    date: Option<NaiveDate>,
}

#[derive(Args)]
struct RenderArgs {
    /// Tracking points shape
    #[arg(short, long, default_value_t = Style::Line)]
    style: Style,

    /// Tracking points colour (line and scatter)
    #[arg(short, long, default_value = DEFAULT_COLOR)]
    color: String,

    #[arg(short, long, default_value_t = DEFAULT_ZOOM)]
    zoom: f64,

    /// Density colour-scale midpoint
    #[arg(short, long, default_value_t = DEFAULT_DENSITY_MIDPOINT,
          value_parser = clap::value_parser!(u8).range(0..=MAX_DENSITY_MIDPOINT as i64))]
    midpoint: u8,

    /// Map layer: satellite, roadmap, terrain, altered-roadmap or hybrid
    #[arg(short, long, default_value = "satellite")]
    tiles: TileLayer,
}

impl RenderArgs {
    fn events(&self) -> Vec<Event> {
        vec![
            Event::SetStyle(self.style),
            Event::SetColor(self.color.clone()),
            Event::SetZoom(self.zoom),
            Event::SetMidpoint(self.midpoint),
            Event::SetTiles(self.tiles),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let config = Config::from_env();
    logging::init(&config.log_file_path);

    let cli = Cli::parse();
    let dash = Dashboard::connect(&config).await?;

    match cli.command {
        Commands::Subjects => {
            let visible = dash.list_visible().await?;
            info!(total = visible.len(), "Subjects fetched");
            for name in visible {
                println!("{name}");
            }
        }
        Commands::Dates { name } => {
            let Some(subject) = dash.resolve(&name).await? else {
                bail!("a subject name is required");
            };
            for date in dash.available_dates(&subject.id).await?.iter() {
                println!("{date}");
            }
        }
        Commands::Show {
            selection,
            render,
            output,
        } => {
            let mut session = Session::new();
            for event in render.events() {
                session.handle(&dash, event).await;
            }
            let view = select(&mut session, &dash, &selection).await;
            println!("{view}");

            if let View::Track(track) = view {
                std::fs::write(&output, track.figure.to_json()?)?;
                info!(path = %output.display(), points = track.track.len(), "Figure written");
            }
        }
        Commands::Export {
            selection,
            output,
            gzip,
        } => {
            let mut session = Session::new();
            let view = select(&mut session, &dash, &selection).await;
            match view {
                View::Track(track) => export::export_file(&output, &track.track, gzip)?,
                other => println!("{other}"),
            }
        }
        Commands::Repl => repl(&dash).await?,
    }

    Ok(())
}

async fn select(session: &mut Session, dash: &Dashboard, selection: &Selection) -> View {
    let view = session
        .handle(dash, Event::Search(selection.name.clone()))
        .await;
    match selection.date {
        Some(date) if session.subject().is_some() => {
            session.handle(dash, Event::SelectDate(date)).await
        }
        _ => view,
    }
}

/// Feeds stdin lines into one session until `quit` or end of input.
async fn repl(dash: &Dashboard) -> Result<()> {
    let mut session = Session::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last = session.refresh(dash).await;
    println!("{last}");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        let arg = arg.trim();

        let event = match command {
            "quit" | "exit" => break,
            "export" => {
                export_view(&last, arg);
                continue;
            }
            _ => match parse_event(command, arg) {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "Unrecognised input");
                    println!("{e}");
                    continue;
                }
            },
        };

        last = session.handle(dash, event).await;
        println!("{last}");
    }

    Ok(())
}

fn parse_event(command: &str, arg: &str) -> Result<Event, String> {
    Ok(match command {
        "search" => Event::Search(arg.to_string()),
        "date" => Event::SelectDate(
            arg.parse()
                .map_err(|e| format!("invalid date `{arg}`: {e}"))?,
        ),
        "style" => Event::SetStyle(arg.parse()?),
        "color" => Event::SetColor(arg.to_string()),
        "zoom" => Event::SetZoom(arg.parse().map_err(|e| format!("invalid zoom `{arg}`: {e}"))?),
        "midpoint" => Event::SetMidpoint(
            arg.parse()
                .map_err(|e| format!("invalid midpoint `{arg}`: {e}"))?,
        ),
        "tiles" => Event::SetTiles(arg.parse()?),
        "back" => Event::Back,
        other => return Err(format!("unknown command `{other}`")),
    })
}

fn export_view(view: &View, arg: &str) {
    let View::Track(track) = view else {
        println!("Nothing to export");
        return;
    };
    let path = if arg.is_empty() {
        Path::new(DEFAULT_FILE_NAME)
    } else {
        Path::new(arg)
    };
    if let Err(e) = export::export_file(path, &track.track, false) {
        error!(error = %e, "Export failed");
    }
}

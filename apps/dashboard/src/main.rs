mod commands;
mod render;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    load_settings, BridgeEvent, Dashboard, DashboardChange, HttpUnitStore, MergeOutcome,
};
use commands::{parse_command, DashboardCommand, HELP};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Live inspection status dashboard for site units")]
struct Args {
    /// Unit store endpoint, e.g. http://localhost:5000/api/units
    #[arg(long)]
    api_url: Option<String>,
    /// Push channel base url, e.g. http://localhost:5000
    #[arg(long)]
    socket_url: Option<String>,
    /// Level to show first.
    #[arg(long)]
    level: Option<String>,
    /// Print the loaded view once and exit.
    #[arg(long)]
    once: bool,
}

enum Step {
    Line(Option<String>),
    Event(Option<BridgeEvent>),
}

fn redraw(dashboard: &Dashboard) {
    println!("\n{}", render::render(dashboard.view()));
}

/// Returns `false` when the session should end.
fn run_command(dashboard: &mut Dashboard, command: DashboardCommand) -> bool {
    let level = match dashboard.view().selected_level() {
        Some(level) => level.to_string(),
        None if matches!(
            command,
            DashboardCommand::Help | DashboardCommand::Quit | DashboardCommand::SelectLevel { .. }
        ) =>
        {
            String::new()
        }
        None => {
            println!("no units loaded yet");
            return true;
        }
    };
    match command {
        DashboardCommand::SelectLevel { level } => {
            dashboard.select_level(level);
            redraw(dashboard);
        }
        DashboardCommand::ChangeStatus {
            unit_number,
            status,
        } => {
            if dashboard
                .change_status(&level, &unit_number, status)
                .is_none()
            {
                println!("unit {unit_number} is not on {level}");
            }
        }
        DashboardCommand::AddComment { unit_number, text } => {
            if dashboard.add_comment(&level, &unit_number, &text).is_none() {
                println!("unit {unit_number} is not on {level}");
            }
        }
        DashboardCommand::ToggleResolved {
            unit_number,
            comment_index,
        } => {
            if dashboard
                .toggle_comment_resolved(&level, &unit_number, comment_index)
                .is_none()
            {
                println!("unit {unit_number} on {level} has no comment #{comment_index}");
            }
        }
        DashboardCommand::ToggleExpanded { unit_number } => {
            if dashboard.toggle_expanded(&level, &unit_number) {
                redraw(dashboard);
            } else {
                println!("unit {unit_number} is not on {level}");
            }
        }
        DashboardCommand::Help => println!("{HELP}"),
        DashboardCommand::Quit => return false,
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    if let Some(socket_url) = args.socket_url {
        settings.socket_url = socket_url;
    }
    info!(api_url = %settings.api_url, socket_url = %settings.socket_url, "starting dashboard");

    let store = HttpUnitStore::new(&settings.api_url).context("unit store url")?;
    let mut dashboard = Dashboard::activate(&settings, Arc::new(store))
        .await
        .context("opening dashboard")?;
    if let Some(level) = args.level {
        dashboard.select_level(level);
    }
    redraw(&dashboard);

    if args.once {
        dashboard.deactivate().await;
        return Ok(());
    }
    println!("type help for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut bridge_alive = true;
    loop {
        let step = tokio::select! {
            line = lines.next_line() => Step::Line(line.context("reading stdin")?),
            event = dashboard.next_event(), if bridge_alive => Step::Event(event),
        };
        match step {
            Step::Line(None) => break,
            Step::Line(Some(line)) => match parse_command(&line) {
                Ok(Some(command)) => {
                    if !run_command(&mut dashboard, command) {
                        break;
                    }
                }
                Ok(None) => {}
                Err(message) => println!("{message}"),
            },
            Step::Event(None) => {
                warn!("push channel task ended; live updates stopped");
                bridge_alive = false;
            }
            Step::Event(Some(event)) => match dashboard.apply(event).await {
                DashboardChange::UnitMerged {
                    outcome: MergeOutcome::NotFound,
                    ..
                } => {}
                _ => redraw(&dashboard),
            },
        }
    }

    dashboard.deactivate().await;
    Ok(())
}

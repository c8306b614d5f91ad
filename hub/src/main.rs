use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::{Difficulty, GameKind, PseudoRandom};
use hub::bots::{self, RoundSummary};
use hub::config::HubConfig;
use hub::context::AppContext;
use hub::game_executor::GameSpec;
use hub::progression::experience_threshold;
use hub::session_manager::SessionManager;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tricade", about = "Play Tricade arcade rounds from the terminal")]
struct Cli {
    /// Directory for the JSON store; progress stays in memory when omitted
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Player whose profile is used
    #[arg(long)]
    user: Option<String>,

    /// Seed for every engine, for repeatable runs
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Let the autopilot play a Snake run
    Snake {
        #[arg(long)]
        grid: Option<u16>,
    },
    /// Random player against the Triki opponent
    Triki {
        #[arg(long, default_value_t = 1)]
        rounds: u32,
    },
    /// A perfect-memory bot clears a Duos board
    Duos {
        /// easy | hard
        #[arg(long, default_value = "easy")]
        difficulty: Difficulty,
    },
    /// Show level, stats, missions and trophies
    Profile,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = HubConfig::from_env().context("Invalid TRICADE_* environment")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(user) = cli.user {
        config.user_id = user;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Command::Snake { grid: Some(grid) } = &cli.command {
        config.grid_size = *grid;
    }
    config.validate()?;

    let ctx = AppContext::from_config(config).await?;
    let mut manager = SessionManager::new(ctx.clone());

    match cli.command {
        Command::Snake { .. } => {
            manager.start(GameSpec::Snake { grid_size: ctx.config.grid_size }).await;
            let handle = manager.active().context("Snake session did not start")?;
            let summary = bots::play_snake(handle).await?;
            print_summary(&summary);
        }
        Command::Triki { rounds } => {
            manager.start(GameSpec::Triki).await;
            let handle = manager.active().context("Triki session did not start")?;
            let mut rng = PseudoRandom::new(ctx.seed());
            for round in 1..=rounds {
                if round > 1 {
                    bots::restart(handle).await?;
                }
                info!("Triki round {}/{}", round, rounds);
                let summary = bots::play_triki(handle, &mut rng).await?;
                print_summary(&summary);
            }
        }
        Command::Duos { difficulty } => {
            manager.start(GameSpec::Duos { difficulty }).await;
            let handle = manager.active().context("Duos session did not start")?;
            let summary = bots::play_duos(handle).await?;
            print_summary(&summary);
        }
        Command::Profile => print_profile(&ctx).await?,
    }

    manager.stop().await;
    Ok(())
}

fn print_summary(summary: &RoundSummary) {
    println!("Result: {:?}", summary.result);
    match &summary.report {
        Some(report) => {
            if let Some(experience) = &report.experience {
                println!(
                    "  +{} exp (level {}, {} exp){}",
                    experience.gained,
                    experience.level,
                    experience.exp,
                    if experience.leveled_up { ", level up!" } else { "" }
                );
            }
            if let Some(missions) = report.missions.as_ref().filter(|m| !m.completed.is_empty()) {
                println!("  Missions completed: {} (+{} exp)", missions.completed.join(", "), missions.reward);
            }
            for trophy in &report.trophies {
                println!("  Trophy unlocked: {}", trophy);
            }
            if report.errors > 0 {
                println!("  {} persistence step(s) failed, see log", report.errors);
            }
        }
        None => println!("  Progress was not confirmed as saved"),
    }
}

async fn print_profile(ctx: &AppContext) -> Result<()> {
    let db = ctx.db.as_ref();
    let profile = db.get_profile(&ctx.user_id).await?;
    println!("{}", ctx.user_id);
    println!(
        "  Level {} ({}/{} exp)",
        profile.level,
        profile.exp,
        experience_threshold(profile.level)
    );
    if let Some(avatar) = profile.avatar_special.as_ref().or(profile.custom_avatar.as_ref()) {
        println!("  Avatar: {}", avatar);
    }

    for game in GameKind::ALL {
        let stats = db.get_stats(&ctx.user_id, game).await?;
        println!("  {}: {}", game, serde_json::to_string(&stats)?);
    }

    let progress = db.get_mission_progress(&ctx.user_id).await?;
    for mission in hub::missions::MISSIONS {
        let mark = if progress.is_completed(mission.id) { "x" } else { " " };
        println!("  [{}] {} (+{})", mark, mission.description, mission.reward);
    }

    for trophy in db.list_trophies(&ctx.user_id).await? {
        println!("  Trophy {}: {} ({})", trophy.id, trophy.title, trophy.date.format("%Y-%m-%d"));
    }
    Ok(())
}

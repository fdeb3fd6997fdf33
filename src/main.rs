use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;

use hunter_log_lib::commands;
use hunter_log_lib::config::AppConfig;
use hunter_log_lib::level_curve::{cumulative_xp_for_level, level_progress};

/// One year
const MAX_INTERVAL_MINUTES: u64 = 525_600;

#[derive(Parser)]
#[command(name = "hunter-log")]
#[command(about = "Daily hunter log - streaks, XP levels and rank progression")]
#[command(version)]
struct Cli {
  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Print results as JSON
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Record today's activity once (safe to run repeatedly)
  Check,

  /// Check at startup and then on a fixed interval until Ctrl-C
  Watch {
    /// Minutes between checks, up to a year (defaults to HUNTER_LOG_CHECK_INTERVAL_MINUTES)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_MINUTES))]
    interval_minutes: Option<u64>,
  },

  /// Show streak, level and rank
  Status,

  /// Grant XP for a quest or journal entry
  Grant {
    #[arg(long)]
    amount: u64,
    #[arg(long)]
    reason: String,
  },

  /// Spend unspent stat points
  Allocate {
    /// strength | agility | vitality | intelligence | perception
    stat: String,
    points: u32,
  },

  /// Resolve the level for a total XP amount
  Level {
    #[arg(long)]
    xp: u64,
  },

  /// Resolve the rank for a stat total
  Rank {
    #[arg(long)]
    stats: f64,
  },

  /// Show recent notifications and mark them read
  Notifications {
    #[arg(long, default_value_t = 20)]
    limit: i64,
  },
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  dotenvy::dotenv().ok();
  let cli = Cli::parse();

  let log_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
    )
    .init();

  // Pure math needs no database
  match &cli.command {
    Commands::Level { xp } => {
      let progress = level_progress(*xp);
      if cli.json {
        return print_json(&progress);
      }
      let next_at = cumulative_xp_for_level(progress.level + 1).map_err(|e| anyhow!(e))?;
      println!(
        "Level {} ({} / {} XP into level, next level at {} total XP)",
        progress.level, progress.xp_into_level, progress.xp_for_next_level, next_at
      );
      return Ok(());
    }
    Commands::Rank { stats } => {
      let rank = commands::progression::rank_for_stats(*stats);
      if cli.json {
        return print_json(&rank);
      }
      println!("Rank {}", rank);
      return Ok(());
    }
    _ => {}
  }

  let config = AppConfig::from_env()?;
  let state = hunter_log_lib::init_state(&config)
    .await
    .map_err(|e| anyhow!("Failed to initialize database: {}", e))?;

  match cli.command {
    Commands::Check => {
      let update = commands::streak::record_activity(&state).await.map_err(|e| anyhow!(e))?;
      if cli.json {
        print_json(&update)?;
      } else {
        println!(
          "{:?}: streak {} (longest {}, {} days active), reward {} XP",
          update.transition,
          update.state.current_streak,
          update.state.longest_streak,
          update.state.total_days_active,
          update.reward
        );
      }
    }
    Commands::Watch { interval_minutes } => {
      let minutes = interval_minutes.unwrap_or(config.check_interval_minutes).max(1);
      let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
          tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
      };
      hunter_log_lib::scheduler::watch(&state, Duration::from_secs(minutes.saturating_mul(60)), shutdown).await;
    }
    Commands::Status => {
      let streak = commands::streak::get_streak(&state).await.map_err(|e| anyhow!(e))?;
      let player = commands::progression::get_player(&state).await.map_err(|e| anyhow!(e))?;
      if cli.json {
        print_json(&serde_json::json!({ "streak": streak, "player": player }))?;
      } else {
        println!(
          "Streak: {} days ({:?}), longest {}, {} days active, next reward {} XP",
          streak.state.current_streak,
          streak.status,
          streak.state.longest_streak,
          streak.state.total_days_active,
          streak.next_reward
        );
        println!(
          "Level {} | Rank {} | {} XP total | {} unspent stat points",
          player.progress.level,
          player.progress.rank,
          player.progress.total_xp,
          player.progress.unspent_stat_points
        );
      }
    }
    Commands::Grant { amount, reason } => {
      let summary = commands::progression::grant_xp(&state, amount, reason)
        .await
        .map_err(|e| anyhow!(e))?;
      if cli.json {
        print_json(&summary)?;
      } else if summary.leveled_up() {
        println!("+{} XP. Level up: {} -> {}", amount, summary.level_before, summary.level_after);
      } else {
        println!("+{} XP ({} total)", amount, summary.total_xp);
      }
    }
    Commands::Allocate { stat, points } => {
      let progress = commands::progression::allocate_stat_points(&state, stat, points)
        .await
        .map_err(|e| anyhow!(e))?;
      if cli.json {
        print_json(&progress)?;
      } else {
        println!(
          "Rank {} | stat total {} | {} points left",
          progress.rank,
          progress.stats.total(),
          progress.unspent_stat_points
        );
      }
    }
    Commands::Notifications { limit } => {
      let items = commands::get_notifications(&state, limit).await.map_err(|e| anyhow!(e))?;
      if cli.json {
        print_json(&items)?;
      } else {
        for n in &items {
          let marker = if n.read { " " } else { "*" };
          println!("{} [{}] {}: {}", marker, n.category, n.title, n.message);
        }
      }
      commands::mark_all_notifications_read(&state).await.map_err(|e| anyhow!(e))?;
    }
    // Answered before the database was opened
    Commands::Level { .. } | Commands::Rank { .. } => {}
  }

  state.db.close().await;
  Ok(())
}

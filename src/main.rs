/// Main entry point for the Tea Time habit engine CLI
///
/// This binary is a thin inspection and demo surface over the engine: it
/// loads state (demo dataset or the remote gateway), prints every habit with
/// its streak, and can optionally keep running with the reminder scheduler
/// active, logging reminders as they come due.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use teatime_habits::{AccessibilitySettings, HabitEngine, UserId, ACCESSIBILITY_KEY, ONBOARDING_KEY};

/// Command line arguments for the habit engine CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the remote habit service; omit for demo mode
    #[arg(long)]
    gateway_url: Option<String>,

    /// User id (UUID) for the remote service; required with --gateway-url
    #[arg(long)]
    user: Option<String>,

    /// Directory for local device storage (reminders, onboarding state)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Keep running with the reminder scheduler active
    #[arg(long)]
    watch: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Set up logging based on command line flags
    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("teatime_habits={}", log_level))
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Tea Time habit engine");

    let engine = match (&args.gateway_url, &args.user) {
        (Some(url), Some(user)) => {
            let user = UserId::from_string(user)?;
            HabitEngine::connected(url, user, args.data_dir.clone())?
        }
        (Some(_), None) => {
            return Err("--gateway-url requires --user".into());
        }
        _ => {
            println!("No gateway configured; running in demo mode.\n");
            HabitEngine::demo(args.data_dir.clone())?
        }
    };

    // First-run hint, tracked under the versioned onboarding key
    let seen_tour: bool = engine.local_store().get(ONBOARDING_KEY).unwrap_or(false);
    if !seen_tour {
        println!("Welcome to the Tea Time Network habit engine!");
        println!("Habits build one day at a time; complete one today to start a streak.\n");
        engine.local_store().set(ONBOARDING_KEY, &true);
    }

    let store = engine.store();
    store.fetch_habits().await;
    if let Some(error) = store.last_error() {
        eprintln!("Warning: {}", error);
    }

    let accessibility: AccessibilitySettings =
        engine.local_store().get(ACCESSIBILITY_KEY).unwrap_or_default();

    let habits = store.habits();
    if habits.is_empty() {
        println!("No habits yet.");
    }
    for habit in &habits {
        let streak = store.get_streak(habit.id);
        let (current, longest) = streak
            .map(|s| (s.current_streak, s.longest_streak))
            .unwrap_or((0, 0));
        let done = if store.is_completed_today(habit.id) { "done today" } else { "open" };

        if accessibility.screen_reader {
            // Linear sentences read better than aligned columns
            println!("{}: streak {}, best {}, {}.", habit.name, current, longest, done);
        } else {
            println!(
                "{:<30} streak {:>3} (best {:>3})  [{}]",
                habit.name, current, longest, done
            );
        }
    }

    if args.watch {
        println!("\nWatching reminders; press Ctrl-C to stop.");
        engine.scheduler().start();
        tokio::signal::ctrl_c().await?;
        engine.scheduler().stop();
    }

    info!("Tea Time habit engine shutdown complete");
    Ok(())
}

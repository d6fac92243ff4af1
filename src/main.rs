//! Memory simulator - main entry point
//!
//! Drives a `MemoryManager` on a real-time tick loop: an admission every
//! 2nd tick, a termination plus an access every 5th tick once the run has
//! warmed up past 30 ticks, and a timestamp banner every 5th tick. The run
//! ends normally when admissions stop fitting or a paging error turns
//! fatal.

use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use vmsim::config::{BYTES_PER_KB, BYTES_PER_MB};
use vmsim::{Access, MemoryManager, SimParams};

/// Demand-paged virtual memory simulator with FIFO replacement.
#[derive(Parser)]
#[command(name = "vmsim", version, about)]
struct Cli {
    /// Physical RAM size in MB
    ram_mb: u64,

    /// Page size in KB
    page_kb: u64,

    /// Minimum process size in MB
    min_proc_mb: u64,

    /// Maximum process size in MB
    max_proc_mb: u64,

    /// Seed for the random source, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Milliseconds of real time per simulated tick (0 disables pacing)
    #[arg(long, default_value_t = 1000)]
    tick_millis: u64,

    /// Stop after this many ticks even if memory never fills
    #[arg(long)]
    max_ticks: Option<u64>,
}

// Workload cadence, in ticks.
const ADMIT_EVERY: u64 = 2;
const CHURN_AFTER: u64 = 30;
const CHURN_EVERY: u64 = 5;
const BANNER_EVERY: u64 = 5;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let params = SimParams {
        ram_mb: cli.ram_mb,
        page_kb: cli.page_kb,
        min_proc_mb: cli.min_proc_mb,
        max_proc_mb: cli.max_proc_mb,
    };

    let mut manager = match MemoryManager::new(params, cli.seed) {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    print_banner(&manager);
    run(&mut manager, &cli);
    println!("{}", "Simulation finished.".bold());
    ExitCode::SUCCESS
}

fn print_banner(manager: &MemoryManager) {
    let plan = manager.plan();
    println!("{}", "=== Memory Configuration ===".cyan().bold());
    println!(
        "Physical RAM:   {} MB ({} frames)",
        plan.ram_bytes() / BYTES_PER_MB,
        plan.total_frames
    );
    println!("Virtual memory: {} MB", plan.virtual_bytes / BYTES_PER_MB);
    println!(
        "Swap space:     {} MB ({} pages)",
        plan.swap_bytes() / BYTES_PER_MB,
        plan.swap_pages
    );
    println!("Page size:      {} KB", plan.page_bytes / BYTES_PER_KB);
    println!("----------------------------");
}

fn run(manager: &mut MemoryManager, cli: &Cli) {
    let mut tick: u64 = 0;
    loop {
        if cli.tick_millis > 0 {
            thread::sleep(Duration::from_millis(cli.tick_millis));
        }
        tick += 1;

        if tick % ADMIT_EVERY == 0 {
            match manager.create_process() {
                Ok(admission) => {
                    let stats = manager.stats();
                    println!(
                        "{} {admission} (RAM {}/{}, swap {}/{})",
                        "[admit]".green(),
                        stats.resident_pages,
                        stats.total_frames,
                        stats.swap_used,
                        stats.swap_capacity
                    );
                }
                Err(e) => {
                    println!("{} {e}", "[admit]".red());
                    println!("Out of virtual memory; stopping the run.");
                    break;
                }
            }
        }

        if tick > CHURN_AFTER && tick % CHURN_EVERY == 0 {
            if let Some(termination) = manager.kill_random_process() {
                println!("{} {termination}", "[kill]".yellow());
            }

            match manager.access_random() {
                Ok(access) => print_access(&access),
                Err(e) => {
                    println!("{} {e}", "[access]".red());
                    println!("Fatal paging error; stopping the run.");
                    break;
                }
            }
        }

        if tick % BANNER_EVERY == 0 {
            println!("{}", format!("--- time: {tick}s ---").dimmed());
        }

        if cli.max_ticks.is_some_and(|max| tick >= max) {
            break;
        }
    }
}

fn print_access(access: &Access) {
    match access {
        Access::Idle => println!("{} {access}", "[access]".dimmed()),
        Access::Hit { .. } => println!("{} {access}", "[access]".green()),
        Access::Fault { .. } => println!("{} {access}", "[access]".magenta()),
    }
}

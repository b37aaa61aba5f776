//! ExecTrail - execution history and usage collector
//!
//! Runs one collection pass, stores today's snapshot, then serves the
//! results over the local API until interrupted.

use chrono::Local;
use exectrail::collect::{run_collection, CollectionPass};
use exectrail::config::EngineConfig;
use exectrail::store::{filter_user_programs, publish_pass, save_pass_snapshot, DATABASE};
use exectrail::winapi_utils::{current_uptime, EventLogQuery, SystemArtifacts};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("exectrail=info")),
        )
        .init();

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║          ExecTrail - Execution & Usage Provenance          ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    // Initialize database early
    println!("🔧 Initializing database...");
    let config = match DATABASE.as_ref() {
        Some(db_arc) => {
            println!("   ✓ Database ready");
            db_arc
                .lock()
                .map(|db| EngineConfig::load(&db))
                .unwrap_or_default()
        }
        None => {
            println!("   ⚠ Database unavailable, running without persistence");
            EngineConfig::default()
        }
    };

    // Collect
    println!("🔧 Collecting execution artifacts...");
    let artifacts = SystemArtifacts::new();
    let events = EventLogQuery::new(config.event_query_timeout);
    let pass = run_collection(&artifacts, &events, config.lookback_days);
    println!("   ✓ Collection finished");

    print_summary(&pass, &config);

    println!("💾 Saving today's snapshot...");
    save_pass_snapshot(&pass, Local::now().date_naive());
    publish_pass(pass);

    // Start HTTP server
    println!("🔧 Starting HTTP server...");
    let ready = exectrail::server::start_server(config);
    let api_addr = match ready.recv_timeout(Duration::from_secs(5)) {
        Ok(Ok(addr)) => {
            println!("   ✓ HTTP server listening on http://{}", addr);
            Some(addr)
        }
        Ok(Err(e)) => {
            println!("   ⚠ HTTP server failed to start: {}", e);
            None
        }
        Err(_) => {
            println!("   ⚠ HTTP server did not report in, continuing");
            None
        }
    };

    // Shutdown signal
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        println!("\n🛑 Shutdown signal received...");
        shutdown_ctrlc.store(true, Ordering::SeqCst);
    })?;

    println!();
    println!("════════════════════════════════════════════════════════════════");
    if let Some(addr) = api_addr {
        println!("🌐 API available at http://{}", addr);
        println!("   • GET /api/executions - Reconciled program history");
        println!("   • GET /api/run-history - Run dialog commands");
        println!("   • GET /api/usage      - Active time per day");
        println!("   • GET /api/summary    - Rankings over recent snapshots");
    }
    println!("   Press Ctrl+C to quit");
    println!("════════════════════════════════════════════════════════════════");
    println!();

    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(200));
    }

    println!("\n👋 ExecTrail has exited. Goodbye!");
    Ok(())
}

fn print_summary(pass: &CollectionPass, config: &EngineConfig) {
    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("📊 Collection Summary");
    println!("════════════════════════════════════════════════════════════════");

    for status in &pass.statuses {
        match &status.unavailable {
            Some(reason) => println!("   {:<12} ⚠ {}", status.source.to_string(), reason),
            None => println!(
                "   {:<12} {} records ({} malformed)",
                status.source.to_string(),
                status.records,
                status.malformed
            ),
        }
    }
    match &pass.event_log_unavailable {
        Some(reason) => println!("   {:<12} ⚠ {}", "Event log", reason),
        None => println!("   {:<12} {} events", "Event log", pass.session_events.len()),
    }

    let view = pass.history.reconciled();
    let programs = filter_user_programs(&view.programs, &config.system_patterns);
    if !programs.is_empty() {
        println!();
        println!("Recent Programs:");
        for (i, record) in programs.iter().take(10).enumerate() {
            let last_run = record
                .last_run
                .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!("   {}. {} - {} [{}]", i + 1, record.program, last_run, record.source);
        }
    }

    if let Ok(uptime) = current_uptime() {
        println!();
        println!(
            "⏱ Booted {} (up {}h {:02}m)",
            uptime.boot_time.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            uptime.uptime_secs / 3600,
            uptime.uptime_secs % 3600 / 60
        );
    }

    if !pass.daily_usage.is_empty() {
        println!();
        println!("🖥 Active Time:");
        for (date, duration) in pass.daily_usage.iter() {
            let minutes = duration.num_minutes();
            println!("   {}  {}h {:02}m", date, minutes / 60, minutes % 60);
        }
    }

    println!("════════════════════════════════════════════════════════════════");
}

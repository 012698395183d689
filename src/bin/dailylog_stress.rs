use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use dailylog::dispatch::DEFAULT_QUEUE_CAPACITY;
use dailylog::{Dispatcher, Granularity, Level, Logger, Rotator, RotatorConfig, SinkTable};

/// Drive info and error rotators through a dispatcher from many threads.
#[derive(Parser, Debug)]
#[command(name = "dailylog-stress")]
#[command(about = "Load generator for rotating log files")]
struct Cli {
    /// Directory the log files are written to
    #[arg(long, default_value = "./logs")]
    dir: PathBuf,

    /// Filename prefix; `_info` and `_error` are appended per sink
    #[arg(long, default_value = "dailylog")]
    prefix: String,

    /// Bucket size: day, hour, minute or second
    #[arg(long, default_value = "second")]
    granularity: Granularity,

    /// Buckets to keep (0 keeps everything)
    #[arg(long, default_value_t = 5)]
    retention: u32,

    /// Gzip retired info files
    #[arg(long)]
    compress: bool,

    /// Dispatch queue capacity
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    capacity: usize,

    /// Number of producer threads
    #[arg(long, default_value_t = 8)]
    producers: usize,

    /// Records each producer emits per level
    #[arg(long, default_value_t = 10_000)]
    records: usize,

    /// Pause between records of one producer, in microseconds
    #[arg(long, default_value_t = 0)]
    pause_us: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let info_log = Rotator::new(
        RotatorConfig::new(&cli.dir, format!("{}_info", cli.prefix))
            .granularity(cli.granularity)
            .retention(cli.retention)
            .compress(cli.compress),
    )
    .context("Failed to create info rotator")?;
    let error_log = Rotator::new(
        RotatorConfig::new(&cli.dir, format!("{}_error", cli.prefix))
            .granularity(cli.granularity)
            .retention(cli.retention),
    )
    .context("Failed to create error rotator")?;

    // Critical records have no route and are dropped by design.
    let sinks = SinkTable::new()
        .route(Level::Info, Arc::new(info_log))
        .route(Level::Error, Arc::new(error_log));
    let dispatcher =
        Arc::new(Dispatcher::new(sinks, cli.capacity).context("Failed to start dispatcher")?);
    let logger = Arc::new(Logger::new(Arc::clone(&dispatcher)));

    info!(
        "Writing to {} with {} producers x {} records ({} buckets)",
        cli.dir.display(),
        cli.producers,
        cli.records,
        cli.granularity
    );

    let start = Instant::now();
    let pause = Duration::from_micros(cli.pause_us);
    let mut handles = Vec::with_capacity(cli.producers);
    for producer in 0..cli.producers {
        let logger = Arc::clone(&logger);
        let records = cli.records;
        let handle = thread::Builder::new()
            .name(format!("producer-{producer}"))
            .spawn(move || {
                let id = format!("producer{producer}");
                for seq in 0..records {
                    let message = format!("hello {seq}");
                    logger.info(&id, "stress", &message);
                    logger.error(&id, "stress", &message);
                    logger.critical(&id, "stress", &message);
                    if !pause.is_zero() {
                        thread::sleep(pause);
                    }
                }
            })
            .context("Failed to spawn producer")?;
        handles.push(handle);
    }

    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
    }
    let enqueued = start.elapsed();

    dispatcher.stop_and_drain().context("Failed to drain dispatcher")?;
    let drained = start.elapsed();

    let total = cli.producers * cli.records * 3;
    info!(
        "Enqueued {} records in {:?} ({:.0} rec/sec), drained in {:?}",
        total,
        enqueued,
        total as f64 / enqueued.as_secs_f64().max(f64::EPSILON),
        drained
    );
    Ok(())
}

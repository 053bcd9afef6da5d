//! CPU load worker
//!
//! Occupies logical cores with spinning arithmetic threads. Runs until
//! terminated; cleanup is the recovery tool's job.

use clap::Parser;
use std::thread;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "cpu-stress", about = "Occupies CPU cores with spinning worker threads")]
struct Args {
    /// Worker thread count; defaults to all logical cores
    #[arg(long)]
    threads: Option<usize>,
}

fn spin_forever() {
    loop {
        let mut acc = 0u64;
        for i in 0..10_000u64 {
            acc = acc.wrapping_add(i.wrapping_mul(i));
        }
        // Keep the work observable so it is not optimized away.
        std::hint::black_box(acc);
    }
}

fn main() {
    let args = Args::parse();

    let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let threads = args.threads.unwrap_or(cores).clamp(1, cores);

    println!("Occupying CPU with {threads} worker threads");
    for _ in 0..threads {
        thread::spawn(spin_forever);
    }

    loop {
        thread::sleep(Duration::from_secs(60));
    }
}

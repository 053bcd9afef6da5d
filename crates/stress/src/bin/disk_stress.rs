//! Disk load worker
//!
//! Writes a file of random bytes at the requested path, keeps it for
//! the retention duration (or until interrupted), then deletes it.
//! A partially written file is removed before exiting on error.

use anyhow::{Context, Result};
use clap::Parser;
use optimizer_stress::size::{parse_size_arg, MIB};
use rand::RngCore;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Parser)]
#[command(
    name = "disk-stress",
    about = "Creates a temporary file of random bytes and deletes it after a retention period"
)]
struct Args {
    /// Directory to write under, or an exact file path
    #[arg(long)]
    path: PathBuf,

    /// File size, e.g. 100MB or 1GB
    #[arg(long, value_parser = parse_size_arg)]
    size: u64,

    /// Seconds to keep the file before deleting it
    #[arg(long, default_value_t = 3600)]
    duration: u64,
}

/// Resolve the file to create: a `temp_<ts>_<tag>.dat` name when the
/// target is a directory, the path itself otherwise. The recovery tool
/// matches this naming pattern when sweeping leftovers.
fn target_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let tag = 1000 + rand::random::<u32>() % 9000;
        path.join(format!("temp_{ts}_{tag}.dat"))
    } else {
        path.to_path_buf()
    }
}

fn write_random_file(path: &Path, size: u64) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;

    let mut rng = rand::thread_rng();
    let mut block = vec![0u8; MIB as usize];
    let blocks = size / MIB;
    let remainder = (size % MIB) as usize;

    for i in 0..blocks {
        if i % 10 == 0 {
            println!("Progress: {:.1}%", i as f64 / blocks as f64 * 100.0);
        }
        rng.fill_bytes(&mut block);
        file.write_all(&block)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if remainder > 0 {
        rng.fill_bytes(&mut block[..remainder]);
        file.write_all(&block[..remainder])
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    file.flush()?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let file_path = target_file(&args.path);

    println!(
        "Creating {:.2}MB file at {}",
        args.size as f64 / MIB as f64,
        file_path.display()
    );

    if let Err(e) = write_random_file(&file_path, args.size) {
        let _ = fs::remove_file(&file_path);
        return Err(e);
    }

    println!("File created, keeping it for {} seconds", args.duration);

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(args.duration)) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("Interrupted, removing file now");
        }
    }

    fs::remove_file(&file_path)
        .with_context(|| format!("failed to remove {}", file_path.display()))?;
    println!("Removed {}", file_path.display());

    Ok(())
}

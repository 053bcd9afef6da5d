//! System recovery utility
//!
//! Stops every load worker the optimizer may have spawned and deletes
//! their temp artifacts, restoring the host to its normal state. The
//! optimizer exposes no API for this: workers are discovered by
//! matching known executable identities against running process command
//! lines, and artifacts by the `temp_*.dat` naming pattern under the
//! recognized search roots.

use anyhow::Result;
use clap::Parser;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use sysinfo::{Disks, ProcessesToUpdate, Signal, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Executable identities this tool is allowed to terminate.
const WORKER_IDENTITIES: &[&str] = &[
    "cpu-stress",
    "memory-stress",
    "disk-stress",
    "resource-optimizer",
];

/// How long terminated workers get to exit before being killed.
const TERMINATION_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(
    name = "recover-system",
    about = "Stops resource load workers and deletes their temp files"
)]
struct Args {
    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if !args.yes && !confirm()? {
        info!("Recovery cancelled");
        return Ok(());
    }

    let mut sys = System::new_all();
    let mut disks = Disks::new_with_refreshed_list();

    info!("System state before recovery:");
    show_status(&mut sys, &mut disks);

    let stopped = stop_workers(&mut sys);
    info!(stopped = stopped, "Stopped load workers");

    let roots: Vec<PathBuf> = candidate_roots()
        .into_iter()
        .filter(|p| p.exists())
        .collect();
    let removed = cleanup_temp_files(&roots);
    info!(removed = removed, "Removed temp artifacts");

    drop_page_caches();

    // Give the system a moment to settle before the closing report.
    std::thread::sleep(Duration::from_secs(10));
    info!("System state after recovery:");
    show_status(&mut sys, &mut disks);

    Ok(())
}

fn confirm() -> Result<bool> {
    print!("This will stop all load workers and delete their temp files. Continue? (y/n): ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}

/// Whether a process looks like one of our load workers, judged by its
/// executable name or any command-line token resolving to one.
fn is_worker_process(name: &str, cmd: &[String]) -> bool {
    let matches_identity = |candidate: &str| {
        WORKER_IDENTITIES
            .iter()
            .any(|w| candidate == *w || candidate == format!("{w}.exe"))
    };

    if matches_identity(name) {
        return true;
    }
    cmd.iter().any(|token| {
        Path::new(token)
            .file_name()
            .map(|f| matches_identity(&f.to_string_lossy()))
            .unwrap_or(false)
    })
}

/// Terminate matching workers, wait a bounded time, kill survivors.
fn stop_workers(sys: &mut System) -> usize {
    sys.refresh_processes(ProcessesToUpdate::All);
    let own_pid = sysinfo::get_current_pid().ok();

    let mut targets = Vec::new();
    for (pid, process) in sys.processes() {
        if Some(*pid) == own_pid {
            continue;
        }
        let name = process.name().to_string_lossy().into_owned();
        let cmd: Vec<String> = process
            .cmd()
            .iter()
            .map(|token| token.to_string_lossy().into_owned())
            .collect();
        if is_worker_process(&name, &cmd) {
            info!(
                pid = pid.as_u32(),
                name = %name,
                "Stopping load worker"
            );
            if process.kill_with(Signal::Term).is_none() {
                // Platform without SIGTERM; fall back to a plain kill.
                process.kill();
            }
            targets.push(*pid);
        }
    }

    let deadline = Instant::now() + TERMINATION_WAIT;
    while Instant::now() < deadline {
        sys.refresh_processes(ProcessesToUpdate::All);
        if targets.iter().all(|pid| sys.process(*pid).is_none()) {
            break;
        }
        std::thread::sleep(Duration::from_millis(200));
    }

    sys.refresh_processes(ProcessesToUpdate::All);
    for pid in &targets {
        if let Some(process) = sys.process(*pid) {
            warn!(pid = pid.as_u32(), "Worker did not exit in time, killing it");
            process.kill();
        }
    }

    targets.len()
}

/// `temp_<ts>_<tag>.dat` artifacts written by the disk worker.
fn is_temp_artifact(file_name: &str) -> bool {
    file_name.starts_with("temp_") && file_name.ends_with(".dat")
}

/// Directories searched for leftover temp artifacts. Windows sweeps the
/// data drive letters; elsewhere the usual data directories. The
/// optimizer workspace is included when configured.
fn candidate_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if cfg!(windows) {
        for letter in b'D'..=b'Z' {
            roots.push(PathBuf::from(format!("{}:\\", letter as char)));
        }
    } else {
        for dir in ["/data", "/var/data", "/home", "/opt"] {
            roots.push(PathBuf::from(dir));
        }
    }

    if let Ok(workspace) = std::env::var("OPTIMIZER_WORKSPACE_DIR") {
        roots.push(PathBuf::from(workspace));
    }

    roots
}

fn cleanup_temp_files(roots: &[PathBuf]) -> usize {
    let mut removed = 0;

    for root in roots {
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !is_temp_artifact(&name) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    info!(path = %entry.path().display(), "Removed temp artifact");
                    removed += 1;
                }
                Err(e) => {
                    error!(
                        path = %entry.path().display(),
                        error = %e,
                        "Failed to remove temp artifact"
                    );
                }
            }
        }
    }

    removed
}

#[cfg(target_os = "linux")]
fn drop_page_caches() {
    match fs::write("/proc/sys/vm/drop_caches", "3") {
        Ok(()) => info!("Dropped page caches"),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!("Dropping page caches requires root, skipping");
        }
        Err(e) => warn!(error = %e, "Failed to drop page caches"),
    }
}

#[cfg(not(target_os = "linux"))]
fn drop_page_caches() {}

fn show_status(sys: &mut System, disks: &mut Disks) {
    sys.refresh_cpu_usage();
    std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL.max(Duration::from_secs(1)));
    sys.refresh_cpu_usage();
    sys.refresh_memory();
    disks.refresh();

    let total = sys.total_memory();
    let used = sys.used_memory();
    let memory_percent = if total > 0 {
        used as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    info!(
        cpu_percent = sys.global_cpu_usage(),
        memory_percent = memory_percent,
        memory_used_gb = used as f64 / (1024.0 * 1024.0 * 1024.0),
        memory_total_gb = total as f64 / (1024.0 * 1024.0 * 1024.0),
        "Host utilization"
    );

    for disk in disks.list() {
        let total = disk.total_space();
        if total == 0 {
            continue;
        }
        let used = total.saturating_sub(disk.available_space());
        info!(
            mount = %disk.mount_point().display(),
            used_percent = used as f64 / total as f64 * 100.0,
            total_gb = total as f64 / (1024.0 * 1024.0 * 1024.0),
            "Volume utilization"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_artifact_pattern() {
        assert!(is_temp_artifact("temp_1700000000_4242.dat"));
        assert!(is_temp_artifact("temp_x.dat"));
        assert!(!is_temp_artifact("temp_1700000000_4242.tmp"));
        assert!(!is_temp_artifact("data_1700000000.dat"));
        assert!(!is_temp_artifact("notes.txt"));
    }

    #[test]
    fn worker_matching_by_name_and_cmdline() {
        assert!(is_worker_process("cpu-stress", &[]));
        assert!(is_worker_process("memory-stress.exe", &[]));
        assert!(is_worker_process(
            "some-shell",
            &["/opt/optimizer/disk-stress".to_string(), "--path".to_string()]
        ));
        assert!(!is_worker_process("bash", &["grep".to_string()]));
        assert!(!is_worker_process("recover-system", &[]));
    }

    #[test]
    fn worker_matching_ignores_plain_arguments() {
        // Size strings and flags must not look like worker executables.
        assert!(!is_worker_process("python3", &["100MB".to_string()]));
        assert!(!is_worker_process("tail", &["-f".to_string(), "app.log".to_string()]));
    }

    #[cfg(not(windows))]
    #[test]
    fn unix_search_roots_cover_data_directories() {
        let roots = candidate_roots();
        assert!(roots.contains(&PathBuf::from("/data")));
        assert!(roots.contains(&PathBuf::from("/var/data")));
        assert!(roots.contains(&PathBuf::from("/home")));
        assert!(roots.contains(&PathBuf::from("/opt")));
    }

    #[test]
    fn cleanup_removes_only_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("keep.dat");
        let sweep = dir.path().join("temp_123_456.dat");
        let nested = dir.path().join("sub");
        fs::create_dir_all(&nested).unwrap();
        let nested_sweep = nested.join("temp_789_012.dat");

        fs::write(&keep, b"x").unwrap();
        fs::write(&sweep, b"x").unwrap();
        fs::write(&nested_sweep, b"x").unwrap();

        let removed = cleanup_temp_files(&[dir.path().to_path_buf()]);
        assert_eq!(removed, 2);
        assert!(keep.exists());
        assert!(!sweep.exists());
        assert!(!nested_sweep.exists());
    }
}

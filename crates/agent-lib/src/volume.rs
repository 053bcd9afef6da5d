//! Data volume selection for disk load placement
//!
//! Picks where a disk filler may write: a configured override path when
//! usable, otherwise the largest non-system volume with enough free
//! space. Selecting by largest *total* capacity (not largest free) is
//! deliberate: big volumes are presumed to be purpose-built data disks.

use crate::models::VolumeCandidate;
use crate::platform::Platform;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Minimum free space a volume must have to receive disk load.
pub const MIN_FREE_BYTES: u64 = 1024 * 1024 * 1024;

/// Pick a target volume from the candidates enumerated this cycle.
///
/// System volumes are excluded when `data_disk_only` is set, volumes
/// under [`MIN_FREE_BYTES`] free are always excluded, and the survivor
/// with the largest total capacity wins. `None` means no volume is
/// usable this cycle; the caller skips disk load rather than erroring.
pub fn pick_volume<'a>(
    candidates: &'a [VolumeCandidate],
    platform: &Platform,
    data_disk_only: bool,
) -> Option<&'a VolumeCandidate> {
    candidates
        .iter()
        .filter(|v| !(data_disk_only && platform.is_system_volume(&v.mount_point)))
        .filter(|v| v.free_bytes >= MIN_FREE_BYTES)
        .max_by_key(|v| v.total_bytes)
}

/// Resolve the path the disk worker should write under.
///
/// A configured override path wins whenever it exists and has at least
/// [`MIN_FREE_BYTES`] free; otherwise auto-selection via [`pick_volume`].
pub fn select_target_volume(
    configured: Option<&Path>,
    candidates: &[VolumeCandidate],
    platform: &Platform,
    data_disk_only: bool,
) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            match free_space_for_path(candidates, path) {
                Some(free) if free >= MIN_FREE_BYTES => {
                    debug!(path = %path.display(), "Using configured disk load path");
                    return Some(path.to_path_buf());
                }
                _ => {
                    warn!(
                        path = %path.display(),
                        "Configured disk load path lacks free space, falling back to auto-selection"
                    );
                }
            }
        } else {
            warn!(
                path = %path.display(),
                "Configured disk load path does not exist, falling back to auto-selection"
            );
        }
    }

    pick_volume(candidates, platform, data_disk_only).map(|v| v.mount_point.clone())
}

/// Free space on the volume holding `path`: the candidate whose mount
/// point is the longest prefix of the path.
fn free_space_for_path(candidates: &[VolumeCandidate], path: &Path) -> Option<u64> {
    candidates
        .iter()
        .filter(|v| path.starts_with(&v.mount_point))
        .max_by_key(|v| v.mount_point.as_os_str().len())
        .map(|v| v.free_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::LinuxDistro;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn volume(mount: &str, total_gib: u64, free_bytes: u64) -> VolumeCandidate {
        VolumeCandidate {
            mount_point: PathBuf::from(mount),
            total_bytes: total_gib * GIB,
            free_bytes,
            filesystem_kind: "ext4".to_string(),
        }
    }

    fn linux() -> Platform {
        Platform::Linux(LinuxDistro::Generic)
    }

    #[test]
    fn skips_system_volume_and_low_free_space() {
        let candidates = vec![
            volume("/", 100, 50 * GIB),
            volume("/data", 500, 2 * GIB),
            volume("/backup", 200, GIB / 2),
        ];
        let picked = pick_volume(&candidates, &linux(), true).unwrap();
        assert_eq!(picked.mount_point, PathBuf::from("/data"));
    }

    #[test]
    fn largest_total_capacity_wins_over_largest_free() {
        let candidates = vec![
            volume("/small", 100, 90 * GIB),
            volume("/big", 500, 2 * GIB),
        ];
        let picked = pick_volume(&candidates, &linux(), true).unwrap();
        assert_eq!(picked.mount_point, PathBuf::from("/big"));
    }

    #[test]
    fn no_survivors_yields_none() {
        let candidates = vec![volume("/", 100, 50 * GIB), volume("/data", 500, GIB - 1)];
        assert!(pick_volume(&candidates, &linux(), true).is_none());
        assert!(select_target_volume(None, &candidates, &linux(), true).is_none());
    }

    #[test]
    fn system_volume_allowed_when_not_data_disk_only() {
        let candidates = vec![volume("/", 100, 50 * GIB)];
        let picked = pick_volume(&candidates, &linux(), false).unwrap();
        assert_eq!(picked.mount_point, PathBuf::from("/"));
    }

    #[test]
    fn configured_path_wins_when_usable() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = vec![volume("/", 100, 50 * GIB)];
        let selected =
            select_target_volume(Some(dir.path()), &candidates, &linux(), true).unwrap();
        assert_eq!(selected, dir.path());
    }

    #[test]
    fn missing_configured_path_falls_back() {
        let candidates = vec![volume("/data", 500, 2 * GIB)];
        let selected = select_target_volume(
            Some(Path::new("/no/such/dir")),
            &candidates,
            &linux(),
            true,
        )
        .unwrap();
        assert_eq!(selected, PathBuf::from("/data"));
    }

    #[test]
    fn configured_path_without_free_space_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        // The volume holding the temp dir reports too little free space.
        let candidates = vec![
            VolumeCandidate {
                mount_point: PathBuf::from("/"),
                total_bytes: 100 * GIB,
                free_bytes: GIB / 4,
                filesystem_kind: "ext4".to_string(),
            },
            volume("/data", 500, 2 * GIB),
        ];
        let selected =
            select_target_volume(Some(dir.path()), &candidates, &linux(), true).unwrap();
        assert_eq!(selected, PathBuf::from("/data"));
    }

    #[test]
    fn longest_mount_prefix_owns_the_path() {
        let candidates = vec![
            volume("/", 100, 50 * GIB),
            volume("/data", 500, 2 * GIB),
        ];
        assert_eq!(
            free_space_for_path(&candidates, Path::new("/data/scratch")),
            Some(2 * GIB)
        );
        assert_eq!(
            free_space_for_path(&candidates, Path::new("/var/tmp")),
            Some(50 * GIB)
        );
    }
}

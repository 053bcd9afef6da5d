//! Platform model
//!
//! A closed enumeration of supported platforms, selected once at
//! startup. Each variant carries the system-volume rule used when
//! excluding boot/OS volumes and the executable naming convention for
//! worker invocation. The Linux distro label is advisory only (it shows
//! up in logs); it never changes selection behavior.

use std::path::Path;

/// Linux mount points never used for disk load placement.
const LINUX_SYSTEM_MOUNTS: &[&str] = &["/", "/boot", "/boot/efi", "/proc", "/sys", "/dev"];

/// Advisory Linux distribution label sniffed from /etc/os-release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinuxDistro {
    CentOs,
    Ubuntu,
    Kylin,
    OpenEuler,
    Generic,
}

impl LinuxDistro {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinuxDistro::CentOs => "centos",
            LinuxDistro::Ubuntu => "ubuntu",
            LinuxDistro::Kylin => "kylin",
            LinuxDistro::OpenEuler => "openeuler",
            LinuxDistro::Generic => "linux_generic",
        }
    }

    fn from_os_release(content: &str) -> Self {
        let content = content.to_ascii_lowercase();
        if content.contains("centos") {
            LinuxDistro::CentOs
        } else if content.contains("ubuntu") {
            LinuxDistro::Ubuntu
        } else if content.contains("kylin") {
            LinuxDistro::Kylin
        } else if content.contains("openeuler") {
            LinuxDistro::OpenEuler
        } else {
            LinuxDistro::Generic
        }
    }
}

/// Supported host platform, detected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux(LinuxDistro),
}

impl Platform {
    /// Resolve the platform from the configured value. "auto" inspects
    /// the running OS; explicit values ("windows", "linux", or a distro
    /// name) are honored as-is.
    pub fn detect(configured: &str) -> Self {
        match configured.to_ascii_lowercase().as_str() {
            "windows" => Platform::Windows,
            "linux" | "linux_generic" => Platform::Linux(sniff_distro()),
            "centos" => Platform::Linux(LinuxDistro::CentOs),
            "ubuntu" => Platform::Linux(LinuxDistro::Ubuntu),
            "kylin" => Platform::Linux(LinuxDistro::Kylin),
            "openeuler" => Platform::Linux(LinuxDistro::OpenEuler),
            _ => {
                if std::env::consts::OS == "windows" {
                    Platform::Windows
                } else {
                    Platform::Linux(sniff_distro())
                }
            }
        }
    }

    /// Whether a mount point hosts the operating system and must never
    /// receive disk load.
    pub fn is_system_volume(&self, mount_point: &Path) -> bool {
        match self {
            Platform::Windows => {
                let mount = mount_point.to_string_lossy();
                let mount = mount.trim_end_matches(['\\', '/']);
                mount.eq_ignore_ascii_case("c:")
            }
            Platform::Linux(_) => LINUX_SYSTEM_MOUNTS
                .iter()
                .any(|m| Path::new(m) == mount_point),
        }
    }

    /// File name of a worker executable on this platform.
    pub fn executable_name(&self, base: &str) -> String {
        match self {
            Platform::Windows => format!("{base}.exe"),
            Platform::Linux(_) => base.to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux(distro) => distro.as_str(),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

fn sniff_distro() -> LinuxDistro {
    match std::fs::read_to_string("/etc/os-release") {
        Ok(content) => LinuxDistro::from_os_release(&content),
        Err(_) => LinuxDistro::Generic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn explicit_platform_values_win_over_auto() {
        assert_eq!(Platform::detect("windows"), Platform::Windows);
        assert_eq!(
            Platform::detect("centos"),
            Platform::Linux(LinuxDistro::CentOs)
        );
        assert_eq!(
            Platform::detect("openEuler"),
            Platform::Linux(LinuxDistro::OpenEuler)
        );
    }

    #[test]
    fn linux_system_mounts_are_excluded() {
        let platform = Platform::Linux(LinuxDistro::Generic);
        for mount in ["/", "/boot", "/boot/efi", "/proc", "/sys", "/dev"] {
            assert!(platform.is_system_volume(Path::new(mount)), "{mount}");
        }
        assert!(!platform.is_system_volume(Path::new("/data")));
        assert!(!platform.is_system_volume(Path::new("/var/data")));
    }

    #[test]
    fn windows_system_drive_is_excluded() {
        let platform = Platform::Windows;
        assert!(platform.is_system_volume(&PathBuf::from("C:\\")));
        assert!(platform.is_system_volume(&PathBuf::from("c:")));
        assert!(!platform.is_system_volume(&PathBuf::from("D:\\")));
    }

    #[test]
    fn executable_naming_convention() {
        assert_eq!(Platform::Windows.executable_name("cpu-stress"), "cpu-stress.exe");
        assert_eq!(
            Platform::Linux(LinuxDistro::Ubuntu).executable_name("cpu-stress"),
            "cpu-stress"
        );
    }

    #[test]
    fn distro_sniffing_from_os_release_content() {
        assert_eq!(
            LinuxDistro::from_os_release("NAME=\"CentOS Linux\"\nVERSION=\"7\""),
            LinuxDistro::CentOs
        );
        assert_eq!(
            LinuxDistro::from_os_release("NAME=\"Ubuntu\"\nVERSION_ID=\"22.04\""),
            LinuxDistro::Ubuntu
        );
        assert_eq!(
            LinuxDistro::from_os_release("NAME=\"openEuler\""),
            LinuxDistro::OpenEuler
        );
        assert_eq!(
            LinuxDistro::from_os_release("NAME=\"Debian GNU/Linux\""),
            LinuxDistro::Generic
        );
    }
}

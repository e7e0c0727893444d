//! Host operating system detection

use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

/// Distribution family, used to pick an installation recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsFamily {
    /// Debian, Ubuntu and derivatives (apt)
    Debian,
    /// RHEL, CentOS, Fedora and derivatives (dnf/yum)
    RedHat,
    /// Anything else, carrying the distribution id
    Other(String),
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsFamily::Debian => f.write_str("debian"),
            OsFamily::RedHat => f.write_str("redhat"),
            OsFamily::Other(id) => write!(f, "other ({})", id),
        }
    }
}

/// What the host identification file says about this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// Distribution family
    pub os_family: OsFamily,
    /// `ID` field, lowercased
    pub distro_id: String,
    /// `VERSION_ID` field, empty when absent (rolling releases)
    pub version: String,
    /// `ID_LIKE` entries
    pub id_like: Vec<String>,
    /// `PRETTY_NAME` field
    pub pretty_name: Option<String>,
}

const DEBIAN_IDS: &[&str] = &["debian", "ubuntu", "linuxmint", "raspbian", "deepin", "kali"];
const REDHAT_IDS: &[&str] = &[
    "rhel",
    "centos",
    "rocky",
    "almalinux",
    "fedora",
    "ol",
    "anolis",
    "opencloudos",
];

impl HostInfo {
    /// Parse the contents of an os-release file
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let fields = parse_fields(content);

        let distro_id = fields
            .get("ID")
            .map(|id| id.to_lowercase())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| "no ID field".to_string())?;
        let id_like: Vec<String> = fields
            .get("ID_LIKE")
            .map(|v| v.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default();

        let os_family = classify(&distro_id, &id_like);

        Ok(Self {
            os_family,
            distro_id,
            version: fields.get("VERSION_ID").cloned().unwrap_or_default(),
            id_like,
            pretty_name: fields.get("PRETTY_NAME").cloned(),
        })
    }
}

fn classify(distro_id: &str, id_like: &[String]) -> OsFamily {
    let is = |ids: &[&str], extra: &[&str]| {
        ids.contains(&distro_id)
            || id_like
                .iter()
                .any(|like| extra.contains(&like.as_str()))
    };

    if is(DEBIAN_IDS, &["debian", "ubuntu"]) {
        OsFamily::Debian
    } else if is(REDHAT_IDS, &["rhel", "fedora", "centos"]) {
        OsFamily::RedHat
    } else {
        OsFamily::Other(distro_id.to_string())
    }
}

fn parse_fields(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Reads the host identification file
#[derive(Debug, Clone)]
pub struct RuntimeDetector {
    os_release: PathBuf,
}

impl RuntimeDetector {
    /// Create a detector reading `os_release`
    pub fn new(os_release: impl Into<PathBuf>) -> Self {
        Self {
            os_release: os_release.into(),
        }
    }

    /// Identify the host; any failure is fatal
    pub fn detect(&self) -> Result<HostInfo> {
        let unidentified = |reason: String| Error::HostUnidentified {
            path: self.os_release.clone(),
            reason,
        };

        let content =
            std::fs::read_to_string(&self.os_release).map_err(|e| unidentified(e.to_string()))?;
        let host = HostInfo::parse(&content).map_err(unidentified)?;

        info!(
            "Detected host {} {} (family: {})",
            host.distro_id, host.version, host.os_family
        );
        Ok(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UBUNTU: &str = r#"PRETTY_NAME="Ubuntu 22.04.4 LTS"
NAME="Ubuntu"
VERSION_ID="22.04"
VERSION="22.04.4 LTS (Jammy Jellyfish)"
ID=ubuntu
ID_LIKE=debian
"#;

    const ROCKY: &str = r#"NAME="Rocky Linux"
VERSION="9.3 (Blue Onyx)"
ID="rocky"
ID_LIKE="rhel centos fedora"
VERSION_ID="9.3"
"#;

    #[test]
    fn test_parse_ubuntu() {
        let host = HostInfo::parse(UBUNTU).unwrap();
        assert_eq!(host.os_family, OsFamily::Debian);
        assert_eq!(host.distro_id, "ubuntu");
        assert_eq!(host.version, "22.04");
        assert_eq!(host.pretty_name.as_deref(), Some("Ubuntu 22.04.4 LTS"));
    }

    #[test]
    fn test_parse_rocky() {
        let host = HostInfo::parse(ROCKY).unwrap();
        assert_eq!(host.os_family, OsFamily::RedHat);
        assert_eq!(host.id_like, vec!["rhel", "centos", "fedora"]);
    }

    #[test]
    fn test_family_from_id_like() {
        let host = HostInfo::parse("ID=pop\nID_LIKE=\"ubuntu debian\"\n").unwrap();
        assert_eq!(host.os_family, OsFamily::Debian);

        let host = HostInfo::parse("ID=arch\n# rolling\n").unwrap();
        assert_eq!(host.os_family, OsFamily::Other("arch".to_string()));
        assert_eq!(host.version, "");
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(HostInfo::parse("NAME=\"Mystery\"\n").is_err());
        assert!(HostInfo::parse("ID=\"\"\n").is_err());
    }

    #[test]
    fn test_detect_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let detector = RuntimeDetector::new(dir.path().join("os-release"));
        let err = detector.detect().unwrap_err();
        assert!(matches!(err, Error::HostUnidentified { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_detect_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("os-release");
        std::fs::write(&path, ROCKY).unwrap();
        let host = RuntimeDetector::new(&path).detect().unwrap();
        assert_eq!(host.distro_id, "rocky");
    }
}

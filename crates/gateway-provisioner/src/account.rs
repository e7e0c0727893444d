//! Account identity and the names and paths derived from it

use std::fmt;
use std::path::{Path, PathBuf};

/// Operator-supplied numeric account token
///
/// Kept as a string: only the character set is checked, not the integer
/// range, since the id ends up in container names and directory names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId(String);

impl AccountId {
    /// Parse a trimmed, non-empty, all-digit token
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    /// The token as written by the operator
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Container name and directories belonging to one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountLayout {
    account: AccountId,
    container_name: String,
    account_dir: PathBuf,
    config_dir: PathBuf,
}

impl AccountLayout {
    /// Derive the layout of `account` under `base_dir`
    pub fn new(account: AccountId, base_dir: &Path, prefix: &str) -> Self {
        let container_name = format!("{}_{}", prefix, account);
        let account_dir = base_dir.join(&container_name);
        let config_dir = account_dir.join("config");
        Self {
            account,
            container_name,
            account_dir,
            config_dir,
        }
    }

    /// The account this layout belongs to
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Exact container name
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Per-account data directory
    pub fn account_dir(&self) -> &Path {
        &self.account_dir
    }

    /// Directory holding the configuration bundle; mounted into the container
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Default host API port: `base` plus the length of the account id
    pub fn default_api_port(&self, base: u16) -> u16 {
        u16::try_from(self.account.as_str().len())
            .ok()
            .and_then(|len| base.checked_add(len))
            .unwrap_or(base)
    }
}

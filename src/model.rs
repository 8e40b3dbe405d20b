use serde::{Deserialize, Serialize};

/// A tracked package as reported by discovery.
///
/// Field names serialize in camelCase to match the scanner's JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    /// Unique identifier across the fleet.
    pub path: String,
    pub relative_path: String,
    #[serde(default)]
    pub react_version: Option<String>,
    #[serde(default)]
    pub next_version: Option<String>,
    #[serde(default)]
    pub is_react_vulnerable: bool,
    #[serde(default)]
    pub is_next_vulnerable: bool,
    #[serde(default)]
    pub package_manager: Option<String>,
    #[serde(default)]
    pub git_branch: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    /// `None` means unknown or not applicable.
    #[serde(default)]
    pub commits_behind_default: Option<u32>,
}

impl PackageInfo {
    pub fn new(path: impl Into<String>, relative_path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            relative_path: relative_path.into(),
            react_version: None,
            next_version: None,
            is_react_vulnerable: false,
            is_next_vulnerable: false,
            package_manager: None,
            git_branch: None,
            default_branch: None,
            commits_behind_default: None,
        }
    }

    pub fn is_vulnerable(&self) -> bool {
        self.is_react_vulnerable || self.is_next_vulnerable
    }

    /// True when the working copy is checked out on its default branch.
    pub fn on_default_branch(&self) -> bool {
        match (&self.git_branch, &self.default_branch) {
            (Some(current), Some(default)) => current == default,
            _ => false,
        }
    }

    /// Commits behind the default branch, only when strictly positive.
    pub fn behind_count(&self) -> Option<u32> {
        self.commits_behind_default.filter(|n| *n > 0)
    }
}

/// Uniform result returned by every remediation collaborator.
///
/// `success == true` carries `message`; `success == false` carries `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Success,
    Error,
}

/// Banner text left behind by the last completed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl StatusMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }
}

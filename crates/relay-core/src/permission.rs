//! Permission modes understood by the assistant CLI.
//!
//! The bridge does not interpret these; it only picks one for the automatic
//! continuation turn that follows a human approval and forwards the string.

use crate::session::PermissionDenial;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    Default,
    AcceptEdits,
    BypassPermissions,
    Plan,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::BypassPermissions => "bypassPermissions",
            PermissionMode::Plan => "plan",
        }
    }

    /// Chooses the mode for the continuation turn after the user approved `denials`.
    ///
    /// Shell access needs a full bypass; file edits only need `acceptEdits`.
    pub fn for_denials(denials: &[PermissionDenial]) -> Self {
        if denials.iter().any(|d| d.tool_name == "Bash") {
            PermissionMode::BypassPermissions
        } else {
            PermissionMode::AcceptEdits
        }
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(PermissionMode::Default),
            "acceptEdits" => Ok(PermissionMode::AcceptEdits),
            "bypassPermissions" => Ok(PermissionMode::BypassPermissions),
            "plan" => Ok(PermissionMode::Plan),
            other => Err(format!("unknown permission mode: {other}")),
        }
    }
}

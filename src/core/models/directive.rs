use std::path::PathBuf;

use regex::Regex;

use crate::core::errors::{HostwardError, Result};

/// Anchored pattern recognizing every occurrence of a directive key,
/// commented out or active.
///
/// The key must start the line, after optional whitespace and at most one
/// `#` placed directly against it, and be followed by whitespace, `=` or end
/// of line. `Port` never matches `PortForwarding`, and prose comments such
/// as `# Port forwarding is off` are left alone.
#[derive(Debug, Clone)]
pub struct MatchPattern {
    regex: Regex,
}

/// How a line matched a [`MatchPattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMatch {
    /// The directive is commented out.
    Commented,
    /// The directive is active; carries the value text after the key.
    Active(String),
}

impl MatchPattern {
    /// Build the pattern for `key`. The key is matched literally.
    pub fn for_key(key: &str) -> Result<Self> {
        if key.trim().is_empty() || key.contains('\n') {
            return Err(HostwardError::InvalidPlan {
                detail: format!("directive key must be a non-empty single line, got {key:?}"),
            });
        }
        let pattern = format!(
            r"^\s*(?P<comment>#)?{}(?P<rest>(?:\s|=).*)?$",
            regex::escape(key)
        );
        let regex = Regex::new(&pattern).map_err(|e| HostwardError::InvalidPlan {
            detail: format!("cannot build match pattern for '{key}': {e}"),
        })?;
        Ok(Self { regex })
    }

    /// Classify a single line, or `None` if it is not about this key.
    pub fn classify(&self, line: &str) -> Option<LineMatch> {
        let caps = self.regex.captures(line)?;
        if caps.name("comment").is_some() {
            return Some(LineMatch::Commented);
        }
        let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or("");
        let value = rest.trim_start().trim_start_matches('=').trim();
        Some(LineMatch::Active(value.to_string()))
    }
}

/// One desired setting in a text configuration file.
#[derive(Debug, Clone)]
pub struct ConfigDirective {
    pub file_path: PathBuf,
    pub key: String,
    pub desired_value: String,
    pub separator: String,
    pub match_pattern: MatchPattern,
}

impl ConfigDirective {
    /// Directive in `key value` form, the sshd_config style.
    pub fn new(
        file_path: impl Into<PathBuf>,
        key: impl Into<String>,
        desired_value: impl Into<String>,
    ) -> Result<Self> {
        Self::with_separator(file_path, key, desired_value, " ")
    }

    /// Directive with a custom separator, e.g. ` = ` for Perl-style configs.
    pub fn with_separator(
        file_path: impl Into<PathBuf>,
        key: impl Into<String>,
        desired_value: impl Into<String>,
        separator: impl Into<String>,
    ) -> Result<Self> {
        let key = key.into();
        let desired_value = desired_value.into();
        if desired_value.contains('\n') {
            return Err(HostwardError::InvalidPlan {
                detail: format!("value for '{key}' must be a single line"),
            });
        }
        let match_pattern = MatchPattern::for_key(&key)?;
        Ok(Self {
            file_path: file_path.into(),
            key,
            desired_value,
            separator: separator.into(),
            match_pattern,
        })
    }

    /// The canonical active line this directive converges to.
    pub fn canonical_line(&self) -> String {
        format!("{}{}{}", self.key, self.separator, self.desired_value)
    }

    /// Normalized value of the canonical line, comparable with
    /// [`LineMatch::Active`] values.
    pub fn normalized_value(&self) -> String {
        match self.match_pattern.classify(&self.canonical_line()) {
            Some(LineMatch::Active(v)) => v,
            _ => self.desired_value.trim().to_string(),
        }
    }
}

/// Result of applying a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Changed,
    Unchanged,
}

impl std::fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchOutcome::Changed => write!(f, "changed"),
            PatchOutcome::Unchanged => write!(f, "unchanged"),
        }
    }
}

use crate::core::errors::PatchError;
use crate::core::models::directive::{ConfigDirective, LineMatch, PatchOutcome};
use crate::core::traits::config_files::ConfigFiles;

/// Makes a text configuration file reflect a desired directive without
/// disturbing unrelated lines.
///
/// The target line is the first active occurrence of the key, or the first
/// commented one when none is active. Later commented occurrences are left
/// alone; later active duplicates carrying the same value are dropped so the
/// file ends with exactly one active line. Active duplicates with different
/// values are an error.
pub struct ConfigPatcher<F: ConfigFiles> {
    pub files: F,
}

impl<F: ConfigFiles> ConfigPatcher<F> {
    pub fn new(files: F) -> Self {
        Self { files }
    }

    /// Apply `directive` to its file in place.
    pub fn apply_directive(&self, directive: &ConfigDirective) -> Result<PatchOutcome, PatchError> {
        let content = self.read_target(directive)?;
        match patch_text(&content, directive)? {
            Some(patched) => {
                self.files.write_preserving(&directive.file_path, &patched)?;
                log::info!(
                    "{}: set '{}'",
                    directive.file_path.display(),
                    directive.canonical_line()
                );
                Ok(PatchOutcome::Changed)
            }
            None => {
                log::debug!(
                    "{}: '{}' already in place",
                    directive.file_path.display(),
                    directive.key
                );
                Ok(PatchOutcome::Unchanged)
            }
        }
    }

    /// Report what [`apply_directive`](Self::apply_directive) would do, without writing.
    pub fn preview(&self, directive: &ConfigDirective) -> Result<PatchOutcome, PatchError> {
        let content = self.read_target(directive)?;
        Ok(match patch_text(&content, directive)? {
            Some(_) => PatchOutcome::Changed,
            None => PatchOutcome::Unchanged,
        })
    }

    fn read_target(&self, directive: &ConfigDirective) -> Result<String, PatchError> {
        self.files.read(&directive.file_path).map_err(|e| match e {
            PatchError::NotFound { path, .. } => PatchError::NotFound {
                path,
                key: directive.key.clone(),
            },
            other => other,
        })
    }
}

/// Compute the patched file content, or `None` when it is already correct.
pub fn patch_text(content: &str, directive: &ConfigDirective) -> Result<Option<String>, PatchError> {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();

    let matches: Vec<(usize, LineMatch)> = lines
        .iter()
        .enumerate()
        .filter_map(|(idx, raw)| {
            directive
                .match_pattern
                .classify(strip_eol(raw))
                .map(|m| (idx, m))
        })
        .collect();

    let active: Vec<(usize, &str)> = matches
        .iter()
        .filter_map(|(idx, m)| match m {
            LineMatch::Active(value) => Some((*idx, value.as_str())),
            LineMatch::Commented => None,
        })
        .collect();

    let mut distinct: Vec<&str> = Vec::new();
    for (_, value) in &active {
        if !distinct.contains(value) {
            distinct.push(value);
        }
    }
    if distinct.len() > 1 {
        return Err(PatchError::AmbiguousMatch {
            path: directive.file_path.clone(),
            key: directive.key.clone(),
            count: active.len(),
            values: distinct.join(", "),
        });
    }

    let target = active
        .first()
        .map(|(idx, _)| *idx)
        .or_else(|| matches.first().map(|(idx, _)| *idx));

    let canonical = directive.canonical_line();
    let mut out = String::with_capacity(content.len() + canonical.len() + 1);

    match target {
        Some(target) => {
            for (idx, raw) in lines.iter().enumerate() {
                if idx == target {
                    out.push_str(&canonical);
                    out.push_str(eol_of(raw));
                } else if active.iter().any(|(a, _)| *a == idx) {
                    // Same-valued duplicate of the target line.
                    continue;
                } else {
                    out.push_str(raw);
                }
            }
        }
        None => {
            out.push_str(content);
            if !content.is_empty() && !content.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&canonical);
            out.push('\n');
        }
    }

    if out == content {
        Ok(None)
    } else {
        Ok(Some(out))
    }
}

fn strip_eol(raw: &str) -> &str {
    raw.trim_end_matches(['\n', '\r'])
}

fn eol_of(raw: &str) -> &str {
    &raw[strip_eol(raw).len()..]
}

//! Prompt file loader (§6 "Prompt file format"). Spec.md calls the dataset
//! loader an external collaborator, but its format is simple enough — and
//! necessary enough to exercise the orchestrator end to end — that it is
//! built here rather than stubbed: `line_by_line` over a plain text file.
//!
//! Per §7, a dataset load failure is never fatal to the run: the caller
//! logs a warning and falls back to the orchestrator's default fixed
//! prompt, which is exactly what an empty prompt list does.

use std::path::Path;

use rand::seq::SliceRandom;

use crate::error::{LoadbenchError, Result};

/// The subset of [`crate::config::RunArgs`] that shapes prompt loading.
#[derive(Debug, Clone, Default)]
pub struct DatasetConfig {
    pub skip_lines: usize,
    pub line_prefix: Option<String>,
    pub shuffle: bool,
    /// `dataset-limit` and `max-examples` are two CLI flags with the same
    /// effect (a leftover of the teacher's own duplicate "BatchJob" /
    /// "fasthttp batch" style naming drift, per §9) — whichever is set
    /// wins, `dataset-limit` taking precedence when both are.
    pub limit: Option<usize>,
    pub max_examples: Option<usize>,
}

impl DatasetConfig {
    fn effective_limit(&self) -> Option<usize> {
        self.limit.or(self.max_examples)
    }
}

/// Split `content` into prompts: blank lines and lines starting with `#`
/// are skipped; `skip_lines` skips that many collected (non-blank,
/// non-comment) lines before the rest are kept; `line_prefix`, if set, is
/// prepended to every kept prompt unless it already starts with it.
fn parse_lines(content: &str, skip_lines: usize, line_prefix: Option<&str>) -> Vec<String> {
    let mut kept: Vec<&str> = content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    if skip_lines > 0 {
        kept = kept.into_iter().skip(skip_lines).collect();
    }

    kept.into_iter()
        .map(|line| match line_prefix {
            Some(prefix) if !line.starts_with(prefix) => format!("{prefix}{line}"),
            _ => line.to_string(),
        })
        .collect()
}

/// Load prompts from a `line_by_line` dataset file. An unreadable path
/// surfaces as a [`LoadbenchError::Dataset`]; the caller (`loadbench::run`)
/// is responsible for treating that as non-fatal per §7.
pub fn load_line_by_line(path: &Path, config: &DatasetConfig) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| LoadbenchError::Dataset(format!("failed to read {}: {e}", path.display())))?;

    let mut prompts = parse_lines(&content, config.skip_lines, config.line_prefix.as_deref());

    if config.shuffle {
        prompts.shuffle(&mut rand::rng());
    }

    if let Some(limit) = config.effective_limit() {
        prompts.truncate(limit);
    }

    Ok(prompts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_blank_lines_and_comments_are_skipped() {
        let prompts = parse_lines("foo\n# bar\n\nbaz\n", 0, None);
        assert_eq!(prompts, vec!["foo".to_string(), "baz".to_string()]);
    }

    #[test]
    fn test_skip_lines_counts_only_kept_lines() {
        let prompts = parse_lines("a\n# comment\nb\n\nc\nd\n", 2, None);
        assert_eq!(prompts, vec!["c".to_string(), "d".to_string()]);
    }

    #[test]
    fn test_line_prefix_is_prepended_unless_already_present() {
        let prompts = parse_lines("translate: hi\nbye\n", 0, Some("translate: "));
        assert_eq!(
            prompts,
            vec!["translate: hi".to_string(), "translate: bye".to_string()]
        );
    }

    #[test]
    fn test_load_line_by_line_reads_a_real_file() {
        let file = write_temp("foo\n# bar\n\nbaz\n");
        let prompts = load_line_by_line(file.path(), &DatasetConfig::default()).unwrap();
        assert_eq!(prompts, vec!["foo".to_string(), "baz".to_string()]);
    }

    #[test]
    fn test_missing_file_surfaces_as_dataset_error() {
        let err = load_line_by_line(Path::new("/no/such/file.txt"), &DatasetConfig::default())
            .unwrap_err();
        assert!(matches!(err, LoadbenchError::Dataset(_)));
    }

    #[test]
    fn test_dataset_limit_truncates_after_shuffle() {
        let file = write_temp("a\nb\nc\nd\ne\n");
        let config = DatasetConfig {
            limit: Some(2),
            ..Default::default()
        };
        let prompts = load_line_by_line(file.path(), &config).unwrap();
        assert_eq!(prompts.len(), 2);
    }

    #[test]
    fn test_max_examples_is_used_when_limit_is_unset() {
        let file = write_temp("a\nb\nc\n");
        let config = DatasetConfig {
            max_examples: Some(1),
            ..Default::default()
        };
        let prompts = load_line_by_line(file.path(), &config).unwrap();
        assert_eq!(prompts.len(), 1);
    }
}

// src/problems/mod.rs — Problem registry
//
// Built-in problems are compiled into the binary from `problems/<id>/`.
// A custom set can be loaded from a directory with the same layout.

use std::path::Path;

use crate::core::types::{Problem, TestHarness};
use crate::infra::errors::BenchError;

macro_rules! builtin {
    ($id:literal) => {
        (
            $id,
            include_str!(concat!("../../problems/", $id, "/prompt.md")),
            include_str!(concat!("../../problems/", $id, "/test.zig")),
        )
    };
}

/// (id, prompt, harness), ordered by id.
const BUILTIN: &[(&str, &str, &str)] = &[
    builtin!("binary_search"),
    builtin!("fizzbuzz"),
    builtin!("gcd"),
    builtin!("palindrome"),
    builtin!("reverse_words"),
];

const PROMPT_FILE: &str = "prompt.md";
const HARNESS_STEM: &str = "test";

/// Ordered, read-only set of problems.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    problems: Vec<Problem>,
}

impl Registry {
    pub fn builtin() -> Self {
        let problems = BUILTIN
            .iter()
            .map(|(id, prompt, harness)| Problem {
                id: id.to_string(),
                name: title_from_prompt(prompt, id),
                prompt: prompt.to_string(),
                harness: TestHarness {
                    file_name: format!("{HARNESS_STEM}.zig"),
                    source: harness.to_string(),
                },
            })
            .collect();
        Self { problems }
    }

    pub fn from_problems(mut problems: Vec<Problem>) -> Self {
        problems.sort_by(|a, b| a.id.cmp(&b.id));
        Self { problems }
    }

    /// Load every `<id>/` sub-directory of `dir` that holds a `prompt.md`
    /// and a `test.*` harness.
    pub fn load_dir(dir: &Path) -> Result<Self, BenchError> {
        let mut problems = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();

            let prompt_path = path.join(PROMPT_FILE);
            if !prompt_path.is_file() {
                tracing::debug!(dir = %path.display(), "no prompt.md, skipping");
                continue;
            }
            let prompt = std::fs::read_to_string(&prompt_path)?;

            let harness = find_harness(&path)?.ok_or_else(|| {
                BenchError::Config(format!(
                    "problem '{id}' has no {HARNESS_STEM}.* harness in {}",
                    path.display()
                ))
            })?;

            problems.push(Problem {
                name: title_from_prompt(&prompt, &id),
                id,
                prompt,
                harness,
            });
        }

        if problems.is_empty() {
            return Err(BenchError::Config(format!(
                "no problems found in {}",
                dir.display()
            )));
        }
        tracing::debug!(count = problems.len(), dir = %dir.display(), "loaded problems");
        Ok(Self::from_problems(problems))
    }

    pub fn all(&self) -> &[Problem] {
        &self.problems
    }

    pub fn get(&self, id: &str) -> Option<&Problem> {
        self.problems.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// Problems with the given ids in registry order; empty `ids` selects all.
    pub fn select(&self, ids: &[String]) -> Result<Vec<Problem>, BenchError> {
        if ids.is_empty() {
            return Ok(self.problems.clone());
        }
        if let Some(unknown) = ids.iter().find(|id| self.get(id).is_none()) {
            return Err(BenchError::UnknownProblem {
                id: unknown.clone(),
            });
        }
        Ok(self
            .problems
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

fn find_harness(dir: &Path) -> Result<Option<TestHarness>, BenchError> {
    let mut candidates: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.file_stem().is_some_and(|s| s == HARNESS_STEM))
        .collect();
    candidates.sort();

    let Some(path) = candidates.into_iter().next() else {
        return Ok(None);
    };
    let source = std::fs::read_to_string(&path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{HARNESS_STEM}.zig"));
    Ok(Some(TestHarness { file_name, source }))
}

/// First `# ` heading, or the id when there is none.
fn title_from_prompt(prompt: &str, id: &str) -> String {
    prompt
        .lines()
        .find_map(|l| l.trim().strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_builtin_ordered_and_named() {
        let registry = Registry::builtin();
        assert_eq!(registry.len(), 5);
        let ids: Vec<_> = registry.all().iter().map(|p| p.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);

        let gcd = registry.get("gcd").unwrap();
        assert_eq!(gcd.name, "Greatest Common Divisor");
        assert_eq!(gcd.harness.file_name, "test.zig");
        assert!(gcd.harness.source.contains("@import(\"solution.zig\")"));
    }

    #[test]
    fn test_select_subset_keeps_registry_order() {
        let registry = Registry::builtin();
        let picked = registry
            .select(&["palindrome".to_string(), "fizzbuzz".to_string()])
            .unwrap();
        let ids: Vec<_> = picked.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["fizzbuzz", "palindrome"]);
    }

    #[test]
    fn test_select_empty_is_all() {
        let registry = Registry::builtin();
        assert_eq!(registry.select(&[]).unwrap().len(), registry.len());
    }

    #[test]
    fn test_select_unknown_id() {
        let err = Registry::builtin()
            .select(&["nope".to_string()])
            .unwrap_err();
        assert!(matches!(err, BenchError::UnknownProblem { id } if id == "nope"));
    }

    #[test]
    fn test_title_fallback() {
        assert_eq!(title_from_prompt("no heading here", "x"), "x");
        assert_eq!(title_from_prompt("intro\n# Real Title \nbody", "x"), "Real Title");
        assert_eq!(title_from_prompt("## Sub only", "x"), "x");
    }

    #[test]
    fn test_load_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let b = tmp.path().join("b_sum");
        fs::create_dir(&b).unwrap();
        fs::write(b.join("prompt.md"), "# Sum\nAdd numbers.").unwrap();
        fs::write(b.join("test.rs"), "#[test] fn t() {}").unwrap();

        let a = tmp.path().join("a_max");
        fs::create_dir(&a).unwrap();
        fs::write(a.join("prompt.md"), "Find the max.").unwrap();
        fs::write(a.join("test.zig"), "test {}").unwrap();

        // Not a problem directory
        fs::create_dir(tmp.path().join("notes")).unwrap();
        fs::write(tmp.path().join("README.md"), "ignored").unwrap();

        let registry = Registry::load_dir(tmp.path()).unwrap();
        let ids: Vec<_> = registry.all().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a_max", "b_sum"]);
        assert_eq!(registry.all()[0].name, "a_max");
        assert_eq!(registry.all()[1].name, "Sum");
        assert_eq!(registry.all()[1].harness.file_name, "test.rs");
    }

    #[test]
    fn test_load_dir_missing_harness() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("broken");
        fs::create_dir(&p).unwrap();
        fs::write(p.join("prompt.md"), "# Broken").unwrap();
        assert!(matches!(
            Registry::load_dir(tmp.path()),
            Err(BenchError::Config(_))
        ));
    }

    #[test]
    fn test_load_dir_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Registry::load_dir(tmp.path()).is_err());
    }
}

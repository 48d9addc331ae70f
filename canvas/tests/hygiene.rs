//! Hygiene: source-tree scans for patterns the engine must not ship.
//!
//! Each pattern has a budget (zero for all of them today). The engine runs
//! inside a browser tab where a panic tears down the whole editor, so
//! production code propagates errors instead. Test files (`*_test.rs`) are
//! exempt.

use std::fs;
use std::path::{Path, PathBuf};

struct Budget {
    pattern: &'static str,
    max: usize,
    hint: &'static str,
}

const BUDGETS: &[Budget] = &[
    // Panics.
    Budget { pattern: ".unwrap()", max: 0, hint: "propagate with `?` or handle the None/Err case" },
    Budget { pattern: ".expect(", max: 0, hint: "propagate with `?` or handle the None/Err case" },
    Budget { pattern: "panic!(", max: 0, hint: "return an error instead" },
    Budget { pattern: "unreachable!(", max: 0, hint: "restructure the match so the arm cannot exist" },
    Budget { pattern: "todo!(", max: 0, hint: "finish the stub" },
    Budget { pattern: "unimplemented!(", max: 0, hint: "finish the stub" },
    // Silent loss.
    Budget { pattern: "let _ =", max: 0, hint: "inspect or log the discarded value" },
    Budget { pattern: ".ok()", max: 0, hint: "inspect or log the discarded error" },
    // Output goes through tracing.
    Budget { pattern: "println!(", max: 0, hint: "use tracing" },
    Budget { pattern: "eprintln!(", max: 0, hint: "use tracing" },
    Budget { pattern: "dbg!(", max: 0, hint: "remove debugging output" },
    // Structure.
    Budget { pattern: "#[allow(dead_code)]", max: 0, hint: "delete the dead code" },
];

/// Modules without a sibling test file.
const UNTESTED_OK: &[&str] = &["lib.rs", "consts.rs", "web.rs"];

fn production_files() -> Vec<(PathBuf, String)> {
    let mut out = Vec::new();
    walk(Path::new("src"), &mut out);
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

fn walk(dir: &Path, out: &mut Vec<(PathBuf, String)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk(&path, out);
            continue;
        }
        let is_rs = path.extension().is_some_and(|e| e == "rs");
        let is_test = path.to_string_lossy().ends_with("_test.rs");
        if is_rs && !is_test {
            if let Ok(content) = fs::read_to_string(&path) {
                out.push((path, content));
            }
        }
    }
}

#[test]
fn pattern_budgets() {
    let files = production_files();
    assert!(!files.is_empty(), "no sources found; run from the canvas crate root");

    let mut failures = Vec::new();
    for budget in BUDGETS {
        let hits: Vec<String> = files
            .iter()
            .flat_map(|(path, content)| {
                content
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| line.contains(budget.pattern))
                    .map(move |(n, _)| format!("  {}:{}", path.display(), n + 1))
            })
            .collect();
        if hits.len() > budget.max {
            failures.push(format!(
                "`{}`: found {}, max {} ({})\n{}",
                budget.pattern,
                hits.len(),
                budget.max,
                budget.hint,
                hits.join("\n")
            ));
        }
    }
    assert!(failures.is_empty(), "hygiene budgets exceeded:\n{}", failures.join("\n"));
}

#[test]
fn every_module_has_sibling_tests() {
    let mut missing = Vec::new();
    for (path, content) in production_files() {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        if UNTESTED_OK.contains(&name.as_str()) {
            continue;
        }
        let test_name = name.replace(".rs", "_test.rs");
        let attached = content.contains(&format!("#[path = \"{test_name}\"]"));
        if !path.with_file_name(&test_name).exists() || !attached {
            missing.push(path.display().to_string());
        }
    }
    assert!(missing.is_empty(), "modules without an attached *_test.rs:\n  {}", missing.join("\n  "));
}

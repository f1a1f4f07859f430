use indicatif::ProgressBar;
use serde_json::json;
use std::io::IsTerminal;
use std::sync::Arc;

use crate::authorship::resolver::{AttributionResolver, ResolvedLine};
use crate::commands::absolute_file_arg;
use crate::config::Config;
use crate::error::AttributionError;
use crate::git::repository::Repository;
use crate::stats::summary::FileSummary;

pub fn handle_stats(
    repo: &Repository,
    config: &Config,
    files: &[String],
    json: bool,
) -> Result<(), AttributionError> {
    let paths = files
        .iter()
        .map(|f| absolute_file_arg(f))
        .collect::<Result<Vec<_>, _>>()?;

    let bar = if paths.len() > 1 && std::io::stderr().is_terminal() {
        ProgressBar::new(paths.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    bar.set_message("Resolving files");

    let resolver = Arc::new(AttributionResolver::new(repo, config));
    let tick = bar.clone();
    let results = smol::block_on(resolver.resolve_files_with(paths, move |_| tick.inc(1)));
    bar.finish_and_clear();

    let mut summaries = Vec::new();
    let mut skipped = Vec::new();
    let mut all_lines: Vec<ResolvedLine> = Vec::new();
    // join_all keeps input order, so results line up with `files`
    for (file, (_, lines)) in files.iter().zip(results) {
        match lines {
            Some(lines) => {
                summaries.push(FileSummary::from_lines(file, &lines));
                all_lines.extend(lines);
            }
            None => skipped.push(file.clone()),
        }
    }
    let total = FileSummary::from_lines("(total)", &all_lines);

    if json {
        let output = json!({
            "files": summaries,
            "total": total,
            "skipped": skipped,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", format_summaries(&summaries, &total));
        for file in &skipped {
            eprintln!("Skipped {}: no blame available", file);
        }
    }
    Ok(())
}

pub fn format_summaries(summaries: &[FileSummary], total: &FileSummary) -> String {
    let path_width = summaries
        .iter()
        .chain(std::iter::once(total))
        .map(|s| s.path.len())
        .max()
        .unwrap_or(0)
        .max("file".len());

    let mut out = format!(
        "{:<pw$} {:>7} {:>7} {:>7} {:>7}  {}\n",
        "file",
        "lines",
        "ai",
        "human",
        "ai %",
        "top model",
        pw = path_width
    );
    for summary in summaries.iter().chain(std::iter::once(total)) {
        out.push_str(&format!(
            "{:<pw$} {:>7} {:>7} {:>7} {:>6.1}%  {}\n",
            summary.path,
            summary.total_lines,
            summary.ai_lines,
            summary.human_lines,
            summary.ai_percentage,
            summary.top_model.as_deref().unwrap_or("-"),
            pw = path_width
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(path: &str, total: usize, ai: usize, model: Option<&str>) -> FileSummary {
        FileSummary {
            path: path.to_string(),
            total_lines: total,
            ai_lines: ai,
            human_lines: total - ai,
            ai_percentage: if total == 0 {
                0.0
            } else {
                ai as f64 / total as f64 * 100.0
            },
            human_percentage: 0.0,
            top_model: model.map(|m| m.to_string()),
            top_human_author: None,
        }
    }

    #[test]
    fn test_format_summaries() {
        let files = vec![summary("src/a.rs", 4, 2, Some("claude-3-opus"))];
        let total = summary("(total)", 4, 2, Some("claude-3-opus"));
        let out = format_summaries(&files, &total);
        let rows: Vec<&str> = out.lines().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("file    "));
        assert!(rows[1].starts_with("src/a.rs"));
        assert!(rows[1].contains("50.0%"));
        assert!(rows[2].starts_with("(total)"));
        assert!(rows[2].ends_with("claude-3-opus"));
    }
}

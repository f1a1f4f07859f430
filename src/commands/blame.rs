use crate::authorship::blame::BlameOptions;
use crate::authorship::resolver::{AttributionResolver, ResolvedLine};
use crate::commands::absolute_file_arg;
use crate::config::Config;
use crate::error::AttributionError;
use crate::git::repository::Repository;
use crate::utils::short_sha;

pub fn handle_blame(
    repo: &Repository,
    config: &Config,
    file: &str,
    newest_commit: Option<&str>,
    json: bool,
) -> Result<(), AttributionError> {
    let resolver = AttributionResolver::new(repo, config).with_blame_options(BlameOptions {
        newest_commit: newest_commit.map(|c| c.to_string()),
    });
    let lines = resolver.resolve_file(&absolute_file_arg(file)?)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
    } else {
        print!("{}", format_blame(&lines));
    }
    Ok(())
}

fn ai_tag(line: &ResolvedLine) -> String {
    if line.is_ai {
        format!("[{}]", line.model.as_deref().unwrap_or("ai"))
    } else {
        String::new()
    }
}

/// git-blame style listing with an AI tag column
pub fn format_blame(lines: &[ResolvedLine]) -> String {
    let author_width = lines.iter().map(|l| l.author.len()).max().unwrap_or(0);
    let tag_width = lines.iter().map(|l| ai_tag(l).len()).max().unwrap_or(0);
    let number_width = lines
        .last()
        .map(|l| l.line_number.to_string().len())
        .unwrap_or(1);

    let mut out = String::new();
    for line in lines {
        out.push_str(&format!(
            "{} ({:<aw$} {} {:<tw$} {:>nw$}) {}\n",
            short_sha(&line.commit_sha),
            line.author,
            line.timestamp.format("%Y-%m-%d"),
            ai_tag(line),
            line.line_number,
            line.content,
            aw = author_width,
            tw = tag_width,
            nw = number_width,
        ));
    }
    out
}

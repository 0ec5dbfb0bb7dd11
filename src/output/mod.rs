use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::pipeline::OutputBundle;
use crate::prompt::ActionKind;

/// JSON envelope around a bundle, with run metadata.
#[derive(Serialize)]
struct JsonReport<'a> {
    action: &'a str,
    generated_at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    bundle: &'a OutputBundle,
}

/// Save a result bundle to file
pub fn save_to_file(
    bundle: &OutputBundle,
    action: &ActionKind,
    path: &Path,
    format: &OutputFormat,
) -> Result<()> {
    let content = render(bundle, action, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print a result bundle to the console
pub fn print_to_console(
    bundle: &OutputBundle,
    action: &ActionKind,
    format: &OutputFormat,
) -> Result<()> {
    println!("{}", render(bundle, action, format)?);
    Ok(())
}

fn render(bundle: &OutputBundle, action: &ActionKind, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_as_text(bundle, action)),
        OutputFormat::Json => Ok(format_as_json(bundle, action)?),
    }
}

fn format_as_text(bundle: &OutputBundle, action: &ActionKind) -> String {
    let mut out = String::new();

    if !bundle.video_details.is_empty() {
        out.push_str(&bundle.video_details);
        out.push_str("\n\n");
    }

    let artifact = bundle.artifact(action);
    out.push_str(&format!("=== {} ===\n", heading(action)));
    out.push_str(artifact);

    out
}

fn format_as_json(bundle: &OutputBundle, action: &ActionKind) -> Result<String> {
    let report = JsonReport {
        action: action.label(),
        generated_at: chrono::Utc::now(),
        bundle,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn heading(action: &ActionKind) -> &'static str {
    match action {
        ActionKind::Summarize => "Summary",
        ActionKind::Introduce => "Introduction",
        ActionKind::Answer(_) => "Answer",
        ActionKind::Quiz => "Quiz",
    }
}

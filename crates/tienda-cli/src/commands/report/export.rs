//! Report export command
//!
//! Requests an export from the backend. Inline files are written to disk,
//! URL exports are printed.

use anyhow::Result;
use std::path::PathBuf;
use tienda_core::{ExportFormat, ExportState, ReportType, Reports};

use super::helpers::build_filters;
use super::types::ExportRow;
use crate::commands::Context;
use crate::output::{print_info, print_single, print_success};

pub async fn export_report(
    ctx: &Context,
    report_type: ReportType,
    export_format: Option<ExportFormat>,
    start: Option<String>,
    end: Option<String>,
    fields: Vec<String>,
    output: Option<String>,
) -> Result<()> {
    let filters = build_filters(start, end, &fields)?;
    let format = export_format.unwrap_or(ctx.config.default_export_format);
    let reports = Reports::from_config(&ctx.config)?;

    print_info(&format!("Exporting {} report as {}...", report_type, format), ctx.progress_quiet());

    let artifact = match reports.export_report(report_type, &filters, format).await {
        ExportState::Succeeded(artifact) => artifact,
        ExportState::Failed(err) => return Err(err.into()),
        other => anyhow::bail!("Export did not finish (state: {})", other.label()),
    };

    let location = match (artifact.bytes(), artifact.url()) {
        (Some(data), _) => {
            let path = output_path(output.as_deref(), &artifact.file_name);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, data)?;
            print_success(
                &format!("Wrote {} bytes to {}", data.len(), path.display()),
                ctx.progress_quiet(),
            );
            path.display().to_string()
        }
        (None, Some(url)) => {
            if output.is_some() {
                print_info("Backend returned a download link; --output is ignored", ctx.progress_quiet());
            }
            url.to_string()
        }
        (None, None) => anyhow::bail!("Export returned no file"),
    };

    let row = ExportRow {
        file_name: artifact.file_name.clone(),
        content_type: artifact.content_type.clone(),
        location,
    };
    print_single(&row, ctx.format)?;
    Ok(())
}

/// Explicit output path (with `~` expanded) or the suggested file name
fn output_path(output: Option<&str>, file_name: &str) -> PathBuf {
    match output {
        Some(path) => PathBuf::from(shellexpand::tilde(path).to_string()),
        None => PathBuf::from(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_defaults_to_file_name() {
        assert_eq!(output_path(None, "sales-report.csv"), PathBuf::from("sales-report.csv"));
    }

    #[test]
    fn test_output_path_explicit() {
        assert_eq!(
            output_path(Some("/tmp/ventas.csv"), "sales-report.csv"),
            PathBuf::from("/tmp/ventas.csv")
        );
    }
}

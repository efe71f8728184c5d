//! Report commands
//!
//! Commands for viewing and exporting reports: show, export.

mod export;
mod helpers;
mod show;
mod types;

use anyhow::Result;

use crate::commands::Context;

// Re-export public types
pub use types::ReportAction;

pub async fn execute(ctx: &Context, action: ReportAction) -> Result<()> {
    match action {
        ReportAction::Show {
            report_type,
            start,
            end,
            filters,
        } => show::show_report(ctx, report_type, start, end, filters).await,
        ReportAction::Export {
            report_type,
            export_format,
            start,
            end,
            filters,
            output,
        } => {
            export::export_report(ctx, report_type, export_format, start, end, filters, output)
                .await
        }
    }
}

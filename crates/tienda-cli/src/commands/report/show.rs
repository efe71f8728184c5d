//! Report show command

use anyhow::Result;
use tienda_core::{OrdersReport, ProductsReport, Report, ReportType, Reports, SalesReport};

use super::helpers::build_filters;
use super::types::{CategoryRow, CountRow, DailySalesRow, MetricRow, StockRow, TopSellerRow};
use crate::commands::Context;
use crate::output::{format_amount, print_info, print_json, print_output, print_section, OutputFormat};

pub async fn show_report(
    ctx: &Context,
    report_type: ReportType,
    start: Option<String>,
    end: Option<String>,
    fields: Vec<String>,
) -> Result<()> {
    let filters = build_filters(start, end, &fields)?;
    let reports = Reports::from_config(&ctx.config)?;

    print_info(&format!("Fetching {} report...", report_type), ctx.progress_quiet());
    let report = reports.get_report(report_type, &filters).await.into_result()?;

    if ctx.format == OutputFormat::Json {
        return print_json(report.as_ref());
    }

    match report.as_ref() {
        Report::Sales(sales) => render_sales(sales),
        Report::Products(products) => render_products(products),
        Report::Orders(orders) => render_orders(orders),
    }
}

fn render_sales(report: &SalesReport) -> Result<()> {
    let currency = if report.currency.is_empty() {
        String::new()
    } else {
        format!(" {}", report.currency)
    };
    let metrics = vec![
        MetricRow::new("Total revenue", format!("{}{}", format_amount(report.total_revenue), currency)),
        MetricRow::new("Total orders", report.total_orders),
        MetricRow::new("Average order", format!("{}{}", format_amount(report.average_order_value), currency)),
    ];
    print_output(&metrics, OutputFormat::Table)?;

    let daily: Vec<DailySalesRow> = report
        .daily
        .iter()
        .map(|p| DailySalesRow {
            date: p.date.clone(),
            revenue: format_amount(p.revenue),
            orders: p.orders,
        })
        .collect();
    print_section("Daily", &daily);

    let categories: Vec<CategoryRow> = report
        .by_category
        .iter()
        .map(|c| CategoryRow {
            category: c.category.clone(),
            revenue: format_amount(c.revenue),
            units: c.units,
        })
        .collect();
    print_section("By category", &categories);
    Ok(())
}

fn render_products(report: &ProductsReport) -> Result<()> {
    let metrics = vec![
        MetricRow::new("Products", report.total_products),
        MetricRow::new("Active", report.active_products),
        MetricRow::new("Out of stock", report.out_of_stock),
    ];
    print_output(&metrics, OutputFormat::Table)?;

    let sellers: Vec<TopSellerRow> = report
        .top_sellers
        .iter()
        .map(|p| TopSellerRow {
            name: p.name.clone(),
            sku: p.sku.clone().unwrap_or_else(|| "-".to_string()),
            units_sold: p.units_sold,
            revenue: format_amount(p.revenue),
        })
        .collect();
    print_section("Top sellers", &sellers);

    let low: Vec<StockRow> = report
        .low_stock
        .iter()
        .map(|s| StockRow {
            name: s.name.clone(),
            stock: s.stock,
        })
        .collect();
    print_section("Low stock", &low);
    Ok(())
}

fn render_orders(report: &OrdersReport) -> Result<()> {
    let fulfillment = report
        .average_fulfillment_hours
        .map(|h| format!("{:.1}h", h))
        .unwrap_or_else(|| "-".to_string());
    let metrics = vec![
        MetricRow::new("Orders", report.total_orders),
        MetricRow::new("Pending", report.pending),
        MetricRow::new("Completed", report.completed),
        MetricRow::new("Cancelled", report.cancelled),
        MetricRow::new("Avg fulfillment", fulfillment),
    ];
    print_output(&metrics, OutputFormat::Table)?;

    print_section("By status", &count_rows(&report.by_status));
    print_section("By province", &count_rows(&report.by_province));
    Ok(())
}

fn count_rows(counts: &std::collections::BTreeMap<String, u64>) -> Vec<CountRow> {
    counts
        .iter()
        .map(|(group, orders)| CountRow {
            group: group.clone(),
            orders: *orders,
        })
        .collect()
}

//! Cart commands
//!
//! Price a cart snapshot stored as a JSON array of cart items.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use tienda_core::{cart_subtotal, CartItem};

use super::Context;
use crate::output::{format_amount, print_info, print_output};

#[derive(Subcommand)]
pub enum CartAction {
    /// Show line totals and the subtotal of a cart file
    Total {
        /// Cart JSON file
        #[arg(short, long)]
        file: String,
    },
}

/// Cart line for table display
#[derive(Debug, Serialize, Tabled)]
pub struct CartLineRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Brand")]
    pub brand: String,
    #[tabled(rename = "Qty")]
    pub quantity: u32,
    #[tabled(rename = "Price")]
    pub price: String,
    #[tabled(rename = "Total")]
    pub total: String,
}

pub async fn execute(ctx: &Context, action: CartAction) -> Result<()> {
    match action {
        CartAction::Total { file } => cart_total(ctx, &file),
    }
}

fn load_cart(file: &str) -> Result<Vec<CartItem>> {
    let path = shellexpand::tilde(file).to_string();
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
    let items: Vec<CartItem> = serde_json::from_str(&raw)?;
    for item in &items {
        item.validate()?;
    }
    Ok(items)
}

fn cart_total(ctx: &Context, file: &str) -> Result<()> {
    let items = load_cart(file)?;

    let rows: Vec<CartLineRow> = items
        .iter()
        .map(|item| CartLineRow {
            id: item.id.clone(),
            name: item.name.clone(),
            brand: item.brand.clone().unwrap_or_else(|| "-".to_string()),
            quantity: item.quantity,
            price: format_amount(item.price),
            total: format_amount(item.line_total()),
        })
        .collect();
    print_output(&rows, ctx.format)?;

    print_info(
        &format!(
            "{} item(s), subtotal {}",
            items.len(),
            format_amount(cart_subtotal(&items))
        ),
        ctx.progress_quiet(),
    );
    Ok(())
}

//! Location commands
//!
//! Browse and check a Costa Rica province/canton/district catalog file.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use tienda_core::{LocationCatalog, LocationSelection};

use super::Context;
use crate::output::{print_error, print_output, print_single, print_success};

#[derive(Subcommand)]
pub enum LocationAction {
    /// List provinces, the cantons of a province, or the districts of a canton
    List {
        /// Catalog JSON file
        #[arg(short, long)]
        file: String,

        /// Province name
        #[arg(short, long)]
        province: Option<String>,

        /// Canton name (requires --province)
        #[arg(short, long, requires = "province")]
        canton: Option<String>,
    },

    /// Check that ids are unique at every level
    Check {
        /// Catalog JSON file
        #[arg(short, long)]
        file: String,
    },

    /// Resolve a province/canton/district selection against the catalog
    Resolve {
        /// Catalog JSON file
        #[arg(short, long)]
        file: String,

        #[arg(long)]
        province: String,

        #[arg(long)]
        canton: String,

        #[arg(long)]
        district: String,
    },
}

/// Location row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct LocationRow {
    #[tabled(rename = "ID")]
    pub id: u32,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Children")]
    pub children: usize,
}

#[derive(Debug, Serialize, Tabled)]
pub struct ResolvedRow {
    #[tabled(rename = "Province")]
    pub province: String,
    #[tabled(rename = "Canton")]
    pub canton: String,
    #[tabled(rename = "District")]
    pub district: String,
    /// Province, canton and district ids joined with dashes
    #[tabled(rename = "Code")]
    pub code: String,
}

#[derive(Debug, Serialize, Tabled)]
pub struct ViolationRow {
    #[tabled(rename = "Scope")]
    pub scope: String,
    #[tabled(rename = "Duplicate ID")]
    pub duplicate_id: u32,
}

pub async fn execute(ctx: &Context, action: LocationAction) -> Result<()> {
    match action {
        LocationAction::List {
            file,
            province,
            canton,
        } => list_locations(ctx, &file, province, canton),
        LocationAction::Check { file } => check_catalog(ctx, &file),
        LocationAction::Resolve {
            file,
            province,
            canton,
            district,
        } => resolve_location(ctx, &file, LocationSelection::new(province, canton, district)),
    }
}

fn load_catalog(file: &str) -> Result<LocationCatalog> {
    let path = shellexpand::tilde(file).to_string();
    Ok(LocationCatalog::load(path)?)
}

fn list_locations(
    ctx: &Context,
    file: &str,
    province: Option<String>,
    canton: Option<String>,
) -> Result<()> {
    let catalog = load_catalog(file)?;
    let rows = list_rows(&catalog, province.as_deref(), canton.as_deref())?;
    print_output(&rows, ctx.format)
}

/// Rows for one level of the hierarchy
fn list_rows(
    catalog: &LocationCatalog,
    province: Option<&str>,
    canton: Option<&str>,
) -> Result<Vec<LocationRow>> {
    let Some(province_name) = province else {
        return Ok(catalog
            .provinces()
            .iter()
            .map(|p| LocationRow {
                id: p.id,
                name: p.name.clone(),
                children: p.cantons.len(),
            })
            .collect());
    };

    let province = catalog
        .province(province_name)
        .ok_or_else(|| anyhow::anyhow!("Province not found: {}", province_name))?;

    let Some(canton_name) = canton else {
        return Ok(province
            .cantons
            .iter()
            .map(|c| LocationRow {
                id: c.id,
                name: c.name.clone(),
                children: c.districts.len(),
            })
            .collect());
    };

    let canton = province
        .canton(canton_name)
        .ok_or_else(|| anyhow::anyhow!("Canton not found in {}: {}", province.name, canton_name))?;

    Ok(canton
        .districts
        .iter()
        .map(|d| LocationRow {
            id: d.id,
            name: d.name.clone(),
            children: 0,
        })
        .collect())
}

fn check_catalog(ctx: &Context, file: &str) -> Result<()> {
    let catalog = load_catalog(file)?;
    let violations = catalog.violations();

    if violations.is_empty() {
        print_success(
            &format!("Catalog OK: {} provinces, ids unique at every level", catalog.provinces().len()),
            ctx.progress_quiet(),
        );
        return Ok(());
    }

    let rows: Vec<ViolationRow> = violations
        .iter()
        .map(|v| ViolationRow {
            scope: v.scope.clone(),
            duplicate_id: v.duplicate_id,
        })
        .collect();
    print_output(&rows, ctx.format)?;
    print_error(&format!("{} duplicate id(s) found", violations.len()));
    anyhow::bail!("Location catalog failed the hierarchy check")
}

fn resolve_location(ctx: &Context, file: &str, selection: LocationSelection) -> Result<()> {
    let catalog = load_catalog(file)?;
    let resolved = catalog.resolve(&selection)?;

    let row = ResolvedRow {
        province: resolved.province.name.clone(),
        canton: resolved.canton.name.clone(),
        district: resolved.district.name.clone(),
        code: format!(
            "{}-{}-{}",
            resolved.province.id, resolved.canton.id, resolved.district.id
        ),
    };
    print_single(&row, ctx.format)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        {"id": 4, "nombre": "Heredia", "cantones": [
            {"id": 401, "nombre": "Heredia", "distritos": [
                {"id": 40101, "nombre": "Heredia"},
                {"id": 40102, "nombre": "Mercedes"}
            ]},
            {"id": 402, "nombre": "Barva", "distritos": []}
        ]}
    ]"#;

    #[test]
    fn test_list_rows_levels() {
        let catalog = LocationCatalog::from_json(CATALOG).unwrap();

        let provinces = list_rows(&catalog, None, None).unwrap();
        assert_eq!(provinces.len(), 1);
        assert_eq!(provinces[0].children, 2);

        let cantons = list_rows(&catalog, Some("heredia"), None).unwrap();
        assert_eq!(cantons.len(), 2);
        assert_eq!(cantons[1].name, "Barva");

        let districts = list_rows(&catalog, Some("Heredia"), Some("Heredia")).unwrap();
        assert_eq!(districts.len(), 2);
        assert_eq!(districts[1].id, 40102);
    }

    #[test]
    fn test_list_rows_unknown_names() {
        let catalog = LocationCatalog::from_json(CATALOG).unwrap();
        assert!(list_rows(&catalog, Some("Limón"), None).is_err());
        assert!(list_rows(&catalog, Some("Heredia"), Some("Escazú")).is_err());
    }
}

//! Costa Rica administrative locations
//!
//! Province → canton → district reference data, consumed as a static JSON
//! lookup table. Field names follow the upstream data set (`nombre`,
//! `cantones`, `distritos`); `name` is accepted as well.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrDistrict {
    pub id: u32,
    #[serde(alias = "nombre")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrCanton {
    pub id: u32,
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(rename = "distritos", alias = "districts", default)]
    pub districts: Vec<CrDistrict>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrProvince {
    pub id: u32,
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(rename = "cantones", alias = "cantons", default)]
    pub cantons: Vec<CrCanton>,
}

impl CrProvince {
    pub fn canton(&self, name: &str) -> Option<&CrCanton> {
        self.cantons.iter().find(|c| names_match(&c.name, name))
    }
}

impl CrCanton {
    pub fn district(&self, name: &str) -> Option<&CrDistrict> {
        self.districts.iter().find(|d| names_match(&d.name, name))
    }
}

/// Case-insensitive, whitespace-trimmed name comparison
fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

// ============================================================================
// Selection
// ============================================================================

/// Province/canton/district picked in a cascading selector
///
/// Changing a parent level clears the levels below it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSelection {
    pub province: String,
    pub canton: String,
    pub district: String,
}

impl LocationSelection {
    pub fn new(
        province: impl Into<String>,
        canton: impl Into<String>,
        district: impl Into<String>,
    ) -> Self {
        Self {
            province: province.into(),
            canton: canton.into(),
            district: district.into(),
        }
    }

    pub fn select_province(&mut self, province: impl Into<String>) {
        self.province = province.into();
        self.canton.clear();
        self.district.clear();
    }

    pub fn select_canton(&mut self, canton: impl Into<String>) {
        self.canton = canton.into();
        self.district.clear();
    }

    pub fn select_district(&mut self, district: impl Into<String>) {
        self.district = district.into();
    }

    /// All three levels filled in
    pub fn is_complete(&self) -> bool {
        !self.province.trim().is_empty()
            && !self.canton.trim().is_empty()
            && !self.district.trim().is_empty()
    }
}

/// A selection mapped onto catalog entries
#[derive(Debug, Clone, Copy)]
pub struct ResolvedLocation<'a> {
    pub province: &'a CrProvince,
    pub canton: &'a CrCanton,
    pub district: &'a CrDistrict,
}

// ============================================================================
// Catalog
// ============================================================================

/// A hierarchy invariant broken by the catalog data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyViolation {
    /// Where the duplicate lives, e.g. `province 1 / canton 101`
    pub scope: String,
    pub duplicate_id: u32,
}

impl std::fmt::Display for HierarchyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "duplicate id {} in {}", self.duplicate_id, self.scope)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<CrProvince>),
    Wrapped {
        #[serde(alias = "provinces")]
        provincias: Vec<CrProvince>,
    },
}

/// Read-only province/canton/district lookup table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocationCatalog {
    provinces: Vec<CrProvince>,
}

impl LocationCatalog {
    pub fn new(provinces: Vec<CrProvince>) -> Self {
        Self { provinces }
    }

    /// Parse a catalog from JSON (bare array or `{"provincias": [...]}`)
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let provinces = match file {
            CatalogFile::List(p) => p,
            CatalogFile::Wrapped { provincias } => provincias,
        };
        Ok(Self { provinces })
    }

    /// Load a catalog from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
        let catalog = Self::from_json(&raw)?;
        log::debug!(
            "[locations] Loaded {} provinces from {}",
            catalog.provinces.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn provinces(&self) -> &[CrProvince] {
        &self.provinces
    }

    pub fn province(&self, name: &str) -> Option<&CrProvince> {
        self.provinces.iter().find(|p| names_match(&p.name, name))
    }

    pub fn province_by_id(&self, id: u32) -> Option<&CrProvince> {
        self.provinces.iter().find(|p| p.id == id)
    }

    /// Every duplicated id: provinces within the catalog, cantons within a
    /// province, districts within a canton
    pub fn violations(&self) -> Vec<HierarchyViolation> {
        let mut violations = Vec::new();

        let mut province_ids = HashSet::new();
        for province in &self.provinces {
            if !province_ids.insert(province.id) {
                violations.push(HierarchyViolation {
                    scope: "catalog".to_string(),
                    duplicate_id: province.id,
                });
            }

            let mut canton_ids = HashSet::new();
            for canton in &province.cantons {
                if !canton_ids.insert(canton.id) {
                    violations.push(HierarchyViolation {
                        scope: format!("province {}", province.id),
                        duplicate_id: canton.id,
                    });
                }

                let mut district_ids = HashSet::new();
                for district in &canton.districts {
                    if !district_ids.insert(district.id) {
                        violations.push(HierarchyViolation {
                            scope: format!("province {} / canton {}", province.id, canton.id),
                            duplicate_id: district.id,
                        });
                    }
                }
            }
        }

        violations
    }

    /// Fail with the first hierarchy violation, if any
    pub fn validate(&self) -> Result<()> {
        match self.violations().first() {
            Some(v) => Err(Error::validation(v.to_string())),
            None => Ok(()),
        }
    }

    /// Map a selection onto catalog entries, naming the first level that
    /// does not match
    pub fn resolve(&self, selection: &LocationSelection) -> Result<ResolvedLocation<'_>> {
        let province = self
            .province(&selection.province)
            .ok_or_else(|| Error::not_found(format!("province '{}'", selection.province)))?;
        let canton = province.canton(&selection.canton).ok_or_else(|| {
            Error::not_found(format!(
                "canton '{}' in {}",
                selection.canton, province.name
            ))
        })?;
        let district = canton.district(&selection.district).ok_or_else(|| {
            Error::not_found(format!(
                "district '{}' in {}",
                selection.district, canton.name
            ))
        })?;

        Ok(ResolvedLocation {
            province,
            canton,
            district,
        })
    }
}

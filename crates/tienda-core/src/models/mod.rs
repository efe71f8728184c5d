//! Data models for the Tienda admin panel

pub mod cart;
pub mod location;
pub mod report;

pub use cart::{cart_subtotal, CartItem};
pub use location::{
    CrCanton, CrDistrict, CrProvince, HierarchyViolation, LocationCatalog, LocationSelection,
    ResolvedLocation,
};
pub use report::{
    ArtifactLocation, CategorySales, ExportArtifact, ExportFormat, OrdersReport, ProductSales,
    ProductsReport, Report, ReportFilters, ReportSelection, ReportType, SalesPoint, SalesReport,
    StockLevel,
};

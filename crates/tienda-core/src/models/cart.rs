//! Cart line items

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Snapshot of a product line in a cart
///
/// The cart feature owns the lifecycle (add, update, remove); this layer
/// only reads the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub image: String,
    pub price: f64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

impl CartItem {
    /// Price times quantity
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }

    /// Check the line can be priced
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::validation("cart item id is empty"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(Error::validation(format!(
                "cart item {} has invalid price {}",
                self.id, self.price
            )));
        }
        if self.quantity == 0 {
            return Err(Error::validation(format!(
                "cart item {} has zero quantity",
                self.id
            )));
        }
        Ok(())
    }
}

/// Sum of line totals
pub fn cart_subtotal(items: &[CartItem]) -> f64 {
    items.iter().map(CartItem::line_total).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, price: f64, quantity: u32) -> CartItem {
        CartItem {
            id: id.to_string(),
            name: "Café molido 500g".to_string(),
            image: "https://cdn.example.com/cafe.jpg".to_string(),
            price,
            quantity,
            brand: None,
            sku: None,
            category_name: None,
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(item("1", 2500.0, 3).line_total(), 7500.0);
    }

    #[test]
    fn test_cart_subtotal() {
        let items = vec![item("1", 1000.0, 2), item("2", 350.5, 1)];
        assert_eq!(cart_subtotal(&items), 2350.5);
        assert_eq!(cart_subtotal(&[]), 0.0);
    }

    #[test]
    fn test_validate_rejects_bad_lines() {
        assert!(item("1", 10.0, 1).validate().is_ok());
        assert!(item("", 10.0, 1).validate().is_err());
        assert!(item("1", -1.0, 1).validate().is_err());
        assert!(item("1", f64::NAN, 1).validate().is_err());
        assert!(item("1", 10.0, 0).validate().is_err());
    }

    #[test]
    fn test_deserialize_camel_case_with_optionals() {
        let json = r#"{
            "id": "sku-9",
            "name": "Gallo pinto mix",
            "image": "/img/gp.png",
            "price": 1200,
            "quantity": 2,
            "categoryName": "Despensa"
        }"#;
        let parsed: CartItem = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.category_name.as_deref(), Some("Despensa"));
        assert!(parsed.brand.is_none());

        let out = serde_json::to_value(&parsed).unwrap();
        assert!(out.get("brand").is_none());
        assert_eq!(out["categoryName"], "Despensa");
    }
}

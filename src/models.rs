//! Upstream records the proxy inspects before caching.
//!
//! Only the fields used for filtering are typed; everything else is carried
//! through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Vendor {
    pub fn is_active_vendor(&self) -> bool {
        self.role
            .as_deref()
            .map(|role| role.eq_ignore_ascii_case("vendor"))
            .unwrap_or(false)
            && is_active(self.status.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Product {
    pub fn is_active(&self) -> bool {
        is_active(self.status.as_ref())
    }
}

/// The backend marks active records with `1`, `"1"`, `true` or `"active"`.
pub fn is_active(status: Option<&Value>) -> bool {
    match status {
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "1" || s.eq_ignore_ascii_case("active"),
        _ => false,
    }
}

pub fn active_vendors(users: Vec<Vendor>) -> Vec<Vendor> {
    users.into_iter().filter(Vendor::is_active_vendor).collect()
}

pub fn active_products(products: Vec<Product>) -> Vec<Product> {
    products.into_iter().filter(Product::is_active).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_forms() {
        assert!(is_active(Some(&json!(1))));
        assert!(is_active(Some(&json!("1"))));
        assert!(is_active(Some(&json!("Active"))));
        assert!(is_active(Some(&json!(true))));
        assert!(!is_active(Some(&json!(0))));
        assert!(!is_active(Some(&json!("inactive"))));
        assert!(!is_active(None));
    }

    #[test]
    fn test_vendor_filter() {
        let users: Vec<Vendor> = serde_json::from_value(json!([
            {"id": 1, "role": "vendor", "status": 1, "shop": "Tea House"},
            {"id": 2, "role": "customer", "status": 1},
            {"id": 3, "role": "Vendor", "status": 0},
            {"id": 4, "status": 1}
        ]))
        .unwrap();

        let vendors = active_vendors(users);
        assert_eq!(vendors.len(), 1);
        assert_eq!(vendors[0].attributes["shop"], "Tea House");
    }

    #[test]
    fn test_product_round_trip_keeps_unknown_fields() {
        let products: Vec<Product> = serde_json::from_value(json!([
            {"id": 10, "status": "active", "price": "4.50"},
            {"id": 11, "status": 0}
        ]))
        .unwrap();

        let active = active_products(products);
        let value = serde_json::to_value(&active).unwrap();
        assert_eq!(value, json!([{"id": 10, "status": "active", "price": "4.50"}]));
    }
}

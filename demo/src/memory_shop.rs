//! In-memory shop backend for the demo.
//!
//! Stands in for the real collaborators (search index, inventory system,
//! loyalty service, image generator) behind the tool surface.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use shopmcp_protocol::McpResult;
use shopmcp_server::ShopBackend;

#[derive(Debug, Clone, Serialize)]
struct Product {
    id: String,
    name: String,
    category: String,
    description: String,
    price: f64,
}

/// Seeded catalog, inventory, and loyalty data.
pub struct MemoryShop {
    products: Vec<Product>,
    inventory: HashMap<String, u32>,
    loyalty_points: HashMap<String, u32>,
}

impl Default for MemoryShop {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryShop {
    /// A small seeded shop.
    pub fn new() -> Self {
        let products = vec![
            Product {
                id: "P1".into(),
                name: "Matte wall paint, white".into(),
                category: "paint".into(),
                description: "Washable matte interior paint, ideal for kitchen walls".into(),
                price: 24.99,
            },
            Product {
                id: "P2".into(),
                name: "Satin wall paint, sage green".into(),
                category: "paint".into(),
                description: "Low-odor satin paint for living rooms and bedrooms".into(),
                price: 27.49,
            },
            Product {
                id: "P3".into(),
                name: "Velvet sofa, three-seat".into(),
                category: "furniture".into(),
                description: "Deep red velvet sofa with oak legs".into(),
                price: 899.00,
            },
            Product {
                id: "P4".into(),
                name: "Arc floor lamp".into(),
                category: "lighting".into(),
                description: "Brushed steel arc lamp with dimmable warm light".into(),
                price: 129.00,
            },
        ];
        let inventory = HashMap::from([
            ("P1".to_string(), 42),
            ("P2".to_string(), 7),
            ("P3".to_string(), 0),
            ("P4".to_string(), 13),
        ]);
        let loyalty_points = HashMap::from([
            ("C1".to_string(), 1200),
            ("C2".to_string(), 450),
            ("C3".to_string(), 80),
        ]);
        Self {
            products,
            inventory,
            loyalty_points,
        }
    }
}

#[async_trait]
impl ShopBackend for MemoryShop {
    async fn product_recommendations(&self, question: &str) -> McpResult<Value> {
        let needle = question.to_lowercase();
        let matches: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| {
                let haystack =
                    format!("{} {} {}", p.name, p.category, p.description).to_lowercase();
                needle
                    .split_whitespace()
                    .any(|word| word.len() > 2 && haystack.contains(word))
            })
            .collect();

        // No keyword hit: recommend the whole catalog rather than nothing.
        if matches.is_empty() {
            return Ok(serde_json::to_value(&self.products)?);
        }
        Ok(serde_json::to_value(matches)?)
    }

    async fn inventory_check(&self, product_id: &str) -> McpResult<Value> {
        let quantity = self.inventory.get(product_id).copied();
        Ok(serde_json::json!({
            "product_id": product_id,
            "known": quantity.is_some(),
            "available": quantity.unwrap_or(0) > 0,
            "quantity": quantity.unwrap_or(0),
        }))
    }

    async fn customer_discount(&self, customer_id: &str) -> McpResult<Value> {
        let points = self.loyalty_points.get(customer_id).copied().unwrap_or(0);
        // One percent per hundred points, capped at 25.
        let discount = (points / 100).min(25);
        Ok(serde_json::json!({
            "customer_id": customer_id,
            "loyalty_points": points,
            "discount_percentage": discount,
        }))
    }

    async fn generate_image(&self, prompt: &str, size: &str) -> McpResult<Value> {
        let slug: String = prompt
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .take(6)
            .collect::<Vec<_>>()
            .join("-");
        Ok(Value::String(format!(
            "https://images.example/shop/{slug}-{size}.png"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recommendations_match_keywords() {
        let shop = MemoryShop::new();
        let result = shop
            .product_recommendations("white paint for a kitchen wall")
            .await
            .unwrap();
        let items = result.as_array().unwrap();
        assert!(!items.is_empty());
        assert!(items.iter().any(|p| p["id"] == "P1"));
        assert!(items.iter().all(|p| p["category"] == "paint"));
    }

    #[tokio::test]
    async fn unmatched_query_returns_full_catalog() {
        let shop = MemoryShop::new();
        let result = shop.product_recommendations("zzz").await.unwrap();
        assert_eq!(result.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn out_of_stock_product_is_unavailable() {
        let shop = MemoryShop::new();
        let result = shop.inventory_check("P3").await.unwrap();
        assert_eq!(result["available"], false);
        assert_eq!(result["quantity"], 0);
        assert_eq!(result["known"], true);
    }

    #[tokio::test]
    async fn discount_is_capped() {
        let shop = MemoryShop::new();
        let result = shop.customer_discount("C1").await.unwrap();
        assert_eq!(result["discount_percentage"], 12);

        let result = shop.customer_discount("unknown").await.unwrap();
        assert_eq!(result["discount_percentage"], 0);
    }

    #[tokio::test]
    async fn image_url_embeds_slug_and_size() {
        let shop = MemoryShop::new();
        let result = shop
            .generate_image("A red velvet sofa!", "512x512")
            .await
            .unwrap();
        assert_eq!(
            result,
            Value::String("https://images.example/shop/a-red-velvet-sofa-512x512.png".into())
        );
    }
}

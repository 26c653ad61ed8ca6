// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Room and product catalog port.

use serde::{Deserialize, Serialize};

/// A bookable room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSpec {
    pub id: String,
    pub name: String,
    pub capacity: u32,
    pub layouts: Vec<String>,
    /// Products that must be on the offer when this room is booked.
    pub required_products: Vec<String>,
    pub base_price: f64,
}

impl RoomSpec {
    pub fn fits(&self, participants: u32) -> bool {
        participants <= self.capacity
    }
}

/// A priced product or catering position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub name: String,
    /// "per person" or "per event".
    pub unit: String,
    pub price: f64,
    pub is_catering: bool,
}

/// Read access to the venue catalog.
pub trait CatalogPort: Send + Sync {
    fn rooms(&self) -> Vec<RoomSpec>;
    fn products(&self) -> Vec<ProductSpec>;

    fn room_by_name(&self, name: &str) -> Option<RoomSpec> {
        let needle = name.trim().to_lowercase();
        self.rooms().into_iter().find(|r| r.name.to_lowercase() == needle)
    }

    fn product_by_name(&self, name: &str) -> Option<ProductSpec> {
        let needle = name.trim().to_lowercase();
        self.products().into_iter().find(|p| p.name.to_lowercase() == needle)
    }

    /// Rooms that hold the given headcount, smallest first.
    fn rooms_fitting(&self, participants: u32) -> Vec<RoomSpec> {
        let mut fitting: Vec<RoomSpec> =
            self.rooms().into_iter().filter(|r| r.fits(participants)).collect();
        fitting.sort_by_key(|r| r.capacity);
        fitting
    }
}

/// Fixed catalog for development and tests.
pub struct StaticCatalog {
    rooms: Vec<RoomSpec>,
    products: Vec<ProductSpec>,
}

impl StaticCatalog {
    pub fn new(rooms: Vec<RoomSpec>, products: Vec<ProductSpec>) -> Self {
        Self { rooms, products }
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        let rooms = vec![
            RoomSpec {
                id: "room-a".to_string(),
                name: "Room A".to_string(),
                capacity: 40,
                layouts: vec!["theatre".to_string(), "banquet".to_string()],
                required_products: vec![],
                base_price: 1200.0,
            },
            RoomSpec {
                id: "room-b".to_string(),
                name: "Room B".to_string(),
                capacity: 100,
                layouts: vec!["theatre".to_string(), "standing".to_string()],
                required_products: vec![],
                base_price: 2000.0,
            },
            RoomSpec {
                id: "garden-pavilion".to_string(),
                name: "Garden Pavilion".to_string(),
                capacity: 60,
                layouts: vec!["banquet".to_string(), "standing".to_string()],
                required_products: vec!["Stage Package".to_string()],
                base_price: 1600.0,
            },
        ];
        let products = vec![
            ProductSpec {
                name: "Business Lunch".to_string(),
                unit: "per person".to_string(),
                price: 45.0,
                is_catering: true,
            },
            ProductSpec {
                name: "Apéro".to_string(),
                unit: "per person".to_string(),
                price: 25.0,
                is_catering: true,
            },
            ProductSpec {
                name: "Vegetarian Menu".to_string(),
                unit: "per person".to_string(),
                price: 40.0,
                is_catering: true,
            },
            ProductSpec {
                name: "Projector".to_string(),
                unit: "per event".to_string(),
                price: 150.0,
                is_catering: false,
            },
            ProductSpec {
                name: "DJ Package".to_string(),
                unit: "per event".to_string(),
                price: 600.0,
                is_catering: false,
            },
            ProductSpec {
                name: "Stage Package".to_string(),
                unit: "per event".to_string(),
                price: 400.0,
                is_catering: false,
            },
        ];
        Self::new(rooms, products)
    }
}

impl CatalogPort for StaticCatalog {
    fn rooms(&self) -> Vec<RoomSpec> {
        self.rooms.clone()
    }

    fn products(&self) -> Vec<ProductSpec> {
        self.products.clone()
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;

//! Hand-off of a finished design to order persistence.
//!
//! The storefront backend is not part of this crate. [`OrderBackend`] is the
//! seam it plugs into and [`OutboxBackend`] a file-based stand-in that the demo
//! uses.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::design::DesignState;
use crate::error::{Result, StudioError};
use crate::scene::{HandOff, Renderer, SceneManager};

/// Contact fields collected before an order is placed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub address: String,
}

impl ContactDetails {
    /// All three fields are required.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("name", &self.name), ("email", &self.email), ("address", &self.address)] {
            if value.trim().is_empty() {
                return Err(StudioError::IncompleteContact(field));
            }
        }
        Ok(())
    }
}

/// The short checkout form: who it goes to and the two captured views.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOrder {
    pub name: String,
    pub address: String,
    pub front_screenshot: String,
    pub back_screenshot: String,
}

impl CheckoutOrder {
    pub fn new(name: &str, address: &str, hand_off: &HandOff) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(StudioError::IncompleteContact("name"));
        }
        if address.trim().is_empty() {
            return Err(StudioError::IncompleteContact("address"));
        }
        Ok(Self {
            name: name.to_string(),
            address: address.to_string(),
            front_screenshot: hand_off.views.front.data_uri(),
            back_screenshot: hand_off.views.back.data_uri(),
        })
    }
}

/// The full order: contact, per-side design and pricing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOrder {
    pub customer: ContactDetails,
    pub design: DesignState,
    pub front_screenshot: String,
    pub back_screenshot: String,
    pub quantity: u32,
    pub unit_price_cents: u64,
    pub total_cents: u64,
}

impl CatalogOrder {
    pub fn new(
        customer: ContactDetails,
        hand_off: &HandOff,
        quantity: u32,
        unit_price_cents: u64,
    ) -> Result<Self> {
        customer.validate()?;
        let quantity = quantity.max(1);
        Ok(Self {
            customer,
            design: hand_off.design.clone(),
            front_screenshot: hand_off.views.front.data_uri(),
            back_screenshot: hand_off.views.back.data_uri(),
            quantity,
            unit_price_cents,
            total_cents: unit_price_cents * quantity as u64,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Order {
    Checkout(CheckoutOrder),
    Catalog(CatalogOrder),
}

/// Identifier the backend assigns to a stored order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub order_id: String,
}

pub trait OrderBackend {
    fn persist(&mut self, order: &Order) -> Result<Receipt>;
}

/// Screens of the storefront the customization view leads to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Contact form for a finished design.
    SubmitDesign,
    /// Catalog checkout for a custom shirt.
    BuyCustom,
    OrderPlaced,
}

pub trait Navigator {
    fn navigate(&mut self, route: Route);
}

/// Captures both views and moves on to the contact form. A failed capture
/// leaves the view where it is.
pub fn submit_design<R: Renderer, N: Navigator + ?Sized>(
    scene: &mut SceneManager<R>,
    navigator: &mut N,
) -> Result<HandOff> {
    let hand_off = scene.hand_off()?;
    navigator.navigate(Route::SubmitDesign);
    Ok(hand_off)
}

/// Persists `order` and moves on to the confirmation screen. Navigation only
/// happens when the backend accepted the order.
pub fn place_order<B: OrderBackend + ?Sized, N: Navigator + ?Sized>(
    backend: &mut B,
    navigator: &mut N,
    order: &Order,
) -> Result<Receipt> {
    let receipt = backend.persist(order)?;
    log::info!("order {} stored", receipt.order_id);
    navigator.navigate(Route::OrderPlaced);
    Ok(receipt)
}

/// Writes each order as pretty-printed JSON into a directory.
#[derive(Clone, Debug)]
pub struct OutboxBackend {
    dir: PathBuf,
    next_id: u64,
}

impl OutboxBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_id: 1,
        }
    }
}

impl OrderBackend for OutboxBackend {
    fn persist(&mut self, order: &Order) -> Result<Receipt> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StudioError::Order(format!("{}: {e}", self.dir.display())))?;
        let order_id = loop {
            let id = format!("order-{:04}", self.next_id);
            self.next_id += 1;
            if !self.dir.join(format!("{id}.json")).exists() {
                break id;
            }
        };
        let json = serde_json::to_vec_pretty(order).map_err(|e| StudioError::Order(e.to_string()))?;
        let path = self.dir.join(format!("{order_id}.json"));
        std::fs::write(&path, json)
            .map_err(|e| StudioError::Order(format!("{}: {e}", path.display())))?;
        Ok(Receipt { order_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_contact_field_is_required() {
        let mut contact = ContactDetails {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            address: "".into(),
        };
        assert!(matches!(contact.validate(), Err(StudioError::IncompleteContact("address"))));
        contact.address = "1 Main St".into();
        assert!(contact.validate().is_ok());
        contact.email = "  ".into();
        assert!(matches!(contact.validate(), Err(StudioError::IncompleteContact("email"))));
    }
}

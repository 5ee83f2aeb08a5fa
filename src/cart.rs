use std::fmt;
use std::str::FromStr;

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Normalized product identifier. Path segments, JSON bodies and stored
/// cart documents all collapse into this one representation, so cart
/// operations compare ids in exactly one way.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
#[schema(value_type = Uuid)]
pub struct ProductId(pub Uuid);

impl ProductId {
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for ProductId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for ProductId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One (product, quantity) entry of a cart. Invariant: `quantity >= 1`
/// while the line exists; a line that would drop to zero is removed, not
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A user's cart: an ordered sequence of lines, unique by product id.
/// Stored as a JSONB document on the user row. Operations consume the
/// value and return the new one; the cart service assigns the result back
/// onto the user row and persists it.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct Cart {
    items: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    pub fn find_line(&self, product_id: ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|line| line.product_id == product_id)
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.find_line(product_id).map(|idx| &self.items[idx])
    }

    /// Add one unit of `product_id`, or take one away when `decrement` is
    /// set. An absent product always gets a fresh line with quantity 1;
    /// a line decremented to zero is removed entirely.
    pub fn add(mut self, product_id: ProductId, decrement: bool) -> Cart {
        match self.find_line(product_id) {
            None => {
                self.items.push(CartLine {
                    product_id,
                    quantity: 1,
                });
                self
            }
            Some(idx) if decrement => {
                if self.items[idx].quantity <= 1 {
                    self.remove(product_id)
                } else {
                    self.items[idx].quantity -= 1;
                    self
                }
            }
            Some(idx) => {
                self.items[idx].quantity += 1;
                self
            }
        }
    }

    /// Drop every line matching `product_id`. Removing an absent product
    /// is a no-op, not an error.
    pub fn remove(mut self, product_id: ProductId) -> Cart {
        self.items.retain(|line| line.product_id != product_id);
        self
    }

    pub fn clear(self) -> Cart {
        Cart::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid() -> ProductId {
        ProductId(Uuid::new_v4())
    }

    fn cart_of(lines: &[(ProductId, u32)]) -> Cart {
        let mut cart = Cart::new();
        for &(product_id, quantity) in lines {
            for _ in 0..quantity {
                cart = cart.add(product_id, false);
            }
        }
        cart
    }

    #[test]
    fn add_absent_product_appends_line_with_quantity_one() {
        let p1 = pid();
        let cart = Cart::new().add(p1, false);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.line(p1).unwrap().quantity, 1);
    }

    #[test]
    fn add_absent_product_leaves_other_lines_unchanged() {
        let (p1, p2) = (pid(), pid());
        let cart = cart_of(&[(p1, 3)]).add(p2, false);
        assert_eq!(cart.line(p1).unwrap().quantity, 3);
        assert_eq!(cart.line(p2).unwrap().quantity, 1);
    }

    #[test]
    fn add_existing_product_increments_quantity() {
        let p1 = pid();
        let cart = cart_of(&[(p1, 1)]).add(p1, false);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.line(p1).unwrap().quantity, 2);
    }

    #[test]
    fn decrement_reduces_quantity_by_one() {
        let p1 = pid();
        let cart = cart_of(&[(p1, 3)]).add(p1, true);
        assert_eq!(cart.line(p1).unwrap().quantity, 2);
    }

    #[test]
    fn decrement_at_quantity_one_removes_the_line() {
        let p1 = pid();
        let cart = cart_of(&[(p1, 1)]).add(p1, true);
        assert!(cart.is_empty());
        assert!(cart.line(p1).is_none());
    }

    #[test]
    fn decrement_of_absent_product_appends_line_with_quantity_one() {
        let p1 = pid();
        let cart = Cart::new().add(p1, true);
        assert_eq!(cart.line(p1).unwrap().quantity, 1);
    }

    #[test]
    fn remove_drops_only_the_matching_line() {
        let (p1, p2) = (pid(), pid());
        let cart = cart_of(&[(p1, 3), (p2, 1)]).remove(p1);
        assert!(cart.line(p1).is_none());
        assert_eq!(cart.line(p2).unwrap().quantity, 1);
    }

    #[test]
    fn remove_of_absent_product_is_a_no_op() {
        let (p1, p2) = (pid(), pid());
        let cart = cart_of(&[(p1, 2)]);
        let removed = cart.clone().remove(p2);
        assert_eq!(removed, cart);
    }

    #[test]
    fn clear_always_yields_the_empty_cart() {
        let cart = cart_of(&[(pid(), 3), (pid(), 1)]);
        assert!(cart.clear().is_empty());
        assert!(Cart::new().clear().is_empty());
    }

    #[test]
    fn lines_stay_unique_across_operation_sequences() {
        let (p1, p2) = (pid(), pid());
        let mut cart = Cart::new();
        for decrement in [false, false, true, false, false] {
            cart = cart.add(p1, decrement);
            cart = cart.add(p2, decrement);
        }
        cart = cart.remove(p1).add(p1, false);

        for line in cart.items() {
            let count = cart
                .items()
                .iter()
                .filter(|other| other.product_id == line.product_id)
                .count();
            assert_eq!(count, 1, "duplicate line for {}", line.product_id);
            assert!(line.quantity >= 1);
        }
    }

    #[test]
    fn total_quantity_sums_all_lines() {
        let cart = cart_of(&[(pid(), 3), (pid(), 2)]);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn cart_round_trips_through_its_json_document_shape() {
        let p1 = pid();
        let cart = cart_of(&[(p1, 2)]);
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json["items"][0]["quantity"], 2);
        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}

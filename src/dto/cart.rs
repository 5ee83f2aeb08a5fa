use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::cart::ProductId;
use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
}

/// `?decrement=true` selects take-one-away; absent or false means add one.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CartMutationQuery {
    #[serde(default)]
    pub decrement: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total_quantity: u32,
}

/// One cart line joined with its catalog detail. `product` is `None` when
/// the product has since been removed from the catalog; the line itself is
/// still shown.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub quantity: u32,
    pub product: Option<Product>,
}

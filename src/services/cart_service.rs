use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::LockType;

use crate::{
    audit::log_audit,
    cart::{Cart, ProductId},
    dto::cart::{CartLineView, CartView},
    entity::{
        products::{Column as ProdCol, Entity as Products},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn view_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let row = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let view = build_cart_view(state, &row.cart).await?;
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

/// Add one unit of a product to the user's cart, or take one away when
/// `decrement` is set. The whole read-modify-write runs in one transaction
/// with the user row locked, so concurrent mutations of the same cart are
/// serialized instead of last-write-wins.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: ProductId,
    decrement: bool,
) -> AppResult<ApiResponse<Cart>> {
    let txn = state.orm.begin().await?;

    let row = lock_user_row(&txn, user).await?;

    let known = Products::find()
        .filter(ProdCol::Id.eq(product_id.as_uuid()))
        .one(&txn)
        .await?;
    if known.is_none() {
        return Err(AppError::UnknownProduct);
    }

    let cart = row.cart.clone().add(product_id, decrement);
    persist_cart(&txn, row, cart.clone()).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "cart_update",
        Some("users"),
        Some(serde_json::json!({ "product_id": product_id, "decrement": decrement })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Cart updated", cart, None))
}

/// Drop every line for the product. Removing a product that is not in the
/// cart succeeds; remove has filter semantics, not lookup semantics.
pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: ProductId,
) -> AppResult<ApiResponse<Cart>> {
    let txn = state.orm.begin().await?;

    let row = lock_user_row(&txn, user).await?;
    let cart = row.cart.clone().remove(product_id);
    persist_cart(&txn, row, cart.clone()).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "cart_remove",
        Some("users"),
        Some(serde_json::json!({ "product_id": product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Removed from cart", cart, None))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Cart>> {
    let txn = state.orm.begin().await?;

    let row = lock_user_row(&txn, user).await?;
    let cart = row.cart.clone().clear();
    persist_cart(&txn, row, cart.clone()).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "cart_clear",
        Some("users"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Cart cleared", cart, None))
}

async fn lock_user_row(
    txn: &sea_orm::DatabaseTransaction,
    user: &AuthUser,
) -> AppResult<UserModel> {
    let row = Users::find()
        .filter(UserCol::Id.eq(user.user_id))
        .lock(LockType::Update)
        .one(txn)
        .await?;
    row.ok_or(AppError::NotFound)
}

async fn persist_cart(
    txn: &sea_orm::DatabaseTransaction,
    row: UserModel,
    cart: Cart,
) -> AppResult<()> {
    let mut active: UserActive = row.into();
    active.cart = Set(cart);
    active.update(txn).await?;
    Ok(())
}

async fn build_cart_view(state: &AppState, cart: &Cart) -> AppResult<CartView> {
    let ids: Vec<_> = cart
        .items()
        .iter()
        .map(|line| line.product_id.as_uuid())
        .collect();

    let products = if ids.is_empty() {
        Vec::new()
    } else {
        Products::find()
            .filter(ProdCol::Id.is_in(ids))
            .all(&state.orm)
            .await?
    };

    let items = cart
        .items()
        .iter()
        .map(|line| {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id.as_uuid())
                .cloned()
                .map(Product::from);
            CartLineView {
                product_id: line.product_id,
                quantity: line.quantity,
                product,
            }
        })
        .collect();

    Ok(CartView {
        items,
        total_quantity: cart.total_quantity(),
    })
}

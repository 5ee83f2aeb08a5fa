use axum_shop_api::{
    cart::{Cart, ProductId},
    db::{create_orm_conn, create_pool, run_migrations},
    dto::products::CreateProductRequest,
    entity::{audit_logs, users::ActiveModel as UserActive},
    error::AppError,
    middleware::auth::AuthUser,
    services::{cart_service, product_service},
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, Statement};
use uuid::Uuid;

// Integration flow: admin creates a product, user adds/decrements/removes/
// clears cart lines, all through the service layer against a live Postgres.
#[tokio::test]
async fn cart_add_decrement_remove_clear_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let user_id = create_user(&state, "user", "user@example.com").await?;
    let admin_id = create_user(&state, "admin", "admin@example.com").await?;

    let auth_user = AuthUser {
        user_id,
        role: "user".into(),
    };
    let auth_admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };

    // Product creation is admin-gated.
    let denied = product_service::create_product(
        &state,
        &auth_user,
        widget_payload("Denied Widget"),
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let created = product_service::create_product(
        &state,
        &auth_admin,
        widget_payload("Test Widget"),
    )
    .await?;
    let product_id = ProductId::from(created.data.unwrap().id);

    // Two adds accumulate quantity on a single line.
    cart_service::add_to_cart(&state, &auth_user, product_id, false).await?;
    let cart = data(cart_service::add_to_cart(&state, &auth_user, product_id, false).await?);
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.line(product_id).unwrap().quantity, 2);

    // Decrement back down; the second decrement removes the line.
    let cart = data(cart_service::add_to_cart(&state, &auth_user, product_id, true).await?);
    assert_eq!(cart.line(product_id).unwrap().quantity, 1);
    let cart = data(cart_service::add_to_cart(&state, &auth_user, product_id, true).await?);
    assert!(cart.is_empty());

    // Unknown product ids are rejected before the cart is touched.
    let unknown = ProductId::from(Uuid::new_v4());
    let rejected = cart_service::add_to_cart(&state, &auth_user, unknown, false).await;
    assert!(matches!(rejected, Err(AppError::UnknownProduct)));

    // Removing an absent product succeeds and leaves the cart unchanged.
    let cart = data(cart_service::remove_from_cart(&state, &auth_user, product_id).await?);
    assert!(cart.is_empty());

    // The view joins catalog detail onto each line.
    cart_service::add_to_cart(&state, &auth_user, product_id, false).await?;
    let view = data(cart_service::view_cart(&state, &auth_user).await?);
    assert_eq!(view.total_quantity, 1);
    assert_eq!(
        view.items[0].product.as_ref().unwrap().name,
        "Test Widget"
    );

    // Clear is absorbing.
    let cart = data(cart_service::clear_cart(&state, &auth_user).await?);
    assert!(cart.is_empty());
    let cart = data(cart_service::clear_cart(&state, &auth_user).await?);
    assert!(cart.is_empty());

    // Mutations leave an audit trail.
    let updates = audit_logs::Entity::find()
        .filter(audit_logs::Column::UserId.eq(user_id))
        .filter(audit_logs::Column::Action.eq("cart_update"))
        .all(&state.orm)
        .await?;
    assert!(!updates.is_empty(), "expected cart_update audit entries");

    Ok(())
}

fn widget_payload(name: &str) -> CreateProductRequest {
    CreateProductRequest {
        name: name.into(),
        description: "A product for testing".into(),
        image_url: None,
        category: Some("testing".into()),
        price: 1000,
        stock: 10,
    }
}

fn data<T>(resp: axum_shop_api::response::ApiResponse<T>) -> T {
    resp.data.expect("response data")
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE audit_logs, products, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState { pool, orm })
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Test {role}")),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        cart: Set(Cart::new()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

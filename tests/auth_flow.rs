use axum_shop_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::auth::{LoginRequest, RegisterRequest},
    error::AppError,
    services::auth_service,
    state::AppState,
};
use sea_orm::{ConnectionTrait, Statement};

#[tokio::test]
async fn register_and_login_flow() -> anyhow::Result<()> {
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
    unsafe { std::env::set_var("JWT_SECRET", "test-secret") };

    let state = setup_state(&database_url).await?;

    // Schema rules from the user model: short or mismatched passwords are rejected.
    let short = auth_service::register_user(&state, register("Ana", "ana@example.com", "abc", "abc")).await;
    assert!(matches!(short, Err(AppError::BadRequest(_))));

    let mismatch =
        auth_service::register_user(&state, register("Ana", "ana@example.com", "secret1", "secret2"))
            .await;
    assert!(matches!(mismatch, Err(AppError::BadRequest(_))));

    let user = auth_service::register_user(
        &state,
        register("Ana", "ana@example.com", "secret1", "secret1"),
    )
    .await?
    .data
    .expect("registered user");
    assert_eq!(user.email, "ana@example.com");
    assert_eq!(user.role, "user");
    assert!(user.cart.is_empty(), "a new user starts with an empty cart");

    let taken = auth_service::register_user(
        &state,
        register("Ana Again", "ana@example.com", "secret1", "secret1"),
    )
    .await;
    assert!(matches!(taken, Err(AppError::BadRequest(_))));

    let wrong = auth_service::login_user(
        &state,
        LoginRequest {
            email: "ana@example.com".into(),
            password: "not-the-password".into(),
        },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::BadRequest(_))));

    let login = auth_service::login_user(
        &state,
        LoginRequest {
            email: "ana@example.com".into(),
            password: "secret1".into(),
        },
    )
    .await?
    .data
    .expect("login response");
    assert!(login.token.starts_with("Bearer "));

    Ok(())
}

fn register(name: &str, email: &str, password: &str, confirm: &str) -> RegisterRequest {
    RegisterRequest {
        name: name.into(),
        email: email.into(),
        password: password.into(),
        confirm_password: confirm.into(),
    }
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE audit_logs, products, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState { pool, orm })
}

//! # API server
//!
//! Assembles the axum router, mounts Swagger UI, configures CORS and binds
//! the TCP listener. `main()` lives in `crates/app`, whose DI container
//! builds the [`AppState`] and calls [`start_server`].

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use tic_core::cache::port::Cache;
use tic_core::common::time::TimeProvider;
use tic_core::commission::port::CommissionStore;
use tic_core::config::AppConfig;
use tic_core::distribution::port::DistributionStore;
use tic_core::funding::port::FundingStore;
use tic_core::notify::port::{NotificationStore, Notifier};
use tic_core::plan::port::PlanStore;
use tic_core::referral::port::ReferralStore;
use tic_core::user::port::{UserStore, VerificationStore};
use tic_core::wallet::port::WalletStore;

use crate::middleware::auth::{auth_middleware, require_admin};
use crate::routes::{
    admin, auth, deposit, notification, partner, payment, referral, subscription, wallet,
    withdrawal,
};

// ============================================================
//  Shared application state
// ============================================================

/// Global application state, injected into every handler through axum's
/// `State` extractor.
///
/// # Invariants
/// - Every port is built by the DI container before the server starts and
///   lives as long as the process.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub verifications: Arc<dyn VerificationStore>,
    pub wallets: Arc<dyn WalletStore>,
    pub funding: Arc<dyn FundingStore>,
    pub referrals: Arc<dyn ReferralStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub distribution: Arc<dyn DistributionStore>,
    pub plans: Arc<dyn PlanStore>,
    pub commissions: Arc<dyn CommissionStore>,
    /// Outbound channel for codes, reset links and back-office alerts
    pub notifier: Arc<dyn Notifier>,
    /// Token revocation list
    pub cache: Arc<dyn Cache>,
    pub clock: Arc<dyn TimeProvider>,
    pub app_config: Arc<AppConfig>,
}

// ============================================================
//  OpenAPI document
// ============================================================

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TIC GLOBAL API",
        version = "0.1.0",
        description = "RESTful gateway of the TIC GLOBAL platform: accounts and KYC, multi-currency wallet, deposits, withdrawals, plans, referral commissions and the admin back-office.",
        contact(name = "TIC GLOBAL Ltd")
    ),
    tags(
        (name = "Auth", description = "Registration, login, verification codes and KYC"),
        (name = "Wallet", description = "Balances, ledger and transfers"),
        (name = "Deposits", description = "User deposit requests"),
        (name = "Withdrawals", description = "Payout methods and withdrawal requests"),
        (name = "Referrals", description = "Referral codes and relationships"),
        (name = "Payments", description = "Plan catalogue, purchases and subscription history"),
        (name = "Partner Wallet", description = "Commission earnings and their transfer to the main balance"),
        (name = "Notifications", description = "In-app inbox"),
        (name = "Admin", description = "Back-office operations")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the global Bearer JWT scheme so Swagger UI shows the
/// Authorize button.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        components.add_security_scheme(
            "bearer_jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some(
                        "Paste the token returned by a login endpoint (without the 'Bearer ' prefix)",
                    ))
                    .build(),
            ),
        );
    }
}

// ============================================================
//  Router construction & start-up
// ============================================================

/// # Summary
/// Builds the complete application router, Swagger UI included.
///
/// # Logic
/// 1. Public routes: sign-up, logins, code flows, referral validation.
/// 2. User routes behind `auth_middleware`.
/// 3. Admin routes behind `auth_middleware` then `require_admin`.
pub fn build_router(state: AppState) -> Router {
    // 1. No authentication
    let public_router = OpenApiRouter::new()
        .routes(routes!(auth::register))
        .routes(routes!(auth::login))
        .routes(routes!(auth::verify_email))
        .routes(routes!(auth::send_verification))
        .routes(routes!(auth::verify_code))
        .routes(routes!(auth::forgot_password))
        .routes(routes!(auth::reset_password))
        .routes(routes!(referral::validate_code))
        .routes(routes!(admin::admin_login));

    // 2. Any valid session
    let user_protected_router = OpenApiRouter::new()
        .routes(routes!(auth::me))
        .routes(routes!(auth::complete_profile))
        .routes(routes!(auth::send_phone_code))
        .routes(routes!(auth::verify_phone_code))
        .routes(routes!(auth::submit_identity))
        .routes(routes!(wallet::get_balance))
        .routes(routes!(wallet::list_transactions))
        .routes(routes!(wallet::transfer_between_accounts))
        .routes(routes!(wallet::transfer_to_user))
        .routes(routes!(deposit::create_deposit))
        .routes(routes!(deposit::list_deposits))
        .routes(routes!(
            withdrawal::get_withdrawals,
            withdrawal::create_withdrawal,
            withdrawal::cancel_withdrawal
        ))
        .routes(routes!(referral::register_referral))
        .routes(routes!(referral::user_data))
        .routes(routes!(referral::generate_code))
        .routes(routes!(referral::list_network))
        .routes(routes!(payment::list_plans, payment::purchase_plan))
        .routes(routes!(subscription::user_subscriptions))
        .routes(routes!(subscription::distribution_history))
        .routes(routes!(partner::get_partner_balance))
        .routes(routes!(partner::list_commissions))
        .routes(routes!(partner::transfer_to_main))
        .routes(routes!(
            notification::list_notifications,
            notification::mark_read
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // 3. Admin role + allow-list
    let admin_protected_router = OpenApiRouter::new()
        .routes(routes!(admin::admin_logout))
        .routes(routes!(
            admin::list_pending_transactions,
            admin::review_transaction
        ))
        .routes(routes!(
            admin::list_deposits,
            admin::bulk_review_deposits,
            admin::update_deposit_status,
            admin::delete_deposit
        ))
        .routes(routes!(admin::review_withdrawal))
        .routes(routes!(wallet::update_balance))
        .routes(routes!(admin::list_users))
        .routes(routes!(admin::set_identity_status))
        .routes(routes!(admin::save_payment_method))
        .routes(routes!(admin::create_notification))
        .routes(routes!(admin::create_subscription))
        .routes(routes!(
            admin::distribution_status,
            admin::distribute_daily_tic
        ))
        .routes(routes!(
            admin::unilevel_status,
            admin::distribute_unilevel
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // 4. Merge everything together with the collected OpenAPI doc
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(public_router)
        .merge(user_protected_router)
        .merge(admin_protected_router)
        .with_state(state)
        .split_for_parts();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors)
}

/// Binds `bind_addr` and serves until `shutdown` resolves.
///
/// # Arguments
/// * `bind_addr` - e.g. `"0.0.0.0:8080"`
pub async fn start_server<F>(
    state: AppState,
    bind_addr: &str,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    tracing::info!("TIC API server listening on {}", bind_addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui/", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

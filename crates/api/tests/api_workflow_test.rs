use std::str::FromStr;
use std::sync::Arc;

use reqwest::StatusCode;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use tic_api::server::{AppState, build_router};
use tic_cache::MemCache;
use tic_core::common::time::RealTimeProvider;
use tic_core::config::AppConfig;
use tic_core::notify::entity::Recipient;
use tic_core::test_utils::RecordingNotifier;
use tic_core::user::entity::{User, UserRole};
use tic_core::user::port::UserStore;
use tic_store::{
    Database, SqliteCommissionStore, SqliteDistributionStore, SqliteFundingStore,
    SqliteNotificationStore, SqlitePlanStore, SqliteReferralStore, SqliteUserStore,
    SqliteWalletStore,
};

const ADMIN_EMAIL: &str = "admin@ticgloballtd.com";
const ADMIN_PASSWORD: &str = "Adm1n!pass";
const USER_PASSWORD: &str = "Passw0rd!";

// Starts the full router on a random port.
async fn spawn_test_server() -> (String, Arc<RecordingNotifier>, tempfile::TempDir) {
    // The reqwest test client is built without a bundled TLS provider.
    rustls::crypto::ring::default_provider().install_default().ok();
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db = Database::open_at(tmp_dir.path()).await.unwrap();

    let users = Arc::new(SqliteUserStore::new(db.clone()));
    let notifier = Arc::new(RecordingNotifier::new());

    let hashed = bcrypt::hash(ADMIN_PASSWORD, 4).unwrap();
    let admin = User::new(
        ADMIN_EMAIL.to_string(),
        hashed,
        None,
        UserRole::Admin,
        chrono::Utc::now(),
    );
    users.create_user(&admin).await.unwrap();

    let mut config = AppConfig::default();
    config.server.jwt_secret = "test-secret".to_string();
    config.admin.emails = vec![ADMIN_EMAIL.to_string()];
    config.referral.base_url = "https://ticgloballtd.com".to_string();

    let state = AppState {
        users: users.clone(),
        verifications: users,
        wallets: Arc::new(SqliteWalletStore::new(db.clone())),
        funding: Arc::new(SqliteFundingStore::new(db.clone())),
        referrals: Arc::new(SqliteReferralStore::new(db.clone())),
        notifications: Arc::new(SqliteNotificationStore::new(db.clone())),
        distribution: Arc::new(SqliteDistributionStore::new(db.clone())),
        plans: Arc::new(SqlitePlanStore::new(db.clone())),
        commissions: Arc::new(SqliteCommissionStore::new(db)),
        notifier: notifier.clone(),
        cache: Arc::new(MemCache::new()),
        clock: Arc::new(RealTimeProvider),
        app_config: Arc::new(config),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let addr = format!("http://127.0.0.1:{}", port);

    let router = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    (addr, notifier, tmp_dir)
}

fn dec_at(body: &Value, pointer: &str) -> Decimal {
    let raw = body.pointer(pointer).unwrap_or_else(|| panic!("missing {}", pointer));
    match raw {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

async fn login(client: &reqwest::Client, base: &str, path: &str, email: &str, password: &str) -> String {
    let res = client
        .post(format!("{}{}", base, path))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_full_api_workflow() {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();

    let (base, notifier, _tmp) = spawn_test_server().await;
    let client = reqwest::Client::new();

    // ============================================
    // Case 1: weak password is refused
    // ============================================
    let res = client
        .post(format!("{}/api/auth/register", base))
        .json(&json!({ "email": "jane@example.com", "password": "short", "country": "NG" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // ============================================
    // Case 2: registration creates user, wallet and referral code
    // ============================================
    let res = client
        .post(format!("{}/api/auth/register", base))
        .json(&json!({ "email": "Jane@Example.com", "password": USER_PASSWORD, "country": "NG" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["user"]["email"], "jane@example.com");
    let jane_code = body["data"]["referralCode"].as_str().unwrap().to_string();
    assert!(jane_code.starts_with("JAN"));

    // ============================================
    // Case 3: duplicate email and unknown referral code
    // ============================================
    let res = client
        .post(format!("{}/api/auth/register", base))
        .json(&json!({ "email": "jane@example.com", "password": USER_PASSWORD, "country": "NG" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/api/auth/register", base))
        .json(&json!({
            "email": "carl@example.com",
            "password": USER_PASSWORD,
            "country": "GH",
            "referralId": "NOPE0000"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // ============================================
    // Case 4: referred sign-up (code matched case-insensitively)
    // ============================================
    let res = client
        .post(format!("{}/api/auth/register", base))
        .json(&json!({
            "email": "bob@example.com",
            "password": USER_PASSWORD,
            "country": "GH",
            "referralId": jane_code.to_lowercase()
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["referredBy"], "jane@example.com");

    // ============================================
    // Case 5: login failures and success
    // ============================================
    let res = client
        .post(format!("{}/api/auth/login", base))
        .json(&json!({ "email": "jane@example.com", "password": "Wrong1!pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);

    let jane = login(&client, &base, "/api/auth/login", "jane@example.com", USER_PASSWORD).await;

    let res = client
        .get(format!("{}/api/wallet/balance", base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // ============================================
    // Case 6: email verification code round trip
    // ============================================
    let res = client
        .post(format!("{}/api/auth/send-verification", base))
        .json(&json!({ "email": "jane@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let sent = notifier
        .last_to(&Recipient::Email("jane@example.com".to_string()))
        .await
        .unwrap();
    let code: String = sent.content.chars().filter(char::is_ascii_digit).take(6).collect();
    assert_eq!(code.len(), 6);
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let res = client
        .post(format!("{}/api/auth/verify-code", base))
        .json(&json!({ "email": "jane@example.com", "code": wrong }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/api/auth/verify-code", base))
        .json(&json!({ "email": "jane@example.com", "code": code }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["email_verified"], true);

    // Codes are single use
    let res = client
        .post(format!("{}/api/auth/verify-code", base))
        .json(&json!({ "email": "jane@example.com", "code": code }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // ============================================
    // Case 7: malformed email is reported, not rejected
    // ============================================
    let res = client
        .post(format!("{}/api/auth/verify-email", base))
        .json(&json!({ "email": "not-an-email" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["isValid"], false);

    // ============================================
    // Case 8: referral validation
    // ============================================
    let res = client
        .get(format!("{}/api/referrals/validate?code=ZZZ99999", base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["isValid"], false);

    let res = client
        .get(format!("{}/api/referrals/validate", base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["isValid"], false);

    let res = client
        .get(format!("{}/api/referrals/user-data", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["referralCode"], jane_code.as_str());
    assert_eq!(body["data"]["stats"]["totalReferrals"], 1);
    assert_eq!(body["data"]["stats"]["activeReferrals"], 0);

    // ============================================
    // Case 9: a user token never reaches admin routes, whatever the Origin
    // ============================================
    let res = client
        .get(format!("{}/api/admin/users", base))
        .bearer_auth(&jane)
        .header("Origin", "http://localhost")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(format!("{}/api/admin/login", base))
        .json(&json!({ "email": "jane@example.com", "password": USER_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let admin = login(&client, &base, "/api/admin/login", ADMIN_EMAIL, ADMIN_PASSWORD).await;

    // ============================================
    // Case 10: payment method + deposit approval credits exactly once
    // ============================================
    let res = client
        .post(format!("{}/api/admin/payment-methods", base))
        .bearer_auth(&admin)
        .json(&json!({
            "id": "usdt-trc20",
            "name": "USDT",
            "network": "TRC20",
            "depositAddress": "TXYZ",
            "minAmount": "10",
            "maxAmount": "10000",
            "processingFeeRate": "0.01",
            "networkFee": "1.5"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/api/deposits/create", base))
        .bearer_auth(&jane)
        .json(&json!({ "amount": "5", "methodId": "usdt-trc20" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/api/deposits/create", base))
        .bearer_auth(&jane)
        .json(&json!({ "amount": "100", "methodId": "usdt-trc20" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let deposit_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(dec_at(&body, "/data/final_amount"), dec!(97.5));

    let res = client
        .get(format!("{}/api/admin/transactions", base))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    let queue = body["data"]["transactions"].as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["type"], "deposit");
    assert_eq!(body["data"]["pagination"]["hasMore"], false);

    for expected_credit in [true, false] {
        let res = client
            .put(format!("{}/api/admin/deposits", base))
            .bearer_auth(&admin)
            .json(&json!({ "depositId": deposit_id, "status": "approved" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["data"]["credited"], expected_credit);
    }

    let res = client
        .get(format!("{}/api/wallet/balance", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(dec_at(&body, "/data/total_balance"), dec!(97.5));

    // Credited deposits cannot be deleted
    let res = client
        .delete(format!("{}/api/admin/deposits", base))
        .bearer_auth(&admin)
        .json(&json!({ "depositId": deposit_id, "reason": "cleanup" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .get(format!("{}/api/admin/deposits?status=approved", base))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["deposits"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["stats"]["approved"], 1);
    assert_eq!(body["data"]["pagination"]["hasMore"], false);

    // ============================================
    // Case 11: internal transfer converts USD into TIC
    // ============================================
    let res = client
        .post(format!("{}/api/wallet/transfer-between-accounts", base))
        .bearer_auth(&jane)
        .json(&json!({ "from_account": "total", "to_account": "tic", "amount": "10" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(dec_at(&body, "/data/wallet/total_balance"), dec!(87.5));
    assert_eq!(dec_at(&body, "/data/wallet/tic_balance"), dec!(500));

    let res = client
        .post(format!("{}/api/wallet/transfer-between-accounts", base))
        .bearer_auth(&jane)
        .json(&json!({ "from_account": "total", "to_account": "gic", "amount": "1000" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // ============================================
    // Case 12: withdrawal holds funds, cancellation refunds them
    // ============================================
    let res = client
        .post(format!("{}/api/withdrawals", base))
        .bearer_auth(&jane)
        .json(&json!({
            "methodId": "usdt-trc20",
            "destinationAddress": "TDEST",
            "amount": "50"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let withdrawal_id = body["data"]["id"].as_str().unwrap().to_string();

    let res = client
        .get(format!("{}/api/withdrawals?type=history", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(dec_at(&body, "/data/wallet/total_balance"), dec!(37.5));
    assert_eq!(body["data"]["stats"]["pending"], 1);

    let res = client
        .put(format!("{}/api/withdrawals", base))
        .bearer_auth(&jane)
        .json(&json!({ "withdrawalId": withdrawal_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .put(format!("{}/api/withdrawals", base))
        .bearer_auth(&jane)
        .json(&json!({ "withdrawalId": withdrawal_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .get(format!("{}/api/wallet/balance", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(dec_at(&body, "/data/total_balance"), dec!(87.5));

    // ============================================
    // Case 13: in-app notifications
    // ============================================
    let res = client
        .get(format!("{}/api/notifications?unread_only=true&count_only=true", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert!(body["data"]["count"].as_u64().unwrap() >= 1);

    let res = client
        .patch(format!("{}/api/notifications", base))
        .bearer_auth(&jane)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .patch(format!("{}/api/notifications", base))
        .bearer_auth(&jane)
        .json(&json!({ "all": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/api/notifications?unread_only=true&count_only=true", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["count"], 0);

    // ============================================
    // Case 14: daily distribution is idempotent per day
    // ============================================
    let res = client
        .post(format!("{}/api/admin/subscriptions", base))
        .bearer_auth(&admin)
        .json(&json!({ "userEmail": "jane@example.com", "planId": "vip" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/api/admin/distribute-daily-tic", base))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["distributed"], 1);

    let res = client
        .post(format!("{}/api/admin/distribute-daily-tic", base))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["distributed"], 0);
    assert_eq!(body["data"]["skipped"], 1);

    // ============================================
    // Case 15: peer transfer checks its recipient and charges the fee
    // ============================================
    let res = client
        .post(format!("{}/api/wallet/transfer-to-user", base))
        .bearer_auth(&jane)
        .json(&json!({ "recipient_email": "Jane@example.com", "amount": "5" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/api/wallet/transfer-to-user", base))
        .bearer_auth(&jane)
        .json(&json!({ "recipient_email": "ghost@example.com", "amount": "5" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(format!("{}/api/wallet/transfer-to-user", base))
        .bearer_auth(&jane)
        .json(&json!({ "recipient_email": "bob@example.com", "amount": "20", "fee": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(dec_at(&body, "/data/wallet/total_balance"), dec!(66.5));

    let bob = login(&client, &base, "/api/auth/login", "bob@example.com", USER_PASSWORD).await;
    let res = client
        .get(format!("{}/api/wallet/balance", base))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(dec_at(&body, "/data/total_balance"), dec!(20));

    // ============================================
    // Case 16: admin balance adjustment
    // ============================================
    let res = client
        .post(format!("{}/api/wallet/update-balance", base))
        .bearer_auth(&admin)
        .json(&json!({ "email": "bob@example.com", "updates": { "total": "-100" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/api/wallet/update-balance", base))
        .bearer_auth(&admin)
        .json(&json!({ "email": "ghost@example.com", "updates": { "total": "10" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(format!("{}/api/wallet/update-balance", base))
        .bearer_auth(&admin)
        .json(&json!({ "email": "bob@example.com", "updates": { "total": "200" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(dec_at(&body, "/data/total_balance"), dec!(220));

    // ============================================
    // Case 17: VIP purchase pays the referrer's partner wallet
    // ============================================
    let res = client
        .get(format!("{}/api/payments", base))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["plans"].as_array().unwrap().len(), 2);

    let res = client
        .get(format!("{}/api/payments?planId=gold", base))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(format!("{}/api/payments", base))
        .bearer_auth(&bob)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/api/payments", base))
        .bearer_auth(&bob)
        .json(&json!({ "planId": "vip" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(dec_at(&body, "/data/wallet/total_balance"), dec!(82));
    assert_eq!(dec_at(&body, "/data/payment/balanceBefore"), dec!(220));
    assert_eq!(body["data"]["commissionsPaid"], 1);

    // Second VIP plan is more than bob has left
    let res = client
        .post(format!("{}/api/payments", base))
        .bearer_auth(&bob)
        .json(&json!({ "planId": "vip" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(format!("{}/api/user/subscriptions", base))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["activeSubscriptions"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["payments"].as_array().unwrap().len(), 1);
    assert_eq!(dec_at(&body, "/data/stats/totalSpent"), dec!(138));

    let res = client
        .get(format!("{}/api/partner-wallet/balance", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(dec_at(&body, "/data/partnerWalletBalance"), dec!(0.044));

    let res = client
        .get(format!("{}/api/partner-wallet/commissions?type=plan_purchase", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    let rows = body["data"]["commissions"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["referredEmail"], "bob@example.com");
    assert_eq!(rows[0]["level"], 1);
    assert_eq!(dec_at(&body, "/data/summary/totalEarned"), dec!(0.044));

    let res = client
        .get(format!("{}/api/partner-wallet/commissions?type=bonus", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(format!("{}/api/referrals/list", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    let network = body["data"]["referrals"].as_array().unwrap();
    assert_eq!(network.len(), 1);
    assert_eq!(network[0]["email"], "bob@example.com");
    assert_eq!(network[0]["level"], 1);
    assert_eq!(network[0]["planType"], "vip");
    assert_eq!(network[0]["status"], "active");
    assert_eq!(dec_at(&body, "/data/referrals/0/totalEarnings"), dec!(0.044));

    let res = client
        .get(format!("{}/api/referrals/list?status=inactive", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["referrals"].as_array().unwrap().len(), 0);
    assert_eq!(body["data"]["totalMembers"], 1);

    // ============================================
    // Case 18: partner wallet pays out to the main balance only what it holds
    // ============================================
    let res = client
        .post(format!("{}/api/partner-wallet/transfer", base))
        .bearer_auth(&jane)
        .json(&json!({ "amount": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/api/partner-wallet/transfer", base))
        .bearer_auth(&jane)
        .json(&json!({ "amount": "0.04" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(dec_at(&body, "/data/wallet/total_balance"), dec!(66.54));
    assert_eq!(dec_at(&body, "/data/wallet/partner_wallet_balance"), dec!(0.004));

    // ============================================
    // Case 19: daily unilevel commissions are paid once per day
    // ============================================
    let res = client
        .get(format!("{}/api/admin/unilevel-commissions/distribute", base))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["alreadyDistributed"], false);
    assert_eq!(body["data"]["vipHolders"], 2);

    let res = client
        .post(format!("{}/api/admin/unilevel-commissions/distribute", base))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["credited"], 1);
    assert_eq!(dec_at(&body, "/data/totalAmount"), dec!(0.044));

    let res = client
        .post(format!("{}/api/admin/unilevel-commissions/distribute", base))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["credited"], 0);
    assert_eq!(body["data"]["skipped"], 1);

    let res = client
        .get(format!("{}/api/partner-wallet/balance", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(dec_at(&body, "/data/partnerWalletBalance"), dec!(0.048));
    assert_eq!(dec_at(&body, "/data/totalEarned"), dec!(0.088));

    // ============================================
    // Case 20: distribution history of the TIC credits
    // ============================================
    let res = client
        .get(format!("{}/api/distribution/history", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["distributions"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["summary"]["totalDistributions"], 1);
    assert_eq!(dec_at(&body, "/data/summary/totalTokens"), dec!(18.90410959));
    assert_eq!(body["data"]["activeSubscriptions"].as_array().unwrap().len(), 1);

    let res = client
        .get(format!("{}/api/distribution/history?planId=starter", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["distributions"].as_array().unwrap().len(), 0);
    assert_eq!(dec_at(&body, "/data/summary/averageDaily"), Decimal::ZERO);

    // ============================================
    // Case 21: withdrawal approval then payout over HTTP
    // ============================================
    let res = client
        .post(format!("{}/api/withdrawals", base))
        .bearer_auth(&jane)
        .json(&json!({
            "methodId": "usdt-trc20",
            "destinationAddress": "TDEST",
            "amount": "20"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let withdrawal_id = body["data"]["id"].as_str().unwrap().to_string();

    // The back-office queue pages across deposits and withdrawals
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let res = client
        .post(format!("{}/api/deposits/create", base))
        .bearer_auth(&bob)
        .json(&json!({ "amount": "50", "methodId": "usdt-trc20" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/api/admin/transactions?limit=1", base))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["transactions"][0]["type"], "deposit");
    assert_eq!(body["data"]["pagination"]["hasMore"], true);

    let res = client
        .get(format!("{}/api/admin/transactions?limit=1&offset=1", base))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["transactions"][0]["id"], withdrawal_id.as_str());
    assert_eq!(body["data"]["pagination"]["hasMore"], false);

    let res = client
        .patch(format!("{}/api/admin/withdrawals/{}", base, withdrawal_id))
        .bearer_auth(&admin)
        .json(&json!({ "action": "complete" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .patch(format!("{}/api/admin/withdrawals/{}", base, withdrawal_id))
        .bearer_auth(&admin)
        .json(&json!({ "action": "pay" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .patch(format!("{}/api/admin/withdrawals/{}", base, withdrawal_id))
        .bearer_auth(&admin)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["status"], "approved");

    let res = client
        .patch(format!("{}/api/admin/withdrawals/{}", base, withdrawal_id))
        .bearer_auth(&admin)
        .json(&json!({ "action": "complete", "tx_hash": "0xsent" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["transaction_hash"], "0xsent");

    let res = client
        .get(format!("{}/api/withdrawals?type=history", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["stats"]["completed"], 1);
    assert_eq!(dec_at(&body, "/data/wallet/total_balance"), dec!(46.54));

    // ============================================
    // Case 22: referral registration is limited to the caller's own account
    // ============================================
    let res = client
        .post(format!("{}/api/referrals/register", base))
        .bearer_auth(&jane)
        .json(&json!({ "referralCode": jane_code, "newUserEmail": "carl@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(format!("{}/api/referrals/generate", base))
        .bearer_auth(&jane)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["code"], jane_code.as_str());

    // ============================================
    // Case 23: password reset through the emailed link
    // ============================================
    let res = client
        .post(format!("{}/api/auth/forgot-password", base))
        .json(&json!({ "email": "nobody@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(
        notifier
            .last_to(&Recipient::Email("nobody@example.com".to_string()))
            .await
            .is_none()
    );

    let res = client
        .post(format!("{}/api/auth/forgot-password", base))
        .json(&json!({ "email": "bob@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let sent = notifier
        .last_to(&Recipient::Email("bob@example.com".to_string()))
        .await
        .unwrap();
    let reset_token = sent.content.split("token=").nth(1).unwrap().trim().to_string();

    let res = client
        .post(format!("{}/api/auth/reset-password", base))
        .json(&json!({ "token": "not-a-token", "password": "N3w!passw0rd" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/api/auth/reset-password", base))
        .json(&json!({ "token": reset_token, "password": "weak" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/api/auth/reset-password", base))
        .json(&json!({ "token": reset_token, "password": "N3w!passw0rd" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Tokens are single use; the old password is gone
    let res = client
        .post(format!("{}/api/auth/reset-password", base))
        .json(&json!({ "token": reset_token, "password": "An0ther!pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/api/auth/login", base))
        .json(&json!({ "email": "bob@example.com", "password": USER_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    login(&client, &base, "/api/auth/login", "bob@example.com", "N3w!passw0rd").await;

    // ============================================
    // Case 24: phone verification code
    // ============================================
    let res = client
        .post(format!("{}/api/auth/send-phone-code", base))
        .bearer_auth(&jane)
        .json(&json!({ "phone": "12-34" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/api/auth/send-phone-code", base))
        .bearer_auth(&jane)
        .json(&json!({ "phone": "+234 801 234 5678" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let sent = notifier
        .last_to(&Recipient::Phone("+2348012345678".to_string()))
        .await
        .unwrap();
    let phone_code: String = sent.content.chars().filter(char::is_ascii_digit).take(6).collect();
    let wrong = if phone_code == "000000" { "111111" } else { "000000" };

    let res = client
        .post(format!("{}/api/auth/verify-phone-code", base))
        .bearer_auth(&jane)
        .json(&json!({ "phone": "+2348012345678", "code": wrong }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/api/auth/verify-phone-code", base))
        .bearer_auth(&jane)
        .json(&json!({ "phone": "+2348012345678", "code": phone_code }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["phone_verified"], true);
    assert_eq!(body["data"]["phone"], "+2348012345678");

    // ============================================
    // Case 25: admin logout revokes the token
    // ============================================
    let res = client
        .delete(format!("{}/api/admin/login", base))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/api/admin/users", base))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

//! Checkout, settlement and reconciliation against `PostgreSQL`.
//!
//! The gateway is an in-process stand-in that signs with a known secret;
//! everything else is the production store.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::PgPool;

use jmd_tiffins_admin::db::{MenuRepository, OrderRepository, PaymentAttemptRepository, TodaysMenuRepository};
use jmd_tiffins_admin::models::NewPaymentAttempt;
use jmd_tiffins_admin::payments::{GatewayError, GatewayOrder, PaymentGateway, WebhookEvent, signature};
use jmd_tiffins_admin::services::{
    CheckoutService, CustomerChoice, OrderRequest, PaymentCallback, PgOrderStore, RetryPolicy,
    reconcile_once,
};
use jmd_tiffins_core::{
    CheckoutState, DeliveryLocation, MealCategory, MenuItemId, PaymentAttemptStatus, PaymentStatus,
    business_offset,
};
use jmd_tiffins_integration_tests::menu_item;

const KEY_SECRET: &str = "integration_key_secret";
const WEBHOOK_SECRET: &str = "integration_webhook_secret";

#[derive(Default)]
struct StubGateway {
    created: AtomicU32,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    fn key_id(&self) -> &str {
        "rzp_test_integration"
    }

    async fn create_order(&self, amount_paise: i64, receipt: &str) -> Result<GatewayOrder, GatewayError> {
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder {
            id: format!("order_it{n}"),
            amount: amount_paise,
            currency: "INR".to_string(),
            receipt: Some(receipt.to_string()),
            status: Some("created".to_string()),
        })
    }

    fn verify_checkout_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        sig: &str,
    ) -> Result<(), GatewayError> {
        let message = signature::checkout_message(gateway_order_id, payment_id);
        if signature::verify(KEY_SECRET, message.as_bytes(), sig) {
            Ok(())
        } else {
            Err(GatewayError::InvalidSignature("mismatch".to_string()))
        }
    }

    fn verify_webhook_signature(&self, body: &[u8], sig: &str) -> Result<(), GatewayError> {
        if signature::verify(WEBHOOK_SECRET, body, sig) {
            Ok(())
        } else {
            Err(GatewayError::InvalidSignature("mismatch".to_string()))
        }
    }
}

fn signed_callback(gateway_order_id: &str, payment_id: &str) -> PaymentCallback {
    let message = signature::checkout_message(gateway_order_id, payment_id);
    PaymentCallback {
        gateway_order_id: gateway_order_id.to_string(),
        payment_id: payment_id.to_string(),
        signature: signature::hmac_sha256_hex(KEY_SECRET, message.as_bytes()),
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

/// An instant on `today()` at `hour:min` business time.
fn at(hour: u32, min: u32) -> DateTime<Utc> {
    business_offset()
        .with_ymd_and_hms(2024, 3, 1, hour, min, 0)
        .unwrap()
        .with_timezone(&Utc)
}

async fn todays_item(pool: &PgPool) -> MenuItemId {
    let item = MenuRepository::new(pool)
        .create(&menu_item(today(), "Veg Thali", MealCategory::Lunch, 120))
        .await
        .unwrap();
    TodaysMenuRepository::new(pool)
        .replace(today(), &[item.id])
        .await
        .unwrap();
    item.id
}

fn request(item: MenuItemId, pay_now: bool) -> OrderRequest {
    OrderRequest {
        customer: Some(CustomerChoice::New {
            name: "Meera".to_string(),
            phone_number: "9876543210".to_string(),
        }),
        menu_item_id: Some(item),
        delivery_location: Some(DeliveryLocation::P1Hostel),
        pay_now,
    }
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_pay_later_commits_unpaid_order(pool: PgPool) {
    let item = todays_item(&pool).await;
    let store = PgOrderStore::new(pool.clone());
    let gateway = StubGateway::default();
    let checkout = CheckoutService::new(&store, &gateway, RetryPolicy::immediate(2), business_offset());

    let placement = checkout.place_order(request(item, false), at(12, 0)).await.unwrap();

    assert!(matches!(placement.state, CheckoutState::PlacedUnpaid { .. }));
    assert_eq!(placement.order.payment_status, PaymentStatus::Unpaid);
    assert_eq!(placement.order.delivery_date, today());
    assert_eq!(placement.order.order_details, "Veg Thali");
    assert_eq!(gateway.created.load(Ordering::SeqCst), 0);
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_order_after_cutoff_rolls_to_tomorrow(pool: PgPool) {
    let item = todays_item(&pool).await;
    let store = PgOrderStore::new(pool.clone());
    let gateway = StubGateway::default();
    let checkout = CheckoutService::new(&store, &gateway, RetryPolicy::immediate(2), business_offset());

    let placement = checkout.place_order(request(item, false), at(21, 30)).await.unwrap();

    assert_eq!(placement.order.delivery_date, today().succ_opt().unwrap());
    assert_eq!(placement.order.created_at, at(21, 30));
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_pay_now_success_marks_order_paid(pool: PgPool) {
    let item = todays_item(&pool).await;
    let store = PgOrderStore::new(pool.clone());
    let gateway = StubGateway::default();
    let checkout = CheckoutService::new(&store, &gateway, RetryPolicy::immediate(2), business_offset());

    let placement = checkout.place_order(request(item, true), at(12, 0)).await.unwrap();
    let intent = placement.payment.unwrap();
    assert_eq!(intent.amount_paise, 12_000);

    let order_id = placement.order.id;
    let state = checkout
        .confirm_payment(order_id, &signed_callback(&intent.gateway_order_id, "pay_it1"))
        .await
        .unwrap();
    assert_eq!(state, CheckoutState::PaymentSettled { order_id });

    let order = OrderRepository::new(&pool).get(order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);

    let attempt = PaymentAttemptRepository::new(&pool)
        .get_by_gateway_order_id(&intent.gateway_order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(attempt.status, PaymentAttemptStatus::Settled);
    assert_eq!(attempt.gateway_payment_id.as_deref(), Some("pay_it1"));
    assert!(attempt.acknowledged_at.is_some());
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_forged_callback_leaves_order_unpaid(pool: PgPool) {
    let item = todays_item(&pool).await;
    let store = PgOrderStore::new(pool.clone());
    let gateway = StubGateway::default();
    let checkout = CheckoutService::new(&store, &gateway, RetryPolicy::immediate(2), business_offset());

    let placement = checkout.place_order(request(item, true), at(12, 0)).await.unwrap();
    let intent = placement.payment.unwrap();
    let forged = PaymentCallback {
        signature: "00".repeat(32),
        ..signed_callback(&intent.gateway_order_id, "pay_it1")
    };

    assert!(checkout.confirm_payment(placement.order.id, &forged).await.is_err());
    let order = OrderRepository::new(&pool).get(placement.order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Unpaid);
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_late_capture_webhook_after_dismissal(pool: PgPool) {
    let item = todays_item(&pool).await;
    let store = PgOrderStore::new(pool.clone());
    let gateway = StubGateway::default();
    let checkout = CheckoutService::new(&store, &gateway, RetryPolicy::immediate(2), business_offset());

    let placement = checkout.place_order(request(item, true), at(12, 0)).await.unwrap();
    let intent = placement.payment.unwrap();
    let order_id = placement.order.id;

    let state = checkout
        .abandon_payment(order_id, &intent.gateway_order_id, false)
        .await
        .unwrap();
    assert!(matches!(state, CheckoutState::PaymentAbandoned { .. }));

    let body = serde_json::json!({
        "event": "payment.captured",
        "payload": {
            "payment": {"entity": {"id": "pay_late", "order_id": intent.gateway_order_id, "status": "captured"}}
        }
    });
    let event: WebhookEvent = serde_json::from_value(body).unwrap();
    checkout.handle_webhook(&event).await.unwrap();

    let (order, state) = checkout.status(order_id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(state, CheckoutState::PaymentSettled { order_id });
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_reconcile_applies_settled_attempts_once(pool: PgPool) {
    let item = todays_item(&pool).await;
    let store = PgOrderStore::new(pool.clone());
    let gateway = StubGateway::default();
    let checkout = CheckoutService::new(&store, &gateway, RetryPolicy::immediate(2), business_offset());
    let placement = checkout.place_order(request(item, false), at(12, 0)).await.unwrap();

    // Settled at the gateway while the request that would mark it paid died
    let attempts = PaymentAttemptRepository::new(&pool);
    attempts
        .create(&NewPaymentAttempt {
            order_id: placement.order.id,
            gateway_order_id: "order_orphan".to_string(),
            amount_paise: 12_000,
        })
        .await
        .unwrap();
    attempts.mark_settled("order_orphan", Some("pay_orphan")).await.unwrap();
    assert_eq!(attempts.list_awaiting_acknowledgement(10).await.unwrap().len(), 1);

    let report = reconcile_once(&store).await.unwrap();
    assert_eq!(report.acknowledged, 1);
    assert_eq!(report.failed, 0);

    let order = OrderRepository::new(&pool).get(placement.order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);

    let again = reconcile_once(&store).await.unwrap();
    assert_eq!(again.acknowledged, 0);
    assert!(attempts.list_awaiting_acknowledgement(10).await.unwrap().is_empty());
}

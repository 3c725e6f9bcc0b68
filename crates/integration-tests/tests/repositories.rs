//! Repository tests against `PostgreSQL`.
//!
//! Each test gets a fresh database with the dashboard migrations applied.

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

use jmd_tiffins_admin::db::{CustomerRepository, MenuRepository, OrderRepository, TodaysMenuRepository};
use jmd_tiffins_admin::models::{MenuItemInput, NewOrder, OrderFilter};
use jmd_tiffins_core::{
    CustomerId, DeliveryLocation, DeliverySchedule, MealCategory, MenuItemId, Money, PaymentStatus,
};
use jmd_tiffins_integration_tests::{customer, menu_item};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

async fn place(
    pool: &PgPool,
    customer_id: CustomerId,
    item_id: MenuItemId,
    status: PaymentStatus,
    delivery: NaiveDate,
) -> i32 {
    let item = MenuRepository::new(pool).get(item_id).await.unwrap().unwrap();
    let order = NewOrder::from_menu_item(
        customer_id,
        &item,
        status,
        Some(DeliveryLocation::WeWork),
        DeliverySchedule {
            delivery_date: delivery,
            created_at: Utc::now(),
        },
    );
    OrderRepository::new(pool).create(&order).await.unwrap().id.as_i32()
}

// =============================================================================
// Today's menu
// =============================================================================

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_replace_swaps_whole_selection(pool: PgPool) {
    let menu = MenuRepository::new(&pool);
    let a = menu.create(&menu_item(day(1), "Poha", MealCategory::Breakfast, 60)).await.unwrap();
    let b = menu.create(&menu_item(day(1), "Veg Thali", MealCategory::Lunch, 120)).await.unwrap();
    let c = menu.create(&menu_item(day(1), "Dal Khichdi", MealCategory::Dinner, 100)).await.unwrap();

    let todays = TodaysMenuRepository::new(&pool);
    assert_eq!(todays.replace(day(1), &[a.id, b.id]).await.unwrap(), 2);
    let mut selection = todays.selection_for(day(1)).await.unwrap();
    selection.sort_by_key(MenuItemId::as_i32);
    assert_eq!(selection, vec![a.id, b.id]);

    todays.replace(day(1), &[c.id]).await.unwrap();
    assert_eq!(todays.selection_for(day(1)).await.unwrap(), vec![c.id]);

    let items = todays.items_for(day(1)).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Dal Khichdi");
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_replace_with_nothing_clears_selection(pool: PgPool) {
    let menu = MenuRepository::new(&pool);
    let a = menu.create(&menu_item(day(1), "Poha", MealCategory::Breakfast, 60)).await.unwrap();

    let todays = TodaysMenuRepository::new(&pool);
    todays.replace(day(1), &[a.id]).await.unwrap();
    assert_eq!(todays.replace(day(1), &[]).await.unwrap(), 0);
    assert!(todays.selection_for(day(1)).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_selection_is_per_date(pool: PgPool) {
    let menu = MenuRepository::new(&pool);
    let a = menu.create(&menu_item(day(1), "Poha", MealCategory::Breakfast, 60)).await.unwrap();
    let b = menu.create(&menu_item(day(2), "Upma", MealCategory::Breakfast, 55)).await.unwrap();

    let todays = TodaysMenuRepository::new(&pool);
    todays.replace(day(1), &[a.id]).await.unwrap();
    todays.replace(day(2), &[b.id]).await.unwrap();

    assert!(todays.selected_item(day(1), a.id).await.unwrap().is_some());
    assert!(todays.selected_item(day(1), b.id).await.unwrap().is_none());
    assert_eq!(todays.selection_for(day(1)).await.unwrap(), vec![a.id]);
}

// =============================================================================
// Menu items
// =============================================================================

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_menu_edit_leaves_order_snapshot(pool: PgPool) {
    let c = CustomerRepository::new(&pool).create(&customer("Ravi")).await.unwrap();
    let menu = MenuRepository::new(&pool);
    let item = menu.create(&menu_item(day(1), "Veg Thali", MealCategory::Lunch, 120)).await.unwrap();
    let order_id = place(&pool, c.id, item.id, PaymentStatus::Unpaid, day(1)).await;

    menu.update(
        item.id,
        &MenuItemInput {
            title: "Deluxe Thali".to_string(),
            price: Money::from_paise(15_000),
            ..menu_item(day(1), "", MealCategory::Lunch, 0)
        },
    )
    .await
    .unwrap();

    let order = OrderRepository::new(&pool)
        .get(jmd_tiffins_core::OrderId::new(order_id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.order_details, "Veg Thali");
    assert_eq!(order.amount, Money::from_paise(12_000));
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_menu_pages_newest_first(pool: PgPool) {
    let menu = MenuRepository::new(&pool);
    for d in 1..=3 {
        menu.create(&menu_item(day(d), &format!("Dish {d}"), MealCategory::Lunch, 100))
            .await
            .unwrap();
    }

    assert_eq!(menu.count().await.unwrap(), 3);
    let first = menu.list_page(1, 2).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].title, "Dish 3");
    let second = menu.list_page(2, 2).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].title, "Dish 1");
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_update_missing_menu_item_is_not_found(pool: PgPool) {
    let err = MenuRepository::new(&pool)
        .update(MenuItemId::new(999), &menu_item(day(1), "Ghost", MealCategory::Dinner, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, jmd_tiffins_admin::db::RepositoryError::NotFound));
}

// =============================================================================
// Orders and stats
// =============================================================================

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_stats_split_sales_and_revenue(pool: PgPool) {
    let c = CustomerRepository::new(&pool).create(&customer("Meera")).await.unwrap();
    let menu = MenuRepository::new(&pool);
    let thali = menu.create(&menu_item(day(1), "Veg Thali", MealCategory::Lunch, 100)).await.unwrap();
    let poha = menu.create(&menu_item(day(1), "Poha", MealCategory::Breakfast, 50)).await.unwrap();
    let chai = menu.create(&menu_item(day(1), "Chai", MealCategory::Breakfast, 30)).await.unwrap();

    place(&pool, c.id, thali.id, PaymentStatus::Paid, day(2)).await;
    place(&pool, c.id, poha.id, PaymentStatus::Partial, day(2)).await;
    place(&pool, c.id, chai.id, PaymentStatus::Unpaid, day(1)).await;

    let stats = OrderRepository::new(&pool).stats(day(2)).await.unwrap();
    assert_eq!(stats.total_orders, 3);
    assert_eq!(stats.total_sales, Money::from_paise(15_000));
    assert_eq!(stats.total_revenue, Money::from_paise(18_000));
    assert_eq!(stats.todays_earnings, Money::from_paise(10_000));
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_order_filters(pool: PgPool) {
    let customers = CustomerRepository::new(&pool);
    let ravi = customers.create(&customer("Ravi")).await.unwrap();
    let meera = customers.create(&customer("Meera")).await.unwrap();
    let item = MenuRepository::new(&pool)
        .create(&menu_item(day(1), "Veg Thali", MealCategory::Lunch, 100))
        .await
        .unwrap();

    place(&pool, ravi.id, item.id, PaymentStatus::Paid, day(1)).await;
    place(&pool, ravi.id, item.id, PaymentStatus::Unpaid, day(2)).await;
    place(&pool, meera.id, item.id, PaymentStatus::Unpaid, day(2)).await;

    let orders = OrderRepository::new(&pool);
    let unpaid_on_2 = OrderFilter {
        delivery_date: Some(day(2)),
        payment_status: Some(PaymentStatus::Unpaid),
        ..OrderFilter::default()
    };
    assert_eq!(orders.count(&unpaid_on_2).await.unwrap(), 2);

    let ravis = OrderFilter {
        customer_id: Some(ravi.id),
        ..OrderFilter::default()
    };
    let rows = orders.list(&ravis).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.customer_name == "Ravi"));
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_deleting_customer_removes_orders(pool: PgPool) {
    let customers = CustomerRepository::new(&pool);
    let c = customers.create(&customer("Ravi")).await.unwrap();
    let item = MenuRepository::new(&pool)
        .create(&menu_item(day(1), "Veg Thali", MealCategory::Lunch, 100))
        .await
        .unwrap();
    place(&pool, c.id, item.id, PaymentStatus::Unpaid, day(1)).await;

    assert!(customers.delete(c.id).await.unwrap());
    assert_eq!(
        OrderRepository::new(&pool).count(&OrderFilter::default()).await.unwrap(),
        0
    );
    assert!(!customers.delete(c.id).await.unwrap());
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_customer_summaries(pool: PgPool) {
    let c = CustomerRepository::new(&pool).create(&customer("Ravi")).await.unwrap();
    let item = MenuRepository::new(&pool)
        .create(&menu_item(day(1), "Veg Thali", MealCategory::Lunch, 100))
        .await
        .unwrap();
    place(&pool, c.id, item.id, PaymentStatus::Paid, day(1)).await;
    place(&pool, c.id, item.id, PaymentStatus::Partial, day(2)).await;

    let summaries = CustomerRepository::new(&pool).list_with_summaries().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total_orders, 2);
    assert_eq!(summaries[0].amount_paid, Money::from_paise(10_000));
    assert_eq!(summaries[0].amount_pending, Money::from_paise(10_000));
}

//! Database operations for menu items and today's menu selection.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use jmd_tiffins_core::{MealCategory, MenuItemId, Money};

use super::RepositoryError;
use crate::models::{MenuItem, MenuItemInput};

/// Page size for the menu table.
pub const MENU_ITEMS_PER_PAGE: u32 = 20;

#[derive(Debug, sqlx::FromRow)]
struct MenuItemRow {
    id: MenuItemId,
    date: NaiveDate,
    title: String,
    category: MealCategory,
    price: Money,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<MenuItemRow> for MenuItem {
    fn from(row: MenuItemRow) -> Self {
        Self {
            id: row.id,
            date: row.date,
            title: row.title,
            category: row.category,
            price: row.price,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

const MENU_COLUMNS: &str = "id, date, title, category, price, description, created_at";

/// Repository for menu item CRUD.
pub struct MenuRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MenuRepository<'a> {
    /// Create a new menu repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of menu items, newest date first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_page(&self, page: u32, per_page: u32) -> Result<Vec<MenuItem>, RepositoryError> {
        let offset = i64::from(page.max(1) - 1) * i64::from(per_page);
        let rows = sqlx::query_as::<_, MenuItemRow>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_items ORDER BY date DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Total number of menu items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM menu_items")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Every menu item, newest date first, for order pickers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<MenuItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, MenuItemRow>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_items ORDER BY date DESC, category, title"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a menu item by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: MenuItemId) -> Result<Option<MenuItem>, RepositoryError> {
        let row = sqlx::query_as::<_, MenuItemRow>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get every menu item whose ID is in `ids`. Missing IDs are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i32> = ids.iter().map(MenuItemId::as_i32).collect();
        let rows = sqlx::query_as::<_, MenuItemRow>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_items WHERE id = ANY($1) ORDER BY category, title, id"
        ))
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create a menu item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &MenuItemInput) -> Result<MenuItem, RepositoryError> {
        let row = sqlx::query_as::<_, MenuItemRow>(&format!(
            r"
            INSERT INTO menu_items (date, title, category, price, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MENU_COLUMNS}
            "
        ))
        .bind(input.date)
        .bind(&input.title)
        .bind(input.category)
        .bind(input.price)
        .bind(&input.description)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Update a menu item. Existing orders keep their snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    pub async fn update(
        &self,
        id: MenuItemId,
        input: &MenuItemInput,
    ) -> Result<MenuItem, RepositoryError> {
        let row = sqlx::query_as::<_, MenuItemRow>(&format!(
            r"
            UPDATE menu_items
            SET date = $2, title = $3, category = $4, price = $5, description = $6
            WHERE id = $1
            RETURNING {MENU_COLUMNS}
            "
        ))
        .bind(id)
        .bind(input.date)
        .bind(&input.title)
        .bind(input.category)
        .bind(input.price)
        .bind(&input.description)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a menu item. It also drops out of any day's selection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: MenuItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Repository for the per-date orderable menu selection.
pub struct TodaysMenuRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TodaysMenuRepository<'a> {
    /// Create a new selection repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// IDs of the items selected for `date`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn selection_for(&self, date: NaiveDate) -> Result<Vec<MenuItemId>, RepositoryError> {
        let ids: Vec<MenuItemId> = sqlx::query_scalar(
            "SELECT menu_item_id FROM todays_menu WHERE date = $1 ORDER BY menu_item_id",
        )
        .bind(date)
        .fetch_all(self.pool)
        .await?;
        Ok(ids)
    }

    /// Full menu items selected for `date`, in serving order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for(&self, date: NaiveDate) -> Result<Vec<MenuItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, MenuItemRow>(
            r"
            SELECT m.id, m.date, m.title, m.category, m.price, m.description, m.created_at
            FROM todays_menu t
            JOIN menu_items m ON m.id = t.menu_item_id
            WHERE t.date = $1
            ORDER BY m.category, m.title, m.id
            ",
        )
        .bind(date)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Look up one item, only if it is part of the selection for `date`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn selected_item(
        &self,
        date: NaiveDate,
        id: MenuItemId,
    ) -> Result<Option<MenuItem>, RepositoryError> {
        let row = sqlx::query_as::<_, MenuItemRow>(
            r"
            SELECT m.id, m.date, m.title, m.category, m.price, m.description, m.created_at
            FROM todays_menu t
            JOIN menu_items m ON m.id = t.menu_item_id
            WHERE t.date = $1 AND t.menu_item_id = $2
            ",
        )
        .bind(date)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Replace the selection for `date` with exactly `ids`.
    ///
    /// Runs as delete-then-insert in one transaction, so readers never see a
    /// half-saved selection. Unknown IDs are skipped. Returns the number of
    /// items now selected.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either statement fails; the
    /// previous selection is then left intact.
    pub async fn replace(&self, date: NaiveDate, ids: &[MenuItemId]) -> Result<u64, RepositoryError> {
        let mut raw: Vec<i32> = ids.iter().map(MenuItemId::as_i32).collect();
        raw.sort_unstable();
        raw.dedup();

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM todays_menu WHERE date = $1")
            .bind(date)
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            r"
            INSERT INTO todays_menu (date, menu_item_id)
            SELECT $1, id FROM menu_items WHERE id = ANY($2)
            ",
        )
        .bind(date)
        .bind(&raw)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::info!(%date, selected = inserted, "Saved today's menu selection");
        Ok(inserted)
    }
}

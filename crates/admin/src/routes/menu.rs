//! Menu items and today's menu selection.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::instrument;

use jmd_tiffins_core::{MealCategory, MenuItemId, Money, business_offset, local_today};

use super::{SelectOption, StaffView, non_empty, parse_optional};
use crate::{
    db::{MenuRepository, RepositoryError, TodaysMenuRepository, menu::MENU_ITEMS_PER_PAGE},
    error::AppError,
    filters,
    middleware::RequireAdminAuth,
    models::{MenuItem, MenuItemInput, menu::group_by_category, order::page_count},
    routes::dashboard::PaginationView,
    state::AppState,
};

/// Form field carrying a selected menu item ID on the share page.
const SELECTION_FIELD: &str = "item";

/// Menu list query parameters.
#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    pub page: Option<u32>,
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Add/edit menu item form input.
#[derive(Debug, Deserialize)]
pub struct MenuItemForm {
    pub date: Option<String>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
}

impl MenuItemForm {
    /// Validate into an input, or the error code to redirect with.
    ///
    /// A blank date means `today`.
    fn into_input(self, today: NaiveDate) -> Result<MenuItemInput, &'static str> {
        let date = parse_optional::<NaiveDate>(self.date.as_deref())
            .map_err(|()| "date")?
            .unwrap_or(today);
        let title = non_empty(self.title.as_deref()).ok_or("title")?.to_string();
        let category = parse_optional::<MealCategory>(self.category.as_deref())
            .ok()
            .flatten()
            .ok_or("category")?;
        let price = non_empty(self.price.as_deref())
            .and_then(|p| Money::parse(p).ok())
            .ok_or("price")?;
        let description = non_empty(self.description.as_deref()).map(String::from);

        Ok(MenuItemInput {
            date,
            title,
            category,
            price,
            description,
        })
    }
}

/// Menu item row for templates.
#[derive(Debug, Clone)]
pub struct MenuItemView {
    pub id: i32,
    pub date: String,
    pub title: String,
    pub category: String,
    pub price: String,
    pub description: String,
}

impl From<&MenuItem> for MenuItemView {
    fn from(item: &MenuItem) -> Self {
        Self {
            id: item.id.as_i32(),
            date: item.date.format("%d %b %Y").to_string(),
            title: item.title.clone(),
            category: item.category.to_string(),
            price: item.price.to_string(),
            description: item.description.clone().unwrap_or_default(),
        }
    }
}

/// A checkbox on the share page.
#[derive(Debug, Clone)]
pub struct MenuChoiceView {
    pub id: i32,
    pub label: String,
    pub checked: bool,
}

/// Items of one meal category.
#[derive(Debug, Clone)]
pub struct MenuGroupView {
    pub label: String,
    pub items: Vec<MenuChoiceView>,
}

/// Group items by category, checking those in `selected`.
#[must_use]
pub fn menu_groups(items: Vec<MenuItem>, selected: &[MenuItemId]) -> Vec<MenuGroupView> {
    group_by_category(items)
        .into_iter()
        .map(|(category, items)| MenuGroupView {
            label: category.to_string(),
            items: items
                .iter()
                .map(|item| MenuChoiceView {
                    id: item.id.as_i32(),
                    label: item.picker_label(),
                    checked: selected.contains(&item.id),
                })
                .collect(),
        })
        .collect()
}

/// Menu list page template.
#[derive(Template, WebTemplate)]
#[template(path = "menu/index.html")]
pub struct MenuIndexTemplate {
    pub staff: StaffView,
    pub current_path: String,
    pub success: Option<String>,
    pub error: Option<String>,
    pub items: Vec<MenuItemView>,
    pub pagination: PaginationView,
    pub categories: Vec<SelectOption>,
    pub today: String,
}

/// Edit menu item page template.
#[derive(Template, WebTemplate)]
#[template(path = "menu/edit.html")]
pub struct MenuEditTemplate {
    pub staff: StaffView,
    pub current_path: String,
    pub error: Option<String>,
    pub id: i32,
    pub date: String,
    pub title: String,
    pub price: String,
    pub description: String,
    pub categories: Vec<SelectOption>,
}

/// Today's menu page template.
#[derive(Template, WebTemplate)]
#[template(path = "menu/share.html")]
pub struct MenuShareTemplate {
    pub staff: StaffView,
    pub current_path: String,
    pub success: Option<String>,
    pub today: String,
    pub groups: Vec<MenuGroupView>,
    pub order_link: String,
}

fn category_options(current: Option<MealCategory>) -> Vec<SelectOption> {
    MealCategory::ALL
        .iter()
        .map(|c| SelectOption::new(c.as_str(), c.to_string(), current == Some(*c)))
        .collect()
}

fn success_message(code: &str) -> Option<String> {
    let message = match code {
        "added" => "Menu item added.",
        "updated" => "Menu item updated. Existing orders keep their original details.",
        "deleted" => "Menu item deleted.",
        "saved" => "Today's menu updated!",
        _ => return None,
    };
    Some(message.to_string())
}

fn error_message(code: &str) -> String {
    match code {
        "date" => "Please enter a valid date.",
        "title" => "Title is required.",
        "category" => "Please pick a category.",
        "price" => "Please enter a valid, non-negative price.",
        "not_found" => "That menu item no longer exists.",
        _ => "Something went wrong. Please try again.",
    }
    .to_string()
}

/// Parse checked menu item IDs from a urlencoded body with repeated keys.
fn selected_ids(body: &[u8]) -> Vec<MenuItemId> {
    url::form_urlencoded::parse(body)
        .filter(|(key, _)| key == SELECTION_FIELD)
        .filter_map(|(_, value)| value.trim().parse::<i32>().ok())
        .map(MenuItemId::new)
        .collect()
}

fn today() -> NaiveDate {
    local_today(Utc::now(), business_offset())
}

/// Menu list page handler.
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> Result<MenuIndexTemplate, AppError> {
    let repo = MenuRepository::new(state.pool());
    let page = query.page.unwrap_or(1).max(1);
    let items = repo.list_page(page, MENU_ITEMS_PER_PAGE).await?;
    let total = repo.count().await?;
    let total_pages = page_count(total, MENU_ITEMS_PER_PAGE);

    Ok(MenuIndexTemplate {
        staff: StaffView::from(&admin),
        current_path: "/menu".to_string(),
        success: query.success.as_deref().and_then(success_message),
        error: query.error.as_deref().map(error_message),
        items: items.iter().map(MenuItemView::from).collect(),
        pagination: PaginationView::new(page, total_pages, |p| format!("/menu?page={p}")),
        categories: category_options(None),
        today: today().to_string(),
    })
}

/// Add a menu item.
#[instrument(skip_all)]
pub async fn create(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Form(form): Form<MenuItemForm>,
) -> Result<Response, AppError> {
    let input = match form.into_input(today()) {
        Ok(input) => input,
        Err(code) => return Ok(Redirect::to(&format!("/menu?error={code}")).into_response()),
    };

    MenuRepository::new(state.pool()).create(&input).await?;
    Ok(Redirect::to("/menu?success=added").into_response())
}

/// Edit menu item page.
#[instrument(skip(admin, state))]
pub async fn edit_page(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<MenuQuery>,
) -> Result<Response, AppError> {
    let Some(item) = MenuRepository::new(state.pool())
        .get(MenuItemId::new(id))
        .await?
    else {
        return Ok(Redirect::to("/menu?error=not_found").into_response());
    };

    Ok(MenuEditTemplate {
        staff: StaffView::from(&admin),
        current_path: "/menu".to_string(),
        error: query.error.as_deref().map(error_message),
        id,
        date: item.date.to_string(),
        title: item.title.clone(),
        price: item.price.amount().to_string(),
        description: item.description.clone().unwrap_or_default(),
        categories: category_options(Some(item.category)),
    }
    .into_response())
}

/// Update a menu item. Orders already placed keep their snapshot.
#[instrument(skip_all, fields(menu_item_id = id))]
pub async fn update(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<MenuItemForm>,
) -> Result<Response, AppError> {
    let input = match form.into_input(today()) {
        Ok(input) => input,
        Err(code) => {
            return Ok(Redirect::to(&format!("/menu/{id}/edit?error={code}")).into_response());
        }
    };

    match MenuRepository::new(state.pool())
        .update(MenuItemId::new(id), &input)
        .await
    {
        Ok(_) => Ok(Redirect::to("/menu?success=updated").into_response()),
        Err(RepositoryError::NotFound) => Ok(Redirect::to("/menu?error=not_found").into_response()),
        Err(e) => Err(e.into()),
    }
}

/// Delete a menu item.
#[instrument(skip_all, fields(menu_item_id = id))]
pub async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    if MenuRepository::new(state.pool())
        .delete(MenuItemId::new(id))
        .await?
    {
        Ok(Redirect::to("/menu?success=deleted").into_response())
    } else {
        Ok(Redirect::to("/menu?error=not_found").into_response())
    }
}

/// Today's menu page: every item grouped by category, today's picks
/// checked, plus the public order link.
#[instrument(skip(admin, state))]
pub async fn share_page(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> Result<MenuShareTemplate, AppError> {
    let pool = state.pool();
    let today = today();
    let items = MenuRepository::new(pool).list_all().await?;
    let selected = TodaysMenuRepository::new(pool).selection_for(today).await?;

    Ok(MenuShareTemplate {
        staff: StaffView::from(&admin),
        current_path: "/menu/share".to_string(),
        success: query.success.as_deref().and_then(success_message),
        today: today.format("%A, %d %b %Y").to_string(),
        groups: menu_groups(items, &selected),
        order_link: state.config().public_order_url(),
    })
}

/// Replace today's selection with the checked items.
#[instrument(skip_all)]
pub async fn save_share(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let ids = selected_ids(&body);
    TodaysMenuRepository::new(state.pool())
        .replace(today(), &ids)
        .await?;
    Ok(Redirect::to("/menu/share?success=saved").into_response())
}

//! Catalog route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::instrument;

use gamewar_core::{CatalogFilter, Category};

use super::page::{Choice, Page, ProductCard};
use crate::error::AppError;
use crate::filters;
use crate::middleware::Viewer;
use crate::state::AppState;

/// Catalog query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

impl CatalogQuery {
    /// Unknown categories are ignored rather than rejected.
    fn filter(&self) -> CatalogFilter {
        CatalogFilter {
            search: self.q.as_deref().unwrap_or_default().trim().to_owned(),
            category: self.category.as_deref().and_then(|c| c.parse().ok()),
        }
    }
}

/// Catalog template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsTemplate {
    pub page: Page,
    pub search: String,
    pub categories: Vec<Choice>,
    pub cards: Vec<ProductCard>,
    /// Path of this listing, to come back to after adding to the cart.
    pub current: String,
}

/// Display the catalog.
#[instrument(skip(state, viewer))]
pub async fn index(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<CatalogQuery>,
) -> Result<ProductsTemplate, AppError> {
    let page = Page::new(&viewer, &state).await?;
    let filter = query.filter();

    let products = state.catalog().search(&filter).await?;
    tracing::debug!(results = products.len(), "Catalog search");

    let categories = Category::ALL
        .into_iter()
        .map(|c| Choice::new(c.as_str(), c.translation_key(), filter.category == Some(c), page.lang))
        .collect();

    let mut current = url::form_urlencoded::Serializer::new(String::new());
    if !filter.search.is_empty() {
        current.append_pair("q", &filter.search);
    }
    if let Some(category) = filter.category {
        current.append_pair("category", category.as_str());
    }
    let current = match current.finish() {
        qs if qs.is_empty() => "/products".to_owned(),
        qs => format!("/products?{qs}"),
    };

    Ok(ProductsTemplate {
        cards: ProductCard::list(&products, &page),
        search: filter.search,
        categories,
        current,
        page,
    })
}

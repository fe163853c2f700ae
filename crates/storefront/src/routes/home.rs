//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use gamewar_core::Category;

use super::page::{Page, ProductCard};
use crate::error::AppError;
use crate::filters;
use crate::middleware::Viewer;
use crate::state::AppState;

/// Category tile linking to the filtered catalog.
pub struct CategoryTile {
    pub value: &'static str,
    pub icon: &'static str,
    pub label: &'static str,
}

/// A home page section: one category and its newest products.
pub struct SectionView {
    pub category: CategoryTile,
    pub cards: Vec<ProductCard>,
}

impl CategoryTile {
    fn new(category: Category, page: &Page) -> Self {
        Self {
            value: category.as_str(),
            icon: category.icon(),
            label: page.t(category.translation_key()),
        }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: Page,
    pub tiles: Vec<CategoryTile>,
    pub sections: Vec<SectionView>,
}

/// Display the home page.
///
/// A catalog failure renders the page without sections.
#[instrument(skip(state, viewer))]
pub async fn home(State(state): State<AppState>, viewer: Viewer) -> Result<HomeTemplate, AppError> {
    let page = Page::new(&viewer, &state).await?;

    let sections = match state.catalog().home_sections().await {
        Ok(sections) => sections,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load home sections");
            Vec::new()
        }
    };

    let sections = sections
        .into_iter()
        .map(|(category, products)| SectionView {
            category: CategoryTile::new(category, &page),
            cards: ProductCard::list(&products, &page),
        })
        .collect();
    let tiles = Category::HOME
        .into_iter()
        .map(|category| CategoryTile::new(category, &page))
        .collect();

    Ok(HomeTemplate {
        page,
        tiles,
        sections,
    })
}

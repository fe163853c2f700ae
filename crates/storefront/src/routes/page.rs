//! Data shared by every rendered page, and small view models.

use gamewar_core::{Access, Dinars, Language, Product, order, translate};

use crate::error::AppError;
use crate::middleware::Viewer;
use crate::models::Flash;
use crate::state::AppState;

/// A pending flash, already translated.
pub struct FlashView {
    pub class: &'static str,
    pub text: String,
}

/// Navbar, language switch, flash and floating WhatsApp button.
pub struct Page {
    pub lang: Language,
    pub access: Access,
    pub signed_in: bool,
    pub user_label: Option<String>,
    pub credit: Option<String>,
    pub cart_count: usize,
    pub flash: Option<FlashView>,
    pub whatsapp_url: Option<String>,
}

impl Page {
    /// Build the chrome for `viewer`, consuming its pending flash.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn new(viewer: &Viewer, state: &AppState) -> Result<Self, AppError> {
        let lang = viewer.lang;
        let flash = Flash::take(&viewer.session).await?.map(|flash| FlashView {
            class: flash.kind.css_class(),
            text: translate(&flash.key, lang).to_owned(),
        });
        let cart_count = viewer.carts(state).load().await?.line_count();

        Ok(Self {
            lang,
            access: viewer.access,
            signed_in: viewer.signed_in(),
            user_label: viewer.profile.as_ref().map(|p| p.label().to_owned()),
            credit: viewer.profile.as_ref().map(|p| p.credit.format_amount()),
            cart_count,
            flash,
            whatsapp_url: order::whatsapp_link(&state.config().whatsapp_number, None),
        })
    }

    /// Translate an interface string.
    #[must_use]
    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        translate(key, self.lang)
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.lang.code()
    }

    #[must_use]
    pub const fn dir(&self) -> &'static str {
        self.lang.dir()
    }

    /// Code of the language the switch leads to.
    #[must_use]
    pub const fn other_code(&self) -> &'static str {
        self.lang.other().code()
    }

    #[must_use]
    pub const fn toggle_label(&self) -> &'static str {
        self.lang.toggle_label()
    }

    #[must_use]
    pub fn money(&self, amount: &Dinars) -> String {
        amount.display(self.lang)
    }
}

/// One `<option>` of a select.
pub struct Choice {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

impl Choice {
    #[must_use]
    pub fn new(value: &'static str, label_key: &'static str, selected: bool, lang: Language) -> Self {
        Self {
            value,
            label: translate(label_key, lang),
            selected,
        }
    }
}

/// A product tile.
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub category: &'static str,
    /// `None` when the visitor may not see prices.
    pub price: Option<String>,
    pub in_stock: bool,
    pub stock: u32,
    pub stock_class: &'static str,
    pub stock_label: &'static str,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, page: &Page) -> Self {
        let level = product.stock_level();
        Self {
            id: product.id.to_string(),
            name: product.name_in(page.lang).to_owned(),
            description: product.description_in(page.lang).to_owned(),
            image: product.image().map(str::to_owned),
            category: page.t(product.category.translation_key()),
            price: page
                .access
                .can_see_prices
                .then(|| page.money(&product.price)),
            in_stock: product.in_stock(),
            stock: product.stock,
            stock_class: level.css_class(),
            stock_label: page.t(level.translation_key()),
        }
    }

    #[must_use]
    pub fn list(products: &[Product], page: &Page) -> Vec<Self> {
        products.iter().map(|p| Self::new(p, page)).collect()
    }
}

/// Keep only same-site paths from a `next` form field.
#[must_use]
pub fn local_path(next: Option<&str>, fallback: &'static str) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_owned(),
        _ => fallback.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path_rejects_other_sites() {
        assert_eq!(local_path(Some("/products?q=ps5"), "/"), "/products?q=ps5");
        assert_eq!(local_path(Some("//evil.example"), "/"), "/");
        assert_eq!(local_path(Some("https://evil.example"), "/cart"), "/cart");
        assert_eq!(local_path(None, "/cart"), "/cart");
    }
}

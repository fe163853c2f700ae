//! Products, categories and the stock-history log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::i18n::{Language, Localized};
use crate::types::{Dinars, ProductId, UserId};

/// Product category tag, stored with the exact spelling below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    #[default]
    Controllers,
    Headsets,
    Cables,
    Wifi,
    Accessories,
    Consoles,
    GiftCards,
}

impl Category {
    pub const ALL: [Self; 7] = [
        Self::Controllers,
        Self::Headsets,
        Self::Cables,
        Self::Wifi,
        Self::Accessories,
        Self::Consoles,
        Self::GiftCards,
    ];

    /// Categories with a tile and a section on the home page.
    pub const HOME: [Self; 6] = [
        Self::Controllers,
        Self::Headsets,
        Self::Cables,
        Self::Wifi,
        Self::Consoles,
        Self::GiftCards,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Controllers => "controllers",
            Self::Headsets => "headsets",
            Self::Cables => "cables",
            Self::Wifi => "wifi",
            Self::Accessories => "accessories",
            Self::Consoles => "consoles",
            Self::GiftCards => "giftCards",
        }
    }

    /// The stored tag doubles as the translation key.
    #[must_use]
    pub const fn translation_key(self) -> &'static str {
        self.as_str()
    }

    /// Icon shown on the home page tile.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Controllers => "🎮",
            Self::Headsets => "🎧",
            Self::Cables => "🔌",
            Self::Wifi => "📶",
            Self::Accessories => "🧰",
            Self::Consoles => "🕹️",
            Self::GiftCards => "🎁",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The category tag is not one the shop knows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl std::str::FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

/// One entry of a product's stock-history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockHistoryEntry {
    pub previous_stock: u32,
    pub new_stock: u32,
    pub updated_at: DateTime<Utc>,
    /// Email of the admin who saved the change, or `unknown`.
    pub updated_by: String,
}

impl StockHistoryEntry {
    /// Signed difference, for display.
    #[must_use]
    pub fn delta(&self) -> i64 {
        i64::from(self.new_stock) - i64::from(self.previous_stock)
    }
}

/// A product document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: Localized,
    pub description: Localized,
    pub price: Dinars,
    pub stock: u32,
    pub category: Category,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Owner for seller-created products; admin-created products may have none.
    pub created_by: Option<UserId>,
    pub stock_history: Vec<StockHistoryEntry>,
}

impl Product {
    /// A new product from a validated draft.
    #[must_use]
    pub fn new(
        id: ProductId,
        draft: ProductDraft,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            stock: draft.stock,
            category: draft.category,
            images: draft.images,
            created_at: now,
            updated_at: now,
            created_by,
            stock_history: Vec::new(),
        }
    }

    #[must_use]
    pub fn name_in(&self, lang: Language) -> &str {
        self.name.get(lang)
    }

    #[must_use]
    pub fn description_in(&self, lang: Language) -> &str {
        self.description.get(lang)
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    #[must_use]
    pub const fn stock_level(&self) -> StockLevel {
        StockLevel::of(self.stock)
    }

    /// Whether `user` may edit this product from the seller screens.
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.created_by.as_ref() == Some(user)
    }

    /// The history entry recording a manual stock change.
    ///
    /// # Errors
    ///
    /// Returns [`StockError::Unchanged`] when `new_stock` equals the current
    /// stock.
    pub fn stock_change(
        &self,
        new_stock: u32,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<StockHistoryEntry, StockError> {
        if new_stock == self.stock {
            return Err(StockError::Unchanged);
        }
        let updated_by = if actor.trim().is_empty() {
            "unknown".to_owned()
        } else {
            actor.to_owned()
        };
        Ok(StockHistoryEntry {
            previous_stock: self.stock,
            new_stock,
            updated_at: now,
            updated_by,
        })
    }

    /// Record a stock change on this product.
    pub fn apply_stock_change(&mut self, entry: StockHistoryEntry) {
        self.stock = entry.new_stock;
        self.updated_at = entry.updated_at;
        self.stock_history.push(entry);
    }

    /// Overwrite the editable fields from a draft, keeping stock history.
    pub fn apply_draft(&mut self, draft: ProductDraft, now: DateTime<Utc>) {
        self.name = draft.name;
        self.description = draft.description;
        self.price = draft.price;
        self.stock = draft.stock;
        self.category = draft.category;
        self.images = draft.images;
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StockError {
    #[error("stock unchanged, nothing to save")]
    Unchanged,
}

/// The product create/edit form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: Localized,
    pub description: Localized,
    pub price: Dinars,
    pub stock: u32,
    pub category: Category,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductDraftError {
    #[error("product name is required in French and Arabic")]
    MissingName,
    #[error("price cannot be negative")]
    NegativePrice,
}

impl ProductDraft {
    /// Trim the names and drop blank image URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if either name is blank or the price is negative.
    pub fn validate(mut self) -> Result<Self, ProductDraftError> {
        self.name = Localized::new(self.name.fr.trim(), self.name.ar.trim());
        if self.name.fr.is_empty() || self.name.ar.is_empty() {
            return Err(ProductDraftError::MissingName);
        }
        if self.price.is_negative() {
            return Err(ProductDraftError::NegativePrice);
        }
        self.images = self
            .images
            .into_iter()
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty())
            .collect();
        Ok(self)
    }

    /// Pre-filled form for editing an existing product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            stock: product.stock,
            category: product.category,
            images: product.images.clone(),
        }
    }
}

/// Stock status shown on the admin stock screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockLevel {
    Out,
    Low,
    Ok,
}

impl StockLevel {
    /// Largest stock still considered low.
    pub const LOW_THRESHOLD: u32 = 3;

    #[must_use]
    pub const fn of(stock: u32) -> Self {
        match stock {
            0 => Self::Out,
            1..=Self::LOW_THRESHOLD => Self::Low,
            _ => Self::Ok,
        }
    }

    #[must_use]
    pub const fn translation_key(self) -> &'static str {
        match self {
            Self::Out => "outOfStock",
            Self::Low => "lowStock",
            Self::Ok => "stockOk",
        }
    }

    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Out => "stock-out",
            Self::Low => "stock-low",
            Self::Ok => "stock-ok",
        }
    }
}

/// Read a quantity or stock count typed into a form.
///
/// Negative numbers read as 0 and numbers past `u32::MAX` saturate. Blank or
/// non-numeric input is `None`.
#[must_use]
pub fn parse_count(input: &str) -> Option<u32> {
    let text = input.trim();
    if let Ok(n) = text.parse::<i64>() {
        return Some(u32::try_from(n.max(0)).unwrap_or(u32::MAX));
    }
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, text.get(1..).unwrap_or_default()),
        Some(b'+') => (false, text.get(1..).unwrap_or_default()),
        _ => (false, text),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { 0 } else { u32::MAX })
}

/// Warning badge on a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartStockBadge {
    LastItems,
    LowStock,
}

impl CartStockBadge {
    #[must_use]
    pub const fn of(stock: u32) -> Option<Self> {
        match stock {
            0..=3 => Some(Self::LastItems),
            4..=5 => Some(Self::LowStock),
            _ => None,
        }
    }

    #[must_use]
    pub const fn translation_key(self) -> &'static str {
        match self {
            Self::LastItems => "lastItems",
            Self::LowStock => "lowStock",
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn product(id: &str, price: i64, stock: u32) -> Product {
        let draft = ProductDraft {
            name: Localized::new(format!("Produit {id}"), format!("منتج {id}")),
            description: Localized::new("Description", "وصف"),
            price: Dinars::from_whole(price),
            stock,
            category: Category::Controllers,
            images: vec![],
        };
        Product::new(ProductId::new(id), draft, None, Utc::now())
    }

    #[test]
    fn test_category_tags() {
        assert_eq!(Category::GiftCards.as_str(), "giftCards");
        assert_eq!(
            serde_json::to_string(&Category::GiftCards).unwrap(),
            "\"giftCards\""
        );
        assert_eq!("wifi".parse::<Category>().unwrap(), Category::Wifi);
        assert!("GiftCards".parse::<Category>().is_err());
        assert!(!Category::HOME.contains(&Category::Accessories));
    }

    #[test]
    fn test_stock_change_records_history() {
        let mut p = product("p1", 1000, 5);
        let entry = p.stock_change(8, "admin@gamewar.dz", Utc::now()).unwrap();
        assert_eq!(entry.previous_stock, 5);
        assert_eq!(entry.new_stock, 8);
        assert_eq!(entry.delta(), 3);

        p.apply_stock_change(entry);
        assert_eq!(p.stock, 8);
        assert_eq!(p.stock_history.len(), 1);

        let entry = p.stock_change(2, "", Utc::now()).unwrap();
        assert_eq!(entry.updated_by, "unknown");
        p.apply_stock_change(entry);
        assert_eq!(p.stock_history.len(), 2);
        assert_eq!(p.stock_history[0].new_stock, 8);
    }

    #[test]
    fn test_stock_change_rejects_same_value() {
        let p = product("p1", 1000, 5);
        assert_eq!(
            p.stock_change(5, "admin@gamewar.dz", Utc::now()),
            Err(StockError::Unchanged)
        );
    }

    #[test]
    fn test_draft_validation() {
        let draft = ProductDraft {
            name: Localized::new("  Manette ", " يد "),
            images: vec![String::new(), " https://img/1.png ".to_owned()],
            ..ProductDraft::default()
        };
        let valid = draft.validate().unwrap();
        assert_eq!(valid.name.fr, "Manette");
        assert_eq!(valid.images, vec!["https://img/1.png".to_owned()]);

        let missing_ar = ProductDraft {
            name: Localized::new("Manette", "   "),
            ..ProductDraft::default()
        };
        assert_eq!(missing_ar.validate(), Err(ProductDraftError::MissingName));

        let negative = ProductDraft {
            name: Localized::new("Manette", "يد"),
            price: Dinars::from_whole(-1),
            ..ProductDraft::default()
        };
        assert_eq!(negative.validate(), Err(ProductDraftError::NegativePrice));
    }

    #[test]
    fn test_stock_levels() {
        assert_eq!(StockLevel::of(0), StockLevel::Out);
        assert_eq!(StockLevel::of(1), StockLevel::Low);
        assert_eq!(StockLevel::of(3), StockLevel::Low);
        assert_eq!(StockLevel::of(4), StockLevel::Ok);
    }

    #[test]
    fn test_cart_badges() {
        assert_eq!(CartStockBadge::of(3), Some(CartStockBadge::LastItems));
        assert_eq!(CartStockBadge::of(5), Some(CartStockBadge::LowStock));
        assert_eq!(CartStockBadge::of(6), None);
    }

    #[test]
    fn test_ownership() {
        let mut p = product("p1", 100, 1);
        let seller = UserId::new("seller-1");
        assert!(!p.is_owned_by(&seller));
        p.created_by = Some(seller.clone());
        assert!(p.is_owned_by(&seller));
    }

    #[test]
    fn test_parse_count_saturates() {
        assert_eq!(parse_count(" 4 "), Some(4));
        assert_eq!(parse_count("-2"), Some(0));
        assert_eq!(parse_count("99999999999"), Some(u32::MAX));
        assert_eq!(parse_count("123456789012345678901234567890"), Some(u32::MAX));
        assert_eq!(parse_count("-123456789012345678901234567890"), Some(0));
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("deux"), None);
        assert_eq!(parse_count("-"), None);
    }
}

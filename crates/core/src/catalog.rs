//! Catalog filtering and grouping.
//!
//! The whole product collection is fetched at once, so every filter here
//! works in-process over a slice.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::i18n::Language;
use crate::order::Order;
use crate::product::{Category, Product, StockLevel};
use crate::types::ProductId;

/// Search box plus category dropdown of the products page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub search: String,
    pub category: Option<Category>,
}

impl CatalogFilter {
    /// French text matches case-insensitively, Arabic text as typed.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let matches_category = self.category.is_none_or(|c| product.category == c);
        matches_category && self.matches_search(product)
    }

    fn matches_search(&self, product: &Product) -> bool {
        let term = self.search.trim();
        if term.is_empty() {
            return true;
        }
        let lowered = term.to_lowercase();
        product.name.fr.to_lowercase().contains(&lowered)
            || product.name.ar.contains(term)
            || product.description.fr.to_lowercase().contains(&lowered)
            || product.description.ar.contains(term)
    }

    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Products per category, in input order.
#[must_use]
pub fn group_by_category(products: &[Product]) -> HashMap<Category, Vec<&Product>> {
    let mut grouped: HashMap<Category, Vec<&Product>> = HashMap::new();
    for product in products {
        grouped.entry(product.category).or_default().push(product);
    }
    grouped
}

/// Home page sections: each home category that has products, with at most
/// `per_section` of them.
#[must_use]
pub fn home_sections(products: &[Product], per_section: usize) -> Vec<(Category, Vec<&Product>)> {
    let mut grouped = group_by_category(products);
    Category::HOME
        .into_iter()
        .filter_map(|category| {
            let mut items = grouped.remove(&category)?;
            items.truncate(per_section);
            Some((category, items))
        })
        .collect()
}

/// Newest first, the order the catalog is listed in.
pub fn sort_newest_first(products: &mut [Product]) {
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Filter buttons of the admin stock screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockFilter {
    #[default]
    All,
    Ok,
    Low,
    Out,
}

impl StockFilter {
    pub const ALL: [Self; 4] = [Self::All, Self::Ok, Self::Low, Self::Out];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Ok => "ok",
            Self::Low => "low",
            Self::Out => "out",
        }
    }

    #[must_use]
    pub const fn translation_key(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Ok => "stockOk",
            Self::Low => "lowStock",
            Self::Out => "outOfStock",
        }
    }

    #[must_use]
    pub fn matches(self, stock: u32) -> bool {
        let level = StockLevel::of(stock);
        match self {
            Self::All => true,
            Self::Ok => level == StockLevel::Ok,
            Self::Low => level == StockLevel::Low,
            Self::Out => level == StockLevel::Out,
        }
    }
}

impl std::str::FromStr for StockFilter {
    type Err = crate::types::ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| crate::types::ParseStatusError {
                kind: "stock filter",
                value: s.to_owned(),
            })
    }
}

/// Admin stock screen: case-insensitive search on the name in the current
/// language, then the stock filter.
#[must_use]
pub fn admin_filter<'a>(
    products: &'a [Product],
    query: &str,
    filter: StockFilter,
    lang: Language,
) -> Vec<&'a Product> {
    let query = query.trim().to_lowercase();
    products
        .iter()
        .filter(|p| p.name_in(lang).to_lowercase().contains(&query))
        .filter(|p| filter.matches(p.stock))
        .collect()
}

/// Number of order lines referencing each product.
#[must_use]
pub fn order_counts(orders: &[Order]) -> HashMap<ProductId, usize> {
    let mut counts = HashMap::new();
    for line in orders.iter().flat_map(|order| &order.items) {
        *counts.entry(line.product_id.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::cart::Cart;
    use crate::i18n::Localized;
    use crate::order::{CheckoutDetails, NewOrder};
    use crate::product::tests::product;
    use crate::profile::UserProfile;
    use crate::types::{OrderId, UserId};

    fn catalog() -> Vec<Product> {
        let mut headset = product("h1", 5000, 2);
        headset.category = Category::Headsets;
        headset.name = Localized::new("Casque HyperX", "سماعة هايبر");
        headset.description = Localized::new("Son surround", "صوت محيطي");

        let mut pad = product("c1", 3000, 10);
        pad.name = Localized::new("Manette DualSense", "يد دوال سنس");

        let mut empty = product("c2", 2500, 0);
        empty.name = Localized::new("Manette Xbox", "يد إكس بوكس");

        let mut bag = product("a1", 900, 7);
        bag.category = Category::Accessories;

        vec![headset, pad, empty, bag]
    }

    #[test]
    fn test_search_is_case_insensitive_on_french() {
        let products = catalog();
        let filter = CatalogFilter {
            search: "MANETTE".to_owned(),
            category: None,
        };
        let ids: Vec<&str> = filter.apply(&products).iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2"]);

        let by_description = CatalogFilter {
            search: "surround".to_owned(),
            category: None,
        };
        assert_eq!(by_description.apply(&products).len(), 1);
    }

    #[test]
    fn test_search_matches_arabic() {
        let products = catalog();
        let filter = CatalogFilter {
            search: "سماعة".to_owned(),
            category: None,
        };
        assert_eq!(filter.apply(&products)[0].id.as_str(), "h1");
    }

    #[test]
    fn test_category_filter_combines_with_search() {
        let products = catalog();
        let filter = CatalogFilter {
            search: String::new(),
            category: Some(Category::Controllers),
        };
        assert_eq!(filter.apply(&products).len(), 2);

        let none = CatalogFilter {
            search: "casque".to_owned(),
            category: Some(Category::Controllers),
        };
        assert!(none.apply(&products).is_empty());
    }

    #[test]
    fn test_home_sections_skip_accessories_and_cap() {
        let products = catalog();
        let sections = home_sections(&products, 1);
        let categories: Vec<Category> = sections.iter().map(|(c, _)| *c).collect();
        assert_eq!(categories, [Category::Controllers, Category::Headsets]);
        assert_eq!(sections[0].1.len(), 1);
        assert_eq!(sections[0].1[0].id.as_str(), "c1");
    }

    #[test]
    fn test_admin_filter() {
        let products = catalog();
        let low = admin_filter(&products, "", StockFilter::Low, Language::Fr);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id.as_str(), "h1");

        let out = admin_filter(&products, "xbox", StockFilter::Out, Language::Fr);
        assert_eq!(out[0].id.as_str(), "c2");

        let ok = admin_filter(&products, "يد", StockFilter::Ok, Language::Ar);
        assert_eq!(ok.len(), 1);
        assert_eq!("low".parse::<StockFilter>().unwrap(), StockFilter::Low);
    }

    #[test]
    fn test_order_counts_count_lines() {
        let products = catalog();
        let profile = UserProfile::first_sign_in(UserId::new("u1"), "a@b.dz", Utc::now());
        let details = CheckoutDetails {
            phone: "0555".to_owned(),
            address: "Oran".to_owned(),
            notes: String::new(),
        };

        let mut first = Cart::new();
        first.add(&products[0]).unwrap();
        first.add(&products[0]).unwrap();
        first.add(&products[1]).unwrap();
        let mut second = Cart::new();
        second.add(&products[1]).unwrap();

        let orders: Vec<Order> = [first, second]
            .iter()
            .enumerate()
            .map(|(i, cart)| {
                NewOrder::from_cart(&profile, cart, details.clone(), Language::Fr, Utc::now())
                    .unwrap()
                    .with_id(OrderId::new(format!("o{i}")))
            })
            .collect();

        let counts = order_counts(&orders);
        assert_eq!(counts[&ProductId::new("h1")], 1);
        assert_eq!(counts[&ProductId::new("c1")], 2);
        assert!(!counts.contains_key(&ProductId::new("a1")));
    }

    #[test]
    fn test_sort_newest_first() {
        let mut products = catalog();
        products[3].created_at = Utc::now() + Duration::hours(1);
        sort_newest_first(&mut products);
        assert_eq!(products[0].id.as_str(), "a1");
    }
}

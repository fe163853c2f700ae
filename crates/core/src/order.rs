//! Order snapshots composed at checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::i18n::Language;
use crate::profile::UserProfile;
use crate::types::{Dinars, OrderId, OrderStatus, ProductId, UserId};

/// TVA applied on top of the order total for display and invoices.
pub const TAX_RATE: Decimal = Decimal::from_parts(19, 0, 0, false, 2);

/// Line of an order, frozen at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    /// Product name in the language the customer was browsing in.
    pub name: String,
    pub quantity: u32,
    pub price: Dinars,
}

impl OrderLine {
    #[must_use]
    pub fn line_total(&self) -> Dinars {
        self.price.times(self.quantity)
    }
}

/// Contact fields entered on the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckoutDetails {
    pub phone: String,
    pub address: String,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("phone number is required")]
    MissingPhone,
    #[error("delivery address is required")]
    MissingAddress,
}

impl CheckoutDetails {
    /// Trim every field and require phone and address.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::MissingPhone`] or
    /// [`CheckoutError::MissingAddress`] for blank fields.
    pub fn validate(self) -> Result<Self, CheckoutError> {
        let details = Self {
            phone: self.phone.trim().to_owned(),
            address: self.address.trim().to_owned(),
            notes: self.notes.trim().to_owned(),
        };
        if details.phone.is_empty() {
            return Err(CheckoutError::MissingPhone);
        }
        if details.address.is_empty() {
            return Err(CheckoutError::MissingAddress);
        }
        Ok(details)
    }
}

/// An order ready to be appended to the `orders` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
    pub items: Vec<OrderLine>,
    pub total: Dinars,
    pub status: OrderStatus,
    pub phone: Option<String>,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Snapshot the cart into an order.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] for an empty cart, or the
    /// validation error of `details`.
    pub fn from_cart(
        profile: &UserProfile,
        cart: &Cart,
        details: CheckoutDetails,
        lang: Language,
        now: DateTime<Utc>,
    ) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let details = details.validate()?;

        let items = cart
            .items()
            .iter()
            .map(|item| OrderLine {
                product_id: item.product_id.clone(),
                name: item.product.name_in(lang).to_owned(),
                quantity: item.quantity,
                price: item.product.price,
            })
            .collect();

        Ok(Self {
            user_id: profile.uid.clone(),
            user_name: profile.display_name.clone().unwrap_or_default(),
            user_email: profile.email.clone(),
            user_phone: details.phone.clone(),
            items,
            total: cart.total(),
            status: OrderStatus::Pending,
            phone: Some(details.phone),
            delivery_address: Some(details.address),
            notes: Some(details.notes),
            created_at: now,
        })
    }

    #[must_use]
    pub fn with_id(self, id: OrderId) -> Order {
        Order {
            id,
            user_id: self.user_id,
            user_name: self.user_name,
            user_email: self.user_email,
            user_phone: self.user_phone,
            items: self.items,
            total: self.total,
            status: self.status,
            phone: self.phone,
            delivery_address: self.delivery_address,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
    pub items: Vec<OrderLine>,
    /// Total before tax.
    pub total: Dinars,
    pub status: OrderStatus,
    pub phone: Option<String>,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn tax(&self) -> Dinars {
        self.total.tax(TAX_RATE)
    }

    #[must_use]
    pub fn total_with_tax(&self) -> Dinars {
        self.total + self.tax()
    }

    /// The short reference shown to customers.
    #[must_use]
    pub fn short_ref(&self) -> &str {
        let id = self.id.as_str();
        id.char_indices()
            .nth(6)
            .and_then(|(end, _)| id.get(..end))
            .unwrap_or(id)
    }

    /// Phone number to reach the customer: the one given at checkout, else
    /// `fallback` (usually the profile phone).
    #[must_use]
    pub fn contact_phone<'a>(&'a self, fallback: Option<&'a str>) -> Option<&'a str> {
        fn given(phone: &&str) -> bool {
            !phone.trim().is_empty()
        }
        self.phone
            .as_deref()
            .filter(given)
            .or_else(|| Some(self.user_phone.as_str()).filter(given))
            .or_else(|| fallback.filter(given))
    }

    /// Text of the WhatsApp invoice message.
    #[must_use]
    pub fn invoice_message(&self, pdf_url: &str) -> String {
        format!(
            "🧾 FACTURE GAMEWAR\nCommande {}\nTotal: {} DA\n📄 {pdf_url}",
            self.short_ref(),
            self.total
        )
    }
}

/// Most recent orders first.
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// A `wa.me` link opening a chat with `phone` and a prefilled `message`.
///
/// Returns `None` when the phone number contains no digits.
#[must_use]
pub fn whatsapp_link(phone: &str, message: Option<&str>) -> Option<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    Some(match message {
        Some(text) => format!("https://wa.me/{digits}?text={}", urlencoding::encode(text)),
        None => format!("https://wa.me/{digits}"),
    })
}

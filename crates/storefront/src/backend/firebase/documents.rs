//! Mapping between domain types and stored documents.
//!
//! Field names are the stored ones (`nameFr`, `createdBy`, ...). Decoding is
//! lenient about optional fields so documents written by older clients still
//! load; a missing timestamp reads as the Unix epoch.

use chrono::{DateTime, Utc};
use tracing::warn;

use gamewar_core::profile::DEFAULT_CREDIT;
use gamewar_core::{
    Category, CreditLog, CreditLogId, CreditLogKind, Dinars, Localized, Order, OrderId,
    OrderLine, OrderStatus, Product, ProductId, RemoteCart, RemoteCartLine, StockHistoryEntry,
    UserId, UserProfile, UserRole, UserStatus,
};

use super::value::{Fields, FieldsExt, Value};
use crate::backend::BackendError;

pub const USERS: &str = "users";
pub const PRODUCTS: &str = "products";
pub const ORDERS: &str = "orders";
pub const CREDIT_LOGS: &str = "credit_logs";

/// Document path of a user's cart mirror.
#[must_use]
pub fn cart_path(uid: &UserId) -> String {
    format!("{USERS}/{uid}/cart/items")
}

/// A domain type stored as one document of a collection.
pub trait Document: Sized {
    const COLLECTION: &'static str;

    fn to_fields(&self) -> Fields;

    /// # Errors
    ///
    /// Returns [`BackendError::Document`] when a required field is missing
    /// or has an unknown value.
    fn from_fields(id: &str, fields: &Fields) -> Result<Self, BackendError>;
}

fn epoch_or(at: Option<DateTime<Utc>>) -> DateTime<Utc> {
    at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn malformed(collection: &str, id: &str, reason: impl Into<String>) -> BackendError {
    BackendError::Document {
        path: format!("{collection}/{id}"),
        reason: reason.into(),
    }
}

fn count(value: Option<i64>) -> u32 {
    value
        .and_then(|n| u32::try_from(n.max(0)).ok())
        .unwrap_or_default()
}

fn dinars(fields: &Fields, key: &str) -> Dinars {
    fields.decimal(key).map(Dinars::new).unwrap_or_default()
}

// =============================================================================
// users
// =============================================================================

impl Document for UserProfile {
    const COLLECTION: &'static str = USERS;

    fn to_fields(&self) -> Fields {
        Fields::from([
            ("email".to_owned(), Value::string(&self.email)),
            ("role".to_owned(), Value::string(self.role.as_str())),
            ("status".to_owned(), Value::string(self.status.as_str())),
            ("credit".to_owned(), Value::dinars(self.credit)),
            ("createdAt".to_owned(), Value::timestamp(self.created_at)),
            (
                "displayName".to_owned(),
                Value::optional_string(self.display_name.as_deref()),
            ),
            (
                "phone".to_owned(),
                Value::optional_string(self.phone.as_deref()),
            ),
        ])
    }

    fn from_fields(id: &str, fields: &Fields) -> Result<Self, BackendError> {
        let role = fields.str("role").map_or_else(UserRole::default, |role| {
            role.parse().unwrap_or_else(|e| {
                warn!(uid = id, error = %e, "Unknown role, reading as user");
                UserRole::default()
            })
        });
        let status = fields.str("status").map_or_else(UserStatus::default, |status| {
            status.parse().unwrap_or_else(|e| {
                warn!(uid = id, error = %e, "Unknown status, reading as pending");
                UserStatus::default()
            })
        });
        let credit = match fields.get("credit") {
            None | Some(Value::NullValue(_)) => DEFAULT_CREDIT,
            Some(value) => value.as_decimal().map(Dinars::new).unwrap_or_else(|| {
                warn!(uid = id, "Unreadable credit, reading as zero");
                Dinars::ZERO
            }),
        };

        Ok(Self {
            uid: UserId::new(id),
            email: fields.text("email"),
            role,
            status,
            credit,
            created_at: epoch_or(fields.timestamp("createdAt")),
            display_name: fields.non_blank("displayName"),
            phone: fields.non_blank("phone"),
        })
    }
}

// =============================================================================
// products
// =============================================================================

fn history_entry_fields(entry: &StockHistoryEntry) -> Value {
    Value::map(Fields::from([
        (
            "previousStock".to_owned(),
            Value::integer(i64::from(entry.previous_stock)),
        ),
        (
            "newStock".to_owned(),
            Value::integer(i64::from(entry.new_stock)),
        ),
        ("updatedAt".to_owned(), Value::timestamp(entry.updated_at)),
        ("updatedBy".to_owned(), Value::string(&entry.updated_by)),
    ]))
}

fn history_entry(value: &Value) -> Option<StockHistoryEntry> {
    let fields = value.as_map()?;
    Some(StockHistoryEntry {
        previous_stock: count(fields.i64("previousStock")),
        new_stock: count(fields.i64("newStock")),
        updated_at: epoch_or(fields.timestamp("updatedAt")),
        updated_by: fields
            .non_blank("updatedBy")
            .unwrap_or_else(|| "unknown".to_owned()),
    })
}

/// Fields written by a stock save.
#[must_use]
pub fn stock_fields(product: &Product) -> Fields {
    Fields::from([
        (
            "stock".to_owned(),
            Value::integer(i64::from(product.stock)),
        ),
        (
            "stockHistory".to_owned(),
            Value::array(product.stock_history.iter().map(history_entry_fields)),
        ),
        ("updatedAt".to_owned(), Value::timestamp(product.updated_at)),
    ])
}

/// Fields written by the product edit form.
#[must_use]
pub fn editable_product_fields(product: &Product) -> Fields {
    Fields::from([
        ("nameFr".to_owned(), Value::string(&product.name.fr)),
        ("nameAr".to_owned(), Value::string(&product.name.ar)),
        (
            "descriptionFr".to_owned(),
            Value::string(&product.description.fr),
        ),
        (
            "descriptionAr".to_owned(),
            Value::string(&product.description.ar),
        ),
        ("price".to_owned(), Value::dinars(product.price)),
        (
            "stock".to_owned(),
            Value::integer(i64::from(product.stock)),
        ),
        ("category".to_owned(), Value::string(product.category.as_str())),
        (
            "images".to_owned(),
            Value::array(product.images.iter().map(Value::string)),
        ),
        ("updatedAt".to_owned(), Value::timestamp(product.updated_at)),
    ])
}

impl Document for Product {
    const COLLECTION: &'static str = PRODUCTS;

    fn to_fields(&self) -> Fields {
        let mut fields = editable_product_fields(self);
        fields.extend(stock_fields(self));
        fields.insert("createdAt".to_owned(), Value::timestamp(self.created_at));
        fields.insert(
            "createdBy".to_owned(),
            Value::optional_string(self.created_by.as_ref().map(UserId::as_str)),
        );
        fields
    }

    fn from_fields(id: &str, fields: &Fields) -> Result<Self, BackendError> {
        let category = fields
            .str("category")
            .ok_or_else(|| malformed(PRODUCTS, id, "missing category"))?
            .parse::<Category>()
            .map_err(|e| malformed(PRODUCTS, id, e.to_string()))?;
        let created_at = epoch_or(fields.timestamp("createdAt"));

        Ok(Self {
            id: ProductId::new(id),
            name: Localized::new(fields.text("nameFr"), fields.text("nameAr")),
            description: Localized::new(fields.text("descriptionFr"), fields.text("descriptionAr")),
            price: dinars(fields, "price"),
            stock: count(fields.i64("stock")),
            category,
            images: fields
                .array("images")
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
            created_at,
            updated_at: fields.timestamp("updatedAt").unwrap_or(created_at),
            created_by: fields.non_blank("createdBy").map(UserId::new),
            stock_history: fields
                .array("stockHistory")
                .iter()
                .filter_map(history_entry)
                .collect(),
        })
    }
}

// =============================================================================
// orders
// =============================================================================

fn order_line(value: &Value) -> Option<OrderLine> {
    let fields = value.as_map()?;
    Some(OrderLine {
        product_id: ProductId::new(fields.str("productId")?),
        name: fields.text("name"),
        quantity: count(fields.i64("quantity")),
        price: dinars(fields, "price"),
    })
}

fn order_line_fields(line: &OrderLine) -> Value {
    Value::map(Fields::from([
        ("productId".to_owned(), Value::string(line.product_id.as_str())),
        ("name".to_owned(), Value::string(&line.name)),
        (
            "quantity".to_owned(),
            Value::integer(i64::from(line.quantity)),
        ),
        ("price".to_owned(), Value::dinars(line.price)),
    ]))
}

impl Document for Order {
    const COLLECTION: &'static str = ORDERS;

    fn to_fields(&self) -> Fields {
        Fields::from([
            ("userId".to_owned(), Value::string(self.user_id.as_str())),
            ("userName".to_owned(), Value::string(&self.user_name)),
            ("userEmail".to_owned(), Value::string(&self.user_email)),
            ("userPhone".to_owned(), Value::string(&self.user_phone)),
            (
                "items".to_owned(),
                Value::array(self.items.iter().map(order_line_fields)),
            ),
            ("total".to_owned(), Value::dinars(self.total)),
            ("status".to_owned(), Value::string(self.status.as_str())),
            (
                "phone".to_owned(),
                Value::optional_string(self.phone.as_deref()),
            ),
            (
                "deliveryAddress".to_owned(),
                Value::optional_string(self.delivery_address.as_deref()),
            ),
            (
                "notes".to_owned(),
                Value::optional_string(self.notes.as_deref()),
            ),
            ("createdAt".to_owned(), Value::timestamp(self.created_at)),
        ])
    }

    fn from_fields(id: &str, fields: &Fields) -> Result<Self, BackendError> {
        let status = match fields.str("status") {
            Some(status) => status
                .parse::<OrderStatus>()
                .map_err(|e| malformed(ORDERS, id, e.to_string()))?,
            None => OrderStatus::default(),
        };

        Ok(Self {
            id: OrderId::new(id),
            user_id: UserId::new(fields.text("userId")),
            user_name: fields.text("userName"),
            user_email: fields.text("userEmail"),
            user_phone: fields.text("userPhone"),
            items: fields.array("items").iter().filter_map(order_line).collect(),
            total: dinars(fields, "total"),
            status,
            phone: fields.non_blank("phone"),
            delivery_address: fields.non_blank("deliveryAddress"),
            notes: fields.non_blank("notes"),
            created_at: epoch_or(fields.timestamp("createdAt")),
        })
    }
}

// =============================================================================
// credit_logs
// =============================================================================

impl Document for CreditLog {
    const COLLECTION: &'static str = CREDIT_LOGS;

    fn to_fields(&self) -> Fields {
        Fields::from([
            ("userId".to_owned(), Value::string(self.user_id.as_str())),
            ("amount".to_owned(), Value::dinars(self.amount)),
            ("type".to_owned(), Value::string(self.kind.as_str())),
            ("reason".to_owned(), Value::string(&self.reason)),
            ("createdAt".to_owned(), Value::timestamp(self.created_at)),
            (
                "actor".to_owned(),
                Value::optional_string(self.actor.as_deref()),
            ),
        ])
    }

    fn from_fields(id: &str, fields: &Fields) -> Result<Self, BackendError> {
        let kind = fields
            .str("type")
            .unwrap_or("admin_adjustment")
            .parse::<CreditLogKind>()
            .map_err(|e| malformed(CREDIT_LOGS, id, e.to_string()))?;

        Ok(Self {
            id: CreditLogId::new(id),
            user_id: UserId::new(fields.text("userId")),
            amount: dinars(fields, "amount"),
            kind,
            reason: fields.text("reason"),
            created_at: epoch_or(fields.timestamp("createdAt")),
            actor: fields.non_blank("actor"),
        })
    }
}

// =============================================================================
// users/{uid}/cart/items
// =============================================================================

#[must_use]
pub fn cart_fields(cart: &RemoteCart) -> Fields {
    let lines = cart.items.iter().map(|line| {
        Value::map(Fields::from([
            ("productId".to_owned(), Value::string(line.product_id.as_str())),
            (
                "quantity".to_owned(),
                Value::integer(i64::from(line.quantity)),
            ),
            ("price".to_owned(), Value::dinars(line.price)),
        ]))
    });
    Fields::from([
        ("items".to_owned(), Value::array(lines)),
        ("updatedAt".to_owned(), Value::timestamp(cart.updated_at)),
    ])
}

#[must_use]
pub fn cart_from_fields(fields: &Fields) -> RemoteCart {
    let items = fields
        .array("items")
        .iter()
        .filter_map(|value| {
            let line = value.as_map()?;
            Some(RemoteCartLine {
                product_id: ProductId::new(line.str("productId")?),
                quantity: count(line.i64("quantity")),
                price: dinars(line, "price"),
            })
        })
        .collect();
    RemoteCart {
        items,
        updated_at: epoch_or(fields.timestamp("updatedAt")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_profile_defaults_for_sparse_document() {
        let fields: Fields = serde_json::from_value(json!({
            "email": {"stringValue": "client@gamewar.dz"},
            "displayName": {"stringValue": "  "}
        }))
        .unwrap();
        let profile = UserProfile::from_fields("u1", &fields).unwrap();
        assert_eq!(profile.uid.as_str(), "u1");
        assert_eq!(profile.credit, DEFAULT_CREDIT);
        assert_eq!(profile.role, UserRole::User);
        assert_eq!(profile.status, UserStatus::Pending);
        assert_eq!(profile.display_name, None);
    }

    #[test]
    fn test_profile_unknown_role_and_status_fall_back() {
        let fields: Fields = serde_json::from_value(json!({
            "role": {"stringValue": "owner"},
            "status": {"stringValue": "banned"}
        }))
        .unwrap();
        let profile = UserProfile::from_fields("u1", &fields).unwrap();
        assert_eq!(profile.role, UserRole::User);
        assert_eq!(profile.status, UserStatus::Pending);
    }

    #[test]
    fn test_profile_keeps_fractional_credit() {
        let fields: Fields = serde_json::from_value(json!({
            "email": {"stringValue": "client@gamewar.dz"},
            "credit": {"doubleValue": 12.5}
        }))
        .unwrap();
        let profile = UserProfile::from_fields("u1", &fields).unwrap();
        assert_eq!(profile.credit, Dinars::new(Decimal::new(125, 1)));
        assert_eq!(profile.to_fields().get("credit"), fields.get("credit"));

        let zero: Fields =
            serde_json::from_value(json!({"credit": {"integerValue": "0"}})).unwrap();
        assert_eq!(UserProfile::from_fields("u2", &zero).unwrap().credit, Dinars::ZERO);
    }

    #[test]
    fn test_product_document_layout() {
        let now = Utc::now();
        let mut product = Product {
            id: ProductId::new("p1"),
            name: Localized::new("Manette", "يد تحكم"),
            description: Localized::new("Sans fil", "لاسلكي"),
            price: Dinars::from_whole(4500),
            stock: 2,
            category: Category::GiftCards,
            images: vec!["https://img/a.png".to_owned()],
            created_at: now,
            updated_at: now,
            created_by: Some(UserId::new("seller-1")),
            stock_history: Vec::new(),
        };
        let entry = product.stock_change(5, "admin@gamewar.dz", now).unwrap();
        product.apply_stock_change(entry);

        let fields = product.to_fields();
        assert_eq!(fields.str("nameAr"), Some("يد تحكم"));
        assert_eq!(fields.str("category"), Some("giftCards"));
        assert_eq!(fields.str("createdBy"), Some("seller-1"));
        assert_eq!(fields.i64("price"), Some(4500));
        let history = fields.array("stockHistory")[0].as_map().unwrap();
        assert_eq!(history.i64("previousStock"), Some(2));
        assert_eq!(history.str("updatedBy"), Some("admin@gamewar.dz"));

        let decoded = Product::from_fields("p1", &fields).unwrap();
        assert_eq!(decoded.stock, 5);
        assert_eq!(decoded.stock_history.len(), 1);
        assert_eq!(decoded.created_by, product.created_by);
    }

    #[test]
    fn test_order_from_legacy_document() {
        let fields: Fields = serde_json::from_value(json!({
            "userId": {"stringValue": "u1"},
            "userEmail": {"stringValue": "client@gamewar.dz"},
            "items": {"arrayValue": {"values": [
                {"mapValue": {"fields": {
                    "productId": {"stringValue": "p1"},
                    "name": {"stringValue": "Casque"},
                    "quantity": {"integerValue": "2"},
                    "price": {"doubleValue": 1500.0}
                }}},
                {"mapValue": {"fields": {"name": {"stringValue": "no id"}}}}
            ]}},
            "total": {"integerValue": "3000"},
            "status": {"stringValue": "confirmed"},
            "phone": {"nullValue": null}
        }))
        .unwrap();
        let order = Order::from_fields("o1", &fields).unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].line_total(), Dinars::from_whole(3000));
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.phone, None);
        assert_eq!(order.created_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_credit_log_type_field() {
        let log = CreditLog {
            id: CreditLogId::new("c1"),
            user_id: UserId::new("u1"),
            amount: Dinars::from_whole(-20),
            kind: CreditLogKind::AdminAdjustment,
            reason: "spam".to_owned(),
            created_at: Utc::now(),
            actor: None,
        };
        let fields = log.to_fields();
        assert_eq!(fields.str("type"), Some("admin_adjustment"));
        assert_eq!(
            CreditLog::from_fields("c1", &fields).unwrap().amount,
            Dinars::from_whole(-20)
        );
    }

    #[test]
    fn test_cart_mirror_fields() {
        let cart = RemoteCart {
            items: vec![RemoteCartLine {
                product_id: ProductId::new("p1"),
                quantity: 3,
                price: Dinars::from_whole(100),
            }],
            updated_at: Utc::now(),
        };
        assert_eq!(cart_path(&UserId::new("u1")), "users/u1/cart/items");
        let decoded = cart_from_fields(&cart_fields(&cart));
        assert_eq!(decoded.items, cart.items);
    }
}

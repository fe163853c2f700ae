//! Order listing and the admin order actions.

use std::collections::HashMap;

use tracing::instrument;

use gamewar_core::{Access, Order, OrderId, OrderStatus, UserId, UserProfile, order};

use crate::backend::{AuthSession, Backend, OrderOwner};
use crate::error::AppError;

/// Orders for the orders page, newest first.
#[derive(Debug, Default)]
pub struct OrderListing {
    pub orders: Vec<Order>,
    /// Profiles of the ordering accounts; only filled for admins.
    pub customers: HashMap<UserId, UserProfile>,
}

impl OrderListing {
    #[must_use]
    pub fn customer(&self, order: &Order) -> Option<&UserProfile> {
        self.customers.get(&order.user_id)
    }
}

pub struct OrderService<'a> {
    backend: &'a Backend,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Every order for admins; the visitor's own orders otherwise.
    ///
    /// Orders are matched by uid first and by email when none match, for
    /// orders placed before the uid was recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    #[instrument(skip(self, auth, access), fields(uid = %auth.uid, admin = access.is_admin))]
    pub async fn list_for(&self, auth: &AuthSession, access: &Access) -> Result<OrderListing, AppError> {
        let mut listing = if access.is_admin {
            let (orders, profiles) = tokio::try_join!(
                self.backend.list_orders(auth),
                self.backend.list_profiles(auth)
            )?;
            OrderListing {
                orders,
                customers: profiles.into_iter().map(|p| (p.uid.clone(), p)).collect(),
            }
        } else {
            let mut orders = self
                .backend
                .orders_for(auth, OrderOwner::User(&auth.uid))
                .await?;
            if orders.is_empty() {
                orders = self
                    .backend
                    .orders_for(auth, OrderOwner::Email(&auth.email))
                    .await?;
            }
            OrderListing {
                orders,
                customers: HashMap::new(),
            }
        };

        order::sort_newest_first(&mut listing.orders);
        Ok(listing)
    }

    async fn fetch(&self, auth: &AuthSession, id: &OrderId) -> Result<Order, AppError> {
        self.backend
            .get_order(auth, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))
    }

    /// Move an order to `to` if that keeps its lifecycle moving forward.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] for a backwards or repeated move.
    #[instrument(skip(self, auth))]
    pub async fn advance(&self, auth: &AuthSession, id: &OrderId, to: OrderStatus) -> Result<Order, AppError> {
        let mut order = self.fetch(auth, id).await?;
        if !order.status.can_transition_to(to) {
            return Err(AppError::BadRequest(format!(
                "order {id} cannot go from {} to {to}",
                order.status
            )));
        }

        self.backend.update_order_status(auth, id, to).await?;
        tracing::info!(order_id = %id, from = %order.status, to = %to, "Order status changed");
        order.status = to;
        Ok(order)
    }

    /// URL of the generated invoice PDF.
    ///
    /// # Errors
    ///
    /// Returns an error if the invoice function fails.
    #[instrument(skip(self, auth))]
    pub async fn invoice_url(&self, auth: &AuthSession, id: &OrderId) -> Result<String, AppError> {
        Ok(self.backend.generate_invoice(auth, id).await?)
    }

    /// A WhatsApp link sending the invoice to the customer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Invalid("phoneUnavailable")` when neither the order
    /// nor the customer's profile has a phone number.
    #[instrument(skip(self, auth))]
    pub async fn whatsapp_invoice(&self, auth: &AuthSession, id: &OrderId) -> Result<String, AppError> {
        let order = self.fetch(auth, id).await?;
        let profile = match self.backend.get_profile(auth, &order.user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(order_id = %id, error = %e, "Could not load customer profile");
                None
            }
        };
        let fallback = profile.as_ref().and_then(|p| p.phone.as_deref());
        let phone = order
            .contact_phone(fallback)
            .ok_or(AppError::Invalid("phoneUnavailable"))?
            .to_owned();

        let pdf_url = self.invoice_url(auth, id).await?;
        order::whatsapp_link(&phone, Some(&order.invoice_message(&pdf_url)))
            .ok_or(AppError::Invalid("phoneUnavailable"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use gamewar_core::{Dinars, UserRole, UserStatus};

    use super::*;
    use crate::backend::MemoryBackend;

    fn order(id: &str, user: &str, email: &str, days_ago: i64) -> Order {
        Order {
            id: OrderId::new(id),
            user_id: UserId::new(user),
            user_name: String::new(),
            user_email: email.to_owned(),
            user_phone: String::new(),
            items: Vec::new(),
            total: Dinars::from_whole(1000),
            status: OrderStatus::Pending,
            phone: None,
            delivery_address: Some("Oran".to_owned()),
            notes: None,
            created_at: Utc::now() - Duration::days(days_ago),
        }
    }

    fn profile(uid: &UserId, email: &str, role: UserRole) -> UserProfile {
        UserProfile {
            role,
            status: UserStatus::Active,
            ..UserProfile::first_sign_in(uid.clone(), email, Utc::now())
        }
    }

    async fn setup() -> (MemoryBackend, Backend, AuthSession, AuthSession) {
        let memory = MemoryBackend::new();
        let admin_uid = UserId::new("admin");
        memory
            .add_account(
                "admin@gamewar.dz",
                "123456",
                Some(profile(&admin_uid, "admin@gamewar.dz", UserRole::Admin)),
            )
            .await;
        let client_uid = UserId::new("client");
        memory
            .add_account(
                "client@gamewar.dz",
                "123456",
                Some(profile(&client_uid, "client@gamewar.dz", UserRole::User)),
            )
            .await;
        let backend = Backend::from(memory.clone());
        let admin = backend.sign_in("admin@gamewar.dz", "123456").await.unwrap();
        let client = backend.sign_in("client@gamewar.dz", "123456").await.unwrap();
        (memory, backend, admin, client)
    }

    #[tokio::test]
    async fn test_listing_by_role() {
        let (memory, backend, admin, client) = setup().await;
        memory.insert_order(order("o1", "client", "client@gamewar.dz", 3)).await;
        memory.insert_order(order("o2", "client", "client@gamewar.dz", 1)).await;
        memory.insert_order(order("o3", "other", "other@gamewar.dz", 2)).await;
        let service = OrderService::new(&backend);

        let mine = service
            .list_for(&client, &Access::derive(memory.profile(&client.uid).await.as_ref()))
            .await
            .unwrap();
        let ids: Vec<_> = mine.orders.iter().map(|o| o.id.to_string()).collect();
        assert_eq!(ids, ["o2", "o1"]);
        assert!(mine.customers.is_empty());

        let all = service
            .list_for(&admin, &Access::derive(memory.profile(&admin.uid).await.as_ref()))
            .await
            .unwrap();
        assert_eq!(all.orders.len(), 3);
        let first = all.orders.first().unwrap();
        assert_eq!(all.customer(first).unwrap().email, "client@gamewar.dz");
    }

    #[tokio::test]
    async fn test_listing_falls_back_to_email() {
        let (memory, backend, _, client) = setup().await;
        memory.insert_order(order("legacy", "old-uid", "client@gamewar.dz", 1)).await;

        let access = Access::derive(memory.profile(&client.uid).await.as_ref());
        let listing = OrderService::new(&backend).list_for(&client, &access).await.unwrap();
        assert_eq!(listing.orders.len(), 1);
    }

    #[tokio::test]
    async fn test_advance_only_moves_forward() {
        let (memory, backend, admin, _) = setup().await;
        memory.insert_order(order("o1", "client", "client@gamewar.dz", 1)).await;
        let service = OrderService::new(&backend);
        let id = OrderId::new("o1");

        assert!(service.advance(&admin, &id, OrderStatus::Delivered).await.is_err());
        let confirmed = service.advance(&admin, &id, OrderStatus::Confirmed).await.unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);
        assert!(service.advance(&admin, &id, OrderStatus::Confirmed).await.is_err());
        service.advance(&admin, &id, OrderStatus::Delivered).await.unwrap();
        assert!(service.advance(&admin, &id, OrderStatus::Cancelled).await.is_err());
    }

    #[tokio::test]
    async fn test_whatsapp_invoice_needs_a_phone() {
        let (memory, backend, admin, _) = setup().await;
        memory.insert_order(order("nophone", "client", "client@gamewar.dz", 1)).await;
        let mut with_phone = order("abcdef123", "client", "client@gamewar.dz", 1);
        with_phone.phone = Some("0555 11 22 33".to_owned());
        memory.insert_order(with_phone).await;
        let service = OrderService::new(&backend);

        let err = service
            .whatsapp_invoice(&admin, &OrderId::new("nophone"))
            .await
            .unwrap_err();
        assert_eq!(err.flash_key(), "phoneUnavailable");

        let link = service
            .whatsapp_invoice(&admin, &OrderId::new("abcdef123"))
            .await
            .unwrap();
        assert!(link.starts_with("https://wa.me/0555112233?text="));
        assert!(link.contains("abcdef"));
    }
}

//! Order listing.
//!
//! # Usage
//!
//! ```bash
//! gw-cli orders list
//! gw-cli orders list --status pending
//! ```

use tracing::info;

use gamewar_core::{Language, Order, OrderStatus};

use super::{AdminSession, CommandError};

/// Log every order, newest first, optionally only those in `status`.
///
/// # Errors
///
/// Returns an error if the orders cannot be read.
pub async fn list(
    session: &AdminSession,
    status: Option<OrderStatus>,
) -> Result<Vec<Order>, CommandError> {
    let listing = session
        .orders()
        .list_for(session.auth(), session.access())
        .await?;

    let orders: Vec<Order> = listing
        .orders
        .iter()
        .filter(|order| status.is_none_or(|s| order.status == s))
        .cloned()
        .collect();

    for order in &orders {
        let customer = listing
            .customer(order)
            .map_or(order.user_email.as_str(), |p| p.email.as_str());
        info!(
            "#{} {} {:<9} {:>14} {} ({} items)",
            order.short_ref(),
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.status.as_str(),
            order.total_with_tax().display(Language::Fr),
            customer,
            order.items.len(),
        );
    }
    info!(count = orders.len(), "Orders listed");
    Ok(orders)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};

    use gamewar_core::{Dinars, OrderId, UserId};

    use super::super::test_support;
    use super::*;

    fn order(id: &str, status: OrderStatus, age_minutes: i64) -> Order {
        Order {
            id: OrderId::new(id),
            user_id: UserId::new("client-uid"),
            user_name: "Client".to_owned(),
            user_email: "client@gamewar.dz".to_owned(),
            user_phone: "0550000000".to_owned(),
            items: Vec::new(),
            total: Dinars::from_whole(1000),
            status,
            phone: None,
            delivery_address: None,
            notes: None,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[tokio::test]
    async fn test_list_filters_by_status_newest_first() {
        let (memory, session) = test_support::seeded().await;
        memory.insert_order(order("old-pending", OrderStatus::Pending, 60)).await;
        memory.insert_order(order("delivered", OrderStatus::Delivered, 30)).await;
        memory.insert_order(order("new-pending", OrderStatus::Pending, 5)).await;

        let all = list(&session, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let pending = list(&session, Some(OrderStatus::Pending)).await.unwrap();
        let ids: Vec<&str> = pending.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["new-pending", "old-pending"]);
    }
}

//! Order maintenance.

use tracing::info;

use bricky_core::OrderId;
use bricky_storefront::db::OrderRepository;

use super::{CliError, connect};

/// Recompute an order's stored totals from its elements.
///
/// # Errors
///
/// Returns an error if the order does not exist.
pub async fn recalculate(id: i32) -> Result<(), CliError> {
    let pool = connect().await?;
    let order = OrderRepository::new(&pool)
        .recalculate_total(OrderId::new(id))
        .await?;

    info!(
        "Order #{}: subtotal {} + shipping {} + tax {} = {}",
        order.id, order.subtotal, order.shipping, order.tax, order.total_price
    );
    Ok(())
}

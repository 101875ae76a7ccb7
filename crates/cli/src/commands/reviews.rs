//! Review moderation.
//!
//! New reviews stay hidden until approved here.

use tracing::info;

use bricky_core::ReviewId;
use bricky_storefront::db::ReviewRepository;

use super::{CliError, connect};

/// List reviews waiting for moderation.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn pending() -> Result<(), CliError> {
    let pool = connect().await?;
    let reviews = ReviewRepository::new(&pool).pending().await?;

    info!("{} reviews pending", reviews.len());
    for review in reviews {
        info!(
            "  #{} {}/5 by {} on {}: {}",
            review.id,
            review.rating,
            review.author,
            review.created_display(),
            review.title
        );
    }
    Ok(())
}

/// Publish (or with `hide`, unpublish) a review.
///
/// # Errors
///
/// Returns an error if the review does not exist.
pub async fn set_approved(id: i32, approved: bool) -> Result<(), CliError> {
    let pool = connect().await?;
    ReviewRepository::new(&pool)
        .set_approved(ReviewId::new(id), approved)
        .await?;
    info!(
        "Review #{id} {}",
        if approved { "approved" } else { "hidden" }
    );
    Ok(())
}

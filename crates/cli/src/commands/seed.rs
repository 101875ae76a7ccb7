//! Seed the catalog from a YAML file.
//!
//! Categories and products are upserted by slug, so the same file can be
//! applied repeatedly to update prices and stock.
//!
//! ```yaml
//! categories:
//!   - title: Bricks
//!     slug: bricks
//!     products:
//!       - name: Brick 2x4 Red
//!         description: Classic 2x4 brick.
//!         price: "0.25"
//!         stock: 500
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use bricky_core::{Price, Slug};
use bricky_storefront::db::products::ProductInput;
use bricky_storefront::db::{CategoryRepository, ProductRepository};

use super::{CliError, connect};

/// Top-level catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryEntry {
    pub title: String,
    /// Derived from the title when omitted.
    pub slug: Option<String>,
    pub picture: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ProductEntry {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub picture: Option<String>,
    /// Decimal string such as `"19.99"`.
    pub price: String,
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

fn slug_for(explicit: Option<&str>, name: &str) -> Result<Slug, String> {
    match explicit {
        Some(slug) => Slug::parse(slug).map_err(|e| format!("{slug}: {e}")),
        None => Slug::slugify(name).map_err(|e| format!("{name}: {e}")),
    }
}

/// Problems in the file, one message each. Empty means the file is good.
#[must_use]
pub fn validate_catalog(catalog: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut product_slugs = std::collections::HashSet::new();

    for category in &catalog.categories {
        if category.title.trim().is_empty() {
            errors.push("category with an empty title".to_string());
        }
        if let Err(e) = slug_for(category.slug.as_deref(), &category.title) {
            errors.push(format!("category slug {e}"));
        }
        for product in &category.products {
            if product.name.trim().is_empty() {
                errors.push(format!("product with an empty name in {}", category.title));
            }
            match slug_for(product.slug.as_deref(), &product.name) {
                Ok(slug) => {
                    if !product_slugs.insert(slug.to_string()) {
                        errors.push(format!("duplicate product slug {slug}"));
                    }
                }
                Err(e) => errors.push(format!("product slug {e}")),
            }
            if let Err(e) = product.price.parse::<Price>() {
                errors.push(format!("{}: {e}", product.name));
            }
            if product.stock < 0 {
                errors.push(format!("{}: stock cannot be negative", product.name));
            }
        }
    }

    errors
}

/// Upsert every category and product in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or if
/// a database operation fails.
pub async fn catalog(file_path: &str) -> Result<(), CliError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading catalog from file");

    // Read and validate before connecting to the database
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: file_path.to_string(),
            source,
        })?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;

    let errors = validate_catalog(&catalog);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CliError::InvalidCatalog(errors.len()));
    }

    let pool = connect().await?;
    let categories = CategoryRepository::new(&pool);
    let products = ProductRepository::new(&pool);

    let mut product_count = 0;
    for entry in &catalog.categories {
        let slug = slug_for(entry.slug.as_deref(), &entry.title).map_err(CliError::Invalid)?;
        let category = categories
            .upsert(entry.title.trim(), &slug, entry.picture.as_deref())
            .await?;

        for product in &entry.products {
            let slug = slug_for(product.slug.as_deref(), &product.name).map_err(CliError::Invalid)?;
            let price = product
                .price
                .parse::<Price>()
                .map_err(|e| CliError::Invalid(e.to_string()))?;
            products
                .upsert(&ProductInput {
                    name: product.name.trim(),
                    slug: &slug,
                    description: &product.description,
                    picture: product.picture.as_deref(),
                    price: price.amount(),
                    stock: product.stock,
                    category_id: category.id,
                    is_active: product.active,
                })
                .await?;
            product_count += 1;
        }
    }

    info!("Seeding complete!");
    info!("  Categories: {}", catalog.categories.len());
    info!("  Products: {product_count}");
    Ok(())
}

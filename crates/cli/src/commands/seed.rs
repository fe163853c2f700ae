//! Seed the catalog from a YAML file.
//!
//! The file lists products in the shape of the product form:
//!
//! ```yaml
//! products:
//!   - name: { fr: "Manette DualSense", ar: "يد تحكم دوال سنس" }
//!     description: { fr: "Manette sans fil", ar: "يد تحكم لاسلكية" }
//!     price: 12500
//!     stock: 8
//!     category: controllers
//!     images:
//!       - https://cdn.gamewar.dz/dualsense.jpg
//! ```
//!
//! Products whose French name is already in the catalog are skipped, so
//! the same file can be applied twice.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use gamewar_core::ProductDraft;
use gamewar_storefront::error::AppError;
use gamewar_storefront::services::Editor;

use super::{AdminSession, CommandError};

/// Contents of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub products: Vec<ProductDraft>,
}

/// Outcome of a seeding run.
#[derive(Debug, Default)]
pub struct SeedResult {
    pub inserted: usize,
    pub skipped: usize,
    pub errors: Vec<(String, AppError)>,
}

/// Read and validate a seed file before anything is written.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if any product
/// fails the product form checks.
pub async fn load(file_path: &str) -> Result<Vec<ProductDraft>, Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;
    let drafts = parse(&content)?;
    info!(products = drafts.len(), "Seed file validated");
    Ok(drafts)
}

/// Parse seed YAML and validate every product.
///
/// # Errors
///
/// Returns an error for invalid YAML or invalid products; every invalid
/// product is logged.
pub fn parse(content: &str) -> Result<Vec<ProductDraft>, Box<dyn std::error::Error>> {
    let file: SeedFile = serde_yaml::from_str(content)?;

    let mut drafts = Vec::with_capacity(file.products.len());
    let mut invalid = 0;
    for (index, draft) in file.products.into_iter().enumerate() {
        match draft.validate() {
            Ok(draft) => drafts.push(draft),
            Err(e) => {
                error!(index, "Invalid product: {e}");
                invalid += 1;
            }
        }
    }
    if invalid > 0 {
        return Err(format!("{invalid} invalid products found").into());
    }
    Ok(drafts)
}

/// Create every product not already in the catalog, owned by the admin.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read. Failed writes are
/// collected in the result.
pub async fn products(
    session: &AdminSession,
    drafts: Vec<ProductDraft>,
) -> Result<SeedResult, CommandError> {
    let back_office = session.back_office();
    let editor = Editor {
        auth: session.auth(),
        is_admin: true,
    };

    let mut existing: HashSet<String> = session
        .catalog()
        .products()
        .await?
        .iter()
        .map(|p| p.name.fr.to_lowercase())
        .collect();

    let mut result = SeedResult::default();
    for draft in drafts {
        let key = draft.name.fr.to_lowercase();
        if existing.contains(&key) {
            result.skipped += 1;
            continue;
        }
        let name = draft.name.fr.clone();
        match back_office.save_product(editor, None, draft).await {
            Ok(product) => {
                info!(product_id = %product.id, name = %name, "Product created");
                existing.insert(key);
                result.inserted += 1;
            }
            Err(e) => result.errors.push((name, e)),
        }
    }

    info!("Seeding complete!");
    info!("  Products inserted: {}", result.inserted);
    info!("  Products skipped (already exist): {}", result.skipped);
    if !result.errors.is_empty() {
        error!("  Errors: {}", result.errors.len());
        for (name, err) in &result.errors {
            error!("    - {name}: {err}");
        }
    }
    Ok(result)
}

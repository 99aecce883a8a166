//! Catalog seeding command.
//!
//! Loads products from a YAML file and creates them through the catalog
//! service, so seeded products pass the same validation as the admin form.
//! Products whose name is already in the catalog are skipped, which makes
//! the command safe to re-run.
//!
//! # Usage
//!
//! ```bash
//! abc-cli seed products --file crates/cli/fixtures/products.yaml
//! ```
//!
//! # File Format
//!
//! ```yaml
//! products:
//!   - name: Canvas Tote Bag
//!     description: Heavy cotton tote.
//!     price: 18.50
//! ```
//!
//! # Environment Variables
//!
//! Reads the same variables as the web binary (`RETAIL_DATABASE_URL`,
//! `RETAIL_BASE_URL`, blob settings).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use abc_retail_core::Price;
use abc_retail_web::blob;
use abc_retail_web::config::{ConfigError, RetailConfig};
use abc_retail_web::db::{self, PgDocumentStore};
use abc_retail_web::services::{CatalogError, CatalogService, ProductForm};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{error, info};

/// Errors that stop a seed run before any product is written.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Could not read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not read existing products: {0}")]
    Catalog(#[from] CatalogError),
}

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub products: Vec<SeedProduct>,
}

/// One product entry.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Accepts `12.50` as well as `"12.50"`.
    #[serde(deserialize_with = "price_text")]
    pub price: String,
}

impl SeedProduct {
    fn to_form(&self) -> ProductForm {
        ProductForm {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price.clone(),
        }
    }
}

fn price_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "price must be a number, got {other:?}"
        ))),
    }
}

/// Outcome of a seed run.
#[derive(Debug, Default)]
pub struct SeedResult {
    pub inserted: usize,
    pub skipped: usize,
    pub errors: Vec<(String, CatalogError)>,
}

/// Check entries that would fail or collide before touching the database.
#[must_use]
pub fn validate_seed(file: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for (index, product) in file.products.iter().enumerate() {
        let name = product.name.trim();
        if name.is_empty() {
            errors.push(format!("products[{index}]: name is required"));
            continue;
        }
        if !names.insert(name.to_lowercase()) {
            errors.push(format!("products[{index}]: duplicate name \"{name}\""));
        }
        if let Err(e) = Price::parse(&product.price) {
            errors.push(format!("products[{index}] \"{name}\": {e}"));
        }
    }

    errors
}

/// Create every product in `file` whose name is not already in the catalog.
///
/// A product that fails to save is recorded in the result and the run
/// continues with the next one.
///
/// # Errors
///
/// Returns `CatalogError` if the existing catalog cannot be listed.
pub async fn seed_products(
    catalog: &CatalogService<'_>,
    file: &SeedFile,
) -> Result<SeedResult, CatalogError> {
    let mut existing: HashSet<String> = catalog
        .list()
        .await?
        .into_iter()
        .map(|p| p.name.to_lowercase())
        .collect();

    let mut result = SeedResult::default();
    for product in &file.products {
        let key = product.name.trim().to_lowercase();
        if existing.contains(&key) {
            result.skipped += 1;
            continue;
        }

        match catalog.create(&product.to_form(), None).await {
            Ok(created) => {
                info!(product_id = %created.id, name = %created.name, "Seeded product");
                existing.insert(key);
                result.inserted += 1;
            }
            Err(e) => result.errors.push((product.name.clone(), e)),
        }
    }

    Ok(result)
}

/// Parse a seed file from disk.
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable, or not valid YAML.
pub async fn load_seed_file(path: &Path) -> Result<SeedFile, SeedError> {
    if !path.exists() {
        return Err(SeedError::FileNotFound(path.to_path_buf()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Seed the catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if the file is invalid, configuration is missing, or the
/// database cannot be reached.
pub async fn products(file_path: &Path) -> Result<(), SeedError> {
    info!(path = %file_path.display(), "Loading products from file");

    // Read and validate YAML before connecting to database
    let file = load_seed_file(file_path).await?;
    info!(products = file.products.len(), "Parsed seed file");

    let errors = validate_seed(&file);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    let config = RetailConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    info!("Connected to database");

    let store = PgDocumentStore::new(pool);
    let blobs = blob::from_config(&config);
    let catalog = CatalogService::new(&store, blobs.as_ref(), &config.image_container);

    let result = seed_products(&catalog, &file).await?;

    info!("Seeding complete!");
    info!("  Products inserted: {}", result.inserted);
    info!("  Products skipped (already exist): {}", result.skipped);

    if !result.errors.is_empty() {
        error!("  Errors: {}", result.errors.len());
        for (name, err) in &result.errors {
            error!("    - {name}: {err}");
        }
    }

    Ok(())
}

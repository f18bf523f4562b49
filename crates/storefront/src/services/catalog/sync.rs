//! Printful catalog sync.
//!
//! Every store product is fetched and reconciled into `products`,
//! `product_variants` and `product_images`. Failures are collected per
//! product so one broken listing does not stop the run.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use printshop_core::Slug;

use super::images::{collect_candidates, dedup_images};
use super::{CatalogCache, CatalogError};
use crate::db::ProductRepository;
use crate::db::products::{NewImage, SyncedVariant};
use crate::services::printful::{PrintfulClient, SyncProductDetail, SyncVariant};

/// Outcome of a sync run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub dry_run: bool,
    pub products_created: u32,
    pub products_updated: u32,
    pub variants_upserted: u32,
    pub variants_disabled: u64,
    pub images_written: usize,
    pub errors: Vec<SyncFailure>,
    /// Reconciled products, filled on dry runs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<ProductPlan>,
}

/// A product that could not be synced.
#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub printful_product_id: i64,
    pub message: String,
}

/// What the sync will write for one Printful product.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPlan {
    pub printful_product_id: i64,
    pub name: String,
    pub slug: String,
    pub base_price: Decimal,
    pub variant_ids: Vec<i64>,
    #[serde(skip)]
    pub images: Vec<NewImage>,
    pub image_urls: Vec<String>,
}

/// Reconcile one Printful product without touching the database.
///
/// The base price is the lowest retail price among sellable variants.
///
/// # Errors
///
/// Returns `CatalogError::NoSellableVariants` if no variant is sellable and
/// priced.
pub fn plan_product(detail: &SyncProductDetail) -> Result<ProductPlan, CatalogError> {
    let product = &detail.sync_product;
    let priced: Vec<(&SyncVariant, Decimal)> = sellable_variants(detail).collect();

    let base_price = priced
        .iter()
        .map(|(_, price)| *price)
        .min()
        .ok_or(CatalogError::NoSellableVariants(product.id))?;

    let images = dedup_images(collect_candidates(detail));

    Ok(ProductPlan {
        printful_product_id: product.id,
        name: product.name.trim().to_string(),
        slug: Slug::from_title(&product.name).as_str().to_string(),
        base_price,
        variant_ids: priced.iter().map(|(v, _)| v.id).collect(),
        image_urls: images.iter().map(|i| i.url.clone()).collect(),
        images,
    })
}

fn sellable_variants(
    detail: &SyncProductDetail,
) -> impl Iterator<Item = (&SyncVariant, Decimal)> {
    detail
        .sync_variants
        .iter()
        .filter(|v| v.is_sellable())
        .filter_map(|v| v.retail_price.map(|price| (v, price)))
}

/// Runs the Printful catalog sync.
pub struct CatalogSync<'a> {
    pool: &'a PgPool,
    printful: &'a PrintfulClient,
    cache: &'a CatalogCache,
}

impl<'a> CatalogSync<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, printful: &'a PrintfulClient, cache: &'a CatalogCache) -> Self {
        Self {
            pool,
            printful,
            cache,
        }
    }

    /// Sync every Printful store product.
    ///
    /// With `dry_run` nothing is written; the report lists the reconciled
    /// products and counts what would be written.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Printful` if the product list cannot be fetched.
    /// Per-product failures end up in [`SyncReport::errors`].
    #[instrument(skip(self))]
    pub async fn run(&self, dry_run: bool) -> Result<SyncReport, CatalogError> {
        let summaries = self.printful.list_sync_products().await?;
        info!(count = summaries.len(), "Fetched Printful store products");

        let mut report = SyncReport {
            dry_run,
            ..SyncReport::default()
        };

        for summary in &summaries {
            if let Err(e) = self.sync_product(summary.id, dry_run, &mut report).await {
                warn!(printful_product_id = summary.id, error = %e, "Product sync failed");
                report.errors.push(SyncFailure {
                    printful_product_id: summary.id,
                    message: e.to_string(),
                });
            }
        }

        if !dry_run {
            self.cache.invalidate_all();
        }

        info!(
            created = report.products_created,
            updated = report.products_updated,
            variants = report.variants_upserted,
            disabled = report.variants_disabled,
            images = report.images_written,
            errors = report.errors.len(),
            dry_run,
            "Catalog sync finished"
        );
        Ok(report)
    }

    async fn sync_product(
        &self,
        printful_product_id: i64,
        dry_run: bool,
        report: &mut SyncReport,
    ) -> Result<(), CatalogError> {
        let detail = self.printful.get_sync_product(printful_product_id).await?;
        let plan = plan_product(&detail)?;

        if dry_run {
            report.variants_upserted += u32::try_from(plan.variant_ids.len()).unwrap_or(u32::MAX);
            report.images_written += plan.images.len();
            report.planned.push(plan);
            return Ok(());
        }

        let repo = ProductRepository::new(self.pool);
        let slug = Slug::from_title(&plan.name);
        let (product, created) = repo
            .upsert_from_printful(plan.printful_product_id, &plan.name, &slug, plan.base_price)
            .await?;
        if created {
            report.products_created += 1;
        } else {
            report.products_updated += 1;
        }

        for (variant, price) in sellable_variants(&detail) {
            let synced = SyncedVariant {
                printful_variant_id: variant.id,
                name: &variant.name,
                sku: variant.sku.as_deref(),
                color: variant.color.as_deref(),
                size: variant.size.as_deref(),
                price,
            };
            repo.upsert_variant_from_printful(product.id, &synced).await?;
            report.variants_upserted += 1;
        }

        report.variants_disabled += repo
            .disable_missing_variants(product.id, &plan.variant_ids)
            .await?;
        report.images_written += repo.replace_images(product.id, &plan.images).await?;

        Ok(())
    }
}

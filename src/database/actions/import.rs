use std::path::Path;

use serde::Serialize;
use sqlx::{Pool, Postgres};

use crate::{
    catalog::{parse_catalog, IngredientRecord, TagRecord},
    constants::{INGREDIENT_CSV, TAG_CSV},
    error::FoodgramError,
};

use super::{insert_ingredients, insert_tags};

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub ingredients_read: usize,
    pub ingredients_inserted: u64,
    pub tags_read: usize,
    pub tags_inserted: u64,
}

/// Loads `ingredients.csv` and `tags.csv` from `data_dir`. Missing files are
/// skipped; rows already in the catalog are left untouched.
pub async fn import_catalog(
    data_dir: &Path,
    pool: &Pool<Postgres>,
) -> Result<ImportReport, FoodgramError> {
    let mut report = ImportReport::default();

    if let Some(content) = read_optional(&data_dir.join(INGREDIENT_CSV)).await? {
        let records: Vec<IngredientRecord> = parse_catalog(&content)?;
        report.ingredients_read = records.len();
        report.ingredients_inserted = insert_ingredients(&records, pool).await?;
    }

    if let Some(content) = read_optional(&data_dir.join(TAG_CSV)).await? {
        let records: Vec<TagRecord> = parse_catalog(&content)?;
        report.tags_read = records.len();
        report.tags_inserted = insert_tags(&records, pool).await?;
    }

    Ok(report)
}

async fn read_optional(path: &Path) -> Result<Option<String>, FoodgramError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            log::info!("> Reading {}", path.display());
            Ok(Some(content))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("> {} not found, skipping", path.display());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

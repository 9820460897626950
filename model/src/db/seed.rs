//! Loading reference data into the store.

use super::{Connection, Record};
use crate::schema::*;
use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs;
use std::hash::Hash;
use std::path::Path;

/// Populate the reference tables from the JSON files in `dir`.
///
/// Each file holds an array of records of one kind. Tables are loaded in dependency order, and
/// every reference from one record to another must resolve, either to a record in the same seed or
/// to one already in the store. A missing file is skipped, but a file which cannot be parsed, or
/// whose records break a constraint, fails the whole setup.
pub async fn setup(conn: &Connection, dir: impl AsRef<Path>) -> anyhow::Result<()> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        tracing::warn!("seed directory {} does not exist, starting empty", dir.display());
        return Ok(());
    }

    let countries = load::<Country>(conn, dir, "countries.json", |_| Ok(())).await?;
    tracing::info!("loaded {countries} countries");

    let country_ids = keys::<Country>(conn).await;
    let brands = load::<VehicleBrand>(conn, dir, "vehicle_brands.json", |brand| {
        references("country", brand.country_id, &country_ids)
    })
    .await?;
    tracing::info!("loaded {brands} vehicle brands");

    let brand_ids = keys::<VehicleBrand>(conn).await;
    let models = load::<VehicleModel>(conn, dir, "vehicle_models.json", |model| {
        references("vehicle brand", model.vehicle_brand_id, &brand_ids)
    })
    .await?;
    tracing::info!("loaded {models} vehicle models");

    let model_ids = keys::<VehicleModel>(conn).await;
    let generations = load::<VehicleGeneration>(conn, dir, "vehicle_generations.json", |generation| {
        references("vehicle model", generation.vehicle_model_id, &model_ids)?;
        if let Some(end) = generation.end_year_production {
            if end < generation.start_year_production {
                bail!(
                    "generation {} ends production before it starts",
                    generation.vehicle_generation_id
                );
            }
        }
        Ok(())
    })
    .await?;
    tracing::info!("loaded {generations} vehicle generations");

    let categories = load::<ProvidedMaintenanceCategory>(
        conn,
        dir,
        "provided_maintenance_categories.json",
        |_| Ok(()),
    )
    .await?;
    tracing::info!("loaded {categories} maintenance categories");

    let category_ids = keys::<ProvidedMaintenanceCategory>(conn).await;
    let types = load::<ProvidedMaintenanceType>(
        conn,
        dir,
        "provided_maintenance_types.json",
        |ty| {
            references(
                "maintenance category",
                ty.provided_maintenance_category_id,
                &category_ids,
            )
        },
    )
    .await?;
    tracing::info!("loaded {types} maintenance types");

    Ok(())
}

async fn keys<T: Record>(conn: &Connection) -> HashSet<T::Key>
where
    T::Key: Hash + Eq,
{
    conn.filter::<T>(|_| true)
        .await
        .iter()
        .map(|row| row.key())
        .collect()
}

fn references<K: Hash + Eq + std::fmt::Display>(
    what: &str,
    key: K,
    known: &HashSet<K>,
) -> anyhow::Result<()> {
    if !known.contains(&key) {
        bail!("reference to unknown {what} {key}");
    }
    Ok(())
}

async fn load<T: Record + DeserializeOwned>(
    conn: &Connection,
    dir: &Path,
    file: &str,
    check: impl Fn(&T) -> anyhow::Result<()>,
) -> anyhow::Result<usize> {
    let path = dir.join(file);
    if !path.exists() {
        tracing::info!("{} not found, skipping", path.display());
        return Ok(0);
    }
    let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let rows: Vec<T> =
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    for row in &rows {
        check(row).with_context(|| format!("invalid record {:?} in {}", row.key(), path.display()))?;
    }
    let count = conn
        .insert_many(rows)
        .await
        .with_context(|| format!("loading {}", path.display()))?;
    Ok(count)
}

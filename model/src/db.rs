//! The in-process store used by the products service.
//!
//! The store holds one table per entity, each an ordered map from primary key to record. All tables
//! live behind a single lock, so every operation on a [`Connection`] is atomic.

use crate::{
    error::{Entity, Error, Result},
    schema::*,
};
use async_std::sync::{Arc, RwLock};
use clap::Args;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;
use uuid::Uuid;

mod seed;

pub use seed::setup;

/// Store options.
#[derive(Clone, Debug, Default, Args)]
#[group(skip)]
pub struct Options {
    /// Directory containing JSON files with reference data to load at startup.
    ///
    /// Missing files are skipped, so an empty or missing directory starts the service with an
    /// empty catalogue.
    #[clap(long, env = "PRODUCTS_SEED_DIR", default_value = "db/seed")]
    pub seed_dir: PathBuf,
}

impl Options {
    /// Create the store and load the reference data into it.
    pub async fn connect(&self) -> anyhow::Result<Connection> {
        let conn = Connection::create();
        setup(&conn, &self.seed_dir).await?;
        Ok(conn)
    }
}

/// A table of records of type `T`, ordered by primary key.
pub type Table<T> = BTreeMap<<T as Record>::Key, T>;

/// An entity which can be kept in the store.
pub trait Record: Clone + Debug + Send + Sync + 'static {
    /// The primary key.
    type Key: Clone + Debug + Ord + Send + Sync;

    /// The kind of entity, for error messages.
    const ENTITY: Entity;

    fn key(&self) -> Self::Key;

    /// A value which must be unique among all records in the table, if there is one.
    fn unique(&self) -> Option<String> {
        None
    }

    #[doc(hidden)]
    fn table(db: &Db) -> &Table<Self>;

    #[doc(hidden)]
    fn table_mut(db: &mut Db) -> &mut Table<Self>;
}

macro_rules! tables {
    ($(
        $table:ident: $record:ty [$entity:ident]
            key $key_ty:ty = |$r:ident| $key:expr
            $(, unique = |$u:ident| $unique:expr)?;
    )*) => {
        /// The contents of the store.
        #[derive(Debug, Default)]
        pub struct Db {
            $($table: Table<$record>,)*
        }

        $(
            impl Record for $record {
                type Key = $key_ty;
                const ENTITY: Entity = Entity::$entity;

                fn key(&self) -> Self::Key {
                    let $r = self;
                    $key
                }

                $(
                    fn unique(&self) -> Option<String> {
                        let $u = self;
                        $unique
                    }
                )?

                fn table(db: &Db) -> &Table<Self> {
                    &db.$table
                }

                fn table_mut(db: &mut Db) -> &mut Table<Self> {
                    &mut db.$table
                }
            }
        )*
    };
}

tables! {
    countries: Country [Country]
        key i16 = |r| r.country_id, unique = |r| Some(r.name.clone());
    customers: Customer [Customer]
        key Uuid = |r| r.customer_id, unique = |r| Some(r.uid.to_string());
    mechanics: Mechanic [Mechanic]
        key Uuid = |r| r.mechanic_id, unique = |r| Some(r.uid.to_string());
    autoservices: Autoservice [Autoservice]
        key Uuid = |r| r.autoservice_id;
    autoservice_users: AutoserviceUser [AutoserviceUser]
        key (Uuid, Uuid) = |r| (r.uid, r.autoservice_id);
    vehicle_brands: VehicleBrand [VehicleBrand]
        key i16 = |r| r.vehicle_brand_id, unique = |r| Some(r.name.clone());
    vehicle_models: VehicleModel [VehicleModel]
        key i32 = |r| r.vehicle_model_id;
    vehicle_generations: VehicleGeneration [VehicleGeneration]
        key i32 = |r| r.vehicle_generation_id;
    vehicles: Vehicle [Vehicle]
        key Uuid = |r| r.vehicle_id, unique = |r| r.vin.clone();
    provided_maintenance_categories: ProvidedMaintenanceCategory [ProvidedMaintenanceCategory]
        key i16 = |r| r.provided_maintenance_category_id, unique = |r| Some(r.name.clone());
    provided_maintenance_types: ProvidedMaintenanceType [ProvidedMaintenanceType]
        key i16 = |r| r.provided_maintenance_type_id, unique = |r| Some(r.name.clone());
    provided_maintenance: ProvidedMaintenance [ProvidedMaintenance]
        key Uuid = |r| r.provided_maintenance_id;
    provided_maintenance_countries: ProvidedMaintenanceCountryAssociation [ProvidedMaintenanceCountry]
        key (Uuid, i16) = |r| (r.provided_maintenance_id, r.country_id);
    provided_maintenance_vehicle_brands: ProvidedMaintenanceVehicleBrandAssociation [ProvidedMaintenanceVehicleBrand]
        key (Uuid, i16) = |r| (r.provided_maintenance_id, r.vehicle_brand_id);
}

/// Check that `row` can be stored in `table` alongside the rows already there.
///
/// `replacing` is the key of a row which `row` is about to replace, and which therefore cannot
/// conflict with it.
fn check_constraints<T: Record>(
    table: &Table<T>,
    row: &T,
    replacing: Option<&T::Key>,
) -> Result<()> {
    if replacing.is_none() && table.contains_key(&row.key()) {
        return Err(Error::AlreadyExists { entity: T::ENTITY });
    }
    if let Some(unique) = row.unique() {
        let conflict = table.iter().any(|(key, other)| {
            Some(key) != replacing && other.unique().as_ref() == Some(&unique)
        });
        if conflict {
            return Err(Error::AlreadyExists { entity: T::ENTITY });
        }
    }
    Ok(())
}

/// A handle to the store.
///
/// Connections are cheap to [clone](Clone), and all clones refer to the same store.
#[derive(Clone, Debug)]
pub struct Connection(Arc<RwLock<Db>>);

impl Connection {
    /// Create a new, empty store and connect to it.
    pub fn create() -> Self {
        Self(Default::default())
    }

    /// Look up a record by primary key.
    pub async fn get<T: Record>(&self, key: &T::Key) -> Result<T> {
        T::table(&*self.0.read().await)
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(T::ENTITY))
    }

    /// Find the first record, in key order, matching `pred`.
    pub async fn find<T: Record>(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        T::table(&*self.0.read().await)
            .values()
            .find(|row| pred(row))
            .cloned()
    }

    /// All records, in key order, matching `pred`.
    pub async fn filter<T: Record>(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        T::table(&*self.0.read().await)
            .values()
            .filter(|row| pred(row))
            .cloned()
            .collect()
    }

    /// Insert a new record.
    ///
    /// Fails with [`Error::AlreadyExists`] if a record with the same primary key or unique value
    /// is already stored.
    pub async fn insert<T: Record>(&self, row: T) -> Result<T> {
        let mut db = self.0.write().await;
        let table = T::table_mut(&mut db);
        check_constraints(table, &row, None)?;
        table.insert(row.key(), row.clone());
        Ok(row)
    }

    /// Insert several records at once.
    ///
    /// Either all of the records are inserted or, if any of them conflicts with an existing record
    /// or with another record in `rows`, none are.
    pub async fn insert_many<T: Record>(&self, rows: impl IntoIterator<Item = T>) -> Result<usize> {
        let mut db = self.0.write().await;
        let table = T::table_mut(&mut db);
        let mut staged = table.clone();
        let mut count = 0;
        for row in rows {
            check_constraints(&staged, &row, None)?;
            staged.insert(row.key(), row);
            count += 1;
        }
        *table = staged;
        Ok(count)
    }

    /// Return the record matching `pred` or, if there is none, insert the one built by `make`.
    ///
    /// The lookup and the insert happen atomically. The returned flag is `true` if a new record
    /// was inserted.
    pub async fn find_or_insert<T: Record>(
        &self,
        pred: impl Fn(&T) -> bool,
        make: impl FnOnce() -> Result<T>,
    ) -> Result<(T, bool)> {
        let mut db = self.0.write().await;
        let table = T::table_mut(&mut db);
        if let Some(existing) = table.values().find(|row| pred(row)) {
            return Ok((existing.clone(), false));
        }
        let row = make()?;
        check_constraints(table, &row, None)?;
        table.insert(row.key(), row.clone());
        Ok((row, true))
    }

    /// Modify a record in place.
    ///
    /// `f` receives a copy of the stored record. The modified copy is written back only if `f`
    /// succeeds and the result does not violate a uniqueness constraint. The primary key must not
    /// change.
    pub async fn update<T: Record>(
        &self,
        key: &T::Key,
        f: impl FnOnce(&mut T) -> Result<()>,
    ) -> Result<T> {
        let mut db = self.0.write().await;
        let table = T::table_mut(&mut db);
        let mut row = table
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(T::ENTITY))?;
        f(&mut row)?;
        if row.key() != *key {
            return Err(Error::Store {
                message: format!("primary key of {} cannot change", T::ENTITY),
            });
        }
        check_constraints(table, &row, Some(key))?;
        table.insert(key.clone(), row.clone());
        Ok(row)
    }
}

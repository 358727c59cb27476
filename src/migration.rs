//! The module for migrating the database.
use std::fmt::Display;

use async_trait::async_trait;
use log::info;
use sea_orm::{
	prelude::*,
	sea_query::{Alias, ColumnDef, Query, Table},
	DatabaseTransaction, TransactionTrait,
};

use crate::{
	db::{Database, PersistenceHandle},
	trace,
};

mod v0_1;


/// The latest database version.
pub const LATEST_VERSION: Version = Version { major: 0, minor: 1 };


type Result<T, E> = trace::Result<T, E>;


#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
	major: u32,
	minor: u32,
}

pub struct Migrations {
	/// A list of available migrations, ordered at version
	list: Vec<(Version, Box<dyn MigrationTrait + Send + Sync>)>,
}

#[async_trait]
trait MigrationTrait {
	async fn run(&self, tx: &DatabaseTransaction) -> Result<(), DbErr>;
}


impl Migrations {
	pub fn load() -> Self {
		Self {
			list: vec![(Version::new(0, 1), Box::new(v0_1::Migration))],
		}
	}

	/// Creates the version table for a fresh database.
	async fn install(&self, connection: &DatabaseConnection) -> Result<(), DbErr> {
		let stat = Table::create()
			.table(Alias::new("version"))
			.if_not_exists()
			.col(ColumnDef::new(Alias::new("major")).integer().not_null())
			.col(ColumnDef::new(Alias::new("minor")).integer().not_null())
			.to_owned();
		connection
			.execute(connection.get_database_backend().build(&stat))
			.await?;
		Ok(())
	}

	async fn load_version(&self, connection: &DatabaseConnection) -> Result<Option<Version>, DbErr> {
		let q = Query::select()
			.from(Alias::new("version"))
			.column(Alias::new("major"))
			.column(Alias::new("minor"))
			.to_owned();
		let r = connection
			.query_one(connection.get_database_backend().build(&q))
			.await?;
		Ok(match r {
			None => None,
			Some(result) => {
				let major: u32 = result.try_get_by_index(0)?;
				let minor: u32 = result.try_get_by_index(1)?;
				Some(Version::new(major, minor))
			}
		})
	}

	async fn store_version(
		&self, tx: &DatabaseTransaction, version: &Version, first: bool,
	) -> Result<(), DbErr> {
		let backend = tx.get_database_backend();
		let stat = if first {
			backend.build(
				&Query::insert()
					.into_table(Alias::new("version"))
					.columns([Alias::new("major"), Alias::new("minor")])
					.values_panic([version.major.into(), version.minor.into()])
					.to_owned(),
			)
		} else {
			backend.build(
				&Query::update()
					.table(Alias::new("version"))
					.values([
						(Alias::new("major"), version.major.into()),
						(Alias::new("minor"), version.minor.into()),
					])
					.to_owned(),
			)
		};
		tx.execute(stat).await?;
		Ok(())
	}

	pub async fn run(&self, db: &Database) -> Result<(), DbErr> {
		let connection = db.inner();
		self.install(connection).await?;

		let stored_version = self.load_version(connection).await?;
		let mut first = stored_version.is_none();
		let mut current_version = stored_version.unwrap_or(Version::new(0, 0));

		for (new_version, migration) in &self.list {
			if new_version > &current_version {
				let tx = connection.begin().await?;
				info!(
					"Running database migration from {} to {}...",
					current_version, new_version
				);
				migration.run(&tx).await?;
				self.store_version(&tx, new_version, first).await?;
				tx.commit().await?;
				info!("Migrated database to {}.", new_version);
				current_version = new_version.clone();
				first = false;
			}
		}

		if current_version != LATEST_VERSION {
			return Err(DbErr::Migration(format!(
				"database is at {}, which is newer than {}",
				current_version, LATEST_VERSION
			))
			.into());
		}
		Ok(())
	}
}

impl Version {
	pub fn new(major: u32, minor: u32) -> Self { Self { major, minor } }
}

impl Display for Version {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "v{}.{}", self.major, self.minor)
	}
}

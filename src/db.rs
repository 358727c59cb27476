//! The store behind the action log and the follow graph.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use log::*;
use sea_orm::{
	prelude::*,
	sea_query::{Expr, OnConflict},
	ActiveValue::NotSet,
	Condition, ConnectOptions, DatabaseBackend, DatabaseTransaction, PaginatorTrait, QueryOrder,
	Set, StreamTrait, TransactionTrait,
};
use thiserror::Error;

use crate::{
	common::EntityRef,
	config::Config,
	entity::{action, follow},
	model::NewAction,
	query,
	trace::{self, Traced},
};


#[derive(Clone)]
pub struct Database {
	path: PathBuf,
	orm: DatabaseConnection,
}

pub struct Transaction(pub(crate) DatabaseTransaction);

#[derive(Debug, Error)]
pub enum Error {
	#[error("{0}")]
	OrmError(#[from] sea_orm::DbErr),
	/// The follow record was removed by someone else while it was being
	/// created.
	#[error("follow of {1} by {0} vanished while it was being created")]
	MissingFollow(EntityRef, EntityRef),
}

/// The number of records that have been removed because the entity they
/// referred to got deleted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CascadeSummary {
	pub actions: u64,
	pub follows: u64,
}

pub type Result<T> = trace::Result<T, self::Error>;


#[async_trait]
pub trait PersistenceHandle {
	type Inner: ConnectionTrait + StreamTrait;

	fn inner(&self) -> &Self::Inner;

	fn backend(&self) -> DatabaseBackend { self.inner().get_database_backend() }


	async fn count_actions(&self) -> Result<u64> { Ok(action::Entity::find().count(self.inner()).await?) }

	async fn count_follows(&self) -> Result<u64> { Ok(follow::Entity::find().count(self.inner()).await?) }

	async fn delete_follow(&self, user: &EntityRef, object: &EntityRef) -> Result<bool> {
		let result = follow::Entity::delete_many()
			.filter(follow_user_is(user))
			.filter(follow_object_is(object))
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}

	async fn find_follow(
		&self, user: &EntityRef, object: &EntityRef,
	) -> Result<Option<follow::Model>> {
		Ok(follow::Entity::find()
			.filter(follow_user_is(user))
			.filter(follow_object_is(object))
			.one(self.inner())
			.await?)
	}

	/// Returns the follow record of the pair, creating it if it doesn't exist
	/// yet. The second value tells whether the record has been created.
	///
	/// The insert is an upsert on the unique pair, so concurrent calls for the
	/// same pair never leave two records behind. An existing record is
	/// returned as is, `actor_only` and `started` are only used for new ones.
	async fn get_or_create_follow(
		&self, user: &EntityRef, object: &EntityRef, actor_only: bool, started: i64,
	) -> Result<(follow::Model, bool)> {
		if let Some(existing) = self.find_follow(user, object).await? {
			return Ok((existing, false));
		}

		let record = follow::ActiveModel {
			id: NotSet,
			user_type: Set(user.type_name.clone()),
			user_id: Set(user.id),
			follow_object_type: Set(object.type_name.clone()),
			follow_object_id: Set(object.id),
			actor_only: Set(actor_only),
			started: Set(started),
		};
		let inserted = follow::Entity::insert(record)
			.on_conflict(
				OnConflict::columns([
					follow::Column::UserType,
					follow::Column::UserId,
					follow::Column::FollowObjectType,
					follow::Column::FollowObjectId,
				])
				.do_nothing()
				.to_owned(),
			)
			.exec_without_returning(self.inner())
			.await?;

		match self.find_follow(user, object).await? {
			Some(model) => Ok((model, inserted > 0)),
			None => {
				warn!("Follow of {} by {} disappeared right after its upsert.", object, user);
				Err(Error::MissingFollow(user.clone(), object.clone()).into())
			}
		}
	}

	/// Follow records of which `object` is the followed object, oldest first.
	async fn load_follows_for_object(&self, object: &EntityRef) -> Result<Vec<follow::Model>> {
		Ok(follow::Entity::find()
			.filter(follow_object_is(object))
			.order_by_asc(follow::Column::Id)
			.all(self.inner())
			.await?)
	}

	/// Follow records of `user`, oldest first. If any type names are given,
	/// only follows of objects of one of those types are included.
	async fn load_follows_of_user(
		&self, user: &EntityRef, type_names: &[&str],
	) -> Result<Vec<follow::Model>> {
		let mut select = follow::Entity::find().filter(follow_user_is(user));
		if !type_names.is_empty() {
			let types = type_names.iter().fold(Condition::any(), |c, t| {
				c.add(follow::Column::FollowObjectType.eq(*t))
			});
			select = select.filter(types);
		}
		Ok(select
			.order_by_asc(follow::Column::Id)
			.all(self.inner())
			.await?)
	}

	/// Whether `user` follows anything at all.
	async fn follows_anything(&self, user: &EntityRef) -> Result<bool> {
		Ok(follow::Entity::find()
			.filter(follow_user_is(user))
			.one(self.inner())
			.await?
			.is_some())
	}

	/// Deletes every action and follow that refers to `entity`, in whatever
	/// role.
	async fn purge_references(&self, entity: &EntityRef) -> Result<CascadeSummary> {
		let actions = action::Entity::delete_many()
			.filter(query::involving(entity))
			.exec(self.inner())
			.await?
			.rows_affected;
		let follows = follow::Entity::delete_many()
			.filter(
				Condition::any()
					.add(follow_user_is(entity))
					.add(follow_object_is(entity)),
			)
			.exec(self.inner())
			.await?
			.rows_affected;
		Ok(CascadeSummary { actions, follows })
	}

	async fn store_action(&self, action: &NewAction) -> Result<action::Model> {
		let timestamp = action.timestamp.unwrap_or_else(Utc::now);
		let record = action::ActiveModel {
			id: NotSet,
			actor_type: Set(action.actor.type_name.clone()),
			actor_id: Set(action.actor.id),
			verb: Set(action.verb.clone()),
			description: Set(action.description.clone()),
			target_type: Set(action.target.as_ref().map(|t| t.type_name.clone())),
			target_id: Set(action.target.as_ref().map(|t| t.id)),
			action_object_type: Set(action.action_object.as_ref().map(|o| o.type_name.clone())),
			action_object_id: Set(action.action_object.as_ref().map(|o| o.id)),
			timestamp: Set(timestamp.timestamp_millis()),
			public: Set(action.public),
			data: Set(action.data.clone()),
		};
		Ok(record.insert(self.inner()).await?)
	}

	/// Changes the visibility of an action. Returns false if there is no such
	/// action.
	async fn update_action_public(&self, id: i64, public: bool) -> Result<bool> {
		let result = action::Entity::update_many()
			.col_expr(action::Column::Public, Expr::value(public))
			.filter(action::Column::Id.eq(id))
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}
}


fn follow_object_is(object: &EntityRef) -> Condition {
	Condition::all()
		.add(follow::Column::FollowObjectType.eq(object.type_name.as_str()))
		.add(follow::Column::FollowObjectId.eq(object.id))
}

fn follow_user_is(user: &EntityRef) -> Condition {
	Condition::all()
		.add(follow::Column::UserType.eq(user.type_name.as_str()))
		.add(follow::Column::UserId.eq(user.id))
}

impl Database {
	pub async fn load(path: PathBuf) -> Result<Self> { Self::load_with(path, &Config::default()).await }

	/// Opens the database at the path that is configured, with the configured
	/// connection pool settings.
	pub async fn load_from_config(config: &Config) -> Result<Self> {
		Self::load_with(PathBuf::from(&config.database_path), config).await
	}

	async fn load_with(path: PathBuf, config: &Config) -> Result<Self> {
		let mut opts = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
		opts.idle_timeout(config.idle_timeout());
		opts.acquire_timeout(config.acquire_timeout());
		if let Some(max) = config.max_connections {
			opts.max_connections(max);
		}
		let orm = sea_orm::Database::connect(opts).await?;
		debug!("Connected to database {}.", path.display());

		Ok(Self { path, orm })
	}

	pub fn path(&self) -> &Path { &self.path }

	pub async fn transaction(&self) -> Result<Transaction> {
		let tx = self.orm.begin().await?;
		Ok(Transaction(tx))
	}
}

impl PersistenceHandle for Database {
	type Inner = sea_orm::DatabaseConnection;

	fn inner(&self) -> &Self::Inner { &self.orm }
}

impl PersistenceHandle for Transaction {
	type Inner = sea_orm::DatabaseTransaction;

	fn inner(&self) -> &Self::Inner { &self.0 }
}

impl From<sea_orm::DbErr> for Traced<Error> {
	fn from(other: sea_orm::DbErr) -> Self { Error::OrmError(other).into() }
}

impl From<Traced<sea_orm::DbErr>> for Traced<Error> {
	fn from(other: Traced<sea_orm::DbErr>) -> Self { other.map(Error::OrmError) }
}

impl Transaction {
	pub async fn commit(self) -> Result<()> {
		self.0.commit().await?;
		Ok(())
	}

	pub async fn rollback(self) -> Result<()> {
		self.0.rollback().await?;
		Ok(())
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::test;

	fn user(id: i64) -> EntityRef { EntityRef::new("User", id) }

	fn group(id: i64) -> EntityRef { EntityRef::new("Group", id) }

	#[tokio::test]
	async fn test_get_or_create_follow() {
		let db = test::load_database("db-follow").await;

		let (first, created) = db
			.get_or_create_follow(&user(1), &group(1), false, 1000)
			.await
			.unwrap();
		assert!(created);
		assert!(!first.actor_only);

		// A second follow keeps the original record untouched.
		let (second, created) = db
			.get_or_create_follow(&user(1), &group(1), true, 2000)
			.await
			.unwrap();
		assert!(!created);
		assert_eq!(first, second);
		assert_eq!(db.count_follows().await.unwrap(), 1);

		assert!(db.delete_follow(&user(1), &group(1)).await.unwrap());
		assert!(!db.delete_follow(&user(1), &group(1)).await.unwrap());
		assert_eq!(db.count_follows().await.unwrap(), 0);
	}

	#[tokio::test]
	async fn test_follows_anything() {
		let db = test::load_database("db-follows-anything").await;
		db.get_or_create_follow(&user(1), &group(1), false, 0)
			.await
			.unwrap();

		assert!(db.follows_anything(&user(1)).await.unwrap());
		assert!(!db.follows_anything(&user(2)).await.unwrap());
		assert!(!db.follows_anything(&group(1)).await.unwrap());
	}

	#[tokio::test]
	async fn test_purge_references_is_idempotent() {
		let db = test::load_database("db-purge").await;
		db.store_action(&NewAction::new(user(1), "joined").target(group(1)))
			.await
			.unwrap();
		db.store_action(&NewAction::new(user(2), "joined").target(group(1)))
			.await
			.unwrap();
		db.store_action(&NewAction::new(user(2), "left"))
			.await
			.unwrap();
		db.get_or_create_follow(&user(2), &group(1), true, 0)
			.await
			.unwrap();

		let summary = db.purge_references(&group(1)).await.unwrap();
		assert_eq!(
			summary,
			CascadeSummary {
				actions: 2,
				follows: 1
			}
		);
		assert_eq!(db.count_actions().await.unwrap(), 1);

		let summary = db.purge_references(&group(1)).await.unwrap();
		assert_eq!(summary, CascadeSummary::default());
	}

	#[tokio::test]
	async fn test_update_action_public() {
		let db = test::load_database("db-public").await;
		let action = db
			.store_action(&NewAction::new(user(1), "posted"))
			.await
			.unwrap();
		assert!(action.public);

		assert!(db.update_action_public(action.id, false).await.unwrap());
		assert!(!db.update_action_public(action.id + 1, false).await.unwrap());
	}

	#[tokio::test]
	async fn test_rolled_back_transaction_leaves_no_trace() {
		let db = test::load_database("db-rollback").await;
		let tx = db.transaction().await.unwrap();
		tx.store_action(&NewAction::new(user(1), "posted"))
			.await
			.unwrap();
		tx.rollback().await.unwrap();
		assert_eq!(db.count_actions().await.unwrap(), 0);
	}
}

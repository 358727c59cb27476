use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use log::*;
use sea_orm::Condition;
use thiserror::Error;

use crate::{
	common::{DocumentType, EntityRef},
	config::Config,
	db::{self, Database, PersistenceHandle},
	entity::{action, follow},
	migration::Migrations,
	model::*,
	query::{ActionQuery, Role},
	registry::{self, Registry},
	trace::{self, Traced},
};


/// The entry point of the library: the store, the document types that may
/// take part in it, and whoever wants to know about new actions.
#[derive(Clone)]
pub struct Api {
	pub db: Database,
	pub registry: Arc<Registry>,
	observers: Arc<RwLock<Vec<Arc<dyn ActionObserver>>>>,
}

#[derive(Debug, Error)]
pub enum Error {
	#[error("{0}")]
	Registry(#[from] registry::Error),
	#[error("{0}")]
	Database(#[from] db::Error),
	#[error("verb \"{0}\" is longer than 255 characters")]
	VerbTooLong(String),
}

pub type Result<T> = trace::Result<T, Error>;


impl Error {
	/// Whether the error is caused by a setup mistake rather than by the
	/// store. These are never worth retrying.
	pub fn is_configuration(&self) -> bool { matches!(self, Self::Registry(_)) }
}

impl From<registry::Error> for Traced<Error> {
	fn from(other: registry::Error) -> Self { Error::Registry(other).into() }
}

impl From<Traced<db::Error>> for Traced<Error> {
	fn from(other: Traced<db::Error>) -> Self { other.map(Error::Database) }
}

impl Api {
	pub fn new(db: Database, registry: Registry) -> Self {
		Self {
			db,
			registry: Arc::new(registry),
			observers: Arc::new(RwLock::new(Vec::new())),
		}
	}

	/// Opens and migrates the configured database. The registry starts out
	/// empty, with the configured apps installed.
	pub async fn load(config: &Config) -> Result<Self> {
		let db = Database::load_from_config(config).await?;
		Migrations::load()
			.run(&db)
			.await
			.map_err(Traced::<db::Error>::from)?;
		Ok(Self::new(db, Registry::from_config(config)))
	}

	/// Every action in the store, including the ones hidden from the public.
	pub fn actions(&self) -> ActionQuery { ActionQuery::new(self.db.clone(), Condition::all()) }

	/// All actions in which `entity` is the action object, public or not.
	pub fn action_object_actions(&self, entity: &EntityRef) -> Result<ActionQuery> {
		self.role_actions(Role::ActionObject, entity)
	}

	/// All actions in which `entity` is the actor, public or not.
	pub fn actor_actions(&self, entity: &EntityRef) -> Result<ActionQuery> {
		self.role_actions(Role::Actor, entity)
	}

	fn check_emission(&self, action: &NewAction) -> Result<()> {
		for participant in action.participants() {
			self.registry.check(participant)?;
		}
		if action.verb.chars().count() > VERB_MAX_LENGTH {
			return Err(Error::VerbTooLong(action.verb.clone()).into());
		}
		Ok(())
	}

	/// Stores a new action and notifies the observers of it.
	pub async fn emit(&self, action: NewAction) -> Result<action::Model> {
		self.check_emission(&action)?;
		let stored = self.db.store_action(&action).await?;
		debug!(
			"Stored action {}: {} {}.",
			stored.id,
			stored.actor(),
			stored.verb
		);
		self.notify(&stored);
		Ok(stored)
	}

	/// Makes `user` follow `object`. Following something twice returns the
	/// existing record, and leaves it as it was.
	pub async fn follow(
		&self, user: &EntityRef, object: &EntityRef, options: FollowOptions,
	) -> Result<follow::Model> {
		self.registry.check(user)?;
		self.registry.check(object)?;
		let started = options.timestamp.unwrap_or_else(Utc::now);

		let tx = self.db.transaction().await?;
		let (record, created) = tx
			.get_or_create_follow(user, object, options.actor_only, started.timestamp_millis())
			.await?;
		let emitted = if created && options.send_action {
			let action = NewAction::new(user.clone(), VERB_STARTED_FOLLOWING)
				.target(object.clone())
				.timestamp(started);
			Some(tx.store_action(&action).await?)
		} else {
			None
		};
		tx.commit().await?;

		if created {
			debug!("{} started following {}.", user, object);
		}
		if let Some(action) = emitted {
			self.notify(&action);
		}
		Ok(record)
	}

	/// The users that follow `object`, in the order they started following it.
	pub async fn followers(&self, object: &EntityRef) -> Result<Vec<EntityRef>> {
		Ok(self
			.for_object(object)
			.await?
			.iter()
			.map(|f| f.user())
			.collect())
	}

	/// The objects `user` follows, in the order they have been followed. If
	/// any types are given, only objects of one of those types are included.
	pub async fn following(
		&self, user: &EntityRef, types: &[DocumentType],
	) -> Result<Vec<EntityRef>> {
		self.registry.check(user)?;
		for document_type in types {
			self.registry.check(document_type)?;
		}

		let type_names: Vec<&str> = types.iter().map(|t| t.name).collect();
		let follows = self.db.load_follows_of_user(user, &type_names).await?;
		Ok(follows.iter().map(|f| f.follow_object()).collect())
	}

	/// All follow records of which `object` is the followed object.
	pub async fn for_object(&self, object: &EntityRef) -> Result<Vec<follow::Model>> {
		self.registry.check(object)?;
		Ok(self.db.load_follows_for_object(object).await?)
	}

	/// An absent user doesn't follow anything.
	pub async fn is_following(&self, user: Option<&EntityRef>, object: &EntityRef) -> Result<bool> {
		self.registry.check(object)?;
		let user = match user {
			None => return Ok(false),
			Some(u) => u,
		};
		self.registry.check(user)?;
		Ok(self.db.find_follow(user, object).await?.is_some())
	}

	fn notify(&self, action: &action::Model) {
		let observers = self
			.observers
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone();
		for observer in &observers {
			observer.action_emitted(action);
		}
	}

	/// Adds an observer that gets notified of every action stored from now on.
	pub fn observe(&self, observer: Arc<dyn ActionObserver>) {
		self.observers
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.push(observer);
	}

	fn role_actions(&self, role: Role, entity: &EntityRef) -> Result<ActionQuery> {
		self.registry.check(entity)?;
		Ok(ActionQuery::new(self.db.clone(), role.is(entity)))
	}

	/// Hides an action from, or reveals it to, the public. Returns false if
	/// the action doesn't exist.
	pub async fn set_public(&self, action_id: i64, public: bool) -> Result<bool> {
		let updated = self.db.update_action_public(action_id, public).await?;
		if updated {
			debug!("Action {} is now public: {}.", action_id, public);
		}
		Ok(updated)
	}

	/// All actions in which `entity` is the target, public or not.
	pub fn target_actions(&self, entity: &EntityRef) -> Result<ActionQuery> {
		self.role_actions(Role::Target, entity)
	}

	/// Stops `user` from following `object`. Returns false if it wasn't
	/// following it to begin with.
	pub async fn unfollow(
		&self, user: &EntityRef, object: &EntityRef, send_action: bool,
	) -> Result<bool> {
		self.registry.check(user)?;
		self.registry.check(object)?;

		let tx = self.db.transaction().await?;
		let removed = tx.delete_follow(user, object).await?;
		let emitted = if removed && send_action {
			let action = NewAction::new(user.clone(), VERB_STOPPED_FOLLOWING).target(object.clone());
			Some(tx.store_action(&action).await?)
		} else {
			None
		};
		tx.commit().await?;

		if removed {
			debug!("{} stopped following {}.", user, object);
		}
		if let Some(action) = emitted {
			self.notify(&action);
		}
		Ok(removed)
	}
}

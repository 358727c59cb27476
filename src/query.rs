//! Lazily evaluated sequences of actions, and the predicates that match
//! polymorphic references.

use std::fmt;

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt, TryStreamExt};
use sea_orm::{
	prelude::*,
	sea_query::{Expr, IntoCondition, Query, SimpleExpr},
	Condition, PaginatorTrait, QueryOrder, QuerySelect,
};

use crate::{
	common::EntityRef,
	db::{self, Database, PersistenceHandle},
	entity::{action, follow},
	trace::Traced,
};


/// One of the three parts an entity can play in an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
	Actor,
	Target,
	ActionObject,
}

pub const ROLES: [Role; 3] = [Role::Actor, Role::Target, Role::ActionObject];

/// A filtered, ordered sequence of actions. Nothing is queried until the
/// sequence is evaluated, and every evaluation queries the store again.
///
/// Actions come out newest first. Actions with equal timestamps come out in
/// reverse insertion order.
#[derive(Clone)]
pub struct ActionQuery {
	db: Database,
	condition: Condition,
	offset: u64,
	limit: Option<u64>,
	/// Known to match nothing, so the store doesn't need to be asked.
	empty: bool,
}


impl Role {
	fn columns(self) -> (action::Column, action::Column) {
		match self {
			Self::Actor => (action::Column::ActorType, action::Column::ActorId),
			Self::Target => (action::Column::TargetType, action::Column::TargetId),
			Self::ActionObject => (
				action::Column::ActionObjectType,
				action::Column::ActionObjectId,
			),
		}
	}

	/// Matches actions in which `entity` plays this role.
	pub fn is(self, entity: &EntityRef) -> Condition {
		let (type_column, id_column) = self.columns();
		Condition::all()
			.add(type_column.eq(entity.type_name.as_str()))
			.add(id_column.eq(entity.id))
	}

	/// Matches actions in which the entity playing this role is followed by
	/// `user`. The follows are looked up by the store as part of the same
	/// query, so the number of follows is not limited. Follows of objects that
	/// are only followed as an actor are left out, unless `include_actor_only`
	/// is set.
	pub fn followed_by(self, user: &EntityRef, include_actor_only: bool) -> Condition {
		let mut follows = Query::select();
		follows
			.columns([
				follow::Column::FollowObjectType,
				follow::Column::FollowObjectId,
			])
			.from(follow::Entity)
			.and_where(follow::Column::UserType.eq(user.type_name.as_str()))
			.and_where(follow::Column::UserId.eq(user.id));
		if !include_actor_only {
			follows.and_where(follow::Column::ActorOnly.eq(false));
		}

		let (type_column, id_column) = self.columns();
		Condition::all().add(
			Expr::tuple([
				SimpleExpr::from(Expr::col((action::Entity, type_column))),
				SimpleExpr::from(Expr::col((action::Entity, id_column))),
			])
			.in_subquery(follows.to_owned()),
		)
	}

	/// Matches actions in which the entity playing this role is of the given
	/// type.
	pub fn is_of_type(self, type_name: &str) -> Condition {
		Condition::all().add(self.columns().0.eq(type_name))
	}
}

/// Matches actions in which `entity` plays any role.
pub fn involving(entity: &EntityRef) -> Condition {
	ROLES
		.iter()
		.fold(Condition::any(), |c, role| c.add(role.is(entity)))
}

impl fmt::Debug for ActionQuery {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActionQuery")
			.field("condition", &self.condition)
			.field("offset", &self.offset)
			.field("limit", &self.limit)
			.field("empty", &self.empty)
			.finish_non_exhaustive()
	}
}

impl ActionQuery {
	pub(crate) fn new(db: Database, condition: Condition) -> Self {
		Self {
			db,
			condition,
			offset: 0,
			limit: None,
			empty: false,
		}
	}

	/// A sequence that never yields anything.
	pub(crate) fn none(db: Database) -> Self {
		let mut this = Self::new(db, Condition::all());
		this.empty = true;
		this
	}

	pub async fn all(&self) -> db::Result<Vec<action::Model>> {
		if self.is_none() {
			return Ok(Vec::new());
		}
		Ok(self.select().all(self.db.inner()).await?)
	}

	pub async fn count(&self) -> db::Result<u64> {
		if self.is_none() {
			return Ok(0);
		}
		// The paginator counts without offset or limit, so slicing is applied
		// on the total afterwards.
		let total = action::Entity::find()
			.filter(self.condition.clone())
			.count(self.db.inner())
			.await?;
		let remaining = total.saturating_sub(self.offset);
		Ok(match self.limit {
			Some(limit) => remaining.min(limit),
			None => remaining,
		})
	}

	pub async fn exists(&self) -> db::Result<bool> { Ok(self.first().await?.is_some()) }

	/// Adds an extra condition that every action needs to match, on top of
	/// the conditions the sequence already has.
	pub fn filter<F>(mut self, condition: F) -> Self
	where
		F: IntoCondition,
	{
		self.condition = Condition::all()
			.add(self.condition)
			.add(condition.into_condition());
		self
	}

	pub async fn first(&self) -> db::Result<Option<action::Model>> {
		if self.is_none() || self.limit == Some(0) {
			return Ok(None);
		}
		Ok(self.select().one(self.db.inner()).await?)
	}

	/// Whether the sequence is known to be empty without asking the store.
	pub fn is_none(&self) -> bool { self.empty }

	/// Only the actions that are visible to the public.
	pub fn public(self) -> Self { self.filter(action::Column::Public.eq(true)) }

	fn select(&self) -> Select<action::Entity> {
		let mut select = action::Entity::find()
			.filter(self.condition.clone())
			.order_by_desc(action::Column::Timestamp)
			.order_by_desc(action::Column::Id);
		if self.offset > 0 {
			// SQLite doesn't accept an offset without a limit
			select = select
				.offset(self.offset)
				.limit(self.limit.unwrap_or(i64::MAX as u64));
		} else if let Some(limit) = self.limit {
			select = select.limit(limit);
		}
		select
	}

	/// Only the actions that happened at or after the given moment.
	pub fn since(self, moment: DateTime<Utc>) -> Self {
		self.filter(action::Column::Timestamp.gte(moment.timestamp_millis()))
	}

	/// Narrows the sequence down to the given positions of it, like slicing a
	/// list. Slicing an already sliced sequence is relative to that slice.
	pub fn slice(mut self, start: u64, end: Option<u64>) -> Self {
		let available = self.limit.map(|l| l.saturating_sub(start));
		let wanted = end.map(|e| e.saturating_sub(start));
		self.limit = match (available, wanted) {
			(Some(a), Some(w)) => Some(a.min(w)),
			(a, w) => a.or(w),
		};
		self.offset += start;
		self
	}

	/// Iterates over the actions with a database cursor, without loading them
	/// all at once.
	pub async fn stream(
		&self,
	) -> db::Result<impl Stream<Item = db::Result<action::Model>> + Send + '_> {
		let rows = if self.is_none() {
			None
		} else {
			Some(self.select().stream(self.db.inner()).await?)
		};
		Ok(futures::stream::iter(rows)
			.flatten()
			.map_err(|e| Traced::new(db::Error::OrmError(e))))
	}

	/// Only the actions that happened before the given moment.
	pub fn until(self, moment: DateTime<Utc>) -> Self {
		self.filter(action::Column::Timestamp.lt(moment.timestamp_millis()))
	}

	pub fn verb(self, verb: &str) -> Self { self.filter(action::Column::Verb.eq(verb)) }
}

//! An action is a single event: an actor performed a verb, optionally on an
//! action object, optionally toward a target.
//!
//! ```text
//! <actor> <verb> <time>
//! <actor> <verb> <target> <time>
//! <actor> <verb> <action_object> <target> <time>
//! ```

use chrono::{DateTime, TimeZone, Utc};
use log::*;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{common::EntityRef, timesince::timesince};


#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Deserialize, Serialize)]
#[sea_orm(table_name = "action")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub id: i64,
	pub actor_type: String,
	pub actor_id: i64,
	pub verb: String,
	#[sea_orm(column_type = "Text", nullable)]
	pub description: Option<String>,
	pub target_type: Option<String>,
	pub target_id: Option<i64>,
	pub action_object_type: Option<String>,
	pub action_object_id: Option<i64>,
	/// Milliseconds since the Unix epoch, in UTC.
	pub timestamp: i64,
	pub public: bool,
	pub data: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}


impl Model {
	pub fn actor(&self) -> EntityRef { EntityRef::new(self.actor_type.as_str(), self.actor_id) }

	pub fn action_object(&self) -> Option<EntityRef> {
		EntityRef::from_columns(self.action_object_type.as_ref(), self.action_object_id)
	}

	pub fn datetime(&self) -> DateTime<Utc> {
		match Utc.timestamp_millis_opt(self.timestamp).single() {
			Some(moment) => moment,
			None => {
				warn!(
					"Action {} has an out-of-range timestamp ({}), using the epoch instead.",
					self.id, self.timestamp
				);
				DateTime::default()
			}
		}
	}

	/// Renders the action as a sentence, using `name_of` to resolve the
	/// display names of the participants.
	pub fn describe<F>(&self, name_of: F, now: Option<DateTime<Utc>>) -> String
	where
		F: Fn(&EntityRef) -> String,
	{
		let actor = name_of(&self.actor());
		let age = self.timesince(now);
		match (self.action_object(), self.target()) {
			(Some(object), Some(target)) => format!(
				"{} {} {} on {} {} ago",
				actor,
				self.verb,
				name_of(&object),
				name_of(&target),
				age
			),
			(None, Some(target)) =>
				format!("{} {} {} {} ago", actor, self.verb, name_of(&target), age),
			(Some(object), None) =>
				format!("{} {} {} {} ago", actor, self.verb, name_of(&object), age),
			(None, None) => format!("{} {} {} ago", actor, self.verb, age),
		}
	}

	/// Whether the given entity takes part in this action, in any role.
	pub fn involves(&self, entity: &EntityRef) -> bool {
		self.actor() == *entity
			|| self.target().as_ref() == Some(entity)
			|| self.action_object().as_ref() == Some(entity)
	}

	pub fn target(&self) -> Option<EntityRef> {
		EntityRef::from_columns(self.target_type.as_ref(), self.target_id)
	}

	/// The time passed since the action happened, relative to `now` or to the
	/// current time if not given.
	pub fn timesince(&self, now: Option<DateTime<Utc>>) -> String {
		timesince(self.datetime(), now.unwrap_or_else(Utc::now))
	}
}

//! A standing subscription of a user to any registered entity. There is at
//! most one record per (user, follow object) pair.

use chrono::{DateTime, TimeZone, Utc};
use log::*;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::common::EntityRef;


#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Deserialize, Serialize)]
#[sea_orm(table_name = "follow")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = true)]
	pub id: i64,
	pub user_type: String,
	pub user_id: i64,
	pub follow_object_type: String,
	pub follow_object_id: i64,
	/// If set, only actions in which the followed object is the actor are of
	/// interest. Otherwise, actions that target it or act on it are too.
	pub actor_only: bool,
	/// Milliseconds since the Unix epoch, in UTC.
	pub started: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}


impl Model {
	pub fn follow_object(&self) -> EntityRef {
		EntityRef::new(self.follow_object_type.as_str(), self.follow_object_id)
	}

	pub fn started_at(&self) -> DateTime<Utc> {
		match Utc.timestamp_millis_opt(self.started).single() {
			Some(moment) => moment,
			None => {
				warn!(
					"Follow {} has an out-of-range start time ({}), using the epoch instead.",
					self.id, self.started
				);
				DateTime::default()
			}
		}
	}

	pub fn user(&self) -> EntityRef { EntityRef::new(self.user_type.as_str(), self.user_id) }
}

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{common::EntityRef, entity::action};


/// The longest verb an action can have.
pub const VERB_MAX_LENGTH: usize = 255;

pub const VERB_STARTED_FOLLOWING: &str = "started following";
pub const VERB_STOPPED_FOLLOWING: &str = "stopped following";


/// An action that is about to be emitted.
#[derive(Clone, Debug)]
pub struct NewAction {
	pub actor: EntityRef,
	pub verb: String,
	pub description: Option<String>,
	pub target: Option<EntityRef>,
	pub action_object: Option<EntityRef>,
	/// Defaults to the moment the action gets stored.
	pub timestamp: Option<DateTime<Utc>>,
	pub public: bool,
	pub data: Option<Value>,
}

#[derive(Clone, Debug)]
pub struct FollowOptions {
	pub actor_only: bool,
	/// Defaults to the moment the follow gets stored.
	pub timestamp: Option<DateTime<Utc>>,
	/// Whether to emit a "started following" action for new follows.
	pub send_action: bool,
}

/// Gets notified of every action that has been stored, in the order the
/// observers were added.
pub trait ActionObserver: Send + Sync {
	fn action_emitted(&self, action: &action::Model);
}


impl NewAction {
	pub fn new(actor: EntityRef, verb: impl Into<String>) -> Self {
		Self {
			actor,
			verb: verb.into(),
			description: None,
			target: None,
			action_object: None,
			timestamp: None,
			public: true,
			data: None,
		}
	}

	pub fn action_object(mut self, action_object: EntityRef) -> Self {
		self.action_object = Some(action_object);
		self
	}

	pub fn data(mut self, data: Value) -> Self {
		self.data = Some(data);
		self
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	/// All entities taking part in the action.
	pub fn participants(&self) -> impl Iterator<Item = &EntityRef> {
		Some(&self.actor)
			.into_iter()
			.chain(self.target.as_ref())
			.chain(self.action_object.as_ref())
	}

	pub fn public(mut self, public: bool) -> Self {
		self.public = public;
		self
	}

	pub fn target(mut self, target: EntityRef) -> Self {
		self.target = Some(target);
		self
	}

	pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
		self.timestamp = Some(timestamp);
		self
	}
}

impl FollowOptions {
	pub fn actor_only(mut self, actor_only: bool) -> Self {
		self.actor_only = actor_only;
		self
	}

	pub fn send_action(mut self, send_action: bool) -> Self {
		self.send_action = send_action;
		self
	}

	pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
		self.timestamp = Some(timestamp);
		self
	}
}

impl Default for FollowOptions {
	fn default() -> Self {
		Self {
			actor_only: true,
			timestamp: None,
			send_action: true,
		}
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_participants() {
		let user = EntityRef::new("User", 1);
		let group = EntityRef::new("Group", 2);
		let comment = EntityRef::new("Comment", 3);

		let action = NewAction::new(user.clone(), "liked");
		assert_eq!(action.participants().collect::<Vec<_>>(), vec![&user]);

		let action = NewAction::new(user.clone(), "commented")
			.target(group.clone())
			.action_object(comment.clone());
		assert_eq!(
			action.participants().collect::<Vec<_>>(),
			vec![&user, &group, &comment]
		);
		assert!(action.public);
	}
}

//! The feeds: public actions relevant to a subject, newest first.
//!
//! Every feed validates its subject against the registry before it builds its
//! query, so an unregistered type fails without the store ever being asked.

use log::*;
use sea_orm::Condition;

use crate::{
	api::{Api, Result},
	common::{EntityRef, TypeTag},
	db::PersistenceHandle,
	query::{self, ActionQuery, Role, ROLES},
};


impl Api {
	/// Public actions in which `subject` is the action object.
	pub fn action_object_stream(&self, subject: &EntityRef) -> Result<ActionQuery> {
		Ok(self.action_object_actions(subject)?.public())
	}

	/// Public actions in which `subject` is the actor.
	pub fn actor_stream(&self, subject: &EntityRef) -> Result<ActionQuery> {
		Ok(self.actor_actions(subject)?.public())
	}

	/// Public actions in which `subject` plays any role.
	pub fn any_stream(&self, subject: &EntityRef) -> Result<ActionQuery> {
		self.registry.check(subject)?;
		Ok(ActionQuery::new(self.db.clone(), query::involving(subject)).public())
	}

	/// Public actions in which any document of the type of `subject` plays any
	/// role. The subject can be a type or a reference to a document of it.
	pub fn document_stream<T>(&self, subject: &T) -> Result<ActionQuery>
	where
		T: TypeTag + ?Sized,
	{
		let document_type = self.registry.check(subject)?;
		let condition = ROLES.iter().fold(Condition::any(), |c, role| {
			c.add(role.is_of_type(document_type.name))
		});
		Ok(ActionQuery::new(self.db.clone(), condition).public())
	}

	/// Public actions in which `subject` is the target.
	pub fn target_stream(&self, subject: &EntityRef) -> Result<ActionQuery> {
		Ok(self.target_actions(subject)?.public())
	}

	/// The personal feed of `user`: the public actions of everything it
	/// follows. Objects that are not followed as an actor only are also
	/// matched as the target or action object. With `with_user_activity`, the
	/// actions of the user itself are included as well.
	///
	/// An absent user has an empty feed.
	pub async fn user_stream(
		&self, user: Option<&EntityRef>, with_user_activity: bool,
	) -> Result<ActionQuery> {
		let user = match user {
			None => return Ok(ActionQuery::none(self.db.clone())),
			Some(u) => u,
		};
		self.registry.check(user)?;

		let follows_anything = self.db.follows_anything(user).await?;
		if !follows_anything && !with_user_activity {
			trace!("Feed of {} is empty, it follows nothing.", user);
			return Ok(ActionQuery::none(self.db.clone()));
		}

		let mut condition = Condition::any();
		if follows_anything {
			condition = condition
				.add(Role::Actor.followed_by(user, true))
				.add(Role::Target.followed_by(user, false))
				.add(Role::ActionObject.followed_by(user, false));
		}
		if with_user_activity {
			condition = condition.add(Role::Actor.is(user));
		}
		Ok(ActionQuery::new(self.db.clone(), condition).public())
	}
}

use async_trait::async_trait;
use sea_orm::{
	prelude::*,
	sea_query::{Index, IndexCreateStatement},
	DatabaseBackend, DatabaseTransaction, Schema,
};

use super::MigrationTrait;
use crate::{
	entity::{action, follow},
	trace,
};


pub struct Migration;


fn index<E, C>(name: &str, entity: E, columns: &[C]) -> IndexCreateStatement
where
	E: EntityTrait + 'static,
	C: ColumnTrait + 'static,
{
	let mut stat = Index::create();
	stat.name(name).table(entity).if_not_exists();
	for column in columns {
		stat.col(*column);
	}
	stat.to_owned()
}


#[async_trait]
impl MigrationTrait for Migration {
	async fn run(&self, tx: &DatabaseTransaction) -> trace::Result<(), DbErr> {
		let backend = DatabaseBackend::Sqlite;
		let schema = Schema::new(backend);

		let stat = schema.create_table_from_entity(action::Entity);
		tx.execute(backend.build(&stat)).await?;
		let stat = schema.create_table_from_entity(follow::Entity);
		tx.execute(backend.build(&stat)).await?;

		// Every feed filters on one of the roles and orders by time
		let indexes = [
			index("action_timestamp", action::Entity, &[action::Column::Timestamp]),
			index("action_verb", action::Entity, &[action::Column::Verb]),
			index("action_public", action::Entity, &[action::Column::Public]),
			index(
				"action_actor",
				action::Entity,
				&[action::Column::ActorType, action::Column::ActorId],
			),
			index(
				"action_target",
				action::Entity,
				&[action::Column::TargetType, action::Column::TargetId],
			),
			index(
				"action_action_object",
				action::Entity,
				&[
					action::Column::ActionObjectType,
					action::Column::ActionObjectId,
				],
			),
			index("follow_started", follow::Entity, &[follow::Column::Started]),
			index(
				"follow_user",
				follow::Entity,
				&[follow::Column::UserType, follow::Column::UserId],
			),
			index(
				"follow_object",
				follow::Entity,
				&[
					follow::Column::FollowObjectType,
					follow::Column::FollowObjectId,
				],
			),
		];
		for stat in &indexes {
			tx.execute(backend.build(stat)).await?;
		}

		// A user follows an object at most once
		let stat = index(
			"follow_pair",
			follow::Entity,
			&[
				follow::Column::UserType,
				follow::Column::UserId,
				follow::Column::FollowObjectType,
				follow::Column::FollowObjectId,
			],
		)
		.unique()
		.to_owned();
		tx.execute(backend.build(&stat)).await?;
		Ok(())
	}
}

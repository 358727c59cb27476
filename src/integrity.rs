//! Keeps actions and follows from pointing at documents that have been
//! deleted.
//!
//! Deleting a document goes through a [`Deletion`]: it removes every action
//! and follow referring to the document inside a transaction, in which the
//! host then deletes the document itself. Nothing is visible to others until
//! the deletion is committed, and a deletion that is dropped halfway is rolled
//! back as a whole.

use log::*;

use crate::{
	api::{Api, Result},
	common::EntityRef,
	db::{CascadeSummary, PersistenceHandle, Transaction},
};


pub struct Deletion {
	entity: EntityRef,
	tx: Transaction,
	summary: CascadeSummary,
}


impl Api {
	/// Starts deleting `entity`, removing everything that refers to it.
	/// Documents of unregistered types can't be referred to, so for them the
	/// deletion is just an empty transaction.
	pub async fn begin_delete(&self, entity: &EntityRef) -> Result<Deletion> {
		let tx = self.db.transaction().await?;
		let summary = if self.registry.is_registered(&entity.type_name) {
			tx.purge_references(entity).await?
		} else {
			warn!(
				"Deleting {}, which is of an unregistered type, leaves its references alone.",
				entity
			);
			CascadeSummary::default()
		};
		debug!(
			"Deletion of {} removes {} actions and {} follows.",
			entity, summary.actions, summary.follows
		);
		Ok(Deletion {
			entity: entity.clone(),
			tx,
			summary,
		})
	}

	/// Removes everything that refers to `entity` right away. Purging an
	/// entity that has nothing referring to it (anymore) does nothing.
	pub async fn purge(&self, entity: &EntityRef) -> Result<CascadeSummary> {
		self.begin_delete(entity).await?.commit().await
	}
}

impl Deletion {
	pub async fn commit(self) -> Result<CascadeSummary> {
		self.tx.commit().await?;
		trace!("Committed deletion of {}.", self.entity);
		Ok(self.summary)
	}

	pub fn entity(&self) -> &EntityRef { &self.entity }

	/// Undoes the removal of the references, as does dropping the deletion.
	pub async fn rollback(self) -> Result<()> {
		self.tx.rollback().await?;
		Ok(())
	}

	/// What has been removed so far.
	pub fn summary(&self) -> CascadeSummary { self.summary }

	/// The transaction in which the host should delete the entity itself.
	pub fn transaction(&self) -> &Transaction { &self.tx }
}

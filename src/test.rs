use log::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tempfile::NamedTempFile;

use crate::{
	api::Api,
	common::{Document, DocumentType},
	db::Database,
	migration::Migrations,
	registry::Registry,
};


/// A user of the host application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct User(pub i64);

/// A group of users of the host application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Group(pub i64);

pub const INSTALLED_APPS: [&str; 1] = ["auth"];


impl Document for User {
	const TYPE: DocumentType = DocumentType::new("User", "auth");

	fn id(&self) -> i64 { self.0 }
}

impl Document for Group {
	const TYPE: DocumentType = DocumentType::new("Group", "auth");

	fn id(&self) -> i64 { self.0 }
}

pub fn initialize_rng() -> ChaCha8Rng {
	let seed = <ChaCha8Rng as SeedableRng>::Seed::default();
	ChaCha8Rng::from_seed(seed)
}

/// Sets up an API on a fresh database, with the `User` and `Group` documents
/// registered.
pub async fn load_api(filename: &str) -> Api {
	let db = load_database(filename).await;
	let registry = Registry::new(INSTALLED_APPS);
	registry
		.register(&[User::TYPE, Group::TYPE])
		.expect("unable to register test documents");
	Api::new(db, registry)
}

pub async fn load_database(filename: &str) -> Database {
	let temp_file = NamedTempFile::with_prefix(filename).unwrap();
	let db = Database::load(temp_file.path().to_owned())
		.await
		.expect("unable to load database");
	let migrations = Migrations::load();
	migrations.run(&db).await.expect("migration issue");
	debug!("Loaded database at {}", temp_file.path().display());
	// Leak it on purpose so that the temp file may live until the end of all tests
	Box::into_raw(Box::new(temp_file));
	db
}

//! Keeps track of the document types that may take part in actions and
//! follows. Registration normally happens once at startup, after which the
//! registry is only read.

use std::{
	collections::{HashMap, HashSet},
	sync::{PoisonError, RwLock},
};

use log::*;
use thiserror::Error;

use crate::{
	common::{DocumentKind, DocumentType, TypeTag},
	config::Config,
};


#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
	#[error("document {name} can not be registered: {reason}")]
	Registration { name: String, reason: String },
	#[error("the document {0} is not registered, please register it first")]
	NotRegistered(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Default)]
pub struct Registry {
	installed_apps: HashSet<String>,
	registered: RwLock<HashMap<String, DocumentType>>,
}


impl Registry {
	pub fn new<I, S>(installed_apps: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			installed_apps: installed_apps.into_iter().map(|a| a.into()).collect(),
			registered: RwLock::new(HashMap::new()),
		}
	}

	pub fn from_config(config: &Config) -> Self { Self::new(config.installed_apps.iter().cloned()) }

	/// Fails with `Error::NotRegistered` if the type of the subject is not
	/// currently registered. If the subject carries a full type description,
	/// it is validated first.
	pub fn check<T>(&self, subject: &T) -> Result<DocumentType>
	where
		T: TypeTag + ?Sized,
	{
		let requested = match subject.document_type() {
			Some(t) => Some(self.validate(&t)?),
			None => None,
		};

		let registered = self.registered.read().unwrap_or_else(PoisonError::into_inner);
		match registered.get(subject.type_name()) {
			Some(found) if requested.map(|r| &r == found).unwrap_or(true) => Ok(*found),
			_ => Err(Error::NotRegistered(subject.type_name().to_string())),
		}
	}

	pub fn is_registered(&self, type_name: &str) -> bool {
		self.registered
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.contains_key(type_name)
	}

	/// Registers the given types. Every type is validated before any of them
	/// is registered, and registering a type twice has no effect.
	pub fn register(&self, types: &[DocumentType]) -> Result<()> {
		for document_type in types {
			self.validate(document_type)?;
		}

		let mut registered = self.registered.write().unwrap_or_else(PoisonError::into_inner);
		for document_type in types {
			if registered.contains_key(document_type.name) {
				continue;
			}
			debug!("Registering document {}.", document_type);
			registered.insert(document_type.name.to_string(), *document_type);
		}
		Ok(())
	}

	pub fn registered(&self) -> Vec<DocumentType> {
		let mut types: Vec<_> = self
			.registered
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.values()
			.copied()
			.collect();
		types.sort_by_key(|t| t.name);
		types
	}

	pub fn unregister(&self, types: &[DocumentType]) -> Result<()> {
		for document_type in types {
			self.validate(document_type)?;
		}

		let mut registered = self.registered.write().unwrap_or_else(PoisonError::into_inner);
		for document_type in types {
			if registered.remove(document_type.name).is_some() {
				debug!("Unregistered document {}.", document_type);
			}
		}
		Ok(())
	}

	fn validate(&self, document_type: &DocumentType) -> Result<DocumentType> {
		let fail = |reason: String| Error::Registration {
			name: document_type.name.to_string(),
			reason,
		};

		match document_type.kind {
			DocumentKind::TopLevel => {}
			DocumentKind::Embedded => Err(fail("it is not a top-level document".into()))?,
			DocumentKind::Abstract => Err(fail("it is abstract".into()))?,
		}
		if !self.installed_apps.contains(document_type.app) {
			Err(fail(format!(
				"it is not installed, please add the app \"{}\" to the installed apps",
				document_type.app
			)))?;
		}
		Ok(*document_type)
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::common::EntityRef;

	const USER: DocumentType = DocumentType::new("User", "auth");
	const GROUP: DocumentType = DocumentType::new("Group", "auth");

	fn registry() -> Registry { Registry::new(["auth"]) }

	#[test]
	fn test_register_and_check() {
		let registry = registry();
		assert_eq!(
			registry.check(&USER),
			Err(Error::NotRegistered("User".into()))
		);

		registry.register(&[USER]).unwrap();
		assert_eq!(registry.check(&USER), Ok(USER));
		assert_eq!(registry.check(&EntityRef::new("User", 3)), Ok(USER));
		assert_eq!(registry.check("User"), Ok(USER));
		assert!(registry.check("Group").is_err());
	}

	#[test]
	fn test_register_twice_is_a_no_op() {
		let registry = registry();
		registry.register(&[USER, GROUP]).unwrap();
		registry.register(&[USER]).unwrap();
		assert_eq!(registry.registered(), vec![GROUP, USER]);
	}

	#[test]
	fn test_invalid_types_are_rejected() {
		let registry = registry();
		let embedded = DocumentType::embedded("Address", "auth");
		let abstract_ = DocumentType::abstract_("Base", "auth");
		let uninstalled = DocumentType::new("Ticket", "helpdesk");

		for t in [embedded, abstract_, uninstalled] {
			match registry.register(&[t]) {
				Err(Error::Registration { name, .. }) => assert_eq!(name, t.name),
				other => panic!("unexpected result for {}: {:?}", t, other),
			}
		}
		assert!(registry.registered().is_empty());
	}

	#[test]
	fn test_failed_batch_registers_nothing() {
		let registry = registry();
		let uninstalled = DocumentType::new("Ticket", "helpdesk");
		assert!(registry.register(&[USER, uninstalled]).is_err());
		assert!(!registry.is_registered("User"));
	}

	#[test]
	fn test_unregister() {
		let registry = registry();
		registry.unregister(&[USER]).unwrap();

		registry.register(&[USER, GROUP]).unwrap();
		registry.unregister(&[USER]).unwrap();
		assert!(!registry.is_registered("User"));
		assert!(registry.is_registered("Group"));
	}

	#[test]
	fn test_check_validates_full_types() {
		let registry = registry();
		registry.register(&[USER]).unwrap();

		// Same name, but defined by another component.
		let impostor = DocumentType::new("User", "blog");
		assert!(matches!(
			registry.check(&impostor),
			Err(Error::Registration { .. })
		));
	}
}

use std::fmt;

use serde::{Deserialize, Serialize};


/// A polymorphic pointer to a document of any registered type. It never holds
/// a copy of the document, so it may dangle once the document is deleted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct EntityRef {
	pub type_name: String,
	pub id: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DocumentKind {
	/// A document that is stored in a collection of its own.
	TopLevel,
	/// A base type that only exists to be derived from.
	Abstract,
	/// A document that only lives inside another document.
	Embedded,
}

/// Describes a persisted document type of the host application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DocumentType {
	pub name: &'static str,
	/// The component of the host application that defines the type.
	pub app: &'static str,
	pub kind: DocumentKind,
}

/// A host document that can take part in actions or be followed.
pub trait Document {
	const TYPE: DocumentType;

	fn id(&self) -> i64;

	fn entity_ref(&self) -> EntityRef { EntityRef::new(Self::TYPE.name, self.id()) }
}

/// Anything a document type can be derived from: a type, or an instance of it.
pub trait TypeTag {
	fn type_name(&self) -> &str;

	/// The full type description, if known. Plain references only carry the
	/// name.
	fn document_type(&self) -> Option<DocumentType> { None }
}


impl EntityRef {
	pub fn new(type_name: impl Into<String>, id: i64) -> Self {
		Self {
			type_name: type_name.into(),
			id,
		}
	}

	/// Builds a reference out of a nullable type & id column pair.
	pub(crate) fn from_columns(type_name: Option<&String>, id: Option<i64>) -> Option<Self> {
		match (type_name, id) {
			(Some(t), Some(id)) => Some(Self::new(t.as_str(), id)),
			_ => None,
		}
	}
}

impl<D> From<&D> for EntityRef
where
	D: Document,
{
	fn from(document: &D) -> Self { document.entity_ref() }
}

impl fmt::Display for EntityRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.type_name, self.id)
	}
}

impl DocumentType {
	pub const fn new(name: &'static str, app: &'static str) -> Self {
		Self {
			name,
			app,
			kind: DocumentKind::TopLevel,
		}
	}

	pub const fn abstract_(name: &'static str, app: &'static str) -> Self {
		Self {
			name,
			app,
			kind: DocumentKind::Abstract,
		}
	}

	pub const fn embedded(name: &'static str, app: &'static str) -> Self {
		Self {
			name,
			app,
			kind: DocumentKind::Embedded,
		}
	}
}

impl fmt::Display for DocumentType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}", self.app, self.name)
	}
}

impl TypeTag for EntityRef {
	fn type_name(&self) -> &str { &self.type_name }
}

impl TypeTag for DocumentType {
	fn type_name(&self) -> &str { self.name }

	fn document_type(&self) -> Option<DocumentType> { Some(*self) }
}

impl TypeTag for str {
	fn type_name(&self) -> &str { self }
}

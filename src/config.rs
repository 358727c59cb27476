use std::{io, path::Path, time::Duration};

use serde::*;
use thiserror::Error;


#[derive(Debug, Error)]
pub enum Error {
	#[error("unable to read config file: {0}")]
	Io(#[from] io::Error),
	#[error("unable to parse config file: {0}")]
	Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub database_path: String,
	/// The components of the host application that are active. Only document
	/// types of these components can be registered.
	#[serde(default)]
	pub installed_apps: Vec<String>,

	pub max_connections: Option<u32>,
	/// In seconds
	pub idle_timeout: Option<u64>,
	/// In seconds
	pub acquire_timeout: Option<u64>,
}


impl Config {
	pub fn acquire_timeout(&self) -> Duration { Duration::from_secs(self.acquire_timeout.unwrap_or(1)) }

	pub fn idle_timeout(&self) -> Duration { Duration::from_secs(self.idle_timeout.unwrap_or(10)) }

	pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
		let content = tokio::fs::read_to_string(path).await?;
		Ok(toml::from_str(&content)?)
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			database_path: String::default(),
			installed_apps: Vec::new(),
			max_connections: None,
			idle_timeout: None,
			acquire_timeout: None,
		}
	}
}


#[cfg(test)]
mod tests {
	use std::io::Write;

	use tempfile::NamedTempFile;

	use super::*;

	#[tokio::test]
	async fn test_load() {
		let mut file = NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
			database_path = "/var/lib/actstream/db.sqlite"
			installed_apps = ["auth", "groups"]
			idle_timeout = 30
		"#
		)
		.unwrap();

		let config = Config::load(file.path()).await.unwrap();
		assert_eq!(config.database_path, "/var/lib/actstream/db.sqlite");
		assert_eq!(config.installed_apps, vec!["auth", "groups"]);
		assert_eq!(config.idle_timeout(), Duration::from_secs(30));
		assert_eq!(config.acquire_timeout(), Duration::from_secs(1));
		assert_eq!(config.max_connections, None);
	}

	#[tokio::test]
	async fn test_load_rejects_garbage() {
		let mut file = NamedTempFile::new().unwrap();
		write!(file, "installed_apps = 3").unwrap();
		assert!(matches!(
			Config::load(file.path()).await,
			Err(Error::Parse(_))
		));
	}

	#[tokio::test]
	async fn test_load_missing_file() {
		assert!(matches!(
			Config::load("/nonexistent/actstream.toml").await,
			Err(Error::Io(_))
		));
	}
}

use std::{
	backtrace::Backtrace,
	error::Error,
	fmt::{Debug, Display},
	ops::Deref,
	result::Result as StdResult,
};


pub type Result<T, E> = StdResult<T, Traced<E>>;

/// An error together with the backtrace of the place it was raised at. The
/// backtrace is only captured in debug builds.
pub struct Traced<E> {
	inner: E,
	#[cfg(debug_assertions)]
	backtrace: Backtrace,
}


impl<T> Traced<T> {
	pub fn new(inner: T) -> Self {
		Self {
			inner,
			#[cfg(debug_assertions)]
			backtrace: Backtrace::force_capture(),
		}
	}

	#[cfg(debug_assertions)]
	pub fn backtrace(&self) -> Option<&Backtrace> { Some(&self.backtrace) }

	#[cfg(not(debug_assertions))]
	pub fn backtrace(&self) -> Option<&Backtrace> { None }

	pub fn into_inner(self) -> T { self.inner }

	/// Converts the inner error, keeping the original backtrace.
	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Traced<U> {
		Traced {
			inner: f(self.inner),
			#[cfg(debug_assertions)]
			backtrace: self.backtrace,
		}
	}
}

impl<E> From<E> for Traced<E> {
	fn from(other: E) -> Self { Self::new(other) }
}

impl<E> Deref for Traced<E> {
	type Target = E;

	fn deref(&self) -> &Self::Target { &self.inner }
}

impl<E> Debug for Traced<E>
where
	E: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		writeln!(f, "{:?}", &self.inner)?;
		if let Some(b) = self.backtrace() {
			write!(f, "{}", b)?;
		}
		Ok(())
	}
}

impl<E> Display for Traced<E>
where
	E: Display,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", &self.inner)
	}
}

impl<E> Error for Traced<E>
where
	E: Error,
{
	fn source(&self) -> Option<&(dyn Error + 'static)> { self.inner.source() }
}

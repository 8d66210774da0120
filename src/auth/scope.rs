//! Token scopes as the bank's token endpoint expects them.
//!
//! A PSD2 scope is a PSU context followed by a service name, e.g. `private accountinformation`.
//! The bank reads the entries positionally, so a [`ScopeSet`] keeps the caller's order and only
//! drops repeats.

// self
use crate::{_prelude::*, resource::ResourceKind};

/// Rejected scope entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// An entry, or the whole input, is blank.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// An entry carries whitespace and would split into two scopes on the wire.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// Offending entry.
		scope: String,
	},
}

/// Ordered scope list without duplicates.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopeSet(Arc<[String]>);
impl ScopeSet {
	/// Builds a scope list; later repeats of an entry are dropped.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut entries = Vec::<String>::new();

		for scope in scopes.into_iter().map(Into::into) {
			check_entry(&scope)?;

			if !entries.contains(&scope) {
				entries.push(scope);
			}
		}

		Ok(Self(entries.into()))
	}

	/// Parses the space-delimited wire form. The empty string yields an empty set.
	pub fn parse(raw: &str) -> Result<Self, ScopeValidationError> {
		raw.parse()
	}

	/// `<context> <service>` for a resource kind, where the context is `private` or
	/// `corporate`.
	pub fn for_resource(context: &str, kind: ResourceKind) -> Result<Self, ScopeValidationError> {
		Self::new([context, kind.scope_service()])
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Whether the set has no entries.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Whether `scope` is one of the entries.
	pub fn contains(&self, scope: &str) -> bool {
		self.iter().any(|entry| entry == scope)
	}

	/// Entries in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Space-delimited form sent as the `scope` form field.
	pub fn normalized(&self) -> String {
		self.0.join(" ")
	}

	/// Entries as stored.
	pub fn as_slice(&self) -> &[String] {
		&self.0
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_list().entries(self.iter()).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"" => Ok(Self::default()),
			blank if blank.trim().is_empty() => Err(ScopeValidationError::Empty),
			_ => Self::new(s.split_whitespace()),
		}
	}
}
impl TryFrom<String> for ScopeSet {
	type Error = ScopeValidationError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}
impl From<ScopeSet> for String {
	fn from(value: ScopeSet) -> Self {
		value.normalized()
	}
}

fn check_entry(scope: &str) -> Result<(), ScopeValidationError> {
	if scope.is_empty() {
		Err(ScopeValidationError::Empty)
	} else if scope.contains(char::is_whitespace) {
		Err(ScopeValidationError::ContainsWhitespace { scope: scope.to_owned() })
	} else {
		Ok(())
	}
}

//! Identifiers, scope sets, and bearer tokens.

pub mod id;
pub mod scope;
pub mod token;

pub use id::*;
pub use scope::*;
pub use token::{secret::*, *};

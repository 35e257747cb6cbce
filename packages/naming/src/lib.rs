//! appcell naming: the hierarchical runtime name space.
//!
//! This crate is the naming core of the appcell application container:
//! - `NamingDirectory`: tree-structured name space with scheme-qualified
//!   roots, tokenized path resolution and parent delegation
//! - `BoundValue`: what a segment resolves to — a direct value, a callback
//!   invoked at lookup time, or a nested sub-directory
//! - `Value`: the data a lookup returns, including opaque runtime handles
//!
//! Use this layer to let any component of a deployed application bind a
//! name to a value, a callback or a sub-directory, and resolve it later
//! from any thread.
//!
//! # Example
//!
//! ```rust
//! use appcell_naming::{NamingDirectory, Value};
//!
//! let root = NamingDirectory::root("php", "global");
//! let env = root.create_subdirectory("env", &[]).unwrap();
//! env.bind("user", Value::from("www-data")).unwrap();
//!
//! assert_eq!(
//!     root.search("php:env/user", &[]).unwrap(),
//!     Value::from("www-data"),
//! );
//! ```

mod binding;
mod directory;
mod error;
mod path;
mod value;

pub use binding::{BoundValue, Callback};
pub use directory::NamingDirectory;
pub use error::NamingError;
pub use value::Value;

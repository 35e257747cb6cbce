//! The hierarchical naming directory.
//!
//! A directory is a tree of nodes rooted at a scheme (e.g. `php`). Each
//! node maps path segments to bound values: plain values, callbacks
//! invoked at lookup time, or nested sub-directories. Lookups walk the
//! segments of a slash-delimited name and fall back to the parent
//! directory when nothing matches locally, so every descendant can
//! resolve names bound near the root.
//!
//! Handles are cheap to clone and safe to share across threads: binds and
//! lookups may run concurrently without caller-side locking.
//!
//! # Example
//!
//! ```rust
//! use appcell_naming::{NamingDirectory, Value};
//!
//! let env = NamingDirectory::root("php", "env");
//! env.bind("php:user", Value::from("www-data")).unwrap();
//! assert_eq!(env.search("php:user", &[]).unwrap(), Value::from("www-data"));
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use glob::Pattern;

use crate::binding::{BoundValue, Callback};
use crate::error::NamingError;
use crate::path;
use crate::value::Value;

/// A single addressable node in the name space.
///
/// Nodes are owned by their parent through the binding map; the
/// back-reference to the parent is weak, so ownership flows strictly root
/// to leaf. A node without a parent must carry a scheme for identifier
/// construction to succeed. The tree is append-only: nodes are created by
/// binds and sub-directory creation, never deleted.
struct NamingNode {
    name: String,
    scheme: Option<String>,
    parent: Weak<NamingNode>,
    bindings: DashMap<String, BoundValue>,
}

/// Cheaply cloneable, thread-safe handle to a naming node.
#[derive(Clone)]
pub struct NamingDirectory {
    node: Arc<NamingNode>,
}

impl NamingDirectory {
    /// Create a root directory carrying the given scheme.
    pub fn root(scheme: &str, name: &str) -> Self {
        NamingDirectory {
            node: Arc::new(NamingNode {
                name: name.to_string(),
                scheme: Some(scheme.to_string()),
                parent: Weak::new(),
                bindings: DashMap::new(),
            }),
        }
    }

    /// Create a parentless directory without a scheme.
    ///
    /// Identifier construction on such a node fails with
    /// [`NamingError::MissingScheme`]; roots that should be addressable
    /// belong in [`NamingDirectory::root`].
    pub fn new(name: &str) -> Self {
        NamingDirectory {
            node: Arc::new(NamingNode {
                name: name.to_string(),
                scheme: None,
                parent: Weak::new(),
                bindings: DashMap::new(),
            }),
        }
    }

    /// Create a child node whose lookups fall back to `parent`.
    ///
    /// The child is not bound into `parent`; use
    /// [`NamingDirectory::create_subdirectory`] when the child should also
    /// be resolvable from the parent.
    pub fn child_of(parent: &NamingDirectory, name: &str) -> Self {
        NamingDirectory {
            node: Arc::new(NamingNode {
                name: name.to_string(),
                scheme: None,
                parent: Arc::downgrade(&parent.node),
                bindings: DashMap::new(),
            }),
        }
    }

    /// The path segment this node is addressed by.
    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// The scheme of the tree this node belongs to.
    ///
    /// Descendants inherit the scheme of their root.
    pub fn scheme(&self) -> Option<String> {
        match self.parent() {
            Some(parent) => parent.scheme(),
            None => self.node.scheme.clone(),
        }
    }

    /// The enclosing directory, if this node is not a root.
    pub fn parent(&self) -> Option<NamingDirectory> {
        self.node.parent.upgrade().map(|node| NamingDirectory { node })
    }

    /// The unique identifier of this directory, built recursively from the
    /// scheme of the root, e.g. `php:env/foo`.
    pub fn identifier(&self) -> Result<String, NamingError> {
        if let Some(parent) = self.parent() {
            return Ok(format!("{}/{}", parent.identifier()?, self.name()));
        }
        match &self.node.scheme {
            Some(scheme) => Ok(format!("{}:{}", scheme, self.name())),
            None => Err(NamingError::MissingScheme {
                name: self.name().to_string(),
            }),
        }
    }

    /// The value bound directly under `key` on this node, if any.
    pub fn get_attribute(&self, key: &str) -> Option<BoundValue> {
        self.node.bindings.get(key).map(|entry| entry.value().clone())
    }

    /// Whether `key` is bound directly on this node.
    pub fn has_attribute(&self, key: &str) -> bool {
        self.node.bindings.contains_key(key)
    }

    /// Bind `value` directly under `key`, replacing any previous binding.
    /// No tokenization is applied to `key`.
    pub fn set_attribute(&self, key: &str, value: BoundValue) {
        self.node.bindings.insert(key.to_string(), value);
    }

    /// The keys bound directly on this node.
    pub fn all_keys(&self) -> Vec<String> {
        self.node
            .bindings
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Resolve `name` to a value, invoking bound callbacks with `args`.
    ///
    /// The leading `"<scheme>:"` prefix is stripped when present. The
    /// segments of the remaining name are checked against this node's
    /// bindings in order and the first bound segment wins: a direct value
    /// is returned as-is (remaining segments are ignored), a callback is
    /// invoked with its bound arguments followed by `args`, and a
    /// sub-directory resolves the rest of the name — or is returned itself
    /// when its own name equals the whole remaining name. When no segment
    /// matches locally, the search is delegated to the parent directory.
    pub fn search(&self, name: &str, args: &[Value]) -> Result<Value, NamingError> {
        let stripped = self.strip_scheme(name);

        for token in path::tokens(stripped) {
            let Some(bound) = self.get_attribute(token) else {
                continue;
            };
            return match bound {
                BoundValue::Direct(value) => Ok(value),
                BoundValue::Callback {
                    callback,
                    bound_args,
                } => {
                    let mut merged = Vec::with_capacity(bound_args.len() + args.len());
                    merged.extend(bound_args);
                    merged.extend_from_slice(args);
                    callback(&merged)
                }
                BoundValue::Directory(directory) => {
                    if directory.name() != stripped {
                        directory.search(path::strip_leading(stripped, token), args)
                    } else {
                        Ok(Value::object(directory))
                    }
                }
            };
        }

        if let Some(parent) = self.parent() {
            return parent.search(stripped, args);
        }

        Err(NamingError::NameNotFound {
            path: stripped.to_string(),
            directory: self.identifier_or_name(),
        })
    }

    /// Bind `value` under `name`.
    ///
    /// Only one level is bound per call: a multi-segment name must lead
    /// through already-existing sub-directories. Directory creation is
    /// explicit, see [`NamingDirectory::create_subdirectory`].
    pub fn bind(&self, name: &str, value: Value) -> Result<(), NamingError> {
        self.bind_value(name, BoundValue::Direct(value))
    }

    /// Bind a callback under `name`.
    ///
    /// At lookup time the callback receives `bound_args` concatenated with
    /// the caller-supplied arguments.
    pub fn bind_callback(
        &self,
        name: &str,
        callback: Callback,
        bound_args: Vec<Value>,
    ) -> Result<(), NamingError> {
        self.bind_value(
            name,
            BoundValue::Callback {
                callback,
                bound_args,
            },
        )
    }

    /// Bind an already-wrapped value under `name`, delegating through
    /// existing sub-directories.
    pub fn bind_value(&self, name: &str, value: BoundValue) -> Result<(), NamingError> {
        let stripped = self.strip_scheme(name);
        let mut tokens = path::tokens(stripped);

        let Some(token) = tokens.next() else {
            return Err(NamingError::BindConflict {
                segment: stripped.to_string(),
                directory: self.identifier_or_name(),
            });
        };

        match self.get_attribute(token) {
            Some(BoundValue::Directory(directory)) => {
                directory.bind_value(path::strip_leading(stripped, token), value)
            }
            Some(_) => Err(NamingError::BindConflict {
                segment: token.to_string(),
                directory: self.identifier_or_name(),
            }),
            None => {
                if tokens.next().is_some() {
                    // the intermediate directory must exist already
                    return Err(NamingError::BindConflict {
                        segment: token.to_string(),
                        directory: self.identifier_or_name(),
                    });
                }
                self.set_attribute(token, value);
                Ok(())
            }
        }
    }

    /// Create a sub-directory under `name` and return it.
    ///
    /// Bindings on this node whose key matches at least one of the glob
    /// `filters` are shallow-copied into the new child before it is bound;
    /// nested directories are shared, not cloned.
    pub fn create_subdirectory(
        &self,
        name: &str,
        filters: &[&str],
    ) -> Result<NamingDirectory, NamingError> {
        let subdirectory = NamingDirectory::child_of(self, name);

        if !filters.is_empty() {
            let patterns = filters
                .iter()
                .map(|filter| {
                    Pattern::new(filter).map_err(|e| NamingError::InvalidPattern {
                        pattern: (*filter).to_string(),
                        message: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            for key in self.all_keys() {
                if patterns.iter().any(|pattern| pattern.matches(&key)) {
                    if let Some(bound) = self.get_attribute(&key) {
                        subdirectory.set_attribute(&key, bound);
                    }
                }
            }
        }

        self.bind_value(name, BoundValue::Directory(subdirectory.clone()))?;
        Ok(subdirectory)
    }

    fn strip_scheme<'a>(&self, name: &'a str) -> &'a str {
        match self.scheme() {
            Some(scheme) => path::strip_scheme(name, &scheme),
            None => name,
        }
    }

    fn identifier_or_name(&self) -> String {
        self.identifier().unwrap_or_else(|_| self.name().to_string())
    }
}

impl fmt::Debug for NamingDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamingDirectory")
            .field("name", &self.node.name)
            .field("scheme", &self.node.scheme)
            .field("keys", &self.all_keys())
            .finish()
    }
}

impl PartialEq for NamingDirectory {
    /// Two handles are equal when they address the same node.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

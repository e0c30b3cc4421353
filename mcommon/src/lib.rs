//! Shared primitives and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use mcommon::{CallId, MetadataMap, TraceId};
//!
//! let call = CallId::from("call-1");
//! let trace = TraceId::new("trace-1");
//! let mut metadata = MetadataMap::new();
//! metadata.insert("tenant".to_string(), "acme".to_string());
//!
//! assert_eq!(call.as_str(), "call-1");
//! assert_eq!(trace.to_string(), "trace-1");
//! ```

mod resilience;

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use mcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Shared metadata and cross-crate identifier newtypes.
    //!
    //! ```rust
    //! use mcommon::{CallId, TraceId};
    //!
    //! let call = CallId::new("call-42");
    //! let trace = TraceId::from("trace-42");
    //!
    //! assert_eq!(call.to_string(), "call-42");
    //! assert_eq!(trace.as_str(), "trace-42");
    //! ```

    use std::collections::HashMap;
    use std::fmt::{Display, Formatter};

    pub type MetadataMap = HashMap<String, String>;

    macro_rules! string_id {
        ($(#[$meta:meta])* $name:ident) => {
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(String);

            impl $name {
                pub fn new(value: impl Into<String>) -> Self {
                    Self(value.into())
                }

                pub fn as_str(&self) -> &str {
                    self.0.as_str()
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<String> for $name {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }
        };
    }

    string_id!(
        /// Correlation id propagated to logs and to the remote endpoint.
        TraceId
    );

    string_id!(
        /// Identifier the model assigned to one function call.
        CallId
    );
}

pub mod registry {
    //! Generic registry map wrapper used by runtime registries.
    //!
    //! ```rust
    //! use mcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! assert!(registry.insert_unique("alpha".to_string(), 1_u32).is_ok());
    //! assert!(registry.insert_unique("alpha".to_string(), 2_u32).is_err());
    //!
    //! assert_eq!(registry.get("alpha"), Some(&1));
    //! ```

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        items: HashMap<K, V>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                items: HashMap::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash,
    {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            self.items.insert(key, value)
        }

        /// Inserts only when `key` is vacant; hands the rejected pair back otherwise.
        pub fn insert_unique(&mut self, key: K, value: V) -> Result<(), (K, V)> {
            if self.items.contains_key(&key) {
                return Err((key, value));
            }

            self.items.insert(key, value);
            Ok(())
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.get(key)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.contains_key(key)
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> {
            self.items.keys()
        }

        pub fn values(&self) -> impl Iterator<Item = &V> {
            self.items.values()
        }

        pub fn len(&self) -> usize {
            self.items.len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }
}

pub use context::{CallId, MetadataMap, TraceId};
pub use future::BoxFuture;
pub use registry::Registry;
pub use resilience::{RetryOutcome, RetryPolicy, Retryable, execute_with_retry};

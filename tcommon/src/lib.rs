//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use tcommon::{GenerationOptions, QueryId, SessionId};
//!
//! let session = SessionId::from("weather");
//! let query = QueryId::new("query-1");
//!
//! let options = GenerationOptions::default().with_temperature(0.3).with_max_tokens(1000);
//! assert_eq!(session.as_str(), "weather");
//! assert_eq!(query.to_string(), "query-1");
//! assert_eq!(options.max_tokens, Some(1000));
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use tcommon::BoxFuture;
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
    //! Cross-crate identifier newtypes.
    //!
    //! ```rust
    //! use tcommon::{QueryId, SessionId};
    //!
    //! let session = SessionId::new("weather");
    //! let query = QueryId::from("query-42");
    //!
    //! assert_eq!(session.to_string(), "weather");
    //! assert_eq!(query.as_str(), "query-42");
    //! ```

    use std::fmt::{Display, Formatter};

    /// Names one connected tool-server session.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct SessionId(String);

    impl SessionId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for SessionId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for SessionId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for SessionId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }

    /// Names one user query and every model turn and tool call made on its behalf.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct QueryId(String);

    impl QueryId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for QueryId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for QueryId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for QueryId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod model {
    //! Shared generation settings used by request types.
    //!
    //! ```rust
    //! use tcommon::GenerationOptions;
    //!
    //! let options = GenerationOptions::default()
    //!     .with_temperature(0.2)
    //!     .with_max_tokens(128);
    //!
    //! assert_eq!(options.temperature, Some(0.2));
    //! assert_eq!(options.max_tokens, Some(128));
    //! ```

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct GenerationOptions {
        pub temperature: Option<f32>,
        pub max_tokens: Option<u32>,
    }

    impl GenerationOptions {
        pub fn with_temperature(mut self, temperature: f32) -> Self {
            self.temperature = Some(temperature);
            self
        }

        pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
            self.max_tokens = Some(max_tokens);
            self
        }
    }
}

pub use context::{QueryId, SessionId};
pub use future::BoxFuture;
pub use model::GenerationOptions;

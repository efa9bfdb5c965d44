//! Assorted imports for modules that declare and serialize records
//!
//! ```
//! use plaindata::prelude::*;
//!
//! #[derive(Record, Debug, Default, Clone, PartialEq)]
//! struct Blob {
//!     #[serial]
//!     data: Bytes,
//! }
//!
//! let mut registry = Registry::new();
//! registry.register::<Blob>().unwrap();
//! let blob = Blob { data: Bytes::from(vec![1, 2]) };
//! let bytes = BinaryCodec::new(&registry).encode_record(&blob).unwrap();
//! assert_eq!(bytes.len(), 4 + 4 + 4 + 2);
//! ```

#[doc(no_inline)]
pub use crate::{
    BinaryCodec, Bytes, Record, Registry, Style, Tree, TreeCodec, Value,
};

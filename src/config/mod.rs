//! C3/C4 -- binding and validating the `shamash` config into a typed tree.

pub mod binder;
pub mod raw;
pub mod schema;
pub mod validator;

pub use binder::bind;
pub use raw::RawValue;
pub use schema::Config;
pub use validator::validate;

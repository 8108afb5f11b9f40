//! Client credentials, bearer tokens, and the compare-and-refresh token store.

pub mod credentials;
pub mod store;
pub mod token;

pub use credentials::*;
pub use store::*;
pub use token::*;

//! Data models for the product catalog client.
//!
//! These models match the API's JSON contract (camelCase on the wire).

mod metrics;
mod product;
mod thumbnail;
mod user;

pub use metrics::*;
pub use product::*;
pub use thumbnail::*;
pub use user::*;

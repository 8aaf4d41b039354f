pub mod client;
pub mod links;
pub mod subscribe;

pub use client::{ClientConfig, RestClient};
pub use subscribe::{Scope, Subscription};

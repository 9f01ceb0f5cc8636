//! Client fallback strategy.
//!
//! The upstream service blocks some client types some of the time. Jobs walk
//! an ordered catalogue of [`ClientProfile`]s, one attempt at a time, until
//! one attempt succeeds.

mod profiles;
mod strategy;

pub use profiles::{
    default_client_profiles, default_info_profile, ClientProfile, DEFAULT_INFO_PLAYER_CLIENT,
    DEFAULT_PLAYER_CLIENTS, PLAYER_CLIENT_ARG_PREFIX,
};
pub use strategy::{run_with_fallback, FallbackPolicy, FallbackSuccess};

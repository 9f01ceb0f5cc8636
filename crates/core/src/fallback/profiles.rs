//! Client profile catalogue.

use serde::{Deserialize, Serialize};

/// Prefix of the extractor argument selecting the upstream player client.
pub const PLAYER_CLIENT_ARG_PREFIX: &str = "youtube:player_client=";

/// Player clients tried for downloads, most likely to succeed first.
pub const DEFAULT_PLAYER_CLIENTS: &[&str] = &[
    "ios",
    "web",
    "mweb",
    "android",
    "android_testsuite",
    "android_producer",
    "android_vr",
    "web_safari",
    "web_embedded",
    "tv_embedded",
    "tv",
    "mediaconnect",
    "ios_creator",
    "android_creator",
    "web_creator",
    "ios_music",
    "android_music",
    "web_music",
];

/// Player client used for metadata queries.
pub const DEFAULT_INFO_PLAYER_CLIENT: &str = "android_testsuite";

/// A named set of extractor arguments presented to the upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProfile {
    pub name: String,
    /// Value passed to `--extractor-args`.
    pub extractor_args: String,
}

impl ClientProfile {
    pub fn new(name: impl Into<String>, extractor_args: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extractor_args: extractor_args.into(),
        }
    }

    /// Profile that only selects a player client.
    pub fn player_client(client: &str) -> Self {
        Self::new(client, format!("{}{}", PLAYER_CLIENT_ARG_PREFIX, client))
    }
}

pub fn default_client_profiles() -> Vec<ClientProfile> {
    DEFAULT_PLAYER_CLIENTS
        .iter()
        .map(|client| ClientProfile::player_client(client))
        .collect()
}

pub fn default_info_profile() -> ClientProfile {
    ClientProfile::player_client(DEFAULT_INFO_PLAYER_CLIENT)
}

//! Anthropic's first-party Messages API.

use super::{ProviderKind, ProviderProfile};

/// Default Anthropic API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

pub static PROFILE: ProviderProfile = ProviderProfile {
    kind: ProviderKind::Anthropic,
    default_base_url: DEFAULT_BASE_URL,
    auth_header: "x-api-key",
    forward_prefix: "anthropic-",
    supports_streaming: true,
};

//! Z.AI (Zhipu) GLM models behind an Anthropic-compatible endpoint.
//!
//! The endpoint accepts the same headers and SSE format as Anthropic, so the
//! profile only differs in its default base URL.

use super::{ProviderKind, ProviderProfile};

/// Default Z.AI base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.z.ai/api/anthropic";

pub static PROFILE: ProviderProfile = ProviderProfile {
    kind: ProviderKind::Zai,
    default_base_url: DEFAULT_BASE_URL,
    auth_header: "x-api-key",
    forward_prefix: "anthropic-",
    supports_streaming: true,
};

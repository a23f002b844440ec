pub mod authenticator;
pub mod memory_store;

pub use authenticator::SoftAuthenticator;
pub use memory_store::MemoryStore;

use webauthn_attest::RelyingPartyConfig;

pub const RP_ID: &str = "example.com";
pub const ORIGIN: &str = "https://example.com";

/// Initialize tracing for tests, honoring RUST_LOG
pub fn init_test_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn rp_config() -> RelyingPartyConfig {
    RelyingPartyConfig::new(RP_ID, ORIGIN)
}

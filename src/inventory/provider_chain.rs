//! Managed-state wrapper around the ordered scrape-provider fallback chain
//! (spec §4.4, §9), built once at startup from `Config`.

use crate::adapters::provider::{Provider, ProviderA, ProviderB, ProviderC, ProviderD};
use crate::config::Config;

pub struct ProviderChain(pub Vec<Box<dyn Provider>>);

impl ProviderChain {
    pub fn from_config(config: &Config) -> Self {
        ProviderChain(vec![
            Box::new(ProviderA::new(config.provider_a_base_url.clone())),
            Box::new(ProviderB::new(config.provider_b_base_url.clone())),
            Box::new(ProviderC::new(config.provider_c_endpoint.clone())),
            Box::new(ProviderD::new(config.provider_d_endpoint.clone())),
        ])
    }
}

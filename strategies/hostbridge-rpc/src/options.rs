use hostbridge_core::{config::Configuration, correlation::CORRELATION_HEADER};
use serde::Deserialize;

/// Configuration section of [CorrelationOptions]
pub const CORRELATION_SECTION: &str = "HostBridge:Correlation";

/// Controls whether and where RPC calls are correlated.
///
/// ```toml
/// [appSettings]
/// "HostBridge:Correlation:Enabled" = "true"
/// "HostBridge:Correlation:IncludeContracts:0" = "orders.OrderService"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CorrelationOptions {
    pub enabled: bool,
    pub header_name: String,
    /// When set, only these contracts are correlated
    pub include_contracts: Option<Vec<String>>,
    /// Wins over `include_contracts`
    pub exclude_contracts: Option<Vec<String>>,
    /// When set, only endpoints with these bindings are correlated
    pub include_bindings: Option<Vec<String>>,
}

impl Default for CorrelationOptions {
    fn default() -> Self {
        CorrelationOptions {
            enabled: false,
            header_name: CORRELATION_HEADER.to_string(),
            include_contracts: None,
            exclude_contracts: None,
            include_bindings: None,
        }
    }
}

impl CorrelationOptions {
    pub fn from_configuration(
        configuration: &Configuration,
    ) -> Result<Self, hostbridge_core::config::ConfigError> {
        configuration.bind_section(CORRELATION_SECTION)
    }

    /// Whether an endpoint of `contract` over `binding` gets correlation
    pub fn applies_to(&self, contract: &str, binding: &str) -> bool {
        if !self.enabled {
            return false;
        }
        if listed(&self.exclude_contracts, contract) {
            return false;
        }
        if is_set(&self.include_contracts) && !listed(&self.include_contracts, contract) {
            return false;
        }
        !is_set(&self.include_bindings) || listed(&self.include_bindings, binding)
    }
}

fn is_set(list: &Option<Vec<String>>) -> bool {
    list.as_ref().is_some_and(|list| !list.is_empty())
}

fn listed(list: &Option<Vec<String>>, name: &str) -> bool {
    list.iter()
        .flatten()
        .any(|entry| entry.eq_ignore_ascii_case(name))
}

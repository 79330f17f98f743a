//! Service configuration.

use serde::{Deserialize, Serialize};

/// Identity and rendering options of a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name, used for WSDL port types, bindings and the service
    /// node.
    pub name: String,

    /// Service URL; doubles as the target namespace of the schema and the
    /// base of generated SOAPAction values.
    pub url: String,

    /// Emit the WSDL document indented.
    pub pretty_wsdl: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "service".to_string(),
            url: "http://localhost:8080/service".to_string(),
            pretty_wsdl: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.name, "service");
        assert!(config.pretty_wsdl);
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
name: scheduleService
url: "http://soap.example.net:4518/schedule"
"#;
        let config: ServiceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "scheduleService");
        assert_eq!(config.url, "http://soap.example.net:4518/schedule");
        // Omitted keys take their defaults.
        assert!(config.pretty_wsdl);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = ServiceConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: ServiceConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.url, config.url);
    }
}

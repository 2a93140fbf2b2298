use crate::config::env::env;

/// Listener address configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
}

impl ServerConfig {
    /// Build config from `SERVER_HOST` / `SERVER_PORT`
    pub fn from_env() -> Self {
        Self {
            host: env("SERVER_HOST", "127.0.0.1".to_string()),
            port: env("SERVER_PORT", 8080),
        }
    }

    /// `host:port`, bracketing IPv6 hosts
    pub fn addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 9000,
        };
        assert_eq!(config.addr(), "0.0.0.0:9000");

        let v6 = ServerConfig {
            host: "::1".to_string(),
            port: 9000,
        };
        assert_eq!(v6.addr(), "[::1]:9000");
    }
}

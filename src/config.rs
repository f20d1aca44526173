use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let seed_demo_data = std::env::var("SEED_DEMO_DATA")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            host,
            port,
            log_level,
            seed_demo_data,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr_combines_host_and_port() {
        let config = Config {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 4010,
            log_level: "debug".to_string(),
            seed_demo_data: false,
        };
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:4010");
    }
}

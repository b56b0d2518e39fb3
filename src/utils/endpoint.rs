use crate::error::AppError;

/// Split a `host:port` string into its parts.
///
/// Exactly one `:` is accepted and the port must fit in a `u16`.
pub fn parse_endpoint(server: &str) -> Result<(String, u16), AppError> {
    let parts: Vec<&str> = server.split(':').collect();

    let (host, port_str) = match parts.as_slice() {
        [host, port] if !host.is_empty() && !port.is_empty() => (*host, *port),
        _ => {
            return Err(AppError::ConfigError(format!(
                "Invalid server '{}', expected host:port",
                server
            )))
        }
    };

    let port = port_str
        .parse::<u16>()
        .map_err(|_| AppError::ConfigError(format!("Invalid port in server '{}': {}", server, port_str)))?;

    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_and_port() {
        let (host, port) = parse_endpoint("redis.internal:6380").unwrap();
        assert_eq!(host, "redis.internal");
        assert_eq!(port, 6380);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["not-valid", "a:b:c", ":6379", "host:", "host:http", "host:70000"] {
            let err = parse_endpoint(bad).unwrap_err();
            assert!(matches!(err, AppError::ConfigError(_)), "{} should fail", bad);
        }
    }
}

/// Reduces a host to the domain shared by its sibling hosts
///
/// Hosts with more than two labels drop their first label; two-label
/// hosts and IPv4 addresses are returned unchanged.
///
/// # Examples
///
/// ```
/// use refindex::url::registrable_domain;
///
/// assert_eq!(registrable_domain("en.cppreference.com"), "cppreference.com");
/// assert_eq!(registrable_domain("cplusplus.com"), "cplusplus.com");
/// assert_eq!(registrable_domain("192.168.0.1"), "192.168.0.1");
/// ```
pub fn registrable_domain(host: &str) -> &str {
    if host.parse::<std::net::Ipv4Addr>().is_ok() {
        return host;
    }

    if host.split('.').count() <= 2 {
        return host;
    }

    match host.split_once('.') {
        Some((_, rest)) => rest,
        None => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomain_dropped() {
        assert_eq!(registrable_domain("www.cplusplus.com"), "cplusplus.com");
    }

    #[test]
    fn test_nested_subdomain_drops_one_label() {
        assert_eq!(registrable_domain("api.v2.example.com"), "v2.example.com");
    }

    #[test]
    fn test_bare_domain_kept() {
        assert_eq!(registrable_domain("example.com"), "example.com");
        assert_eq!(registrable_domain("localhost"), "localhost");
    }

    #[test]
    fn test_ip_address_kept() {
        assert_eq!(registrable_domain("127.0.0.1"), "127.0.0.1");
    }
}

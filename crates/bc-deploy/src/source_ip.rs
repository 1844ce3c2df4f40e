// SPDX-License-Identifier: MIT

//! Source-IP detection fallback chain (`spec.md` §4.4 step 3, §9 design
//! notes): a pure function over the remote's `$SSH_CONNECTION` output
//! plus the local interface list, so it is unit-testable without a real
//! SSH session.

use std::net::Ipv4Addr;

/// `$SSH_CONNECTION` is `"client_ip client_port server_ip server_port"`;
/// the first field is the controller's IP as observed by the remote.
fn parse_ssh_connection(output: &str) -> Option<Ipv4Addr> {
    output.split_whitespace().next()?.parse().ok()
}

/// Fallback chain: remote `$SSH_CONNECTION` → env-supplied controller IP
/// → first non-loopback local IPv4 interface → `127.0.0.1`.
pub fn detect_source_ip(
    ssh_connection_output: Option<&str>,
    env_controller_ip: Option<&str>,
    local_ipv4_interfaces: &[Ipv4Addr],
) -> Ipv4Addr {
    if let Some(ip) = ssh_connection_output.and_then(parse_ssh_connection) {
        return ip;
    }
    if let Some(ip) = env_controller_ip.and_then(|s| s.parse().ok()) {
        return ip;
    }
    if let Some(ip) = local_ipv4_interfaces.iter().find(|ip| !ip.is_loopback()) {
        return *ip;
    }
    Ipv4Addr::new(127, 0, 0, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_ssh_connection_first_field() {
        let ip = detect_source_ip(Some("10.0.0.5 54321 10.0.0.1 22"), Some("9.9.9.9"), &[]);
        assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 5));
    }

    #[test]
    fn falls_back_to_env_when_ssh_connection_missing() {
        let ip = detect_source_ip(None, Some("9.9.9.9"), &[]);
        assert_eq!(ip, Ipv4Addr::new(9, 9, 9, 9));
    }

    #[test]
    fn falls_back_to_env_when_ssh_connection_is_not_ipv4() {
        let ip = detect_source_ip(Some("not-an-ip"), Some("9.9.9.9"), &[]);
        assert_eq!(ip, Ipv4Addr::new(9, 9, 9, 9));
    }

    #[test]
    fn falls_back_to_first_non_loopback_interface() {
        let interfaces = [Ipv4Addr::new(127, 0, 0, 1), Ipv4Addr::new(192, 168, 1, 10)];
        let ip = detect_source_ip(None, None, &interfaces);
        assert_eq!(ip, Ipv4Addr::new(192, 168, 1, 10));
    }

    #[test]
    fn falls_back_to_loopback_when_nothing_else_available() {
        let ip = detect_source_ip(None, None, &[]);
        assert_eq!(ip, Ipv4Addr::new(127, 0, 0, 1));
    }
}

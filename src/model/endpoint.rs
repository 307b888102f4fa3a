use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use typed_builder::TypedBuilder;

/// The network context of a node in the service graph.
///
/// Endpoints double as qualifiers during tree assembly: two server spans
/// sharing one client span id are told apart by the endpoint they ran on, so
/// equality and hashing cover every field.
#[derive(TypedBuilder, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Lowercase label of this node in the service graph, such as `favstar`.
    #[builder(setter(strip_option, into), default)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub service_name: Option<String>,
    /// The text representation of a v4 address associated with this endpoint.
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ipv4: Option<Ipv4Addr>,
    /// The text representation of a v6 address associated with this endpoint.
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ipv6: Option<Ipv6Addr>,
    /// Port of the IP, if known.
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub port: Option<u16>,
}

impl Endpoint {
    /// Builds an endpoint from a service name and, when the instrumentation
    /// captured one, the socket address the service was reachable at.
    ///
    /// The address is split across the version-specific ip fields so the
    /// endpoint serializes in Zipkin v2 shape, where `ipv4` and `ipv6` are
    /// distinct keys.
    pub fn new(service_name: impl Into<String>, socket_addr: Option<SocketAddr>) -> Self {
        let mut endpoint = Endpoint::builder().service_name(service_name).build();
        if let Some(addr) = socket_addr {
            match addr.ip() {
                IpAddr::V4(ip) => endpoint.ipv4 = Some(ip),
                IpAddr::V6(ip) => endpoint.ipv6 = Some(ip),
            }
            endpoint.port = Some(addr.port());
        }
        endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_omits_absent_fields() {
        let endpoint = Endpoint::builder().build();
        assert_eq!(serde_json::to_string(&endpoint).unwrap(), "{}");
    }

    #[test]
    fn json_round_trips() {
        let endpoint = Endpoint::builder()
            .service_name("favstar")
            .ipv4(Ipv4Addr::new(127, 0, 0, 1))
            .port(8080)
            .build();
        let json = serde_json::to_string(&endpoint).unwrap();
        assert_eq!(
            json,
            "{\"serviceName\":\"favstar\",\"ipv4\":\"127.0.0.1\",\"port\":8080}"
        );
        assert_eq!(serde_json::from_str::<Endpoint>(&json).unwrap(), endpoint);
    }

    #[test]
    fn new_splits_the_socket_address() {
        assert_eq!(
            Endpoint::new("favstar", "10.0.0.1:9411".parse().ok()),
            Endpoint::builder()
                .service_name("favstar")
                .ipv4(Ipv4Addr::new(10, 0, 0, 1))
                .port(9411)
                .build(),
        );
        assert_eq!(
            Endpoint::new("favstar", "[2001:db8::1]:9411".parse().ok()),
            Endpoint::builder()
                .service_name("favstar")
                .ipv6("2001:db8::1".parse().unwrap())
                .port(9411)
                .build(),
        );
    }

    #[test]
    fn new_without_address_keeps_only_the_name() {
        assert_eq!(
            Endpoint::new("favstar", None),
            Endpoint::builder().service_name("favstar").build(),
        );
    }

    #[test]
    fn equality_covers_every_field() {
        let base = Endpoint::builder().service_name("favstar").build();
        let with_port = Endpoint::builder().service_name("favstar").port(80).build();
        assert_ne!(base, with_port);
    }
}

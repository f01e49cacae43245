//! Actionable indicator objects
//!
//! Each actionable MISP attribute becomes one `ActionableObject`: the
//! attribute value spread over the ingestion service's type-specific fields,
//! an expiration instant, and the attribute's own tags.

use misp_relay_common::RawAttribute;
use serde_json::{Map, Value};
use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq)]
pub struct ActionableObject {
    pub fields: Map<String, Value>,
    pub tags: Vec<String>,
}

/// Which side of a connection an address attribute describes
#[derive(Debug, Clone, Copy, PartialEq)]
enum Direction {
    Source,
    Destination,
}

impl Direction {
    fn prefix(&self) -> &'static str {
        match self {
            Direction::Source => "networkSource",
            Direction::Destination => "networkDestination",
        }
    }
}

impl ActionableObject {
    pub fn from_attribute(attribute: &RawAttribute, expiration_date_time: &str) -> Self {
        let mut fields = Map::new();
        fields.insert(
            "expirationDateTime".to_string(),
            Value::String(expiration_date_time.to_string()),
        );

        let value = attribute.value.trim();
        match attribute.attribute_type.as_str() {
            "ip-src" => insert_address(&mut fields, Some(Direction::Source), value),
            "ip-dst" => insert_address(&mut fields, Some(Direction::Destination), value),
            "ip-src|port" => insert_address_with_port(&mut fields, Direction::Source, value),
            "ip-dst|port" => insert_address_with_port(&mut fields, Direction::Destination, value),
            "domain" | "hostname" => insert_text(&mut fields, "domainName", value),
            "domain|ip" => {
                let (domain, ip) = split_composite(value);
                insert_text(&mut fields, "domainName", domain);
                if let Some(ip) = ip {
                    insert_address(&mut fields, None, ip);
                }
            }
            "url" => insert_text(&mut fields, "url", value),
            "user-agent" => insert_text(&mut fields, "userAgent", value),
            "email-src" => insert_text(&mut fields, "emailSenderAddress", value),
            "email-dst" => insert_text(&mut fields, "emailRecipient", value),
            "email-subject" => insert_text(&mut fields, "emailSubject", value),
            "filename" => insert_text(&mut fields, "fileName", value),
            composite if composite.starts_with("filename|") => {
                let hash_type = &composite["filename|".len()..];
                let (file_name, hash) = split_composite(value);
                insert_text(&mut fields, "fileName", file_name);
                if let Some(hash) = hash {
                    insert_hash(&mut fields, hash_type, hash);
                }
            }
            hash_type if is_hash_type(hash_type) => insert_hash(&mut fields, hash_type, value),
            _ => insert_text(&mut fields, "value", value),
        }

        Self {
            fields,
            tags: attribute.tag_names(),
        }
    }
}

fn is_hash_type(attribute_type: &str) -> bool {
    matches!(
        attribute_type,
        "md5" | "sha1" | "sha224" | "sha256" | "sha384" | "sha512" | "authentihash" | "ssdeep"
    )
}

fn file_hash_type(attribute_type: &str) -> &str {
    match attribute_type {
        "authentihash" => "authenticodeHash256",
        "ssdeep" => "ctph",
        other => other,
    }
}

fn split_composite(value: &str) -> (&str, Option<&str>) {
    match value.split_once('|') {
        Some((first, second)) => (first.trim(), Some(second.trim())),
        None => (value, None),
    }
}

fn insert_text(fields: &mut Map<String, Value>, key: &str, value: &str) {
    fields.insert(key.to_string(), Value::String(value.to_string()));
}

fn insert_hash(fields: &mut Map<String, Value>, attribute_type: &str, value: &str) {
    insert_text(fields, "fileHashType", file_hash_type(attribute_type));
    insert_text(fields, "fileHashValue", value);
}

fn insert_address(fields: &mut Map<String, Value>, direction: Option<Direction>, value: &str) {
    let family = match value.parse::<IpAddr>() {
        Ok(IpAddr::V6(_)) => "IPv6",
        _ if value.contains(':') => "IPv6",
        _ => "IPv4",
    };
    let prefix = direction.map(|d| d.prefix()).unwrap_or("network");
    insert_text(fields, &format!("{}{}", prefix, family), value);
}

fn insert_address_with_port(fields: &mut Map<String, Value>, direction: Direction, value: &str) {
    let (address, port) = split_composite(value);
    insert_address(fields, Some(direction), address);
    if let Some(port) = port {
        let port_value = port
            .parse::<u16>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(port.to_string()));
        fields.insert(format!("{}Port", direction.prefix()), port_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EXPIRATION: &str = "2021-03-31T00:00:00Z";

    fn object(attribute_type: &str, value: &str) -> ActionableObject {
        ActionableObject::from_attribute(&RawAttribute::new(attribute_type, value), EXPIRATION)
    }

    mod network_indicators {
        use super::*;

        #[test]
        fn should_map_destination_ipv4() {
            let obj = object("ip-dst", "1.2.3.4");

            assert_eq!(obj.fields.get("networkDestinationIPv4"), Some(&json!("1.2.3.4")));
            assert_eq!(obj.fields.get("expirationDateTime"), Some(&json!(EXPIRATION)));
        }

        #[test]
        fn should_map_source_ipv6() {
            let obj = object("ip-src", "2001:db8::1");

            assert_eq!(obj.fields.get("networkSourceIPv6"), Some(&json!("2001:db8::1")));
        }

        #[test]
        fn should_split_address_and_port() {
            let obj = object("ip-dst|port", "10.0.0.1|8443");

            assert_eq!(obj.fields.get("networkDestinationIPv4"), Some(&json!("10.0.0.1")));
            assert_eq!(obj.fields.get("networkDestinationPort"), Some(&json!(8443)));
        }

        #[test]
        fn should_map_domain_with_resolved_ip() {
            let obj = object("domain|ip", "evil.example|5.6.7.8");

            assert_eq!(obj.fields.get("domainName"), Some(&json!("evil.example")));
            assert_eq!(obj.fields.get("networkIPv4"), Some(&json!("5.6.7.8")));
        }

        #[test]
        fn should_treat_hostname_as_domain() {
            let obj = object("hostname", "c2.evil.example");

            assert_eq!(obj.fields.get("domainName"), Some(&json!("c2.evil.example")));
        }
    }

    mod file_indicators {
        use super::*;

        #[test]
        fn should_map_plain_hash() {
            let obj = object("sha256", "abc123");

            assert_eq!(obj.fields.get("fileHashType"), Some(&json!("sha256")));
            assert_eq!(obj.fields.get("fileHashValue"), Some(&json!("abc123")));
        }

        #[test]
        fn should_map_filename_with_hash() {
            let obj = object("filename|md5", "dropper.exe|d41d8cd9");

            assert_eq!(obj.fields.get("fileName"), Some(&json!("dropper.exe")));
            assert_eq!(obj.fields.get("fileHashType"), Some(&json!("md5")));
            assert_eq!(obj.fields.get("fileHashValue"), Some(&json!("d41d8cd9")));
        }

        #[test]
        fn should_rename_authenticode_hash_type() {
            let obj = object("authentihash", "ff00");

            assert_eq!(
                obj.fields.get("fileHashType"),
                Some(&json!("authenticodeHash256"))
            );
        }
    }

    #[test]
    fn should_fall_back_to_plain_value_for_unmapped_types() {
        let obj = object("mutex", "Global\\evil");

        assert_eq!(obj.fields.get("value"), Some(&json!("Global\\evil")));
    }

    #[test]
    fn should_carry_trimmed_attribute_tags() {
        let attribute = RawAttribute::new("url", "http://evil.example/x")
            .with_tag(" malware ")
            .with_tag("tlp:red");

        let obj = ActionableObject::from_attribute(&attribute, EXPIRATION);

        assert_eq!(obj.tags, vec!["malware", "tlp:red"]);
        assert_eq!(obj.fields.get("url"), Some(&json!("http://evil.example/x")));
    }

    #[test]
    fn should_have_empty_tags_when_attribute_is_untagged() {
        assert!(object("url", "http://a.example").tags.is_empty());
    }
}

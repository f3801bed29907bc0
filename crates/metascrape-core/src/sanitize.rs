//! Sanitization pipeline for crawled routes.
//!
//! An ordered sequence of pure passes over a `(path, response)` pair. Each
//! pass takes the accumulated rewrite of the previous one; gated passes key
//! off the (possibly already rewritten) path. Every rewrite is a
//! deterministic function of the matched text, so the same real value maps
//! to the same sanitized value within a response.

use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{Error, Result};
use crate::route::Route;

static IPV4_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\b").unwrap());

static MAC_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[0-9a-f]{2}:[0-9a-f]{2}:[0-9a-f]{2}:[0-9a-f]{2}:[0-9a-f]{2}:[0-9a-f]{2}\b")
        .unwrap()
});

static ACCOUNT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{12}\b").unwrap());

static RESOURCE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?P<type>[a-z]{1,6})-(?P<id>[0-9a-f]{8,32})\b").unwrap());

static COMPUTE_HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?P<type>ec2|ip)-(?P<o0>\d{1,3})-(?P<o1>\d{1,3})-(?P<o2>\d{1,3})-(?P<o3>\d{1,3})\.(?P<region>[^.]+)\.compute\.(?P<root>amazonaws\.com|internal)\b",
    )
    .unwrap()
});

const MAC_FILLER: &str = "01:23:45:67:89:ab";
const ACCOUNT_FILLER: &str = "012345678901";
const HEX_FILLER: &str = "0123456789abcdef";

/// Final path segments that carry a compute hostname.
const HOSTNAME_SEGMENTS: &[&str] = &["hostname", "local-hostname", "public-hostname"];

const CREDENTIALS_SUFFIX: &str =
    "/meta-data/identity-credentials/ec2/security-credentials/ec2-instance";

/// Run the full pipeline over one route.
///
/// Passes run in a fixed order; later passes operate on the already
/// rewritten text of earlier ones. Headers and encoding pass through
/// untouched.
pub fn sanitize_route(route: Route) -> Result<Route> {
    let Route {
        path,
        headers,
        response,
        response_encoding,
    } = route;

    let (path, response) = sanitize_ip_addresses(path, response);
    let (path, response) = sanitize_mac_addresses(path, response);
    let (path, response) = sanitize_account_ids(path, response);
    let response = sanitize_hostname(&path, response)?;
    let (path, response) = sanitize_resource_ids(path, response);
    let response = sanitize_iam_credentials(&path, response)?;
    let response = sanitize_instance_identity(&path, response);

    Ok(Route {
        path,
        headers,
        response,
        response_encoding,
    })
}

/// Rewrite private and globally-routable IPv4 addresses.
///
/// The zero/non-zero trailing octet distinction is preserved: some
/// consumers key off it, and `10.0.0.0` vs `10.0.0.1` keeps them honest
/// without leaking the real address.
fn sanitize_ip_addresses(path: String, response: String) -> (String, String) {
    (rewrite_ipv4(&path), rewrite_ipv4(&response))
}

fn rewrite_ipv4(text: &str) -> String {
    IPV4_ADDRESS
        .replace_all(text, |caps: &Captures| {
            let literal = &caps[0];
            let Ok(addr) = literal.parse::<Ipv4Addr>() else {
                // matched the shape but not a valid address (octet > 255)
                return literal.to_string();
            };

            let last = if addr.octets()[3] == 0 { 0 } else { 1 };

            if addr.is_private() {
                format!("10.0.0.{last}")
            } else if is_globally_routable(addr) {
                format!("1.1.1.{last}")
            } else {
                literal.to_string()
            }
        })
        .into_owned()
}

/// Whether an address sits in none of the special-purpose ranges.
///
/// Stand-in for the unstable `Ipv4Addr::is_global`; loopback, link-local
/// and friends fall through the sanitizer unchanged.
fn is_globally_routable(addr: Ipv4Addr) -> bool {
    let octets = addr.octets();
    let shared = octets[0] == 100 && (octets[1] & 0b1100_0000) == 64;
    let benchmarking = octets[0] == 198 && (octets[1] & 0xfe) == 18;
    let reserved = octets[0] >= 240;

    !(addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_documentation()
        || addr.is_unspecified()
        || addr.is_multicast()
        || shared
        || benchmarking
        || reserved)
}

fn sanitize_mac_addresses(path: String, response: String) -> (String, String) {
    (
        MAC_ADDRESS.replace_all(&path, MAC_FILLER).into_owned(),
        MAC_ADDRESS.replace_all(&response, MAC_FILLER).into_owned(),
    )
}

fn sanitize_account_ids(path: String, response: String) -> (String, String) {
    (
        ACCOUNT_ID.replace_all(&path, ACCOUNT_FILLER).into_owned(),
        ACCOUNT_ID
            .replace_all(&response, ACCOUNT_FILLER)
            .into_owned(),
    )
}

/// Rewrite the compute hostname, which reflects the actual IP.
///
/// Only applies when the path's final segment names a hostname entry. The
/// hostname format is load-bearing downstream, so a response that fails to
/// parse is an error rather than a silent pass-through.
fn sanitize_hostname(path: &str, response: String) -> Result<String> {
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    if !HOSTNAME_SEGMENTS.contains(&last_segment) {
        return Ok(response);
    }

    let caps = COMPUTE_HOSTNAME
        .captures(&response)
        .ok_or_else(|| Error::MalformedHostname(response.clone()))?;

    let sanitized = match &caps["type"] {
        // public host
        "ec2" => format!("ec2-1-1-1-1.{}.compute.{}", &caps["region"], &caps["root"]),
        // private host
        _ => format!("ip-10-0-0-1.{}.compute.{}", &caps["region"], &caps["root"]),
    };

    Ok(sanitized)
}

/// Rewrite resource identifiers such as instance and AMI ids.
///
/// The hex portion is replaced by a repeating `0123456789abcdef` cycled to
/// the original length; the type tag is kept so the identifier still reads
/// as what it was.
fn sanitize_resource_ids(path: String, response: String) -> (String, String) {
    (rewrite_resource_ids(&path), rewrite_resource_ids(&response))
}

fn rewrite_resource_ids(text: &str) -> String {
    RESOURCE_ID
        .replace_all(text, |caps: &Captures| {
            let filler: String = HEX_FILLER.chars().cycle().take(caps["id"].len()).collect();
            format!("{}-{}", &caps["type"], filler)
        })
        .into_owned()
}

/// Overwrite the embedded credential document's secret fields.
///
/// Filler lengths match the real fields (20/40/676) so downstream size
/// expectations keep being exercised.
fn sanitize_iam_credentials(path: &str, response: String) -> Result<String> {
    if !path.ends_with(CREDENTIALS_SUFFIX) {
        return Ok(response);
    }

    let mut document: serde_json::Value =
        serde_json::from_str(&response).map_err(|e| Error::MalformedCredentialDocument {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

    let Some(fields) = document.as_object_mut() else {
        return Err(Error::MalformedCredentialDocument {
            path: path.to_string(),
            reason: "not a JSON object".to_string(),
        });
    };

    fields.insert("AccessKeyId".to_string(), "A".repeat(20).into());
    fields.insert("SecretAccessKey".to_string(), "B".repeat(40).into());
    fields.insert("Token".to_string(), "C".repeat(676).into());

    serde_json::to_string_pretty(&document).map_err(|e| Error::MalformedCredentialDocument {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Replace instance-identity cryptographic documents wholesale.
///
/// These formats are too structurally complex to partially sanitize; the
/// fillers keep the original fixed lengths.
fn sanitize_instance_identity(path: &str, response: String) -> String {
    if path.ends_with("/dynamic/instance-identity/pkcs7") {
        "A".repeat(828)
    } else if path.ends_with("/dynamic/instance-identity/rsa2048") {
        "B".repeat(1063)
    } else if path.ends_with("/dynamic/instance-identity/signature") {
        "C".repeat(128)
    } else {
        response
    }
}

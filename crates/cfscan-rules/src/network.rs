//! # Security Group Rules
//!
//! Ingress open to the internet on administrative ports (or on every port),
//! and explicit unrestricted egress.
//!
//! An ingress entry is *open* when its `CidrIp` is `0.0.0.0/0` or its
//! `CidrIpv6` is `::/0`. Its port exposure is read from `IpProtocol`,
//! `FromPort`, and `ToPort`:
//!
//! - protocol `-1` / `all`, a `FromPort` of `-1`, a range covering
//!   0–65535, or no port bounds at all means every port;
//! - ICMP (`icmp`, `1`, `icmpv6`, `58`) exposes no ports;
//! - otherwise the inclusive `FromPort..=ToPort` range, a single missing
//!   bound taking the other's value.
//!
//! Entries whose source, protocol, or ports are intrinsic expressions are
//! skipped.

use std::ops::RangeInclusive;

use cfscan_core::{
    is_intrinsic, Finding, FindingKind, PropertyValue, Resource, RuleExecutionError, Severity,
};
use serde_json::{Map, Value};

use crate::registry::{Rule, RuleOutcome, RuleRegistry};

const SECURITY_GROUP: &str = "AWS::EC2::SecurityGroup";
const INGRESS: &str = "AWS::EC2::SecurityGroupIngress";

const SSH_PORT: i64 = 22;
const RDP_PORT: i64 = 3389;
const MAX_PORT: i64 = 65535;

const OPEN_IPV4: &str = "0.0.0.0/0";
const OPEN_IPV6: &str = "::/0";

pub(crate) fn register(registry: &mut RuleRegistry) {
    let ingress = || {
        Rule::new(
            "sg-ingress",
            "Ingress must not be open to the internet on SSH, RDP, or all ports",
            check_ingress,
        )
    };
    registry.register(SECURITY_GROUP, ingress());
    registry.register(INGRESS, ingress());
    registry.register(
        SECURITY_GROUP,
        Rule::new(
            "sg-egress",
            "Explicit egress to the internet on all protocols is reported",
            check_egress,
        ),
    );
}

/// How much of the port space an entry exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Exposure {
    AllPorts,
    Range(RangeInclusive<i64>),
    None,
    Unknown,
}

/// One ingress or egress rule, inline or standalone.
type Entry = Map<String, Value>;

fn field<'a>(entry: &'a Entry, key: &str) -> Option<&'a Value> {
    entry.get(key).filter(|v| !v.is_null())
}

fn protocol_of(entry: &Entry) -> Option<Result<String, ()>> {
    let raw = field(entry, "IpProtocol")?;
    if is_intrinsic(raw) {
        return Some(Err(()));
    }
    let text = raw
        .as_text()
        .map(str::to_ascii_lowercase)
        .or_else(|| raw.as_integer().map(|n| n.to_string()));
    Some(text.ok_or(()))
}

fn exposure(entry: &Entry) -> Exposure {
    match protocol_of(entry) {
        Some(Err(())) => return Exposure::Unknown,
        Some(Ok(p)) if p == "-1" || p == "all" => return Exposure::AllPorts,
        Some(Ok(p)) if matches!(p.as_str(), "icmp" | "1" | "icmpv6" | "58") => {
            return Exposure::None
        }
        _ => {}
    }

    let bound = |key: &str| -> Result<Option<i64>, ()> {
        match field(entry, key) {
            None => Ok(None),
            Some(v) => v.as_integer().map(Some).ok_or(()),
        }
    };
    let (Ok(from), Ok(to)) = (bound("FromPort"), bound("ToPort")) else {
        return Exposure::Unknown;
    };
    let (from, to) = match (from, to) {
        (None, None) => return Exposure::AllPorts,
        (Some(f), None) => (f, f),
        (None, Some(t)) => (t, t),
        (Some(f), Some(t)) => (f, t),
    };
    if from == -1 || (from <= 0 && to >= MAX_PORT) {
        Exposure::AllPorts
    } else {
        Exposure::Range(from..=to)
    }
}

/// The open CIDR this entry allows, if any.
fn open_cidr(entry: &Entry) -> Option<&str> {
    field(entry, "CidrIp")
        .and_then(PropertyValue::as_text)
        .filter(|c| *c == OPEN_IPV4)
        .or_else(|| {
            field(entry, "CidrIpv6")
                .and_then(PropertyValue::as_text)
                .filter(|c| *c == OPEN_IPV6)
        })
}

/// Ingress entries of `resource`, each with a label for messages.
fn ingress_entries(resource: &Resource) -> Result<Vec<(String, &Entry)>, RuleExecutionError> {
    if resource.resource_type() == INGRESS {
        return Ok(vec![("ingress".to_string(), resource.properties())]);
    }
    entries(resource, "SecurityGroupIngress", "sg-ingress")
}

fn entries<'a>(
    resource: &'a Resource,
    key: &str,
    rule_id: &str,
) -> Result<Vec<(String, &'a Entry)>, RuleExecutionError> {
    let Some(list) = resource.property(key) else {
        return Ok(Vec::new());
    };
    if is_intrinsic(list) {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for (index, entry) in list.items().into_iter().enumerate() {
        if is_intrinsic(entry) {
            continue;
        }
        let Some(map) = entry.as_object() else {
            return Err(RuleExecutionError::new(
                rule_id,
                format!("{key}[{index}] must be a mapping, found {}", entry.shape_name()),
            ));
        };
        out.push((format!("{key}[{index}]"), map));
    }
    Ok(out)
}

fn check_ingress(resource: &Resource) -> RuleOutcome {
    let mut all_ports = Vec::new();
    let mut ssh = Vec::new();
    let mut rdp = Vec::new();

    for (label, entry) in ingress_entries(resource)? {
        let Some(cidr) = open_cidr(entry) else {
            continue;
        };
        match exposure(entry) {
            Exposure::AllPorts => all_ports.push(format!("{label} from {cidr}")),
            Exposure::Range(range) => {
                let described =
                    format!("{label} ports {}-{} from {cidr}", range.start(), range.end());
                if range.contains(&SSH_PORT) {
                    ssh.push(described.clone());
                }
                if range.contains(&RDP_PORT) {
                    rdp.push(described);
                }
            }
            Exposure::None | Exposure::Unknown => {}
        }
    }

    let mut findings = Vec::new();
    let mut emit = |items: Vec<String>, kind: FindingKind, what: &str, fix: &str| {
        if !items.is_empty() {
            findings.push(Finding::new(
                resource,
                Severity::High,
                kind,
                format!("{what}: {}", items.join(", ")),
                fix,
            ));
        }
    };
    emit(
        all_ports,
        FindingKind::SG_UNRESTRICTED_ALL_PORTS,
        "Ingress allows every port from the internet",
        "Restrict the protocol and port range, and limit the source CIDR.",
    );
    emit(
        ssh,
        FindingKind::SG_UNRESTRICTED_SSH,
        "Ingress allows SSH (22) from the internet",
        "Limit SSH to a bastion or VPN CIDR, or use Session Manager instead.",
    );
    emit(
        rdp,
        FindingKind::SG_UNRESTRICTED_RDP,
        "Ingress allows RDP (3389) from the internet",
        "Limit RDP to a bastion or VPN CIDR.",
    );
    Ok(findings)
}

fn check_egress(resource: &Resource) -> RuleOutcome {
    let open: Vec<String> = entries(resource, "SecurityGroupEgress", "sg-egress")?
        .into_iter()
        .filter_map(|(label, entry)| {
            let cidr = open_cidr(entry)?;
            let all = matches!(protocol_of(entry), Some(Ok(p)) if p == "-1" || p == "all");
            all.then(|| format!("{label} to {cidr}"))
        })
        .collect();
    if open.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![Finding::new(
        resource,
        Severity::Medium,
        FindingKind::SG_UNRESTRICTED_EGRESS,
        format!("Egress allows all traffic to the internet: {}", open.join(", ")),
        "Limit egress to the destinations and ports the workload needs.",
    )])
}

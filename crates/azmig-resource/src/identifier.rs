//! Azure resource identifiers
//!
//! Provides [`ResourceIdentifier`], the parsed form of an ARM resource path:
//!
//! ```text
//! /subscriptions/{id}/resourceGroups/{group}/providers/{namespace}/{type}/{name}[/{type}/{name}]*
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

const SUBSCRIPTIONS: &str = "subscriptions";
const RESOURCE_GROUPS: &str = "resourceGroups";
const PROVIDERS: &str = "providers";

/// Minimum number of `/`-delimited segments in a resource path
pub const MIN_SEGMENTS: usize = 8;

/// Parsed resource identifier
///
/// Immutable once built. Provider, type and name strings keep the exact case
/// they were written with, and equality is exact: `loadBalancers` and
/// `loadbalancers` are different types as far as this crate is concerned.
///
/// # Examples
/// - `/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/loadBalancers/lb1`
/// - `/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/loadBalancers/lb1/frontendIPConfigurations/fe1`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceIdentifier {
    subscription_id: String,
    resource_group: String,
    provider: String,
    /// `(type, name)` pairs, outermost resource first
    segments: Vec<(String, String)>,
}

impl ResourceIdentifier {
    /// Build a top-level resource identifier from its fields
    ///
    /// # Errors
    /// Returns [`IdentifierError::Malformed`] if any field is empty or contains `/`
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        provider: impl Into<String>,
        resource_type: impl Into<String>,
        resource_name: impl Into<String>,
    ) -> Result<Self, IdentifierError> {
        let id = Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            provider: provider.into(),
            segments: vec![(resource_type.into(), resource_name.into())],
        };
        id.check_fields()?;
        Ok(id)
    }

    /// Identifier of a child resource nested under this one
    ///
    /// # Errors
    /// Returns [`IdentifierError::Malformed`] if either part is empty or contains `/`
    pub fn child(
        &self,
        child_type: impl Into<String>,
        child_name: impl Into<String>,
    ) -> Result<Self, IdentifierError> {
        let mut id = self.clone();
        id.segments.push((child_type.into(), child_name.into()));
        id.check_fields()?;
        Ok(id)
    }

    fn check_fields(&self) -> Result<(), IdentifierError> {
        let fields = [&self.subscription_id, &self.resource_group, &self.provider]
            .into_iter()
            .chain(self.segments.iter().flat_map(|(t, n)| [t, n]));

        for field in fields {
            if field.is_empty() || field.contains('/') {
                return Err(IdentifierError::Malformed {
                    input: self.to_string(),
                    reason: format!("invalid identifier field '{field}'"),
                });
            }
        }
        Ok(())
    }

    /// Subscription GUID (or name, verbatim)
    #[inline]
    #[must_use]
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Resource group name
    #[inline]
    #[must_use]
    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    /// Resource provider namespace, e.g. `Microsoft.Network`
    #[inline]
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Resource type chain, e.g. `loadBalancers` or
    /// `loadBalancers/frontendIPConfigurations` for a child resource
    #[must_use]
    pub fn resource_type(&self) -> String {
        self.segments
            .iter()
            .map(|(t, _)| t.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Name of the addressed (innermost) resource
    #[inline]
    #[must_use]
    pub fn resource_name(&self) -> &str {
        self.segments.last().map_or("", |(_, n)| n.as_str())
    }

    /// `provider/resourceType`, e.g. `Microsoft.Network/loadBalancers`
    #[must_use]
    pub fn full_type(&self) -> String {
        format!("{}/{}", self.provider, self.resource_type())
    }

    /// Whether this identifier addresses a child resource
    #[inline]
    #[must_use]
    pub fn is_child(&self) -> bool {
        self.segments.len() > 1
    }

    /// Parent resource, if this is a child resource
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if !self.is_child() {
            return None;
        }
        let mut parent = self.clone();
        parent.segments.pop();
        Some(parent)
    }

    /// Outermost (top-level) resource this identifier belongs to
    #[must_use]
    pub fn top_level(&self) -> Self {
        let mut top = self.clone();
        top.segments.truncate(1);
        top
    }

    /// Whether both identifiers live in the same subscription and resource group
    #[inline]
    #[must_use]
    pub fn same_resource_group(&self, other: &Self) -> bool {
        self.subscription_id == other.subscription_id && self.resource_group == other.resource_group
    }
}

impl Display for ResourceIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/{SUBSCRIPTIONS}/{}/{RESOURCE_GROUPS}/{}/{PROVIDERS}/{}",
            self.subscription_id, self.resource_group, self.provider
        )?;
        for (resource_type, name) in &self.segments {
            write!(f, "/{resource_type}/{name}")?;
        }
        Ok(())
    }
}

impl FromStr for ResourceIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: String| IdentifierError::Malformed {
            input: s.to_string(),
            reason,
        };

        let body = s
            .strip_prefix('/')
            .ok_or_else(|| malformed("must start with '/'".to_string()))?;
        let body = body.strip_suffix('/').unwrap_or(body);

        let parts: Vec<&str> = body.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(malformed("empty path segment".to_string()));
        }
        if parts.len() < MIN_SEGMENTS {
            return Err(malformed(format!(
                "expected at least {MIN_SEGMENTS} segments, found {}",
                parts.len()
            )));
        }

        for (position, marker) in [(0, SUBSCRIPTIONS), (2, RESOURCE_GROUPS), (4, PROVIDERS)] {
            if !parts[position].eq_ignore_ascii_case(marker) {
                return Err(malformed(format!(
                    "expected '{marker}' at segment {}, found '{}'",
                    position + 1,
                    parts[position]
                )));
            }
        }

        let tail = &parts[6..];
        if tail.len() % 2 != 0 {
            return Err(malformed(format!(
                "resource type '{}' has no name",
                tail[tail.len() - 1]
            )));
        }

        Ok(Self {
            subscription_id: parts[1].to_string(),
            resource_group: parts[3].to_string(),
            provider: parts[5].to_string(),
            segments: tail
                .chunks_exact(2)
                .map(|pair| (pair[0].to_string(), pair[1].to_string()))
                .collect(),
        })
    }
}

impl TryFrom<String> for ResourceIdentifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceIdentifier> for String {
    fn from(id: ResourceIdentifier) -> Self {
        id.to_string()
    }
}

/// Errors related to resource identifiers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// Input does not have the shape of an ARM resource path
    #[error("malformed resource identifier '{input}': {reason}")]
    Malformed {
        /// The offending input, verbatim
        input: String,
        /// What was wrong with it
        reason: String,
    },
}

impl IdentifierError {
    /// The input that failed to parse
    #[must_use]
    pub fn input(&self) -> &str {
        match self {
            Self::Malformed { input, .. } => input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LB: &str =
        "/subscriptions/0000-1111/resourceGroups/rg-web/providers/Microsoft.Network/loadBalancers/lb1";

    #[test]
    fn parse_top_level() {
        let id: ResourceIdentifier = LB.parse().unwrap();
        assert_eq!(id.subscription_id(), "0000-1111");
        assert_eq!(id.resource_group(), "rg-web");
        assert_eq!(id.provider(), "Microsoft.Network");
        assert_eq!(id.resource_type(), "loadBalancers");
        assert_eq!(id.resource_name(), "lb1");
        assert_eq!(id.full_type(), "Microsoft.Network/loadBalancers");
        assert!(!id.is_child());
        assert!(id.parent().is_none());
    }

    #[test]
    fn parse_child_resource() {
        let input = format!("{LB}/frontendIPConfigurations/fe1");
        let id: ResourceIdentifier = input.parse().unwrap();
        assert_eq!(id.resource_type(), "loadBalancers/frontendIPConfigurations");
        assert_eq!(id.resource_name(), "fe1");
        assert!(id.is_child());
        assert_eq!(id.parent().unwrap().to_string(), LB);
        assert_eq!(id.top_level().to_string(), LB);
    }

    #[test]
    fn markers_are_case_insensitive_but_values_are_not() {
        let input = "/SUBSCRIPTIONS/s/resourcegroups/RG/Providers/Microsoft.Network/LoadBalancers/LB1";
        let id: ResourceIdentifier = input.parse().unwrap();
        assert_eq!(id.resource_group(), "RG");
        assert_eq!(id.resource_type(), "LoadBalancers");
        assert_eq!(id.resource_name(), "LB1");

        let canonical: ResourceIdentifier = LB.parse().unwrap();
        assert_ne!(id.full_type(), canonical.full_type());
    }

    #[test]
    fn trailing_slash_is_tolerated() {
        let id: ResourceIdentifier = format!("{LB}/").parse().unwrap();
        assert_eq!(id.to_string(), LB);
    }

    #[test]
    fn display_is_canonical() {
        let id: ResourceIdentifier = LB.parse().unwrap();
        assert_eq!(id.to_string(), LB);
    }

    #[test]
    fn rejects_short_path() {
        let err = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network"
            .parse::<ResourceIdentifier>()
            .unwrap_err();
        assert!(matches!(err, IdentifierError::Malformed { .. }));
        assert!(err.to_string().contains("at least 8 segments"));
    }

    #[test]
    fn rejects_misordered_markers() {
        let input = "/resourceGroups/rg/subscriptions/s/providers/Microsoft.Network/loadBalancers/lb1";
        let err = input.parse::<ResourceIdentifier>().unwrap_err();
        assert_eq!(err.input(), input);
    }

    #[test]
    fn rejects_missing_providers_marker() {
        let input = "/subscriptions/s/resourceGroups/rg/provider/Microsoft.Network/loadBalancers/lb1";
        assert!(input.parse::<ResourceIdentifier>().is_err());
    }

    #[test]
    fn rejects_relative_path_and_empty_segments() {
        assert!(LB[1..].parse::<ResourceIdentifier>().is_err());
        assert!(LB.replace("/rg-web/", "//").parse::<ResourceIdentifier>().is_err());
        assert!("".parse::<ResourceIdentifier>().is_err());
    }

    #[test]
    fn rejects_dangling_type() {
        let input = format!("{LB}/frontendIPConfigurations");
        assert!(input.parse::<ResourceIdentifier>().is_err());
    }

    #[test]
    fn new_validates_fields() {
        let id = ResourceIdentifier::new("s", "rg", "Microsoft.Network", "publicIPAddresses", "pip1")
            .unwrap();
        assert_eq!(id.full_type(), "Microsoft.Network/publicIPAddresses");
        assert!(ResourceIdentifier::new("s", "", "p", "t", "n").is_err());
        assert!(ResourceIdentifier::new("s", "rg", "p", "t/x", "n").is_err());
        assert!(id.child("", "x").is_err());
    }

    #[test]
    fn serde_uses_canonical_string() {
        let id: ResourceIdentifier = LB.parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{LB}\""));

        let back: ResourceIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let bad: Result<ResourceIdentifier, _> = serde_json::from_str("\"/nope\"");
        assert!(bad.is_err());
    }

    #[test]
    fn same_resource_group() {
        let a: ResourceIdentifier = LB.parse().unwrap();
        let b = ResourceIdentifier::new("0000-1111", "rg-web", "Microsoft.Network", "publicIPAddresses", "pip")
            .unwrap();
        let c = ResourceIdentifier::new("0000-1111", "rg-other", "Microsoft.Network", "publicIPAddresses", "pip")
            .unwrap();
        assert!(a.same_resource_group(&b));
        assert!(!a.same_resource_group(&c));
    }
}

// Request path construction
//
// Turns a logical resource id plus addressing context into the exact
// path and query string the switch expects:
//
//   brocade-interface/fibrechannel + Fabric(128)
//     -> /rest/running/brocade-interface/fibrechannel?vf-id=128
//
// Pure and synchronous; every validation failure surfaces here, before
// anything is put on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::Error;
use crate::resource::{ResourceMap, ResourceScope};
use crate::version::{FosVersion, MINIMUM_SUPPORTED};

/// Query parameter the device recognizes on fabric-scoped paths.
pub const VF_ID_PARAM: &str = "vf-id";

/// Fabric id the device reserves to mean "all logical switches".
const RESERVED_ALL_FABRICS: u16 = 255;

// ── Virtual fabric id ────────────────────────────────────────────────

/// Validated virtual fabric (logical switch) id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VfId(u8);

impl VfId {
    /// Validate a fabric id: `0..=254`. 255 is reserved by the device.
    pub fn new(id: u16) -> Result<Self, Error> {
        if id == RESERVED_ALL_FABRICS {
            return Err(Error::InvalidVfId {
                id,
                reason: "reserved by the device for all fabrics",
            });
        }
        u8::try_from(id).map(Self).map_err(|_| Error::InvalidVfId {
            id,
            reason: "must be in the range 0..=254",
        })
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u16> for VfId {
    type Error = Error;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<VfId> for u16 {
    fn from(id: VfId) -> Self {
        u16::from(id.0)
    }
}

impl fmt::Display for VfId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Addressing context ───────────────────────────────────────────────

/// Addressing context of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// No virtual fabric scoping.
    #[default]
    Chassis,
    /// Target one logical switch.
    Fabric(VfId),
}

impl Scope {
    pub fn vf_id(self) -> Option<VfId> {
        match self {
            Self::Chassis => None,
            Self::Fabric(id) => Some(id),
        }
    }
}

impl From<VfId> for Scope {
    fn from(id: VfId) -> Self {
        Self::Fabric(id)
    }
}

// ── Builder ──────────────────────────────────────────────────────────

/// Builds request paths for one negotiated API version.
#[derive(Debug, Clone, Copy)]
pub struct UriBuilder<'a> {
    resources: &'a ResourceMap,
    version: &'a FosVersion,
}

impl<'a> UriBuilder<'a> {
    /// Create a builder for `version`, rejecting releases below the default
    /// baseline.
    pub fn new(resources: &'a ResourceMap, version: &'a FosVersion) -> Result<Self, Error> {
        Self::with_minimum(resources, version, &MINIMUM_SUPPORTED)
    }

    /// Create a builder, rejecting releases below `minimum`.
    pub fn with_minimum(
        resources: &'a ResourceMap,
        version: &'a FosVersion,
        minimum: &FosVersion,
    ) -> Result<Self, Error> {
        if !version.supports(minimum) {
            return Err(Error::UnsupportedVersion {
                found: version.to_string(),
                minimum: minimum.clone(),
            });
        }
        Ok(Self { resources, version })
    }

    /// Resolve `resource` under `scope` into `path[?vf-id=N]`.
    pub fn build(&self, resource: &str, scope: Scope) -> Result<String, Error> {
        validate_resource(resource)?;

        let segments: Vec<&str> = resource.split('/').collect();
        let split = segments.len().min(2);
        let (lookup, rest) = segments.split_at(split);
        let lookup_id = lookup.join("/");

        let (mut path, resource_scope) = match self.resources.get(&lookup_id) {
            Some(def) => (
                format!("{}/{}", self.version.api_root(), def.path),
                def.scope,
            ),
            None => {
                let guess = format!("{}/running/{lookup_id}", self.version.api_root());
                warn!(resource = %lookup_id, uri = %guess, "unknown resource, using best guess");
                (guess, ResourceScope::Fabric)
            }
        };

        for segment in rest {
            path.push('/');
            path.push_str(segment);
        }

        match (resource_scope, scope) {
            (ResourceScope::Fabric, Scope::Fabric(id)) => {
                path.push('?');
                path.push_str(VF_ID_PARAM);
                path.push('=');
                path.push_str(&id.to_string());
            }
            (ResourceScope::Chassis, Scope::Fabric(id)) => {
                trace!(resource, vf_id = %id, "chassis resource, dropping fabric context");
            }
            (_, Scope::Chassis) => {}
        }

        Ok(path)
    }
}

/// Reject resource ids that can't name a RESTCONF node.
pub fn validate_resource(resource: &str) -> Result<(), Error> {
    let invalid = |reason: &str| Error::InvalidResource {
        resource: resource.to_owned(),
        reason: reason.to_owned(),
    };

    if resource.is_empty() {
        return Err(invalid("empty resource id"));
    }
    if resource.starts_with('/') || resource.ends_with('/') {
        return Err(invalid("leading or trailing '/'"));
    }

    let mut segments = resource.split('/');
    let module = segments.next().unwrap_or_default();
    if !module
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        || module.starts_with('-')
    {
        return Err(invalid("module name must be lowercase kebab-case"));
    }

    for segment in std::iter::once(module).chain(segments) {
        if segment.is_empty() {
            return Err(invalid("empty path segment"));
        }
        if let Some(bad) = segment
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '%' | ':')))
        {
            return Err(Error::InvalidResource {
                resource: resource.to_owned(),
                reason: format!("character {bad:?} is not allowed"),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resource::ResourceDef;

    fn v9() -> FosVersion {
        "9.1.0".parse().unwrap()
    }

    fn fid(id: u16) -> Scope {
        Scope::Fabric(VfId::new(id).unwrap())
    }

    #[test]
    fn fabric_resource_carries_vf_id() {
        let map = ResourceMap::default();
        let version = v9();
        let builder = UriBuilder::new(&map, &version).unwrap();

        for id in [0, 1, 128, 254] {
            let path = builder
                .build("brocade-interface/fibrechannel", fid(id))
                .unwrap();
            assert_eq!(
                path,
                format!("/rest/running/brocade-interface/fibrechannel?vf-id={id}")
            );
        }
    }

    #[test]
    fn chassis_resource_never_carries_vf_id() {
        let map = ResourceMap::default();
        let version = v9();
        let builder = UriBuilder::new(&map, &version).unwrap();

        for scope in [Scope::Chassis, fid(1), fid(128)] {
            let path = builder.build("brocade-chassis/chassis", scope).unwrap();
            assert_eq!(path, "/rest/running/brocade-chassis/chassis");
            assert!(!path.contains(VF_ID_PARAM));
        }
    }

    #[test]
    fn fabric_resource_without_context_has_no_query() {
        let map = ResourceMap::default();
        let version = v9();
        let builder = UriBuilder::new(&map, &version).unwrap();
        let path = builder
            .build("brocade-zone/effective-configuration", Scope::Chassis)
            .unwrap();
        assert_eq!(path, "/rest/running/brocade-zone/effective-configuration");
    }

    #[test]
    fn deeper_segments_are_appended_before_query() {
        let map = ResourceMap::default();
        let version = v9();
        let builder = UriBuilder::new(&map, &version).unwrap();
        let path = builder
            .build("brocade-interface/fibrechannel/name/0%2F1", fid(10))
            .unwrap();
        assert_eq!(
            path,
            "/rest/running/brocade-interface/fibrechannel/name/0%2F1?vf-id=10"
        );
    }

    #[test]
    fn unknown_resource_uses_best_guess() {
        let map = ResourceMap::default();
        let version = v9();
        let builder = UriBuilder::new(&map, &version).unwrap();
        let path = builder.build("brocade-future/leaf", fid(5)).unwrap();
        assert_eq!(path, "/rest/running/brocade-future/leaf?vf-id=5");
    }

    #[test]
    fn registered_resource_is_used() {
        let mut map = ResourceMap::empty();
        map.insert(
            "brocade-custom/leaf",
            ResourceDef::new("operations/custom/leaf", ResourceScope::Chassis),
        );
        let version = v9();
        let builder = UriBuilder::new(&map, &version).unwrap();
        let path = builder.build("brocade-custom/leaf", fid(5)).unwrap();
        assert_eq!(path, "/rest/operations/custom/leaf");
    }

    #[test]
    fn malformed_resources_are_rejected() {
        let map = ResourceMap::default();
        let version = v9();
        let builder = UriBuilder::new(&map, &version).unwrap();

        for bad in [
            "",
            "/brocade-chassis/chassis",
            "brocade-chassis/chassis/",
            "brocade-chassis//chassis",
            "brocade-chassis/chassis?vf-id=1",
            "brocade chassis/chassis",
            "Brocade-Chassis/chassis",
            "brocade-chassis/chassis#frag",
        ] {
            let err = builder.build(bad, Scope::Chassis).unwrap_err();
            assert!(
                matches!(err, Error::InvalidResource { .. }),
                "expected InvalidResource for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn old_release_is_rejected() {
        let map = ResourceMap::default();
        let old: FosVersion = "8.1.0".parse().unwrap();
        let err = UriBuilder::new(&map, &old).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }));
    }

    #[test]
    fn vf_id_range() {
        assert_eq!(VfId::new(0).unwrap().get(), 0);
        assert_eq!(VfId::new(254).unwrap().get(), 254);
        assert!(matches!(VfId::new(255), Err(Error::InvalidVfId { id: 255, .. })));
        assert!(matches!(VfId::new(256), Err(Error::InvalidVfId { id: 256, .. })));
    }

    #[test]
    fn scope_serde_round_trip_rejects_reserved() {
        let json = serde_json::to_string(&fid(7)).unwrap();
        assert_eq!(json, r#"{"fabric":7}"#);
        assert!(serde_json::from_str::<Scope>(r#"{"fabric":255}"#).is_err());
    }
}

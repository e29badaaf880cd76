// Known RESTCONF resources and their addressing scope
//
// Each logical resource id (`module/leaf`) maps to a path relative to the
// API root and a scope: chassis-wide resources ignore the virtual fabric
// context, fabric-scoped resources take `?vf-id=N`. The table is seeded
// with the releases the driver was built against; callers register newer
// leaves at runtime with [`ResourceMap::insert`].

use indexmap::IndexMap;

use serde::{Deserialize, Serialize};

/// Whether a resource lives on the physical chassis or inside a logical switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceScope {
    /// Chassis-wide. The virtual fabric parameter is never sent.
    Chassis,
    /// Per logical switch. Addressed with `?vf-id=N`.
    Fabric,
}

/// One entry of the resource table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDef {
    /// Path below the API root, e.g. `running/brocade-interface/fibrechannel`.
    pub path: String,
    pub scope: ResourceScope,
}

impl ResourceDef {
    pub fn new(path: impl Into<String>, scope: ResourceScope) -> Self {
        Self {
            path: path.into(),
            scope,
        }
    }
}

/// Lookup table from logical resource id to [`ResourceDef`].
#[derive(Debug, Clone)]
pub struct ResourceMap {
    entries: IndexMap<String, ResourceDef>,
}

impl Default for ResourceMap {
    fn default() -> Self {
        let entries = DEFAULT_RESOURCES
            .iter()
            .map(|(id, path, scope)| ((*id).to_owned(), ResourceDef::new(*path, *scope)))
            .collect();
        Self { entries }
    }
}

impl ResourceMap {
    /// A table with no entries. Every lookup falls through to the best guess.
    pub fn empty() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Register or replace a resource definition.
    pub fn insert(&mut self, id: impl Into<String>, def: ResourceDef) -> Option<ResourceDef> {
        self.entries.insert(id.into(), def)
    }

    pub fn get(&self, id: &str) -> Option<&ResourceDef> {
        self.entries.get(id)
    }

    /// Entries in registration order, the default table first.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ResourceDef)> {
        self.entries.iter().map(|(id, def)| (id.as_str(), def))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

use ResourceScope::{Chassis, Fabric};

#[rustfmt::skip]
const DEFAULT_RESOURCES: &[(&str, &str, ResourceScope)] = &[
    ("brocade-module-version", "brocade-module-version", Chassis),
    ("brocade-module-version/module", "brocade-module-version/module", Chassis),
    ("auth-token", "auth-token", Fabric),
    ("brocade-fibrechannel-switch", "running/brocade-fibrechannel-switch", Fabric),
    ("brocade-fibrechannel-switch/fibrechannel-switch", "running/brocade-fibrechannel-switch/fibrechannel-switch", Fabric),
    ("brocade-fibrechannel-switch/topology-domain", "running/brocade-fibrechannel-switch/topology-domain", Fabric),
    ("brocade-fibrechannel-switch/topology-route", "running/brocade-fibrechannel-switch/topology-route", Fabric),
    ("brocade-fibrechannel-logical-switch", "running/brocade-fibrechannel-logical-switch", Chassis),
    ("brocade-fibrechannel-logical-switch/fibrechannel-logical-switch", "running/brocade-fibrechannel-logical-switch/fibrechannel-logical-switch", Chassis),
    ("brocade-interface", "running/brocade-interface", Fabric),
    ("brocade-interface/fibrechannel", "running/brocade-interface/fibrechannel", Fabric),
    ("brocade-interface/fibrechannel-statistics", "running/brocade-interface/fibrechannel-statistics", Fabric),
    ("brocade-interface/fibrechannel-performance", "running/brocade-interface/fibrechannel-performance", Fabric),
    ("brocade-interface/fibrechannel-statistics-db", "running/brocade-interface/fibrechannel-statistics-db", Fabric),
    ("brocade-interface/extension-ip-interface", "running/brocade-interface/extension-ip-interface", Fabric),
    ("brocade-interface/gigabitethernet", "running/brocade-interface/gigabitethernet", Fabric),
    ("brocade-interface/gigabitethernet-statistics", "running/brocade-interface/gigabitethernet-statistics", Fabric),
    ("brocade-interface/logical-e-port", "running/brocade-interface/logical-e-port", Fabric),
    ("brocade-interface/portchannel", "running/brocade-interface/portchannel", Fabric),
    ("brocade-media", "running/brocade-media", Fabric),
    ("brocade-media/media-rdp", "running/brocade-media/media-rdp", Fabric),
    ("brocade-fabric", "running/brocade-fabric", Fabric),
    ("brocade-fabric/access-gateway", "running/brocade-fabric/access-gateway", Fabric),
    ("brocade-fabric/fabric-switch", "running/brocade-fabric/fabric-switch", Fabric),
    ("brocade-fibrechannel-routing", "running/brocade-fibrechannel-routing", Fabric),
    ("brocade-fibrechannel-routing/routing-configuration", "running/brocade-fibrechannel-routing/routing-configuration", Fabric),
    ("brocade-fibrechannel-routing/lsan-zone", "running/brocade-fibrechannel-routing/lsan-zone", Fabric),
    ("brocade-fibrechannel-routing/lsan-device", "running/brocade-fibrechannel-routing/lsan-device", Fabric),
    ("brocade-fibrechannel-routing/edge-fabric-alias", "running/brocade-fibrechannel-routing/edge-fabric-alias", Fabric),
    ("brocade-zone", "running/brocade-zone", Fabric),
    ("brocade-zone/defined-configuration", "running/brocade-zone/defined-configuration", Fabric),
    ("brocade-zone/effective-configuration", "running/brocade-zone/effective-configuration", Fabric),
    ("brocade-zone/fabric-lock", "running/brocade-zone/fabric-lock", Fabric),
    ("brocade-fibrechannel-diagnostics", "running/brocade-fibrechannel-diagnostics", Fabric),
    ("brocade-fibrechannel-diagnostics/fibrechannel-diagnostics", "running/brocade-fibrechannel-diagnostics/fibrechannel-diagnostics", Fabric),
    ("brocade-fdmi", "running/brocade-fdmi", Fabric),
    ("brocade-fdmi/hba", "running/brocade-fdmi/hba", Fabric),
    ("brocade-fdmi/port", "running/brocade-fdmi/port", Fabric),
    ("brocade-name-server", "running/brocade-name-server", Fabric),
    ("brocade-name-server/fibrechannel-name-server", "running/brocade-name-server/fibrechannel-name-server", Fabric),
    ("brocade-fabric-traffic-controller", "running/brocade-fabric-traffic-controller", Fabric),
    ("brocade-fabric-traffic-controller/fabric-traffic-controller-device", "running/brocade-fabric-traffic-controller/fabric-traffic-controller-device", Chassis),
    ("brocade-fibrechannel-configuration", "running/brocade-fibrechannel-configuration", Fabric),
    ("brocade-fibrechannel-configuration/switch-configuration", "running/brocade-fibrechannel-configuration/switch-configuration", Fabric),
    ("brocade-fibrechannel-configuration/f-port-login-settings", "running/brocade-fibrechannel-configuration/f-port-login-settings", Fabric),
    ("brocade-fibrechannel-configuration/port-configuration", "running/brocade-fibrechannel-configuration/port-configuration", Fabric),
    ("brocade-fibrechannel-configuration/zone-configuration", "running/brocade-fibrechannel-configuration/zone-configuration", Fabric),
    ("brocade-fibrechannel-configuration/fabric", "running/brocade-fibrechannel-configuration/fabric", Fabric),
    ("brocade-fibrechannel-configuration/chassis-config-settings", "running/brocade-fibrechannel-configuration/chassis-config-settings", Fabric),
    ("brocade-fibrechannel-configuration/fos-settings", "running/brocade-fibrechannel-configuration/fos-settings", Fabric),
    ("brocade-logging", "running/brocade-logging", Fabric),
    ("brocade-logging/audit", "running/brocade-logging/audit", Fabric),
    ("brocade-logging/syslog-server", "running/brocade-logging/syslog-server", Fabric),
    ("brocade-logging/log-setting", "running/brocade-logging/log-setting", Fabric),
    ("brocade-logging/log-quiet-control", "running/brocade-logging/log-quiet-control", Fabric),
    ("brocade-logging/raslog", "running/brocade-logging/raslog", Chassis),
    ("brocade-logging/raslog-module", "running/brocade-logging/raslog-module", Chassis),
    ("brocade-logging/supportftp", "running/brocade-logging/supportftp", Chassis),
    ("brocade-logging/error-log", "running/brocade-logging/error-log", Chassis),
    ("brocade-logging/audit-log", "running/brocade-logging/audit-log", Chassis),
    ("brocade-fibrechannel-trunk", "running/brocade-fibrechannel-trunk", Fabric),
    ("brocade-fibrechannel-trunk/trunk", "running/brocade-fibrechannel-trunk/trunk", Fabric),
    ("brocade-fibrechannel-trunk/performance", "running/brocade-fibrechannel-trunk/performance", Fabric),
    ("brocade-fibrechannel-trunk/trunk-area", "running/brocade-fibrechannel-trunk/trunk-area", Fabric),
    ("brocade-ficon", "running/brocade-ficon", Fabric),
    ("brocade-ficon/cup", "running/brocade-ficon/cup", Fabric),
    ("brocade-ficon/logical-path", "running/brocade-ficon/logical-path", Fabric),
    ("brocade-ficon/rnid", "running/brocade-ficon/rnid", Fabric),
    ("brocade-ficon/switch-rnid", "running/brocade-ficon/switch-rnid", Fabric),
    ("brocade-ficon/lirr", "running/brocade-ficon/lirr", Fabric),
    ("brocade-ficon/rlir", "running/brocade-ficon/rlir", Fabric),
    ("brocade-fru", "running/brocade-fru", Chassis),
    ("brocade-fru/power-supply", "running/brocade-fru/power-supply", Chassis),
    ("brocade-fru/fan", "running/brocade-fru/fan", Chassis),
    ("brocade-fru/blade", "running/brocade-fru/blade", Chassis),
    ("brocade-fru/history-log", "running/brocade-fru/history-log", Chassis),
    ("brocade-fru/sensor", "running/brocade-fru/sensor", Chassis),
    ("brocade-fru/wwn", "running/brocade-fru/wwn", Chassis),
    ("brocade-chassis", "running/brocade-chassis", Chassis),
    ("brocade-chassis/chassis", "running/brocade-chassis/chassis", Chassis),
    ("brocade-chassis/ha-status", "running/brocade-chassis/ha-status", Chassis),
    ("brocade-maps", "running/brocade-maps", Fabric),
    ("brocade-maps/maps-config", "running/brocade-maps/maps-config", Fabric),
    ("brocade-maps/rule", "running/brocade-maps/rule", Fabric),
    ("brocade-maps/maps-policy", "running/brocade-maps/maps-policy", Fabric),
    ("brocade-maps/group", "running/brocade-maps/group", Fabric),
    ("brocade-maps/dashboard-rule", "running/brocade-maps/dashboard-rule", Fabric),
    ("brocade-maps/dashboard-history", "running/brocade-maps/dashboard-history", Fabric),
    ("brocade-maps/dashboard-misc", "running/brocade-maps/dashboard-misc", Fabric),
    ("brocade-maps/credit-stall-dashboard", "running/brocade-maps/credit-stall-dashboard", Fabric),
    ("brocade-maps/oversubscription-dashboard", "running/brocade-maps/oversubscription-dashboard", Fabric),
    ("brocade-maps/system-resources", "running/brocade-maps/system-resources", Fabric),
    ("brocade-maps/paused-cfg", "running/brocade-maps/paused-cfg", Fabric),
    ("brocade-maps/monitoring-system-matrix", "running/brocade-maps/monitoring-system-matrix", Fabric),
    ("brocade-maps/switch-status-policy-report", "running/brocade-maps/switch-status-policy-report", Fabric),
    ("brocade-maps/fpi-profile", "running/brocade-maps/fpi-profile", Fabric),
    ("brocade-time", "running/brocade-time", Chassis),
    ("brocade-time/clock-server", "running/brocade-time/clock-server", Chassis),
    ("brocade-time/time-zone", "running/brocade-time/time-zone", Chassis),
    ("brocade-security", "running/brocade-security", Chassis),
    ("brocade-security/sec-crypto-cfg", "running/brocade-security/sec-crypto-cfg", Chassis),
    ("brocade-security/sec-crypto-cfg-template", "running/brocade-security/sec-crypto-cfg-template", Chassis),
    ("brocade-security/sec-crypto-cfg-template-action", "running/brocade-security/sec-crypto-cfg-template-action", Chassis),
    ("brocade-security/password-cfg", "running/brocade-security/password-cfg", Chassis),
    ("brocade-security/user-specific-password-cfg", "running/brocade-security/user-specific-password-cfg", Chassis),
    ("brocade-security/user-config", "running/brocade-security/user-config", Chassis),
    ("brocade-security/ldap-role-map", "running/brocade-security/ldap-role-map", Chassis),
    ("brocade-security/sshutil", "running/brocade-security/sshutil", Chassis),
    ("brocade-security/sshutil-key", "running/brocade-security/sshutil-key", Chassis),
    ("brocade-security/sshutil-known-host", "running/brocade-security/sshutil-known-host", Chassis),
    ("brocade-security/sshutil-public-key", "running/brocade-security/sshutil-public-key", Chassis),
    ("brocade-security/sshutil-public-key-action", "running/brocade-security/sshutil-public-key-action", Chassis),
    ("brocade-security/password", "running/brocade-security/password", Chassis),
    ("brocade-security/security-certificate-generate", "running/brocade-security/security-certificate-generate", Chassis),
    ("brocade-security/security-certificate-action", "running/brocade-security/security-certificate-action", Chassis),
    ("brocade-security/security-certificate", "running/brocade-security/security-certificate", Chassis),
    ("brocade-security/radius-server", "running/brocade-security/radius-server", Chassis),
    ("brocade-security/tacacs-server", "running/brocade-security/tacacs-server", Chassis),
    ("brocade-security/ldap-server", "running/brocade-security/ldap-server", Chassis),
    ("brocade-security/auth-spec", "running/brocade-security/auth-spec", Chassis),
    ("brocade-security/ipfilter-policy", "running/brocade-security/ipfilter-policy", Chassis),
    ("brocade-security/ipfilter-rule", "running/brocade-security/ipfilter-rule", Chassis),
    ("brocade-security/security-certificate-extension", "running/brocade-security/security-certificate-extension", Chassis),
    ("brocade-license", "running/brocade-license", Chassis),
    ("brocade-license/license", "running/brocade-license/license", Chassis),
    ("brocade-license/ports-on-demand-license-info", "running/brocade-license/ports-on-demand-license-info", Chassis),
    ("brocade-snmp", "running/brocade-snmp", Chassis),
    ("brocade-snmp/system", "running/brocade-snmp/system", Chassis),
    ("brocade-snmp/mib-capability", "running/brocade-snmp/mib-capability", Chassis),
    ("brocade-snmp/trap-capability", "running/brocade-snmp/trap-capability", Chassis),
    ("brocade-snmp/v1-account", "running/brocade-snmp/v1-account", Chassis),
    ("brocade-snmp/v1-trap", "running/brocade-snmp/v1-trap", Chassis),
    ("brocade-snmp/v3-account", "running/brocade-snmp/v3-account", Chassis),
    ("brocade-snmp/v3-trap", "running/brocade-snmp/v3-trap", Chassis),
    ("brocade-snmp/access-control", "running/brocade-snmp/access-control", Chassis),
    ("brocade-supportlink", "operations/supportlink", Fabric),
    ("brocade-supportlink/supportlink-profile", "operations/supportlink/supportlink-profile", Chassis),
    ("brocade-operation-supportsave", "operations/supportsave", Chassis),
    ("brocade-operation-supportsave/connection", "operations/supportsave/connection", Chassis),
    ("brocade-operation-firmwaredownload", "operations/firmwaredownload", Fabric),
    ("brocade-operation-firmwaredownload/firmwaredownload-parameters", "operations/firmwaredownload/firmwaredownload-parameters", Chassis),
    ("brocade-operation-show-status", "operations/show-status", Chassis),
    ("brocade-operation-show-status/show-status", "operations/show-status/show-status", Chassis),
    ("brocade-operation-device-management", "operations/device-management", Chassis),
    ("brocade-operation-device-management/device", "operations/device-management/device", Chassis),
    ("brocade-operation-license", "operations/license", Chassis),
    ("brocade-operation-license/license-parameters", "operations/license/license-parameters", Chassis),
    ("brocade-operation-pcie-health", "operations/pcie-health-test", Chassis),
    ("brocade-operation-pcie-health/slot-test", "operations/pcie-health-test/slot-test", Chassis),
    ("brocade-operation-fabric", "operations/fibrechannel-fabric", Fabric),
    ("brocade-operation-fabric/fabric-operation-parameters", "operations/fibrechannel-fabric/fabric-operation-parameters", Fabric),
    ("brocade-operation-supportlink", "operations/supportlink", Chassis),
    ("brocade-operation-supportlink/supportlink", "operations/supportlink/supportlink", Chassis),
    ("brocade-extension-ip-route", "running/brocade-extension-ip-route", Fabric),
    ("brocade-extension-ip-route/extension-ip-route", "running/brocade-extension-ip-route/extension-ip-route", Fabric),
    ("brocade-extension-ipsec-policy", "running/brocade-extension-ipsec-policy", Fabric),
    ("brocade-extension-ipsec-policy/extension-ipsec-policy", "running/brocade-extension-ipsec-policy/extension-ipsec-policy", Fabric),
    ("brocade-extension-tunnel", "running/brocade-extension-tunnel", Fabric),
    ("brocade-extension-tunnel/extension-tunnel", "running/brocade-extension-tunnel/extension-tunnel", Fabric),
    ("brocade-extension-tunnel/extension-tunnel-statistics", "running/brocade-extension-tunnel/extension-tunnel-statistics", Fabric),
    ("brocade-extension-tunnel/extension-circuit", "running/brocade-extension-tunnel/extension-circuit", Fabric),
    ("brocade-extension-tunnel/extension-circuit-statistics", "running/brocade-extension-tunnel/extension-circuit-statistics", Fabric),
    ("brocade-extension-tunnel/circuit-qos-statistics", "running/brocade-extension-tunnel/circuit-qos-statistics", Fabric),
    ("brocade-extension-tunnel/wan-statistics", "running/brocade-extension-tunnel/wan-statistics", Fabric),
    ("brocade-extension", "running/brocade-extension", Fabric),
    ("brocade-extension/traffic-control-list", "running/brocade-extension/traffic-control-list", Fabric),
    ("brocade-extension/dp-hcl-status", "running/brocade-extension/dp-hcl-status", Fabric),
    ("brocade-extension/global-lan-statistics", "running/brocade-extension/global-lan-statistics", Fabric),
    ("brocade-extension/lan-flow-statistics", "running/brocade-extension/lan-flow-statistics", Fabric),
    ("brocade-lldp", "running/brocade-lldp", Fabric),
    ("brocade-lldp/lldp-neighbor", "running/brocade-lldp/lldp-neighbor", Fabric),
    ("brocade-lldp/lldp-profile", "running/brocade-lldp/lldp-profile", Fabric),
    ("brocade-lldp/lldp-statistics", "running/brocade-lldp/lldp-statistics", Fabric),
    ("brocade-lldp/lldp-global", "running/brocade-lldp/lldp-global", Fabric),
    ("brocade-operation-zone", "running/brocade-operation-zone", Fabric),
    ("brocade-operation-zone/zone-operation-parameters", "running/brocade-operation-zone/zone-operation-parameters", Fabric),
    ("brocade-operation-extension", "operations/extension", Fabric),
    ("brocade-operation-extension/extension-operation-parameters", "operations/extension/extension-operation-parameters", Fabric),
    ("brocade-operation-lldp", "operations/lldp", Fabric),
    ("brocade-operation-lldp/lldp-operations", "operations/lldp/lldp-operations", Fabric),
];

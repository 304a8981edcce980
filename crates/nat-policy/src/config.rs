//! Persistence of policies into `nat_policy_<index>` configuration sections

use rvoip_infra_common::ConfigStore;
use std::sync::Arc;
use tracing::{error, warn};

use crate::context::CoreContext;
use crate::policy::NatPolicy;

/// More purged sections than this hints at a section leak
const PURGE_WARNING_THRESHOLD: usize = 5;

pub fn section_name(index: usize) -> String {
    format!("nat_policy_{}", index)
}

impl NatPolicy {
    /// Writes the policy into section `nat_policy_<index>`
    pub fn save_to_config(&self, config: &mut ConfigStore, index: usize) {
        let section = section_name(index);
        config.set_string(&section, "ref", self.reference.as_str());
        config.set_string(&section, "stun_server", self.stun_server.as_str());
        config.set_string(&section, "stun_server_username", self.stun_server_username.as_str());
        config.set_bool(&section, "turn_enable_udp", self.turn_udp_enabled);
        config.set_bool(&section, "turn_enable_tcp", self.turn_tcp_enabled);
        config.set_bool(&section, "turn_enable_tls", self.turn_tls_enabled);

        let mut protocols = Vec::new();
        if self.upnp_enabled {
            protocols.push("upnp");
        } else {
            if self.stun_enabled {
                protocols.push("stun");
            }
            if self.turn_enabled {
                protocols.push("turn");
            }
            if self.ice_enabled {
                protocols.push("ice");
            }
        }
        config.set_string_list(&section, "protocols", &protocols);

        for (key, value) in [
            ("turn_configuration_endpoint", &self.turn_configuration_endpoint),
            ("nat_v4_address", &self.nat_v4_address),
            ("nat_v6_address", &self.nat_v6_address),
        ] {
            if value.is_empty() {
                config.remove_key(&section, key);
            } else {
                config.set_string(&section, key, value.as_str());
            }
        }
    }

    /// Policy stored in section `nat_policy_<index>`, if that section exists
    pub fn load_from_config(core: Arc<CoreContext>, config: &ConfigStore, index: usize) -> Option<NatPolicy> {
        let section = section_name(index);
        if !config.has_section(&section) {
            return None;
        }
        Some(Self::from_section(core, config, &section))
    }

    /// Looks for the section whose `ref` is `reference`
    pub fn from_ref(core: Arc<CoreContext>, config: &ConfigStore, reference: &str) -> Option<NatPolicy> {
        for index in 0.. {
            let section = section_name(index);
            if !config.has_section(&section) {
                break;
            }
            if config.get_string(&section, "ref") == Some(reference) {
                return Some(Self::from_section(core, config, &section));
            }
        }
        error!("There is no NatPolicy with ref [{}]", reference);
        None
    }

    /// Builds a policy from an arbitrary section. Keys that are absent take
    /// their defaults; a missing `ref` keeps a freshly generated one.
    pub fn from_section(core: Arc<CoreContext>, config: &ConfigStore, section: &str) -> NatPolicy {
        let mut policy = NatPolicy::new(core);
        if let Some(reference) = config.get_string(section, "ref") {
            policy.reference = reference.to_string();
        }
        policy.stun_server = config.get_string_or(section, "stun_server", "").to_string();
        policy.stun_server_username = config.get_string_or(section, "stun_server_username", "").to_string();
        policy.turn_udp_enabled = config.get_bool(section, "turn_enable_udp", true);
        policy.turn_tcp_enabled = config.get_bool(section, "turn_enable_tcp", false);
        policy.turn_tls_enabled = config.get_bool(section, "turn_enable_tls", false);
        policy.turn_configuration_endpoint = config
            .get_string_or(section, "turn_configuration_endpoint", "")
            .to_string();
        policy.nat_v4_address = config.get_string_or(section, "nat_v4_address", "").to_string();
        policy.nat_v6_address = config.get_string_or(section, "nat_v6_address", "").to_string();

        for protocol in config.get_string_list(section, "protocols").unwrap_or_default() {
            match protocol.as_str() {
                "stun" => policy.stun_enabled = true,
                "turn" => policy.turn_enabled = true,
                "ice" => policy.ice_enabled = true,
                "upnp" => policy.upnp_enabled = true,
                other => warn!("Unknown NAT protocol [{}] in section [{}]", other, section),
            }
        }
        policy
    }

    /// Removes `nat_policy_<index>` and every following contiguous section.
    /// Returns how many were removed.
    pub fn clear_config_from_index(config: &mut ConfigStore, index: usize) -> usize {
        let mut purged = 0;
        let mut current = index;
        loop {
            let section = section_name(current);
            if !config.has_section(&section) {
                break;
            }
            config.clean_section(&section);
            purged += 1;
            current += 1;
        }
        if purged > PURGE_WARNING_THRESHOLD {
            warn!("Purged [{}] unused NatPolicy sections from config file.", purged);
        }
        purged
    }
}

//! Human-facing names for job types and workflow steps.

/// Known job types and their display names.
const JOB_TYPE_NAMES: &[(&str, &str)] = &[
    ("firmware_update", "Firmware Update"),
    ("full_server_update", "Full Server Update"),
    ("rolling_cluster_update", "Rolling Cluster Update"),
    ("discovery_scan", "Discovery Scan"),
    ("vcenter_sync", "vCenter Sync"),
    ("host_sync", "Host Sync"),
    ("inventory_sync", "Inventory Sync"),
    ("zfs_replication", "ZFS Replication"),
    ("health_check", "Health Check"),
    ("power_action", "Power Action"),
    ("bios_config_write", "BIOS Configuration"),
    ("scp_export", "SCP Export"),
    ("scp_import", "SCP Import"),
    ("boot_configuration", "Boot Configuration"),
    ("virtual_media_mount", "Virtual Media Mount"),
    ("esxi_upgrade", "ESXi Upgrade"),
    ("credential_test", "Credential Test"),
];

/// `snake_case` → `Title Case`.
///
/// Empty segments (doubled or edge underscores) are dropped.
pub fn title_case(raw: &str) -> String {
    raw.split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Display name for a job type, falling back to its title-cased tag.
pub fn job_type_name(job_type: &str) -> String {
    JOB_TYPE_NAMES
        .iter()
        .find(|(tag, _)| *tag == job_type)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| title_case(job_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_cases_snake_case() {
        assert_eq!(title_case("enter_maintenance_mode"), "Enter Maintenance Mode");
        assert_eq!(title_case("__odd__input_"), "Odd Input");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn known_types_use_the_lookup() {
        assert_eq!(job_type_name("vcenter_sync"), "vCenter Sync");
        assert_eq!(job_type_name("idrac_reset"), "Idrac Reset");
    }
}

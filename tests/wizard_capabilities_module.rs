use chanwiz::config::CapabilityCatalog;
use chanwiz::shared::ids::CapabilityId;
use chanwiz::wizard::capabilities::{
    available_capabilities, compare_capabilities, filter_capabilities, selections_from_existing,
    CapabilitySelection, CapabilitySelections, ExistingCapabilities,
};
use std::cmp::Ordering;

fn ids(raw: &[&str]) -> Vec<CapabilityId> {
    raw.iter()
        .map(|id| CapabilityId::parse(id).expect("capability id"))
        .collect()
}

#[test]
fn wizard_capabilities_module_filters_below_current_version() {
    let candidates = ids(&["V1_3", "V1_4_1", "V1_4_2", "V1_4_3", "V2_0"]);
    let current = ids(&["V1_4_2"]).remove(0);

    assert_eq!(
        filter_capabilities(&candidates, Some(&current)),
        ids(&["V1_4_2", "V1_4_3", "V2_0"])
    );
    assert_eq!(filter_capabilities(&candidates, None), candidates);
}

#[test]
fn wizard_capabilities_module_compares_versions_numerically() {
    let list = ids(&["V1_4_10", "V1_4_9", "V2_0", "V2_0_0"]);
    assert_eq!(
        compare_capabilities(&list[0], &list[1]),
        Some(Ordering::Greater)
    );
    assert_eq!(compare_capabilities(&list[2], &list[3]), Some(Ordering::Equal));
}

#[test]
fn wizard_capabilities_module_update_lists_start_at_the_channel_values() {
    let catalog = CapabilityCatalog {
        channel: ids(&["V1_3", "V1_4_2", "V2_0"]),
        orderer: ids(&["V1_1", "V1_4_2", "V2_0"]),
        application: ids(&["V1_1", "V2_0"]),
    };
    let existing = ExistingCapabilities {
        channel: Some(ids(&["V1_4_2"]).remove(0)),
        orderer: None,
        application: Some(ids(&["V2_0"]).remove(0)),
    };

    let available = available_capabilities(&catalog, Some(&existing));
    assert_eq!(available.channel, ids(&["V1_4_2", "V2_0"]));
    assert_eq!(available.orderer, catalog.orderer);
    assert_eq!(available.application, ids(&["V2_0"]));

    let selections = selections_from_existing(&existing);
    assert_eq!(
        selections.channel,
        CapabilitySelection::Explicit(ids(&["V1_4_2"]).remove(0))
    );
    assert_eq!(selections.orderer, CapabilitySelection::UseDefault);
}

#[test]
fn wizard_capabilities_module_selection_serializes_use_default_marker() {
    let selections: CapabilitySelections =
        serde_yaml::from_str("channel: use_default\norderer: V2_0\n").expect("selections");
    assert_eq!(selections.channel, CapabilitySelection::UseDefault);
    assert_eq!(selections.application, CapabilitySelection::UseDefault);
    assert!(selections.orderer.is_explicit());

    let json = serde_json::to_value(&selections).expect("json");
    assert_eq!(json["channel"], "use_default");
    assert_eq!(json["orderer"], "V2_0");
}

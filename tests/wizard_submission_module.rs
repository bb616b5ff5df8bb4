use chanwiz::config::{FeatureFlags, Settings};
use chanwiz::shared::ids::CapabilityId;
use chanwiz::wizard::capabilities::CapabilitySelection;
use chanwiz::wizard::model::{
    ChaincodePolicy, Consenter, Identity, MspDefinition, Orderer, Organization, PolicySelection,
    PolicyType, RaftNode,
};
use chanwiz::wizard::submission::{
    build_create_request, build_update_request, chaincode_policy_payload, SubmissionError,
};
use chanwiz::wizard::{WizardMode, WizardState};

fn cap(raw: &str) -> CapabilityId {
    CapabilityId::parse(raw).expect("capability id")
}

fn org(msp: &str, cert: &str) -> Organization {
    Organization {
        msp: msp.to_string(),
        roles: vec!["admin".to_string()],
        root_certs: vec![cert.to_string()],
        node_ou: true,
        ..Organization::default()
    }
}

fn creator(msp: &str, cert: &str) -> MspDefinition {
    MspDefinition {
        msp_id: msp.to_string(),
        display_name: msp.to_string(),
        root_certs: vec![cert.to_string()],
        ..MspDefinition::default()
    }
}

fn identity() -> Identity {
    Identity {
        name: "admin".to_string(),
        cert: "Y2VydA==".to_string(),
        private_key: Some("a2V5".to_string()),
    }
}

fn create_state() -> WizardState {
    let mut state = WizardState::new(WizardMode::Create, FeatureFlags::default());
    state.channel_name = " mychannel ".to_string();
    state.selected_orderer = Some(Orderer {
        id: "orderer1".to_string(),
        display_name: "Orderer".to_string(),
        msp_id: "OrdererMSP".to_string(),
        url2use: "grpcs://orderer1:7050".to_string(),
        backend_addr: "orderer1:7050".to_string(),
        raft: Some(vec![
            RaftNode {
                display_name: "node1".to_string(),
                backend_addr: "node1:7050".to_string(),
                ..RaftNode::default()
            },
            RaftNode {
                display_name: "node2".to_string(),
                backend_addr: "node2:7050".to_string(),
                ..RaftNode::default()
            },
        ]),
    });
    state.orgs = vec![org("Org1MSP", "root1")];
    state.custom_policy = Some(PolicySelection { n: 1, out_of: 1 });
    state.selected_identity = Some(identity());
    state.selected_channel_creator = Some(creator("Org1MSP", "root1"));
    state
}

#[test]
fn wizard_submission_module_create_leaves_block_params_null_without_override() {
    let state = create_state();
    let request = build_create_request(&state, &Settings::default()).expect("request");
    let json = serde_json::to_value(&request).expect("json");

    assert_eq!(json["channel_id"], "mychannel");
    assert_eq!(json["org_msp_id"], "Org1MSP");
    assert!(json["block_params"].is_null());
    assert!(json["raft_params"].is_null());
    assert_eq!(
        json["all_orderer_urls"],
        serde_json::json!(["node1:7050", "node2:7050"])
    );
    assert_eq!(json["application_capabilities"], serde_json::json!(["V2_0"]));
    assert!(json.get("channel_capabilities").is_none());
    assert_eq!(json["lifecycle_policy"]["type"], "MAJORITY");
    assert_eq!(json["n_out_of"], 1);
}

#[test]
fn wizard_submission_module_create_sends_block_params_with_override() {
    let mut state = create_state();
    state.override_defaults = true;
    state.block_params.absolute_max_bytes = Some("10MB".to_string());
    state.block_params.max_message_count = Some("500".to_string());
    state.block_params.timeout = Some("2s".to_string());

    let request = build_create_request(&state, &Settings::default()).expect("request");
    let block = request.block_params.expect("block params");

    assert_eq!(block.absolute_max_bytes, Some(10 * 1024 * 1024));
    assert_eq!(block.max_message_count, Some(500));
    assert_eq!(block.preferred_max_bytes, None);
    assert_eq!(block.timeout.as_deref(), Some("2s"));
}

#[test]
fn wizard_submission_module_create_omits_policies_below_2_0() {
    let mut state = create_state();
    state.selected_capabilities.application = CapabilitySelection::Explicit(cap("V1_4_2"));

    let request = build_create_request(&state, &Settings::default()).expect("request");

    assert_eq!(request.application_capabilities, Some(vec![cap("V1_4_2")]));
    assert!(request.lifecycle_policy.is_none());
    assert!(request.endorsement_policy.is_none());
}

#[test]
fn wizard_submission_module_create_keeps_only_selected_raft_urls() {
    let mut state = create_state();
    state.use_default_consenters = false;
    state.consenters = vec![Consenter {
        name: "node2".to_string(),
        host: "node2".to_string(),
        port: "7050".to_string(),
        ..Consenter::default()
    }];

    let request = build_create_request(&state, &Settings::default()).expect("request");

    assert_eq!(request.all_orderer_urls, vec!["node2:7050".to_string()]);
    assert_eq!(request.consenters.len(), 1);
}

#[test]
fn wizard_submission_module_create_requires_orderer() {
    let mut state = create_state();
    state.selected_orderer = None;
    let err = build_create_request(&state, &Settings::default()).expect_err("no orderer");
    assert!(matches!(err, SubmissionError::MissingOrderer));
}

#[test]
fn wizard_submission_module_specific_policy_without_members_becomes_majority() {
    let payload = chaincode_policy_payload(&ChaincodePolicy {
        policy_type: PolicyType::Specific,
        members: Vec::new(),
        n: Some(2),
    });
    assert_eq!(payload.policy_type, PolicyType::Majority);
    assert_eq!(payload.n, "");

    let payload = chaincode_policy_payload(&ChaincodePolicy {
        policy_type: PolicyType::Specific,
        members: vec!["Org1MSP".to_string(), "Org2MSP".to_string()],
        n: Some(2),
    });
    assert_eq!(payload.policy_type, PolicyType::Specific);
    assert_eq!(payload.n, "2");
}

#[test]
fn wizard_submission_module_update_request_reports_only_changes() {
    let mut state = WizardState::new(WizardMode::Update, FeatureFlags::default());
    state.channel_name = "mychannel".to_string();
    state.baseline.capabilities.channel = Some(cap("V1_4_3"));
    state.baseline.capabilities.application = Some(cap("V1_4_2"));
    state.selected_capabilities.channel = CapabilitySelection::Explicit(cap("V1_4_3"));
    state.selected_capabilities.application = CapabilitySelection::Explicit(cap("V2_0"));
    state.original_orgs = vec![org("Org1MSP", "root1")];
    state.orgs = state.original_orgs.clone();
    state.msps = vec![MspDefinition {
        host_url: Some("https://console".to_string()),
        ..creator("Org1MSP", "root1")
    }];
    state.selected_identity = Some(identity());
    state.selected_channel_creator = Some(creator("Org1MSP", "root1"));

    let request = build_update_request(&state, &Settings::default(), "orderer1:7050")
        .expect("update request");
    let json = serde_json::to_value(&request).expect("json");

    assert_eq!(json["orderer_host"], "orderer1:7050");
    assert_eq!(json["isAdmin"], true);
    assert!(json["channel_capabilities"].is_null());
    assert!(json["orderer_capabilities"].is_null());
    assert_eq!(json["application_capabilities"], serde_json::json!(["V2_0"]));
    assert!(json["block_params"].is_null());
    assert_eq!(json["consenters"], serde_json::json!([]));
    assert_eq!(
        json["updated_application_msps"]["Org1MSP"]["msp_definition"]["host_url"],
        "https://console"
    );
    assert!(json["lifecycle_policy"].is_object());
}

#[test]
fn wizard_submission_module_update_is_not_admin_with_foreign_root_cert() {
    let mut state = WizardState::new(WizardMode::Update, FeatureFlags::default());
    state.channel_name = "mychannel".to_string();
    state.original_orgs = vec![org("Org1MSP", "root1")];
    state.selected_channel_creator = Some(creator("Org1MSP", "other-root"));
    state.baseline.n_out_of = Some(PolicySelection { n: 2, out_of: 3 });

    let request =
        build_update_request(&state, &Settings::default(), "orderer1:7050").expect("request");

    assert!(!request.is_admin);
    assert_eq!(request.n_out_of, 2);
    assert!(request.lifecycle_policy.is_none());
}

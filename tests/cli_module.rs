use chanwiz::cli::{parse_cli_verb, run_cli, CliVerb};
use chanwiz::config::CONFIG_PATH_ENV;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::tempdir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

const READY_DRAFT: &str = r#"
viewing: prerequisites
state:
  mode: create
  channel_name: mychannel
  selected_orderer:
    id: orderer1
    msp_id: OrdererMSP
    url2use: grpcs://orderer1:7050
    backend_addr: orderer1:7050
  orgs:
    - msp: Org1MSP
      roles: [admin]
      node_ou: true
  custom_policy:
    n: 1
    out_of: 1
  selected_identity:
    name: org1admin
    cert: Y2VydA==
    private_key: c2VjcmV0
  selected_channel_creator:
    msp_id: Org1MSP
"#;

fn write_draft(dir: &Path) -> String {
    fs::write(
        dir.join("config.yaml"),
        format!("log_path: {}\n", dir.join("wizard.log").display()),
    )
    .expect("write config");
    let draft = dir.join("draft.yaml");
    fs::write(&draft, READY_DRAFT).expect("write draft");
    draft.display().to_string()
}

fn run(args: &[&str]) -> Result<String, String> {
    run_cli(args.iter().map(|arg| arg.to_string()).collect())
}

fn with_config<F>(test: F)
where
    F: FnOnce(&Path),
{
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let dir = tempdir().expect("tempdir");
    std::env::set_var(CONFIG_PATH_ENV, dir.path().join("config.yaml"));
    test(dir.path());
    std::env::remove_var(CONFIG_PATH_ENV);
}

#[test]
fn cli_module_parses_verbs() {
    assert_eq!(parse_cli_verb("walk"), CliVerb::Walk);
    assert_eq!(parse_cli_verb("--help"), CliVerb::Help);
    assert_eq!(parse_cli_verb("deploy"), CliVerb::Unknown);
}

#[test]
fn cli_module_init_writes_settings_once() {
    with_config(|dir| {
        let first = run(&["init"]).expect("init");
        assert!(first.starts_with("wrote default settings"));
        assert!(dir.join("config.yaml").exists());

        let second = run(&["init"]).expect("init again");
        assert!(second.starts_with("settings already exist"));
    });
}

#[test]
fn cli_module_steps_lists_update_timeline() {
    with_config(|_| {
        let output = run(&["steps", "update"]).expect("steps");
        assert!(output.starts_with("mode=update"));
        assert!(output.contains("organization_updating_channel"));
        assert!(output.contains("consenter_set"));
        assert!(!output.contains("prerequisites"));

        assert!(run(&["steps", "delete"]).is_err());
    });
}

#[test]
fn cli_module_walk_replays_keys_over_draft() {
    with_config(|dir| {
        let draft = write_draft(dir);

        let output = run(&["walk", &draft, "right,right,left"]).expect("walk");

        assert!(output.contains("-> channel_details"));
        assert!(output.contains("-> channel_organizations"));
        assert!(output.ends_with("end=channel_details"));
    });
}

#[test]
fn cli_module_preview_redacts_private_key() {
    with_config(|dir| {
        let draft = write_draft(dir);

        let output = run(&["preview", &draft]).expect("preview");
        let json: serde_json::Value = serde_json::from_str(&output).expect("json");

        assert_eq!(json["channel_id"], "mychannel");
        assert_eq!(json["client_prv_key_b64pem"], "<redacted>");
        assert!(!output.contains("c2VjcmV0"));
    });
}

#[test]
fn cli_module_status_reports_buttons() {
    with_config(|dir| {
        let draft = write_draft(dir);

        let output = run(&["status", &draft]).expect("status");

        assert!(dir.join("wizard.log").exists());

        assert!(output.contains("channel=mychannel"));
        assert!(output.contains("viewing=prerequisites"));
        assert!(output.contains("next=channel_details enabled=true"));
        assert!(output.contains("orderer_signature_needed=false"));
    });
}

#[test]
fn cli_module_submit_refuses_draft_with_incomplete_review() {
    with_config(|dir| {
        write_draft(dir);
        let draft = dir.join("no_creator.yaml");
        let incomplete = READY_DRAFT.replace("  selected_channel_creator:\n    msp_id: Org1MSP\n", "");
        fs::write(&draft, incomplete).expect("write draft");

        let err = run(&["submit", &draft.display().to_string()]).expect_err("submit");

        assert!(err.ends_with("channel review is not complete"));
    });
}

use crate::api::RestClient;
use crate::config::{
    default_global_config_path, default_state_root, load_settings_or_default, save_settings,
    Settings,
};
use crate::shared::ids::CapabilityId;
use crate::shared::logging::{wizard_log_path, WizardLog};
use crate::wizard::capabilities::available_capabilities;
use crate::wizard::collaborators::{Collaborators, LogAnalytics, OrdererRegistry};
use crate::wizard::completion::is_step_complete;
use crate::wizard::navigation::{
    parse_scripted_wizard_keys, wizard_action_from_key, wizard_transition, NavState, Route,
    WizardNavEffect,
};
use crate::wizard::predicates::{consenter_update_count, GatingFlags};
use crate::wizard::session::{ChannelCompletion, WizardSession};
use crate::wizard::state::WizardState;
use crate::wizard::step::{initial_step, WizardMode, WizardStep};
use crate::wizard::submission::{build_create_request, build_update_request};
use crate::wizard::timeline::{build_timeline, PruneInputs, Timeline};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

const REDACTED: &str = "<redacted>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Init,
    Steps,
    Status,
    Walk,
    Preview,
    Submit,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "init" => CliVerb::Init,
        "steps" => CliVerb::Steps,
        "status" => CliVerb::Status,
        "walk" => CliVerb::Walk,
        "preview" => CliVerb::Preview,
        "submit" => CliVerb::Submit,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  init [--force]                       Write default settings to the config path"
            .to_string(),
        "  steps <create|update>                Print the wizard timeline".to_string(),
        "  status <draft.yaml>                  Show step completion, gating flags and buttons"
            .to_string(),
        "  walk <draft.yaml> <keys>             Replay keys (left,right,enter,esc,s) over a draft"
            .to_string(),
        "  preview <draft.yaml>                 Print the request a submission would send"
            .to_string(),
        "  submit <draft.yaml>                  Submit the draft to the channel backend"
            .to_string(),
        "  help                                 Show this help".to_string(),
    ]
}

pub fn help_text() -> String {
    cli_help_lines().join("\n")
}

/// A saved wizard: the state plus where the user was.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WizardDraft {
    pub viewing: Option<WizardStep>,
    pub visited: Vec<WizardStep>,
    pub state: WizardState,
}

impl WizardDraft {
    pub fn nav(&self) -> NavState {
        let mut nav = NavState::new(self.state.mode);
        nav.visited.extend(self.visited.iter().copied());
        nav.show(self.viewing.unwrap_or_else(|| initial_step(self.state.mode)));
        nav
    }
}

pub fn load_draft(path: &Path) -> Result<WizardDraft, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read draft {}: {e}", path.display()))?;
    serde_yaml::from_str(&raw).map_err(|e| format!("invalid draft {}: {e}", path.display()))
}

fn load_cli_settings() -> Result<Settings, String> {
    let path = default_global_config_path().map_err(|e| e.to_string())?;
    load_settings_or_default(&path).map_err(|e| e.to_string())
}

fn cli_log(settings: &Settings) -> WizardLog {
    match &settings.log_path {
        Some(path) => WizardLog::new(Some(path.clone())),
        None => WizardLog::new(default_state_root().ok().map(|root| wizard_log_path(&root))),
    }
}

fn collaborators(settings: &Settings, log: &WizardLog) -> (Arc<RestClient>, Collaborators) {
    let client = Arc::new(RestClient::from_settings(settings));
    let collaborators =
        Collaborators::from_backend(client.clone(), Arc::new(LogAnalytics::new(log.clone())));
    (client, collaborators)
}

fn draft_session(draft: &WizardDraft, settings: &Settings, log: &WizardLog) -> WizardSession {
    let (_, collaborators) = collaborators(settings, log);
    let mut session = WizardSession::resume(
        draft.state.clone(),
        settings.clone(),
        collaborators,
        log.clone(),
    );
    session.restore_nav(draft.nav());
    session
}

fn required_arg<'a>(args: &'a [String], index: usize, usage: &str) -> Result<&'a str, String> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("usage: {usage}"))
}

fn render_timeline(timeline: &Timeline, state: Option<&WizardState>) -> Vec<String> {
    let mut lines = Vec::new();
    for group in &timeline.groups {
        lines.push(format!("[{}]", group.title.unwrap_or("start")));
        for entry in &group.steps {
            let mut marks = Vec::new();
            if entry.is_link {
                marks.push("link");
            }
            if entry.disabled {
                marks.push("disabled");
            }
            if let Some(state) = state {
                marks.push(if is_step_complete(entry.step, state) {
                    "complete"
                } else {
                    "incomplete"
                });
            }
            lines.push(format!("  {:32} {}", entry.label, marks.join(",")));
        }
    }
    lines
}

fn cmd_init(args: &[String]) -> Result<String, String> {
    let force = args.iter().any(|arg| arg == "--force");
    let path = default_global_config_path().map_err(|e| e.to_string())?;
    if path.exists() && !force {
        return Ok(format!("settings already exist at {}", path.display()));
    }
    save_settings(&Settings::default(), &path).map_err(|e| e.to_string())?;
    Ok(format!("wrote default settings to {}", path.display()))
}

fn cmd_steps(args: &[String]) -> Result<String, String> {
    let mode = WizardMode::parse(required_arg(args, 0, "chanwiz steps <create|update>")?)?;
    let settings = load_cli_settings()?;
    let mut state = WizardState::new(mode, settings.features);
    if settings.features.capabilities_enabled {
        state.available_capabilities = available_capabilities(&settings.capability_catalog, None);
    }
    if mode.is_update() {
        // Assume a channel recent enough for consenter edits.
        state.baseline.capabilities.orderer = CapabilityId::parse("V1_4_2").ok();
    }
    let mut timeline = build_timeline(mode);
    timeline.prune(&PruneInputs::from_state(&state));
    let mut lines = vec![format!("mode={mode}")];
    lines.extend(render_timeline(&timeline, None));
    Ok(lines.join("\n"))
}

fn flag_lines(state: &WizardState) -> Vec<String> {
    let flags = GatingFlags::derive(state);
    vec![
        format!(
            "higher_capability_available={}",
            flags.higher_capability_available
        ),
        format!("channel_2_0={}", flags.channel_2_0),
        format!("can_modify_consenters={}", flags.can_modify_consenters),
        format!("orderer_signature_needed={}", flags.orderer_signature_needed),
        format!("consenter_update_count={}", consenter_update_count(state)),
    ]
}

fn cmd_status(args: &[String]) -> Result<String, String> {
    let draft = load_draft(Path::new(required_arg(
        args,
        0,
        "chanwiz status <draft.yaml>",
    )?))?;
    let settings = load_cli_settings()?;
    let log = cli_log(&settings);
    let session = draft_session(&draft, &settings, &log);
    let state = session.state();

    let mut lines = vec![
        format!("mode={}", state.mode),
        format!("channel={}", state.channel_name),
        format!("viewing={}", session.nav().viewing),
    ];
    lines.extend(render_timeline(session.timeline(), Some(state)));
    lines.extend(flag_lines(state));
    let buttons = session.buttons();
    lines.push(format!(
        "back={}",
        buttons.back.map_or("-".to_string(), |step| step.to_string())
    ));
    let next = match buttons.next {
        Some(Route::Step(step)) => step.to_string(),
        Some(Route::Submit) => buttons.next_label.to_string(),
        None => "-".to_string(),
    };
    lines.push(format!("next={next} enabled={}", buttons.next_enabled));
    if let Some(warning) = &state.block_timeout_error {
        lines.push(format!("warning={warning}"));
    }
    if let Some(failure) = &state.submission_error {
        lines.push(format!("last_error={}", failure.title));
    }
    Ok(lines.join("\n"))
}

fn cmd_walk(args: &[String]) -> Result<String, String> {
    let usage = "chanwiz walk <draft.yaml> <keys>";
    let draft = load_draft(Path::new(required_arg(args, 0, usage)?))?;
    let keys = parse_scripted_wizard_keys(required_arg(args, 1, usage)?)?;
    let settings = load_cli_settings()?;
    let log = cli_log(&settings);
    let mut session = draft_session(&draft, &settings, &log);
    let mut nav = draft.nav();

    let mut lines = vec![format!("start={}", nav.viewing)];
    for key in keys {
        let Some(action) = wizard_action_from_key(key) else {
            continue;
        };
        match wizard_transition(&mut nav, action, session.state(), session.timeline()) {
            Ok(transition) => {
                let line = match transition.effect {
                    WizardNavEffect::ShowStep(step) => format!("-> {step}"),
                    WizardNavEffect::SubmitCreate => "-> submit (create)".to_string(),
                    WizardNavEffect::SubmitUpdate => "-> submit (update)".to_string(),
                    WizardNavEffect::Close => "-> close".to_string(),
                    WizardNavEffect::None => transition.feedback.unwrap_or_default(),
                };
                lines.push(line);
                if matches!(
                    transition.effect,
                    WizardNavEffect::SubmitCreate
                        | WizardNavEffect::SubmitUpdate
                        | WizardNavEffect::Close
                ) {
                    break;
                }
                session.restore_nav(nav.clone());
            }
            Err(err) => lines.push(format!("!! {err}")),
        }
    }
    lines.push(format!("end={}", nav.viewing));
    Ok(lines.join("\n"))
}

fn redact(mut value: serde_json::Value) -> serde_json::Value {
    if let Some(key) = value.get_mut("client_prv_key_b64pem") {
        if !key.is_null() {
            *key = serde_json::Value::String(REDACTED.to_string());
        }
    }
    value
}

fn cmd_preview(args: &[String]) -> Result<String, String> {
    let draft = load_draft(Path::new(required_arg(
        args,
        0,
        "chanwiz preview <draft.yaml>",
    )?))?;
    let settings = load_cli_settings()?;
    let log = cli_log(&settings);
    let state = &draft.state;
    let value = match state.mode {
        WizardMode::Create => {
            let request = build_create_request(state, &settings).map_err(|e| e.to_string())?;
            serde_json::to_value(&request).map_err(|e| e.to_string())?
        }
        WizardMode::Update => {
            let (client, _) = collaborators(&settings, &log);
            let orderer = state
                .selected_orderer
                .as_ref()
                .ok_or_else(|| "no orderer selected".to_string())?;
            let host = client
                .resolve_orderer_url(orderer, &state.baseline.consenters)
                .map_err(|e| e.to_string())?;
            let request =
                build_update_request(state, &settings, &host).map_err(|e| e.to_string())?;
            serde_json::to_value(&request).map_err(|e| e.to_string())?
        }
    };
    serde_json::to_string_pretty(&redact(value)).map_err(|e| e.to_string())
}

fn cmd_submit(args: &[String]) -> Result<String, String> {
    let draft = load_draft(Path::new(required_arg(
        args,
        0,
        "chanwiz submit <draft.yaml>",
    )?))?;
    let settings = load_cli_settings()?;
    let log = cli_log(&settings);
    let mut session = draft_session(&draft, &settings, &log);

    let completed: Rc<RefCell<Option<ChannelCompletion>>> = Rc::new(RefCell::new(None));
    let sink = completed.clone();
    session.on_complete(move |completion| {
        *sink.borrow_mut() = Some(completion.clone());
    });

    session.submit();
    session.pump_blocking(Duration::from_secs(settings.request_timeout_secs + 5));

    if let Some(completion) = completed.borrow().as_ref() {
        let mut line = format!(
            "{} channel `{}`",
            match completion.mode {
                WizardMode::Create => "created",
                WizardMode::Update => "updated",
            },
            completion.channel_id
        );
        if completion.orderer_signature_needed == Some(true) {
            line.push_str(" (orderer signature needed)");
        }
        return Ok(line);
    }
    match &session.state().submission_error {
        Some(failure) => Err(format!(
            "{}: {}",
            failure.title,
            failure.details.as_deref().unwrap_or("no details")
        )),
        None => Err("submission did not finish before the timeout".to_string()),
    }
}

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Init => cmd_init(&args[1..]),
        CliVerb::Steps => cmd_steps(&args[1..]),
        CliVerb::Status => cmd_status(&args[1..]),
        CliVerb::Walk => cmd_walk(&args[1..]),
        CliVerb::Preview => cmd_preview(&args[1..]),
        CliVerb::Submit => cmd_submit(&args[1..]),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_verb_is_an_error() {
        let err = run_cli(vec!["frobnicate".to_string()]).expect_err("unknown");
        assert_eq!(err, "unknown command `frobnicate`");
    }

    #[test]
    fn empty_args_print_help() {
        let help = run_cli(Vec::new()).expect("help");
        assert!(help.contains("walk <draft.yaml> <keys>"));
    }

    #[test]
    fn draft_nav_starts_on_saved_step() {
        let draft: WizardDraft = serde_yaml::from_str(
            "viewing: channel_details\nvisited: [prerequisites]\nstate:\n  channel_name: ch1\n",
        )
        .expect("draft");
        let nav = draft.nav();
        assert_eq!(nav.viewing, WizardStep::ChannelDetails);
        assert!(nav.visited.contains(&WizardStep::Prerequisites));
        assert!(nav.visited.contains(&WizardStep::ChannelDetails));
    }

    #[test]
    fn preview_redacts_private_key() {
        let value = redact(serde_json::json!({"client_prv_key_b64pem": "secret"}));
        assert_eq!(value["client_prv_key_b64pem"], REDACTED);
    }
}

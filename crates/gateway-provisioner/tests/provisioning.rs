//! End-to-end provisioning sessions against a fake host

mod common;

use common::{FakeHost, answers, default_answers, has_file};
use gateway_provisioner::{
    AccountOutcome, ContainerState, Error, ExecutionContext, InputProvider, PortPurpose,
    ScriptedInput, SessionEnd,
};
use std::io;

fn script(accounts: Vec<Vec<String>>) -> ScriptedInput {
    let count = accounts.len();
    let mut all = Vec::new();
    for (i, account) in accounts.into_iter().enumerate() {
        all.extend(account);
        all.push(if i + 1 < count { "y" } else { "n" }.to_string());
    }
    ScriptedInput::new(all)
}

#[smol_potat::test]
async fn test_default_port_in_use_takes_operator_answer() {
    let host = FakeHost::new();
    host.state().listening.insert(3010);

    let mut answers = default_answers("123456789");
    answers.insert(5, "3100".to_string());
    let mut input = script(vec![answers]);

    let summary = host.session(&mut input).run().await.unwrap();

    let record = &summary.records[0];
    assert_eq!(record.host_port(PortPurpose::Api), Some(3100));
    assert_eq!(record.host_port(PortPurpose::WebUi), Some(6099));
    assert_eq!(record.outcome.final_state(), ContainerState::Running);

    assert!(input.prompts().contains(&"API port [3010]: ".to_string()));
    assert!(
        input
            .messages()
            .iter()
            .any(|m| m.contains("port 3010 is already in use"))
    );
    let run = host
        .command_lines()
        .into_iter()
        .find(|line| line.starts_with("docker run -d"))
        .unwrap();
    assert!(run.contains("-p 3100:3001"));
    assert!(!run.contains("3011"));
}

#[smol_potat::test]
async fn test_reprovisioning_replaces_container() {
    let host = FakeHost::new();
    let mut input = script(vec![
        answers("42", "", "ws://first:8080/ws", "", "", ""),
        answers("42", "", "ws://second:8080/ws", "", "", ""),
    ]);

    let summary = host.session(&mut input).run().await.unwrap();

    assert_eq!(summary.records.len(), 2);
    for record in &summary.records {
        assert_eq!(record.outcome.final_state(), ContainerState::Running);
        assert_eq!(record.host_port(PortPurpose::Api), Some(3003));
    }

    let bridge = host.read_json("42", "onebot11.json");
    assert_eq!(
        bridge["network"]["websocketClients"][0]["url"],
        "ws://second:8080/ws"
    );
    let containers: Vec<String> = host.state().containers.keys().cloned().collect();
    assert_eq!(containers, vec!["napcat_42"]);

    let lines = host.command_lines();
    assert_eq!(lines.iter().filter(|l| *l == "docker rm -f napcat_42").count(), 1);
    assert_eq!(lines.iter().filter(|l| l.starts_with("docker run -d")).count(), 2);

    // The stale container goes away before the second run call
    let removal = lines.iter().position(|l| l == "docker rm -f napcat_42").unwrap();
    let runs: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.starts_with("docker run -d"))
        .map(|(i, _)| i)
        .collect();
    assert!(runs[0] < removal && removal < runs[1]);

    let transitions = |index: usize| match &summary.records[index].outcome {
        AccountOutcome::Lifecycle(report) => report.transitions.clone(),
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(
        transitions(0),
        vec![ContainerState::Absent, ContainerState::Starting, ContainerState::Running]
    );
    assert_eq!(
        transitions(1),
        vec![
            ContainerState::Stale,
            ContainerState::Removed,
            ContainerState::Starting,
            ContainerState::Running
        ]
    );
}

#[smol_potat::test]
async fn test_inspect_failure_does_not_end_session() {
    let host = FakeHost::new();
    host.state().failing_inspect.insert("napcat_7".to_string());
    // napcat_7 keeps publishing its ports, so account 8 picks free ones
    let mut input = script(vec![
        default_answers("7"),
        answers("8", "", "", "", "3100", "7100"),
    ]);

    let summary = host.session(&mut input).run().await.unwrap();

    assert_eq!(summary.records.len(), 2);
    assert_eq!(summary.records[0].outcome.final_state(), ContainerState::Failed);
    assert_eq!(summary.records[1].outcome.final_state(), ContainerState::Running);
    assert_eq!(summary.records[1].host_port(PortPurpose::Api), Some(3100));
    assert_eq!(summary.ended_by, SessionEnd::Declined);
    assert!(
        input
            .messages()
            .iter()
            .any(|m| m.contains("docker run --rm --name napcat_7"))
    );
    // No rollback of the started container
    assert!(host.state().containers.contains_key("napcat_7"));
}

#[smol_potat::test]
async fn test_bundle_written_with_fallback_interval() {
    let host = FakeHost::new();
    let mut input = script(vec![answers("42", "bot", "", "every minute", "", "")]);

    host.session(&mut input).run().await.unwrap();

    let dir = host.config_dir("42");
    for file in ["napcat.json", "napcat_42.json", "onebot11.json", "onebot11_42.json"] {
        assert!(has_file(&dir, file), "{file} missing");
    }
    let read = |name: &str| std::fs::read(dir.join(name)).unwrap();
    assert_eq!(read("napcat.json"), read("napcat_42.json"));
    assert_eq!(read("onebot11.json"), read("onebot11_42.json"));

    let client = &host.read_json("42", "onebot11_42.json")["network"]["websocketClients"][0];
    assert_eq!(client["name"], "bot");
    assert_eq!(client["url"], "ws://127.0.0.1:8080/onebot/v11/ws");
    assert_eq!(client["reconnectInterval"], 1200);
}

#[smol_potat::test]
async fn test_console_port_cannot_reuse_api_port() {
    let host = FakeHost::new();
    let mut script = answers("42", "", "", "", "7000", "7000");
    script.extend(["7001".to_string(), "n".to_string()]);
    let mut input = ScriptedInput::new(script);

    let summary = host.session(&mut input).run().await.unwrap();
    let record = &summary.records[0];
    assert_eq!(record.host_port(PortPurpose::Api), Some(7000));
    assert_eq!(record.host_port(PortPurpose::WebUi), Some(7001));
    assert!(
        input
            .messages()
            .iter()
            .any(|m| m.contains("already used by this account"))
    );
}

#[smol_potat::test]
async fn test_missing_socket_tool_is_fatal() {
    let host = FakeHost::new();
    host.state().tools.remove("ss");
    let mut input = script(vec![default_answers("1")]);

    let err = host.session(&mut input).run().await.unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(err, Error::MissingTool { ref tool, .. } if tool == "ss"));
    assert!(host.state().containers.is_empty());
}

#[smol_potat::test]
async fn test_missing_runtime_is_installed_once() {
    let host = FakeHost::new();
    host.state().tools.remove("docker");
    let mut input = script(vec![
        default_answers("1"),
        answers("2", "", "", "", "3100", "7100"),
    ]);

    let summary = host.session(&mut input).run().await.unwrap();

    assert_eq!(host.state().installs, 1);
    assert_eq!(summary.ended_by, SessionEnd::Declined);
    assert_eq!(summary.records.len(), 2);
    assert!(
        summary
            .records
            .iter()
            .all(|r| r.outcome.final_state() == ContainerState::Running)
    );
}

#[smol_potat::test]
async fn test_unidentified_host_is_fatal() {
    let mut host = FakeHost::new();
    host.settings.host.os_release = host.dir.path().join("missing-os-release");
    let mut input = script(vec![default_answers("1")]);

    let err = host.session(&mut input).run().await.unwrap_err();
    assert!(matches!(err, Error::HostUnidentified { .. }));
}

#[smol_potat::test]
async fn test_skipped_dependency_check_runs_no_probes() {
    let mut host = FakeHost::new();
    host.settings.host.os_release = host.dir.path().join("missing-os-release");
    let mut input = script(vec![default_answers("1")]);

    let summary = host
        .session(&mut input)
        .skip_dependency_check(true)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.records[0].outcome.final_state(), ContainerState::Running);
    assert!(!host.command_lines().iter().any(|l| l.starts_with("sh -c")));
}

#[smol_potat::test]
async fn test_closed_input_ends_session() {
    let host = FakeHost::new();
    let mut input = ScriptedInput::new(["5", "nonebot"]);

    let summary = host.session(&mut input).run().await.unwrap();

    assert_eq!(summary.ended_by, SessionEnd::InputClosed);
    assert!(summary.records.is_empty());
}

#[smol_potat::test]
async fn test_invalid_account_is_asked_again() {
    let host = FakeHost::new();
    let mut answers = default_answers("12");
    answers.insert(0, "12ab".to_string());
    let mut input = script(vec![answers]);

    let summary = host.session(&mut input).run().await.unwrap();

    assert_eq!(summary.records[0].container_name, "napcat_12");
    assert!(
        input
            .messages()
            .iter()
            .any(|m| m == "Account ids contain digits only.")
    );
}

/// Fails the first read as a terminal would on bytes that are not UTF-8
struct GarbledFirstLine {
    inner: ScriptedInput,
    garbled: bool,
}

impl InputProvider for GarbledFirstLine {
    fn read_line(&mut self, prompt: &str) -> gateway_provisioner::Result<Option<String>> {
        if !self.garbled {
            self.garbled = true;
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "stream did not contain valid UTF-8",
            )
            .into());
        }
        self.inner.read_line(prompt)
    }

    fn notify(&mut self, message: &str) {
        self.inner.notify(message)
    }
}

#[smol_potat::test]
async fn test_unreadable_account_id_is_asked_again() {
    let host = FakeHost::new();
    let mut input = GarbledFirstLine {
        inner: script(vec![default_answers("12")]),
        garbled: false,
    };

    let summary = host
        .session_with(&mut input, ExecutionContext::new(1000, 1000, false, false))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.records.len(), 1);
    assert_eq!(summary.records[0].container_name, "napcat_12");
    assert!(
        input
            .inner
            .messages()
            .iter()
            .any(|m| m.contains("could not be read"))
    );
}

#[smol_potat::test]
async fn test_sudo_prefixes_runtime_calls_only() {
    let host = FakeHost::new();
    let mut input = script(vec![default_answers("9")]);

    let summary = host
        .session_with(&mut input, ExecutionContext::new(1000, 1000, false, true))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.records[0].outcome.final_state(), ContainerState::Running);
    let lines = host.command_lines();
    assert!(lines.iter().any(|l| l.starts_with("sudo -E docker run -d")));
    assert!(lines.contains(&"ss -tuln".to_string()));
    assert!(!lines.iter().any(|l| l.starts_with("docker ")));
}

#[smol_potat::test]
async fn test_privileged_operator_runs_container_as_root() {
    let host = FakeHost::new();
    let mut input = script(vec![default_answers("9")]);

    host.session_with(&mut input, ExecutionContext::new(0, 0, true, false))
        .run()
        .await
        .unwrap();

    let run = host
        .command_lines()
        .into_iter()
        .find(|line| line.starts_with("docker run -d"))
        .unwrap();
    assert!(run.contains("-e NAPCAT_UID=0 -e NAPCAT_GID=0"));
}

#[smol_potat::test]
async fn test_summary_table_is_shown() {
    let host = FakeHost::new();
    let mut input = script(vec![default_answers("3")]);

    host.session(&mut input).run().await.unwrap();

    let table = input.messages().last().unwrap();
    assert!(table.contains("ACCOUNT"));
    assert!(table.contains("napcat_3"));
}

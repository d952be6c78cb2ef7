use assert_cmd::Command;
use httpmock::{Method::GET, MockServer};
use predicates::prelude::*;

const ENV_VARS: [&str; 6] = [
    "META_ACCESS_TOKEN",
    "META_API_URL",
    "META_API_VERSION",
    "META_HTTP_TIMEOUT_SECS",
    "META_USER_AGENT",
    "META_REQUIRED_PERMISSIONS",
];

fn cmd(envs: &[(&str, &str)]) -> anyhow::Result<Command> {
    let mut cmd = Command::cargo_bin("meta-ads-probe")?;
    for k in ENV_VARS {
        cmd.env_remove(k);
    }
    for (k, v) in envs {
        cmd.env(k, v);
    }
    cmd.arg("--log-level").arg("warn");
    Ok(cmd)
}

fn mock_happy_chain(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/me/permissions");
        then.status(200).json_body(serde_json::json!({"data": [
            {"permission": "ads_read", "status": "granted"},
            {"permission": "ads_management", "status": "granted"}
        ]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/me/adaccounts");
        then.status(200)
            .header("X-Business-Use-Case-Usage", r#"{"points": 42}"#)
            .header("X-FB-Debug-Cache", "1")
            .json_body(serde_json::json!({"data": [{"id": "act_123", "name": "A"}]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/act_123/campaigns");
        then.status(200).json_body(serde_json::json!({"data": []}));
    });
}

#[test]
fn missing_token_exits_non_zero_without_requests() -> anyhow::Result<()> {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.path_contains("/");
        then.status(200).body("{}");
    });
    cmd(&[("META_API_URL", server.base_url().as_str())])?
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("META_ACCESS_TOKEN"));
    assert_eq!(any.hits(), 0);
    Ok(())
}

#[test]
fn missing_permission_exits_non_zero_before_the_chain() -> anyhow::Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/me/permissions");
        then.status(200).json_body(serde_json::json!({"data": [
            {"permission": "ads_read", "status": "granted"}
        ]}));
    });
    let accounts = server.mock(|when, then| {
        when.method(GET).path("/me/adaccounts");
        then.status(200).json_body(serde_json::json!({"data": []}));
    });
    cmd(&[
        ("META_ACCESS_TOKEN", "t"),
        ("META_API_URL", server.base_url().as_str()),
    ])?
    .arg("--required-permissions")
    .arg("ads_read,ads_management")
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("ads_management"));
    assert_eq!(accounts.hits(), 0);
    Ok(())
}

#[test]
fn completed_run_exits_zero_and_prints_metrics() -> anyhow::Result<()> {
    let server = MockServer::start();
    mock_happy_chain(&server);
    cmd(&[
        ("META_ACCESS_TOKEN", "t"),
        ("META_API_URL", server.base_url().as_str()),
        ("META_REQUIRED_PERMISSIONS", "ads_read,ads_management"),
    ])?
    .assert()
    .success()
    .stdout(predicate::str::contains("=== GET /me/adaccounts ==="))
    .stdout(predicate::str::contains("Rate limit used: 42/9000"))
    .stdout(predicate::str::contains("Cache hit: yes"))
    .stdout(predicate::str::contains("Skipped: Campaign detail"));
    Ok(())
}

#[test]
fn json_format_emits_one_object_per_line() -> anyhow::Result<()> {
    let server = MockServer::start();
    mock_happy_chain(&server);
    let assert = cmd(&[
        ("META_ACCESS_TOKEN", "t"),
        ("META_API_URL", server.base_url().as_str()),
    ])?
    .arg("--format")
    .arg("json")
    .assert()
    .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(serde_json::from_str::<serde_json::Value>)
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(events[0]["event"], "start");
    let accounts = events
        .iter()
        .find(|e| e["path"] == "/me/adaccounts")
        .expect("accounts probe event");
    assert_eq!(accounts["metrics"]["rate_limit_points"], 42);
    assert_eq!(accounts["metrics"]["data_complete"], true);
    Ok(())
}

#[test]
fn version_flag_needs_no_token() -> anyhow::Result<()> {
    cmd(&[])?
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("meta-ads-probe "));
    Ok(())
}

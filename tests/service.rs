//! Integration tests for the provisioning facade.
//!
//! These tests drive a full request through validation, identifier
//! generation, workload rendering and launch, then poll status while the fake
//! runtime plays back a workload's output.

mod common;

use common::FakeRuntime;
use mailbox_provisioner::error::{Error, SandboxError, ValidationError};
use mailbox_provisioner::sandbox::ProvisionerConfig;
use mailbox_provisioner::{Phase, ProvisionRequest, Provisioner};

fn provisioner(runtime: &FakeRuntime) -> Provisioner<FakeRuntime> {
    Provisioner::new(runtime.clone(), ProvisionerConfig::default())
}

fn request() -> ProvisionRequest {
    ProvisionRequest::new("contoso.com", "Jane Doe", "Initial-Passw0rd").with_count(3)
}

// =============================================================================
// Create Tests
// =============================================================================

#[tokio::test]
async fn test_invalid_request_never_reaches_runtime() {
    let runtime = FakeRuntime::new();
    let provisioner = provisioner(&runtime);

    let mut bad = request();
    bad.sender_name = "Jane".to_string();

    let err = provisioner
        .create(&bad)
        .await
        .expect_err("single name should be rejected");
    assert!(matches!(
        err,
        Error::Validation(ValidationError::MissingNamePart { .. })
    ));
    assert!(runtime.launches().is_empty());
}

#[tokio::test]
async fn test_name_without_usable_identifiers_never_reaches_runtime() {
    let runtime = FakeRuntime::new();
    let provisioner = provisioner(&runtime);

    let err = provisioner
        .create(&ProvisionRequest::new("contoso.com", "李 王", "pw"))
        .await
        .expect_err("no mailbox names can be built");
    assert!(matches!(
        err,
        Error::Validation(ValidationError::NoUsableIdentifiers { .. })
    ));
    assert!(runtime.launches().is_empty());
}

#[tokio::test]
async fn test_count_above_configured_max_is_rejected() {
    let runtime = FakeRuntime::new();
    let provisioner = Provisioner::new(
        runtime.clone(),
        ProvisionerConfig::default().with_max_count(5),
    );

    let err = provisioner
        .create(&request().with_count(6))
        .await
        .expect_err("count above max");
    assert!(matches!(
        err,
        Error::Validation(ValidationError::CountOutOfRange { requested: 6, max: 5 })
    ));
    assert!(runtime.launches().is_empty());
}

#[tokio::test]
async fn test_create_launches_rendered_workload() {
    let runtime = FakeRuntime::new();
    let provisioner = provisioner(&runtime);

    let ticket = provisioner.create(&request()).await.expect("create");

    assert_eq!(ticket.phase, Phase::Starting);
    assert_eq!(ticket.auth_url, "https://microsoft.com/devicelogin");
    assert_eq!(
        ticket.addresses,
        vec![
            "jane.doe@contoso.com",
            "jane.doe1@contoso.com",
            "jane.doe2@contoso.com"
        ]
    );

    let spec = &runtime.launches()[0];
    assert_eq!(spec.name, ticket.sandbox_name);
    let script = spec.command.last().expect("workload argument");
    for address in &ticket.addresses {
        assert!(script.contains(&format!("'{address}'")), "{address} missing");
    }
    assert!(script.contains("'Initial-Passw0rd'"));
    assert!(script.contains("'Jane Doe'"));
}

#[tokio::test]
async fn test_create_passes_proxy_through() {
    let runtime = FakeRuntime::new();
    let provisioner = provisioner(&runtime);

    provisioner
        .create(&request().with_proxy("http://proxy.local:3128"))
        .await
        .expect("create");

    assert_eq!(
        runtime.launches()[0].env_var("HTTPS_PROXY"),
        Some("http://proxy.local:3128")
    );
}

// =============================================================================
// Status Tests
// =============================================================================

#[tokio::test]
async fn test_status_follows_workflow() {
    let runtime = FakeRuntime::new();
    let provisioner = provisioner(&runtime);
    let name = provisioner
        .create(&request())
        .await
        .expect("create")
        .sandbox_name;

    let report = provisioner.status(&name).await.expect("status");
    assert_eq!(report.phase, Phase::Starting);
    assert!(report.running);
    assert_eq!(report.auth_code, None);

    runtime.append_output(
        &name,
        "To sign in, use a web browser to open the page https://microsoft.com/devicelogin \
         and enter the code HX7Q2LMNP to authenticate.\nAUTH_CODE: HX7Q2LMNP\n",
    );
    let report = provisioner.status(&name).await.expect("status");
    assert_eq!(report.phase, Phase::WaitingForAuth);
    assert_eq!(report.auth_code.as_deref(), Some("HX7Q2LMNP"));

    runtime.append_output(
        &name,
        "AUTH_SUCCESS: Authentication completed successfully\n\
         SUCCESS: Created mailbox jane.doe@contoso.com\n",
    );
    let report = provisioner.status(&name).await.expect("status");
    assert_eq!(report.phase, Phase::CreatingMailboxes);
    assert_eq!(report.succeeded, vec!["jane.doe@contoso.com"]);

    runtime.append_output(
        &name,
        "SUCCESS: Created mailbox jane.doe1@contoso.com\n\
         FAILED: Could not create jane.doe2@contoso.com - The proxy address is already being used\n\
         \n=== MAILBOX CREATION COMPLETED ===\n",
    );
    runtime.set_running(&name, false);
    let report = provisioner.status(&name).await.expect("status");
    assert_eq!(report.phase, Phase::Completed);
    assert!(!report.running);
    assert_eq!(
        report.succeeded,
        vec!["jane.doe@contoso.com", "jane.doe1@contoso.com"]
    );
    assert_eq!(report.failed, vec!["jane.doe2@contoso.com"]);
    assert_eq!(report.auth_code.as_deref(), Some("HX7Q2LMNP"));
    assert!(report.logs.ends_with("=== MAILBOX CREATION COMPLETED ===\n"));
}

#[tokio::test]
async fn test_status_is_idempotent() {
    let runtime = FakeRuntime::new();
    let provisioner = provisioner(&runtime);
    runtime.insert(
        "mailbox-creator-x",
        "AUTH_CODE: ABC12345\nERROR: something odd\n",
        true,
    );

    let first = provisioner.status("mailbox-creator-x").await.expect("status");
    let second = provisioner.status("mailbox-creator-x").await.expect("status");
    assert_eq!(first, second);
    assert!(runtime.exists("mailbox-creator-x"), "polling has no side effects");
}

#[tokio::test]
async fn test_status_of_dead_sandbox_without_output() {
    let runtime = FakeRuntime::new();
    let provisioner = provisioner(&runtime);
    runtime.insert("mailbox-creator-dead", "", false);

    let report = provisioner
        .status("mailbox-creator-dead")
        .await
        .expect("status");
    assert_eq!(report.phase, Phase::Failed);
    assert!(report.succeeded.is_empty());
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn test_status_auth_timeout() {
    let runtime = FakeRuntime::new();
    let provisioner = provisioner(&runtime);
    runtime.insert(
        "mailbox-creator-late",
        "AUTH_CODE: ABC12345\nAUTH_TIMEOUT: Authentication not completed within 15 minutes\n",
        false,
    );

    let report = provisioner
        .status("mailbox-creator-late")
        .await
        .expect("status");
    assert_eq!(report.phase, Phase::AuthTimeout);
    assert_eq!(report.auth_code.as_deref(), Some("ABC12345"));
}

#[tokio::test]
async fn test_status_unknown_sandbox() {
    let runtime = FakeRuntime::new();
    let provisioner = provisioner(&runtime);

    assert!(matches!(
        provisioner.status("mailbox-creator-ghost").await,
        Err(Error::Sandbox(SandboxError::NotFound { .. }))
    ));
}

// =============================================================================
// Remove / List Tests
// =============================================================================

#[tokio::test]
async fn test_remove_then_list() {
    let runtime = FakeRuntime::new();
    let provisioner = provisioner(&runtime);
    let a = provisioner.create(&request()).await.expect("create a");
    let b = provisioner.create(&request()).await.expect("create b");

    let listed = provisioner.list().await.expect("list");
    assert_eq!(listed.len(), 2);

    provisioner.remove(&a.sandbox_name).await.expect("remove a");

    let listed = provisioner.list().await.expect("list");
    let names: Vec<&str> = listed.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec![b.sandbox_name.as_str()]);

    assert!(matches!(
        provisioner.remove(&a.sandbox_name).await,
        Err(Error::Sandbox(SandboxError::NotFound { .. }))
    ));
}

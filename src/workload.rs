//! Rendering of the in-sandbox PowerShell workload.
//!
//! The workload connects to Exchange Online with the device-code flow, relays
//! the code through an `AUTH_CODE:` line, waits for the operator to finish the
//! sign-in and then creates one shared mailbox per identifier. Everything the
//! status parser relies on is printed from here; see [`crate::status::markers`].
//!
//! Every caller-supplied value is embedded as a single-quoted PowerShell
//! literal built by [`quote`], so no value can terminate its string or expand
//! variables and subexpressions.

use std::fmt::Write;

use crate::status::markers;

/// Minutes the workload waits for the operator to finish device-code sign-in.
pub const AUTH_WINDOW_MINUTES: u32 = 15;

/// Everything needed to render one workload.
#[derive(Debug, Clone)]
pub struct WorkloadDescriptor {
    /// Mail domain the mailboxes are created in.
    pub realm: String,
    /// Display name shared by every mailbox.
    pub display_name: String,
    /// Local parts, one mailbox each.
    pub identifiers: Vec<String>,
    /// Initial mailbox password.
    pub credential: String,
}

impl WorkloadDescriptor {
    /// Full addresses in identifier order.
    #[must_use]
    pub fn addresses(&self) -> Vec<String> {
        self.identifiers
            .iter()
            .map(|id| format!("{id}@{}", self.realm))
            .collect()
    }
}

/// Quotes a value as a PowerShell single-quoted string literal.
///
/// PowerShell treats the typographic quotes U+2018..U+201B as single quotes
/// too, so each of them is doubled along with the ASCII apostrophe.
#[must_use]
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if matches!(c, '\'' | '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}') {
            out.push(c);
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Renders the workload script for the given descriptor.
#[must_use]
pub fn render(descriptor: &WorkloadDescriptor) -> String {
    let mut mailboxes = String::new();
    for (identifier, address) in descriptor.identifiers.iter().zip(descriptor.addresses()) {
        // Writing into a String cannot fail.
        let _ = writeln!(
            mailboxes,
            "    @{{ Name = {}; Address = {} }}",
            quote(identifier),
            quote(&address)
        );
    }

    let realm = quote(&descriptor.realm);
    let display_name = quote(&descriptor.display_name);
    let credential = quote(&descriptor.credential);
    let mailbox_count = descriptor.identifiers.len().to_string();
    let auth_window = AUTH_WINDOW_MINUTES.to_string();

    fill(TEMPLATE, |key| {
        let value = match key {
            "REALM" => realm.as_str(),
            "DISPLAY_NAME" => display_name.as_str(),
            "CREDENTIAL" => credential.as_str(),
            "MAILBOX_COUNT" => mailbox_count.as_str(),
            "AUTH_WINDOW_MINUTES" => auth_window.as_str(),
            "MAILBOXES" => mailboxes.trim_end(),
            "AUTH_CODE" => markers::AUTH_CODE,
            "AUTH_SUCCESS" => markers::AUTH_SUCCESS,
            "AUTH_TIMEOUT" => markers::AUTH_TIMEOUT,
            "ERROR" => markers::ERROR,
            "CREATED" => markers::CREATED,
            "NOT_CREATED" => markers::NOT_CREATED,
            "FINISHED" => markers::FINISHED_BANNER,
            _ => return None,
        };
        Some(value)
    })
}

/// Substitutes `{{KEY}}` placeholders in a single left-to-right pass.
///
/// Substituted text is never rescanned, so a value containing `{{...}}` stays
/// literal. Unknown keys are left in place.
fn fill<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match lookup(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Workload template. Placeholders are `{{NAME}}`; values are substituted
/// already quoted, marker placeholders are substituted verbatim.
const TEMPLATE: &str = r#"$ErrorActionPreference = 'Stop'
$ProgressPreference = 'SilentlyContinue'

$Realm = {{REALM}}
$DisplayName = {{DISPLAY_NAME}}
$Credential = ConvertTo-SecureString {{CREDENTIAL}} -AsPlainText -Force
$Mailboxes = @(
{{MAILBOXES}}
)

Write-Host "=== STARTING MAILBOX CREATION FOR $Realm ==="
Write-Host "Sandbox: $env:HOSTNAME"
Write-Host "Timestamp: $(Get-Date -Format o)"

try {
    if (-not (Get-Module -ListAvailable -Name ExchangeOnlineManagement)) {
        Write-Host 'Installing ExchangeOnlineManagement module...'
        Install-Module -Name ExchangeOnlineManagement -Force -AllowClobber -Scope CurrentUser
    }
    Import-Module ExchangeOnlineManagement -Force
} catch {
    Write-Host "{{ERROR}} Failed to load ExchangeOnlineManagement: $_"
    exit 1
}

Write-Host "Connecting to Exchange Online for $Realm"
$authStarted = Get-Date
$codeReported = $false
try {
    Connect-ExchangeOnline -Device -ShowBanner:$true *>&1 | ForEach-Object {
        $line = "$_"
        Write-Host $line
        if (-not $codeReported -and $line -match 'enter the code ([A-Z0-9]{6,12}) to authenticate') {
            Write-Host "{{AUTH_CODE}} $($Matches[1])"
            $codeReported = $true
        }
    }
} catch {
    if (((Get-Date) - $authStarted).TotalMinutes -ge {{AUTH_WINDOW_MINUTES}} -or "$_" -match 'expired|timed? ?out|AADSTS70020') {
        Write-Host "{{AUTH_TIMEOUT}} Authentication not completed within {{AUTH_WINDOW_MINUTES}} minutes"
    } else {
        Write-Host "{{ERROR}} Failed to connect to Exchange Online: $_"
    }
    exit 1
}

try {
    $null = Get-Mailbox -ResultSize 1
    Write-Host "{{AUTH_SUCCESS}} Authentication completed successfully"
} catch {
    Write-Host "{{ERROR}} Connected session cannot query mailboxes: $_"
    exit 1
}

Write-Host ''
Write-Host '=== CREATING MAILBOXES ==='
Write-Host "Creating {{MAILBOX_COUNT}} mailboxes for $Realm"

foreach ($mailbox in $Mailboxes) {
    try {
        $null = New-Mailbox -Shared -Name $mailbox.Name -DisplayName $DisplayName -PrimarySmtpAddress $mailbox.Address -Password $Credential -ResetPasswordOnNextLogon $false
        Write-Host "{{CREATED}} $($mailbox.Address)"
    } catch {
        Write-Host "{{NOT_CREATED}} $($mailbox.Address) - $_"
    }
}

Write-Host ''
Write-Host '{{FINISHED}}'
Disconnect-ExchangeOnline -Confirm:$false -ErrorAction SilentlyContinue
"#;

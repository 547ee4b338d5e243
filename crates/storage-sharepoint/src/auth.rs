//! Credential exchange with the Microsoft login services.
//!
//! App principals go through the Azure ACS client-credentials grant and end
//! up with a bearer token. User accounts go through the legacy STS SAML
//! exchange: a security token is requested from `extSTS.srf`, redeemed at
//! the tenant's sign-in page, and the resulting `rtFa`/`FedAuth` cookies
//! become the session. Tokens are never refreshed; a session lives as long
//! as its storage instance.

use reqwest::{header, Client, RequestBuilder};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

use storage_core::StorageError;

use crate::config::SharePointConfig;

/// Well-known principal id of the SharePoint Online service.
const SHAREPOINT_PRINCIPAL: &str = "00000003-0000-0ff1-ce00-000000000000";

const STS_ENVELOPE: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"
      xmlns:a="http://www.w3.org/2005/08/addressing"
      xmlns:u="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd">
  <s:Header>
    <a:Action s:mustUnderstand="1">http://schemas.xmlsoap.org/ws/2005/02/trust/RST/Issue</a:Action>
    <a:ReplyTo>
      <a:Address>http://www.w3.org/2005/08/addressing/anonymous</a:Address>
    </a:ReplyTo>
    <a:To s:mustUnderstand="1">https://login.microsoftonline.com/extSTS.srf</a:To>
    <o:Security s:mustUnderstand="1" xmlns:o="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd">
      <o:UsernameToken>
        <o:Username>{username}</o:Username>
        <o:Password>{password}</o:Password>
      </o:UsernameToken>
    </o:Security>
  </s:Header>
  <s:Body>
    <t:RequestSecurityToken xmlns:t="http://schemas.xmlsoap.org/ws/2005/02/trust">
      <wsp:AppliesTo xmlns:wsp="http://schemas.xmlsoap.org/ws/2004/09/policy">
        <a:EndpointReference>
          <a:Address>{endpoint}</a:Address>
        </a:EndpointReference>
      </wsp:AppliesTo>
      <t:KeyType>http://schemas.xmlsoap.org/ws/2005/05/identity/NoProofKey</t:KeyType>
      <t:RequestType>http://schemas.xmlsoap.org/ws/2005/02/trust/Issue</t:RequestType>
      <t:TokenType>urn:oasis:names:tc:SAML:1.0:assertion</t:TokenType>
    </t:RequestSecurityToken>
  </s:Body>
</s:Envelope>"#;

/// Which credential pair the configuration selected.
#[derive(Debug, Clone)]
pub(crate) enum Credentials {
    Client { id: String, secret: String },
    User { username: String, password: String },
}

/// Auth material attached to every request.
#[derive(Debug)]
enum AuthToken {
    Bearer(String),
    Cookies(String),
}

/// One authenticated connection to the site.
///
/// Holds the auth material plus a lazily-fetched form digest that
/// cookie-mode write requests must carry.
#[derive(Debug)]
pub(crate) struct Session {
    auth: AuthToken,
    pub(crate) form_digest: OnceCell<String>,
}

impl Session {
    /// Performs the credential exchange selected by the configuration.
    pub(crate) async fn acquire(
        http: &Client,
        config: &SharePointConfig,
    ) -> Result<Self, StorageError> {
        let auth = match config.credentials()? {
            Credentials::Client { id, secret } => {
                acquire_app_token(http, config, &id, &secret).await?
            }
            Credentials::User { username, password } => {
                acquire_user_cookies(http, config, &username, &password).await?
            }
        };
        Ok(Self {
            auth,
            form_digest: OnceCell::new(),
        })
    }

    /// Attaches the session's auth material to a request.
    pub(crate) fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            AuthToken::Bearer(token) => req.bearer_auth(token),
            AuthToken::Cookies(cookies) => req.header(header::COOKIE, cookies),
        }
    }

    /// Cookie sessions must send `X-RequestDigest` on write requests.
    pub(crate) fn needs_digest(&self) -> bool {
        matches!(self.auth, AuthToken::Cookies(_))
    }
}

async fn acquire_app_token(
    http: &Client,
    config: &SharePointConfig,
    id: &str,
    secret: &str,
) -> Result<AuthToken, StorageError> {
    #[derive(Deserialize)]
    struct TokenResponse {
        access_token: String,
    }

    let url = format!("{}/{}/tokens/OAuth/2", config.login_url(), config.tenant_id);
    let resource = format!(
        "{SHAREPOINT_PRINCIPAL}/{}.sharepoint.com@{}",
        config.tenant, config.tenant_id
    );
    let form = [
        ("grant_type", "client_credentials".to_string()),
        ("client_id", format!("{id}@{}", config.tenant_id)),
        ("client_secret", secret.to_string()),
        ("resource", resource),
    ];

    debug!("requesting app-only access token");
    let resp = http
        .post(&url)
        .form(&form)
        .send()
        .await
        .map_err(|e| StorageError::Auth(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        let detail = resp.text().await.unwrap_or_default();
        return Err(StorageError::Auth(format!(
            "token endpoint returned HTTP {status}: {detail}"
        )));
    }
    let token: TokenResponse = resp
        .json()
        .await
        .map_err(|e| StorageError::Auth(e.to_string()))?;
    Ok(AuthToken::Bearer(token.access_token))
}

async fn acquire_user_cookies(
    http: &Client,
    config: &SharePointConfig,
    username: &str,
    password: &str,
) -> Result<AuthToken, StorageError> {
    let sts_url = format!("{}/extSTS.srf", config.login_url());
    let envelope = STS_ENVELOPE
        .replace("{username}", &xml_escape(username))
        .replace("{password}", &xml_escape(password))
        .replace("{endpoint}", &config.sharepoint_url());

    debug!("requesting security token for user sign-in");
    let resp = http
        .post(&sts_url)
        .header(header::CONTENT_TYPE, "application/soap+xml; charset=utf-8")
        .body(envelope)
        .send()
        .await
        .map_err(|e| StorageError::Auth(e.to_string()))?;
    let body = resp
        .text()
        .await
        .map_err(|e| StorageError::Auth(e.to_string()))?;

    let token = match tag_text(&body, "BinarySecurityToken") {
        Some(token) => token.to_string(),
        None => {
            let reason = tag_text(&body, "psf:text").unwrap_or("no security token in response");
            return Err(StorageError::Auth(format!(
                "security token request rejected: {}",
                reason.trim()
            )));
        }
    };

    // Redeeming the token answers with a redirect carrying the session
    // cookies; redirects are disabled on the client so they are not lost.
    let signin_url = format!("{}/_forms/default.aspx?wa=wsignin1.0", config.sharepoint_url());
    debug!("redeeming security token for session cookies");
    let resp = http
        .post(&signin_url)
        .body(token)
        .send()
        .await
        .map_err(|e| StorageError::Auth(e.to_string()))?;

    let mut rtfa = None;
    let mut fedauth = None;
    for value in resp.headers().get_all(header::SET_COOKIE) {
        let Ok(text) = value.to_str() else { continue };
        let cookie = match text.split_once(';') {
            Some((first, _)) => first,
            None => text,
        };
        if cookie.starts_with("rtFa=") {
            rtfa = Some(cookie.to_string());
        } else if cookie.starts_with("FedAuth=") {
            fedauth = Some(cookie.to_string());
        }
    }
    match (rtfa, fedauth) {
        (Some(rtfa), Some(fedauth)) => Ok(AuthToken::Cookies(format!("{rtfa}; {fedauth}"))),
        _ => Err(StorageError::Auth(
            "sign-in response did not set session cookies".to_string(),
        )),
    }
}

/// Text content of the first element whose tag matches `tag`.
fn tag_text<'a>(body: &'a str, tag: &str) -> Option<&'a str> {
    let at = body.find(tag)?;
    let rest = &body[at..];
    let open = rest.find('>')?;
    let rest = &rest[open + 1..];
    let close = rest.find('<')?;
    let text = &rest[..close];
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

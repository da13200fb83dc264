//! Interactive Engage login via a local WebDriver session.
//!
//! The CAS flow (username/password form, then the Duo prompt the user
//! approves on their phone) runs in a real browser driven over the WebDriver
//! REST protocol; only the resulting cookies are taken out of the session.

use anyhow::{Context, bail};
use loopsync_core::CookieJar;
use reqwest::Method;
use serde_json::{Value, json};
use std::time::{Duration, Instant};

const LOGIN_URL: &str = "https://gatech.campuslabs.com/engage/account/login?returnUrl=/engage/";
const LOGGED_IN_TITLE: &str = "Explore - Georgia Institute of Technology";

/// W3C WebDriver element identifier key in find-element replies.
const ELEMENT_REF_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const LOGIN_FORM_TIMEOUT: Duration = Duration::from_secs(10);
/// Duo approval happens out-of-band; give it longer.
const DUO_TIMEOUT: Duration = Duration::from_secs(20);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Log in to Engage through CAS and return the session cookie jar.
#[tracing::instrument(level = "info", skip(password))]
pub async fn log_in_to_engage(
    webdriver_url: &str,
    username: &str,
    password: &str,
) -> anyhow::Result<CookieJar> {
    tracing::info!("starting engage authentication");
    let session = WebDriverSession::start(webdriver_url).await?;

    session.navigate(LOGIN_URL).await?;

    let username_field = session.wait_for_element("#username", LOGIN_FORM_TIMEOUT).await?;
    let password_field = session.wait_for_element("#password", LOGIN_FORM_TIMEOUT).await?;
    let submit = session
        .wait_for_element("[name=submitbutton]", LOGIN_FORM_TIMEOUT)
        .await?;

    session.send_keys(&username_field, username).await?;
    session.send_keys(&password_field, password).await?;
    tracing::info!("submitting login form");
    session.click(&submit).await?;

    tracing::info!("waiting for authentication to complete");
    session.wait_for_title(LOGGED_IN_TITLE, DUO_TIMEOUT).await?;

    let cookies = session.cookies().await?;
    if cookies.is_empty() {
        bail!("engage login produced no cookies");
    }
    session.close().await?;

    Ok(cookies)
}

/// Minimal W3C WebDriver client: just the commands the login flow needs.
struct WebDriverSession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl WebDriverSession {
    async fn start(webdriver_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::new();
        let base_url = webdriver_url.trim_end_matches('/').to_string();

        let body = json!({"capabilities": {"alwaysMatch": {"browserName": "chrome"}}});
        let resp = client
            .post(format!("{base_url}/session"))
            .json(&body)
            .send()
            .await
            .context("connect to webdriver")?;
        if !resp.status().is_success() {
            bail!(
                "webdriver session creation failed: {}: {}",
                resp.status(),
                resp.text().await.unwrap_or_default()
            );
        }
        let reply: Value = resp.json().await.context("decode webdriver session reply")?;
        let session_id = reply
            .pointer("/value/sessionId")
            .and_then(Value::as_str)
            .context("webdriver session reply missing sessionId")?
            .to_string();

        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    /// Issue a command and return the unwrapped `value` field.
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> anyhow::Result<Value> {
        let mut req = self.client.request(method, self.url(path));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.context("webdriver request")?;
        let status = resp.status();
        if !status.is_success() {
            bail!(
                "webdriver command {path} failed: {status}: {}",
                resp.text().await.unwrap_or_default()
            );
        }
        let reply: Value = resp.json().await.context("decode webdriver reply")?;
        Ok(reply.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn navigate(&self, url: &str) -> anyhow::Result<()> {
        self.command(Method::POST, "/url", Some(json!({"url": url})))
            .await?;
        Ok(())
    }

    async fn title(&self) -> anyhow::Result<String> {
        let value = self.command(Method::GET, "/title", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Find by CSS selector; `None` while the element is not present yet.
    async fn find_element(&self, css: &str) -> anyhow::Result<Option<String>> {
        let body = json!({"using": "css selector", "value": css});
        let resp = self
            .client
            .post(self.url("/element"))
            .json(&body)
            .send()
            .await
            .context("webdriver find element")?;
        // "no such element" comes back as 404.
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = resp.status();
        if !status.is_success() {
            bail!(
                "webdriver find element failed: {status}: {}",
                resp.text().await.unwrap_or_default()
            );
        }
        let reply: Value = resp.json().await.context("decode find element reply")?;
        Ok(element_ref(&reply))
    }

    async fn wait_for_element(&self, css: &str, timeout: Duration) -> anyhow::Result<String> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.find_element(css).await? {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                bail!("timed out waiting for element {css}");
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_title(&self, expected: &str, timeout: Duration) -> anyhow::Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.title().await? == expected {
                return Ok(());
            }
            if Instant::now() >= deadline {
                bail!("timed out waiting for page title {expected:?}");
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn send_keys(&self, element: &str, text: &str) -> anyhow::Result<()> {
        self.command(
            Method::POST,
            &format!("/element/{element}/value"),
            Some(json!({"text": text})),
        )
        .await?;
        Ok(())
    }

    async fn click(&self, element: &str) -> anyhow::Result<()> {
        self.command(Method::POST, &format!("/element/{element}/click"), Some(json!({})))
            .await?;
        Ok(())
    }

    async fn cookies(&self) -> anyhow::Result<CookieJar> {
        let value = self.command(Method::GET, "/cookie", None).await?;
        Ok(jar_from_cookies(&value))
    }

    async fn close(self) -> anyhow::Result<()> {
        self.command(Method::DELETE, "", None).await?;
        Ok(())
    }
}

fn element_ref(reply: &Value) -> Option<String> {
    reply
        .pointer(&format!("/value/{ELEMENT_REF_KEY}"))
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

fn jar_from_cookies(value: &Value) -> CookieJar {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|cookie| {
            let name = cookie.get("name")?.as_str()?;
            let value = cookie.get("value")?.as_str()?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_element_ref_from_reply() {
        let reply = json!({
            "value": {"element-6066-11e4-a52e-4f735466cecf": "node-1"}
        });
        assert_eq!(element_ref(&reply).as_deref(), Some("node-1"));
        assert_eq!(element_ref(&json!({"value": null})), None);
    }

    #[test]
    fn builds_jar_from_cookie_reply() {
        let value = json!([
            {"name": "session", "value": "abc", "domain": ".campuslabs.com"},
            {"name": "csrf", "value": "xyz"},
            {"name": "broken"}
        ]);
        let jar = jar_from_cookies(&value);
        assert_eq!(jar.header_value(), "csrf=xyz; session=abc");
    }

    #[test]
    fn non_array_cookie_reply_yields_empty_jar() {
        assert!(jar_from_cookies(&Value::Null).is_empty());
    }
}

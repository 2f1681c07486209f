//! Identity-provider HTTP login exchange.
//!
//! Three calls against the single-sign-on service: fetch the login page,
//! post credentials, post the one-time code. The OTP response is not
//! followed (its redirect is the success signal); the final redirect target
//! is then fetched once to complete the provider's session handshake.

pub mod forms;

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{Client, header, redirect};
use secrecy::ExposeSecret;
use url::Url;

use crate::error::LoginError;
use crate::identity::{Credential, Identity};

/// DOM id of the credentials form on the provider's login page.
pub const LOGIN_FORM_ID: &str = "kc-form-login";

/// DOM id of the one-time-code form.
pub const OTP_FORM_ID: &str = "kc-otp-login-form";

/// One authentication exchange against the identity provider.
///
/// Both clients share a fresh cookie jar so the provider session survives
/// across the calls; `no_redirect` exists solely for the OTP step, where the
/// redirect itself must be observed instead of followed.
pub struct SsoClient {
    base: Url,
    http: Client,
    no_redirect: Client,
}

impl SsoClient {
    /// Build a client pair with a fresh cookie jar and bounded timeouts.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LoginError> {
        let base = Url::parse(base_url)?;
        let jar = Arc::new(Jar::default());

        let http = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .build()?;
        let no_redirect = Client::builder()
            .cookie_provider(jar)
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base,
            http,
            no_redirect,
        })
    }

    /// Run the credentials + OTP exchange starting from `auth_url`.
    ///
    /// On success the provider has accepted both factors and its completion
    /// redirect has been fetched; the CA tool polling the session can now
    /// finish on its own.
    pub async fn authenticate(
        &self,
        auth_url: &str,
        identity: &Identity,
        credential: &Credential,
    ) -> Result<(), LoginError> {
        let html = self.http.get(auth_url).send().await?.text().await?;
        let action = forms::form_action(&html, LOGIN_FORM_ID, &self.base)
            .ok_or(LoginError::FormNotFound)?;

        tracing::debug!("Submitting credentials to login form");
        let html = self
            .http
            .post(action)
            .form(&[
                ("username", identity.email.as_str()),
                ("password", credential.password.expose_secret()),
                ("login", "Sign In"),
            ])
            .send()
            .await?
            .text()
            .await?;

        let action = forms::form_action(&html, OTP_FORM_ID, &self.base)
            .ok_or(LoginError::OtpFormNotFound)?;

        tracing::debug!("Submitting one-time code");
        let response = self
            .no_redirect
            .post(action)
            .form(&[("otp", credential.otp.expose_secret())])
            .send()
            .await?;

        let target = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(LoginError::OtpFailed)?;

        tracing::debug!("OTP accepted, completing session handshake");
        let target = self.base.join(&target)?;
        self.http.get(target).send().await?;

        Ok(())
    }
}

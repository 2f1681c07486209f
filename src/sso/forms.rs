//! Form-action extraction from identity-provider HTML.
//!
//! The provider's login pages are scraped with a narrow pattern rather than
//! a full HTML parser. Both form lookups of the flow (credentials, OTP) go
//! through [`form_action`], which also owns entity unescaping and
//! relative-URL resolution.

use regex::Regex;
use url::Url;

/// Find the submission URL of the form with DOM id `form_id`.
///
/// The action attribute has entity-encoded ampersands unescaped and, when
/// relative, is resolved against `base`. Returns `None` when the form or
/// its action is absent, or the action does not resolve to a URL.
pub fn form_action(html: &str, form_id: &str, base: &Url) -> Option<Url> {
    let pattern = format!(r#"(?s)id="{}".*?action="([^"]+)""#, regex::escape(form_id));
    let re = Regex::new(&pattern).ok()?;
    let action = re.captures(html)?.get(1)?.as_str().replace("&amp;", "&");
    base.join(&action).ok()
}

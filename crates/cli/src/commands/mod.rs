//! Command implementations.

mod run;
mod validate;

pub use run::run_pipeline;
pub use validate::run_validate;

/// URL with the password masked, for logs and summaries
pub(crate) fn redact_url(url: &url::Url) -> String {
    let mut redacted = url.clone();
    if redacted.password().is_some() {
        let _ = redacted.set_password(Some("***"));
    }
    redacted.to_string()
}

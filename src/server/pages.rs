use axum::response::Html;
use handlebars::Handlebars;
use serde::Serialize;

use crate::error::Error;
use crate::types::Repository;

const LANDING: &str = "landing";
const DASHBOARD: &str = "dashboard";

#[derive(Serialize)]
struct LandingContext<'a> {
    login_url: &'a str,
    error: Option<&'static str>,
}

#[derive(Serialize)]
struct DashboardContext<'a> {
    username: &'a str,
    avatar_url: Option<&'a str>,
    repos: &'a [Repository],
    notice: Option<&'a str>,
}

/// Human-readable text for a `/?error=` code from the login flow.
fn login_error_text(code: &str) -> &'static str {
    match code {
        "access_denied" => "Sign-in was cancelled on GitHub.",
        "state_mismatch" | "missing_verifier" => "Your sign-in attempt expired. Please try again.",
        "oauth_not_configured" => "GitHub sign-in is not configured on this server.",
        "token_exchange_failed" | "userinfo_failed" => {
            "GitHub sign-in failed. Please try again."
        }
        _ => "Sign-in failed. Please try again.",
    }
}

/// HTML pages, rendered with HTML escaping on.
pub(crate) struct Pages {
    registry: Handlebars<'static>,
}

impl Pages {
    pub(crate) fn new() -> Result<Self, Error> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry
            .register_template_string(LANDING, include_str!("../../templates/landing.hbs"))
            .map_err(|e| Error::Config(format!("landing template: {e}")))?;
        registry
            .register_template_string(DASHBOARD, include_str!("../../templates/dashboard.hbs"))
            .map_err(|e| Error::Config(format!("dashboard template: {e}")))?;
        Ok(Self { registry })
    }

    fn render<T: Serialize>(&self, name: &str, ctx: &T) -> Result<Html<String>, Error> {
        self.registry
            .render(name, ctx)
            .map(Html)
            .map_err(|e| Error::Config(format!("rendering '{name}' failed: {e}")))
    }

    pub(crate) fn landing(&self, login_url: &str, error: Option<&str>) -> Result<Html<String>, Error> {
        self.render(
            LANDING,
            &LandingContext {
                login_url,
                error: error.map(login_error_text),
            },
        )
    }

    pub(crate) fn dashboard(
        &self,
        username: &str,
        avatar_url: Option<&str>,
        repos: &[Repository],
        notice: Option<&str>,
    ) -> Result<Html<String>, Error> {
        self.render(
            DASHBOARD,
            &DashboardContext {
                username,
                avatar_url,
                repos,
                notice,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(json: serde_json::Value) -> Repository {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn landing_links_to_login() {
        let html = Pages::new().unwrap().landing("/login", None).unwrap().0;
        assert!(html.contains("href=\"/login\""));
        assert!(!html.contains("class=\"error\""));
    }

    #[test]
    fn landing_shows_known_error_text_only() {
        let pages = Pages::new().unwrap();
        let html = pages.landing("/login", Some("state_mismatch")).unwrap().0;
        assert!(html.contains("Your sign-in attempt expired"));

        let html = pages.landing("/login", Some("<script>")).unwrap().0;
        assert!(!html.contains("<script>"));
        assert!(html.contains("Sign-in failed"));
    }

    #[test]
    fn dashboard_escapes_repository_fields() {
        let repos = [repo(serde_json::json!({
            "name": "demo",
            "full_name": "octocat/demo",
            "owner": {"login": "octocat"},
            "html_url": "https://github.com/octocat/demo",
            "description": "<b>bold</b>"
        }))];
        let html = Pages::new()
            .unwrap()
            .dashboard("octocat", None, &repos, None)
            .unwrap()
            .0;
        assert!(html.contains("octocat/demo"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(html.contains("/set_repo/octocat/demo"));
    }

    #[test]
    fn dashboard_renders_notice_and_empty_list() {
        let html = Pages::new()
            .unwrap()
            .dashboard("Guest", None, &[], Some("Could not load repositories."))
            .unwrap()
            .0;
        assert!(html.contains("Could not load repositories."));
        assert!(html.contains("No repositories"));
    }
}

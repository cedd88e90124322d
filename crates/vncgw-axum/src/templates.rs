//! HTML pages served by the front end.
//!
//! Both pages are small enough to keep as string templates with `{{NAME}}`
//! placeholders. The viewer template can be overridden by dropping a
//! `viewer.html` into the assets directory.

use std::path::Path;

use tracing::{debug, info};
use vncgw_core::{ClientId, GatewayError, ViewerContext, ViewerPage};

/// File name of an optional viewer template override in the assets directory.
pub const VIEWER_TEMPLATE_FILE: &str = "viewer.html";

const REDIRECT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Connecting</title>
</head>
<body>
<script>
(function () {
  var w = window.innerWidth || document.documentElement.clientWidth;
  var h = window.innerHeight || document.documentElement.clientHeight;
  window.location.replace("/{{ID}}_" + Math.floor(w) + "_" + Math.floor(h));
})();
</script>
<noscript>This page needs JavaScript to measure the browser window.</noscript>
</body>
</html>
"#;

const DEFAULT_VIEWER_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1, maximum-scale=1, user-scalable=no">
<title>{{TITLE}}</title>
<link rel="icon" href="/favicon.ico">
<style>
  html, body { margin: 0; padding: 0; height: 100%; overflow: hidden; background: #000; }
  #screen { width: 100%; height: 100%; }
  #status { position: fixed; top: 0; left: 0; right: 0; padding: 4px 8px;
            font: 13px sans-serif; color: #fff; background: rgba(0, 0, 0, 0.6); display: none; }
</style>
</head>
<body>
<div id="status"></div>
<div id="screen"></div>
<script type="module">
import RFB from "/core/rfb.js";

const status = document.getElementById("status");
const scheme = window.location.protocol === "https:" ? "wss" : "ws";
const url = scheme + "://" + window.location.hostname + ":{{PORT}}/websockify";

const rfb = new RFB(document.getElementById("screen"), url);
rfb.qualityLevel = {{QUALITY}};
rfb.scaleViewport = false;
rfb.resizeSession = false;

rfb.addEventListener("credentialsrequired", () => {
  if ({{PASSWORD_REQUIRED}}) {
    rfb.sendCredentials({ password: window.prompt("Password for {{TITLE}}") || "" });
  }
});
rfb.addEventListener("disconnect", (e) => {
  status.textContent = e.detail.clean ? "Session ended. Reload to start a new one."
                                      : "Connection lost. Reload to start a new session.";
  status.style.display = "block";
});
</script>
</body>
</html>
"#;

/// Page served at `/` and for non-idle sessions: measures the viewport and
/// navigates to `/{id}_{width}_{height}`.
pub fn redirect_page(id: &ClientId) -> String {
    REDIRECT_TEMPLATE.replace("{{ID}}", id.as_str())
}

/// Viewer page backed by a string template.
#[derive(Debug, Clone)]
pub struct HtmlViewerPage {
    template: String,
}

impl HtmlViewerPage {
    /// The built-in noVNC viewer.
    pub fn builtin() -> Self {
        Self {
            template: DEFAULT_VIEWER_TEMPLATE.to_string(),
        }
    }

    pub fn from_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Use `<assets_dir>/viewer.html` if present, otherwise the built-in page.
    pub fn load(assets_dir: &Path) -> std::io::Result<Self> {
        let path = assets_dir.join(VIEWER_TEMPLATE_FILE);
        match std::fs::read_to_string(&path) {
            Ok(template) => {
                info!(path = %path.display(), "Using custom viewer template");
                Ok(Self::from_template(template))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No custom viewer template, using built-in");
                Ok(Self::builtin())
            }
            Err(e) => Err(e),
        }
    }
}

impl ViewerPage for HtmlViewerPage {
    fn render(&self, ctx: &ViewerContext) -> Result<String, GatewayError> {
        let mut saw_port = false;
        let rendered = substitute(&self.template, |name| match name {
            "TITLE" => Some(escape_html(&ctx.title)),
            "PORT" => {
                saw_port = true;
                Some(ctx.port.to_string())
            }
            "QUALITY" => Some(ctx.quality.to_string()),
            "PASSWORD_REQUIRED" => Some(ctx.password_required.to_string()),
            _ => None,
        })?;

        if !saw_port {
            return Err(GatewayError::TemplateRenderFailed(
                "template has no {{PORT}} placeholder".to_string(),
            ));
        }
        Ok(rendered)
    }
}

/// Replace every `{{NAME}}` in `template` in a single pass, where `NAME` is
/// made of uppercase letters and underscores. Any other `{{` is copied
/// through. Substituted values are never rescanned.
fn substitute<F>(template: &str, mut lookup: F) -> Result<String, GatewayError>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let name_len = after
            .bytes()
            .take_while(|b| b.is_ascii_uppercase() || *b == b'_')
            .count();

        if name_len > 0 && after[name_len..].starts_with("}}") {
            let name = &after[..name_len];
            let Some(value) = lookup(name) else {
                return Err(GatewayError::TemplateRenderFailed(format!(
                    "unknown placeholder {{{{{name}}}}}"
                )));
            };
            out.push_str(&value);
            rest = &after[name_len + 2..];
        } else {
            out.push_str("{{");
            rest = after;
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ViewerContext {
        ViewerContext {
            port: 5901,
            quality: 6,
            title: "demo <app>".to_string(),
            password_required: false,
        }
    }

    #[test]
    fn test_redirect_page_embeds_id_and_script() {
        let page = redirect_page(&ClientId::parse("abc123").unwrap());
        assert!(page.contains("/abc123_"));
        assert!(page.contains("window.innerWidth"));
        assert!(page.contains("window.location.replace"));
    }

    #[test]
    fn test_builtin_viewer_renders_context() {
        let page = HtmlViewerPage::builtin().render(&ctx()).unwrap();
        assert!(page.contains(":5901/websockify"));
        assert!(page.contains("rfb.qualityLevel = 6;"));
        assert!(page.contains("<title>demo &lt;app&gt;</title>"));
        assert!(page.contains("if (false)"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn test_template_without_port_fails() {
        let page = HtmlViewerPage::from_template("<html>{{TITLE}}</html>");
        assert!(matches!(
            page.render(&ctx()),
            Err(GatewayError::TemplateRenderFailed(_))
        ));
    }

    #[test]
    fn test_unknown_placeholder_fails() {
        let page = HtmlViewerPage::from_template("{{PORT}} {{WIDTH}}");
        assert!(matches!(
            page.render(&ctx()),
            Err(GatewayError::TemplateRenderFailed(_))
        ));
    }

    #[test]
    fn test_braces_in_values_and_scripts_are_kept() {
        let page = HtmlViewerPage::from_template(
            "<title>{{TITLE}}</title><script>const o = {{ port: {{PORT}} }};</script>",
        );
        let ctx = ViewerContext {
            title: "{{weird}} {{PORT}} app".to_string(),
            ..ctx()
        };
        assert_eq!(
            page.render(&ctx).unwrap(),
            "<title>{{weird}} {{PORT}} app</title><script>const o = {{ port: 5901 }};</script>"
        );
    }

    #[test]
    fn test_load_prefers_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let builtin = HtmlViewerPage::load(dir.path()).unwrap();
        assert!(builtin.render(&ctx()).unwrap().contains("/core/rfb.js"));

        std::fs::write(dir.path().join(VIEWER_TEMPLATE_FILE), "port={{PORT}}").unwrap();
        let page = HtmlViewerPage::load(dir.path()).unwrap();
        assert_eq!(page.render(&ctx()).unwrap(), "port=5901");
    }
}

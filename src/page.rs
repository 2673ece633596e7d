//! HTML rendering for the single-page UI.
//!
//! Two views: the traits form while the quota is open, and the exhaustion
//! notice with a password form while it is closed. Anything that came from
//! the user or the generator is escaped before it is written out.

use crate::orchestrator::{MAX_TRAITS_CHARS, QUOTA_EXHAUSTED_MESSAGE};

const TITLE: &str = "Fictional Character Designer";

const STYLE: &str = r#"
body { font-family: sans-serif; max-width: 720px; margin: 40px auto; padding: 0 16px; }
.centered-content { display: flex; justify-content: center; align-items: center; flex-direction: column; text-align: center; }
.spacer { margin-top: 20px; }
.styled-text-input { text-align: center; width: 80%; margin: auto; padding: 8px; }
.styled-button { display: flex; justify-content: center; margin-top: 12px; }
.result { text-align: center; font-size: 1.2em; margin-top: 20px; white-space: pre-wrap; }
.notice { text-align: center; margin-top: 12px; color: #2e7d32; }
.rejected { color: #c62828; }
"#;

/// What the page should show besides the form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageView {
    /// Whether the quota currently admits requests
    pub open: bool,
    /// Traits to pre-fill the input with
    pub traits: String,
    /// Generated text or failure message
    pub result: Option<String>,
    /// Success notice (e.g. after unlocking)
    pub notice: Option<String>,
    /// Rejection notice (e.g. wrong password)
    pub rejection: Option<String>,
}

/// Escape text for an HTML body or attribute value
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

/// Render the full page
pub fn render(view: &PageView) -> String {
    let mut body = String::new();

    if let Some(notice) = &view.notice {
        body.push_str(&format!("<div class='notice'>{}</div>", escape_html(notice)));
    }

    if view.open {
        body.push_str(&render_form(&view.traits));
        if let Some(result) = &view.result {
            body.push_str(&format!("<div class='result'>{}</div>", escape_html(result)));
        }
    } else {
        // A result produced by the request that closed the gate is still shown
        if let Some(result) = &view.result {
            body.push_str(&format!("<div class='result'>{}</div>", escape_html(result)));
        }
        body.push_str(&render_locked(view.rejection.as_deref()));
    }

    format!(
        "<!DOCTYPE html>\n<html lang='en'>\n<head>\n<meta charset='utf-8'>\n\
         <meta name='viewport' content='width=device-width, initial-scale=1'>\n\
         <title>{title}</title>\n<style>{style}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        title = TITLE,
        style = STYLE,
        body = body
    )
}

fn render_form(traits: &str) -> String {
    format!(
        "<div class='centered-content'><h1>Design a Fictional Character</h1></div>\
         <div class='centered-content'><p>Input traits to visualize your unique fictional character design.</p></div>\
         <div class='spacer'></div>\
         <div class='centered-content'><h3>Enter character traits below:</h3></div>\
         <form method='post' action='/generate'>\
         <input class='styled-text-input' type='text' name='traits' maxlength='{max}' value='{traits}' \
         title=\"Describe your character's traits or appearance here.\">\
         <div class='styled-button'><button type='submit'>Generate Character Design</button></div>\
         </form>",
        max = MAX_TRAITS_CHARS,
        traits = escape_html(traits)
    )
}

fn render_locked(rejection: Option<&str>) -> String {
    let rejection = rejection
        .map(|msg| format!("<div class='notice rejected'>{}</div>", escape_html(msg)))
        .unwrap_or_default();
    format!(
        "<div class='result'>{message}</div>\
         <form method='post' action='/unlock' class='centered-content spacer'>\
         <label for='password'>Enter password to continue:</label>\
         <input id='password' type='password' name='password'>\
         <div class='styled-button'><button type='submit'>Unlock</button></div>\
         </form>{rejection}",
        message = QUOTA_EXHAUSTED_MESSAGE,
        rejection = rejection
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_open_page_has_form() {
        let html = render(&PageView {
            open: true,
            ..Default::default()
        });
        assert!(html.contains("Design a Fictional Character"));
        assert!(html.contains("action='/generate'"));
        assert!(html.contains("maxlength='100'"));
        assert!(!html.contains("action='/unlock'"));
    }

    #[test]
    fn test_closed_page_has_password_form() {
        let html = render(&PageView::default());
        assert!(html.contains(QUOTA_EXHAUSTED_MESSAGE));
        assert!(html.contains("action='/unlock'"));
        assert!(!html.contains("action='/generate'"));
    }

    #[test]
    fn test_result_is_escaped() {
        let html = render(&PageView {
            open: true,
            result: Some("<script>alert(1)</script>".to_string()),
            ..Default::default()
        });
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_traits_prefilled_and_escaped() {
        let html = render(&PageView {
            open: true,
            traits: "brave' onfocus='x".to_string(),
            ..Default::default()
        });
        assert!(html.contains("value='brave&#39; onfocus=&#39;x'"));
    }

    #[test]
    fn test_rejection_shown_on_locked_page() {
        let html = render(&PageView {
            rejection: Some("Password not accepted.".to_string()),
            ..Default::default()
        });
        assert!(html.contains("Password not accepted."));
    }
}

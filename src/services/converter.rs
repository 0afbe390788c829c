//! Pattern-based HTML to JSX rewriting.
//!
//! This is a textual transform, not a parser: attributes inside comments or
//! script bodies are rewritten too.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static CLASS_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r"class=").expect("valid regex"));
static FOR_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r"for=").expect("valid regex"));
static VOID_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"<(img|input|br|hr|area|base|col|embed|link|meta|param|source|track)\b([^>]*?)\s*/?>",
    )
    .expect("valid regex")
});
static STYLE_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"style="([^"]*)""#).expect("valid regex"));
static KEBAB: Lazy<Regex> = Lazy::new(|| Regex::new(r"-([a-z])").expect("valid regex"));
static DATA_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"data-([a-zA-Z0-9-]+)=").expect("valid regex"));

const COMPONENT_HEAD: &str = "import React from 'react';\n\nconst Component = () => {\n  return (\n    ";
const COMPONENT_TAIL: &str = "\n  );\n};\n\nexport default Component;";

fn camel_case(property: &str) -> String {
    KEBAB
        .replace_all(property, |caps: &Captures| caps[1].to_uppercase())
        .into_owned()
}

/// `color: red; font-size: 12px` becomes `style={{color: "red", fontSize: "12px"}}`.
fn style_object(declarations: &str) -> String {
    let entries: Vec<String> = declarations
        .split(';')
        .filter(|decl| !decl.trim().is_empty())
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            Some(format!(
                "{}: \"{}\"",
                camel_case(property.trim()),
                value.trim()
            ))
        })
        .collect();
    format!("style={{{{{}}}}}", entries.join(", "))
}

/// Rewrites HTML attributes and void elements into JSX. No wrapping.
pub fn rewrite_jsx(html: &str) -> String {
    let code = CLASS_ATTR.replace_all(html, "className=");
    let code = FOR_ATTR.replace_all(&code, "htmlFor=");
    let code = VOID_TAG.replace_all(&code, "<$1$2 />");
    let code = STYLE_ATTR.replace_all(&code, |caps: &Captures| style_object(&caps[1]));
    // The hyphen after `data` is dropped; existing consumers depend on it.
    let code = DATA_ATTR.replace_all(&code, "data$1=");
    code.into_owned()
}

/// Converts an HTML snippet into a React function component module.
pub fn html_to_react(html: &str) -> String {
    format!("{}{}{}", COMPONENT_HEAD, rewrite_jsx(html), COMPONENT_TAIL)
}

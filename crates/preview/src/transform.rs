//! Source-level rewrite of an entry module into a plain script.
//! 將進入點模組改寫為一般腳本的原始碼層級轉換。

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static DEFAULT_DECLARATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^([ \t]*)export[ \t]+default[ \t]+((?:async[ \t]+)?function\b[ \t]*\*?|class\b)[ \t]*([A-Za-z_$][\w$]*)?",
    )
    .expect("invalid default declaration regex")
});

static DEFAULT_IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*export[ \t]+default[ \t]+([A-Za-z_$][\w$]*)[ \t]*;?[ \t]*$")
        .expect("invalid default identifier regex")
});

static DEFAULT_EXPRESSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([ \t]*)export[ \t]+default[ \t]+").expect("invalid default expression regex")
});

static HOST_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*import[ \t]+([^;'"]+?)[ \t]+from[ \t]*['"](react|react-dom|react-dom/client)['"][ \t]*;?"#,
    )
    .expect("invalid import regex")
});

static BARE_HOST_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import[ \t]*['"](react|react-dom|react-dom/client)['"][ \t]*;?"#)
        .expect("invalid bare import regex")
});

/// How the default export of the entry was lowered.
/// 進入點預設匯出的改寫方式。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportRewrite {
    /// `export default function Name(` became `function Name(`.
    Function { name: String },
    /// `export default class Name` became `class Name`.
    Class { name: String },
    /// A trailing `export default Name;` statement was removed.
    Identifier { name: String },
    /// `export default <expr>` became `const <symbol> = <expr>`.
    Expression,
    /// No default export was present; the source is passed through.
    Absent,
}

/// Entry source after rewriting, plus the symbol that names its component.
/// 改寫後的進入點原始碼，以及其元件所使用的名稱。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformedSource {
    pub code: String,
    pub symbol: String,
    pub rewrite: ExportRewrite,
}

/// Rewrites the single top-level default export of `source` into a plain declaration
/// and replaces imports of the host-provided UI library with global destructuring.
/// 將唯一的頂層預設匯出改寫為一般宣告，並將 UI 函式庫的 import 改為解構全域物件。
///
/// Anonymous defaults are named `fallback_symbol`. Everything else is left untouched.
/// 匿名預設匯出會以 `fallback_symbol` 命名，其餘內容不變。
pub fn transform_entry(source: &str, fallback_symbol: &str) -> TransformedSource {
    let source = rewrite_host_imports(source);

    if let Some(caps) = DEFAULT_DECLARATION_RE.captures(&source) {
        let indent = caps.get(1).map_or("", |m| m.as_str());
        let keyword = caps.get(2).map_or("", |m| m.as_str()).trim_end();
        let declared = caps
            .get(3)
            .map(|m| m.as_str())
            .filter(|name| *name != "extends");
        let name = declared.unwrap_or(fallback_symbol).to_string();
        // `class extends Base` has no name; keep the `extends` that was captured.
        let tail = match (caps.get(3), declared) {
            (Some(m), None) => format!(" {}", m.as_str()),
            _ => String::new(),
        };
        let replacement = format!("{indent}{keyword} {name}{tail}");
        let rewrite = if keyword.starts_with("class") {
            ExportRewrite::Class { name: name.clone() }
        } else {
            ExportRewrite::Function { name: name.clone() }
        };
        return splice(&source, &caps, replacement, name, rewrite);
    }

    if let Some(caps) = DEFAULT_IDENTIFIER_RE.captures(&source) {
        let name = caps.get(1).map_or("", |m| m.as_str()).to_string();
        return splice(
            &source,
            &caps,
            String::new(),
            name.clone(),
            ExportRewrite::Identifier { name },
        );
    }

    if let Some(caps) = DEFAULT_EXPRESSION_RE.captures(&source) {
        let indent = caps.get(1).map_or("", |m| m.as_str());
        let replacement = format!("{indent}const {fallback_symbol} = ");
        return splice(
            &source,
            &caps,
            replacement,
            fallback_symbol.to_string(),
            ExportRewrite::Expression,
        );
    }

    TransformedSource {
        code: source,
        symbol: fallback_symbol.to_string(),
        rewrite: ExportRewrite::Absent,
    }
}

fn splice(
    source: &str,
    caps: &Captures<'_>,
    replacement: String,
    symbol: String,
    rewrite: ExportRewrite,
) -> TransformedSource {
    let Some(whole) = caps.get(0) else {
        return TransformedSource {
            code: source.to_string(),
            symbol,
            rewrite: ExportRewrite::Absent,
        };
    };
    let mut code = String::with_capacity(source.len() + replacement.len());
    code.push_str(&source[..whole.start()]);
    code.push_str(&replacement);
    code.push_str(&source[whole.end()..]);
    TransformedSource {
        code,
        symbol,
        rewrite,
    }
}

fn host_global(module: &str) -> &'static str {
    if module == "react" {
        "React"
    } else {
        "ReactDOM"
    }
}

/// Lowers `import ... from 'react'` style statements, keeping line numbers stable.
fn rewrite_host_imports(source: &str) -> String {
    let rewritten = HOST_IMPORT_RE.replace_all(source, |caps: &Captures<'_>| {
        let clause = caps.get(1).map_or("", |m| m.as_str());
        let global = host_global(caps.get(2).map_or("", |m| m.as_str()));
        let newlines = caps.get(0).map_or(0, |m| m.as_str().matches('\n').count());
        let mut out = import_bindings(clause, global);
        out.push_str(&"\n".repeat(newlines));
        out
    });
    BARE_HOST_IMPORT_RE.replace_all(&rewritten, "").into_owned()
}

fn import_bindings(clause: &str, global: &str) -> String {
    let clause = clause.trim();
    let (head, named) = match clause.find('{') {
        Some(open) => {
            let close = clause[open..].find('}').map_or(clause.len(), |i| open + i);
            (&clause[..open], Some(&clause[open + 1..close]))
        }
        None => (clause, None),
    };

    let mut statements = Vec::new();
    for part in head.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let alias = part
            .strip_prefix('*')
            .and_then(|rest| rest.trim_start().strip_prefix("as"))
            .map(str::trim)
            .unwrap_or(part);
        if alias != global {
            statements.push(format!("const {alias} = {global};"));
        }
    }

    if let Some(named) = named {
        let mut fields = Vec::new();
        for spec in named.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let mut words = spec.split_whitespace();
            let imported = words.next().unwrap_or_default();
            let local = match (words.next(), words.next()) {
                (Some("as"), Some(local)) => local,
                _ => imported,
            };
            if imported == "default" {
                if local != global {
                    statements.push(format!("const {local} = {global};"));
                }
            } else if imported == local {
                fields.push(imported.to_string());
            } else {
                fields.push(format!("{imported}: {local}"));
            }
        }
        if !fields.is_empty() {
            statements.push(format!("const {{ {} }} = {global};", fields.join(", ")));
        }
    }

    statements.join(" ")
}

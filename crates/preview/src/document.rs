use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::surface::{ErrorPhase, PreviewError};
use crate::transform::{transform_entry, ExportRewrite};

/// Default name of the component exported by the entry file.
/// 進入點檔案匯出之元件的預設名稱。
pub const DEFAULT_ENTRY_SYMBOL: &str = "App";

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][\w$]*$").expect("invalid identifier regex"));

/// Errors raised while preparing an entry for execution, before any surface exists.
/// 在建立執行表面之前、準備進入點時發生的錯誤。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("{symbol} component not found: the entry file never declares `{symbol}`")]
    MissingEntrySymbol { symbol: String },
    #[error("`{0}` is not a valid component name")]
    InvalidSymbol(String),
}

impl PipelineError {
    /// Both variants mean the expected component cannot be mounted.
    /// 兩種錯誤皆代表預期元件無法掛載。
    pub fn phase(&self) -> ErrorPhase {
        ErrorPhase::Render
    }
}

impl From<PipelineError> for PreviewError {
    fn from(err: PipelineError) -> Self {
        PreviewError::new(err.phase(), err.to_string())
    }
}

/// Self-contained unit handed to a surface: the rewritten entry plus the component probe.
/// 交給執行表面的自足單位：改寫後的進入點與元件探測。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewDocument {
    source: String,
    symbol: String,
    rewrite: ExportRewrite,
}

impl PreviewDocument {
    /// Rewritten entry source, still JSX.
    /// 改寫後的進入點原始碼（仍為 JSX）。
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn rewrite(&self) -> &ExportRewrite {
        &self.rewrite
    }

    /// Script that runs after the entry was evaluated: checks that the symbol is
    /// callable, mounts it, and reports through the surface bridge.
    /// 進入點評估後執行的腳本：檢查符號可呼叫、掛載並透過表面橋接回報。
    pub fn mount_script(&self) -> String {
        let symbol = &self.symbol;
        format!(
            r#"(() => {{
  const surface = globalThis.__surface;
  const component = typeof {symbol} === "undefined" ? undefined : {symbol};
  if (component === undefined) {{
    surface.fail("render", "{symbol} component not found");
    return;
  }}
  if (typeof component !== "function") {{
    surface.fail("render", "{symbol} component is not a function (found " + typeof component + ")");
    return;
  }}
  try {{
    surface.paint(ReactDOM.renderToString(React.createElement(component)));
  }} catch (err) {{
    surface.fail("render", String(err && err.message !== undefined ? err.message : err));
  }}
}})();
"#
        )
    }
}

/// Transforms `entry_source` and runs the static capability probe for `symbol`.
/// 轉換 `entry_source` 並對 `symbol` 執行靜態能力探測。
pub fn prepare_document(entry_source: &str, symbol: &str) -> Result<PreviewDocument, PipelineError> {
    if !IDENTIFIER_RE.is_match(symbol) {
        return Err(PipelineError::InvalidSymbol(symbol.to_string()));
    }
    let transformed = transform_entry(entry_source, symbol);
    if !mentions_identifier(&transformed.code, &transformed.symbol) {
        return Err(PipelineError::MissingEntrySymbol {
            symbol: transformed.symbol,
        });
    }
    Ok(PreviewDocument {
        source: transformed.code,
        symbol: transformed.symbol,
        rewrite: transformed.rewrite,
    })
}

fn mentions_identifier(code: &str, ident: &str) -> bool {
    let is_ident_char = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    code.match_indices(ident).any(|(start, _)| {
        let before = code[..start].chars().next_back();
        let after = code[start + ident.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

/// Markup shown when no entry file exists.
/// 找不到進入點檔案時顯示的標記。
pub fn placeholder_markup(entry_file: &str) -> String {
    format!(
        "<div class=\"preview-placeholder\"><p>No {} file found</p><p>Create an {} file to see preview</p></div>",
        escape_html(entry_file),
        escape_html(entry_file)
    )
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepares_named_default_export() {
        let doc = prepare_document("export default function App(){return 1}", "App").unwrap();
        assert_eq!(doc.source(), "function App(){return 1}");
        assert_eq!(doc.symbol(), "App");
        assert!(doc.mount_script().contains("typeof App === \"undefined\""));
    }

    #[test]
    fn missing_symbol_is_a_pipeline_error() {
        let err = prepare_document("const x = 1;", "App").unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingEntrySymbol {
                symbol: "App".into()
            }
        );
        let preview: PreviewError = err.into();
        assert_eq!(preview.phase, ErrorPhase::Render);
        assert!(preview.message.contains("App"));
    }

    #[test]
    fn probe_respects_identifier_boundaries() {
        assert!(prepare_document("function Application() {}", "App").is_err());
        assert!(prepare_document("const $App = 1;", "App").is_err());
        assert!(prepare_document("const App = 1;", "App").is_ok());
    }

    #[test]
    fn default_export_name_overrides_configured_symbol() {
        let doc = prepare_document("export default function Main() {}", "App").unwrap();
        assert_eq!(doc.symbol(), "Main");
    }

    #[test]
    fn rejects_non_identifier_symbols() {
        assert!(matches!(
            prepare_document("x", "App()"),
            Err(PipelineError::InvalidSymbol(_))
        ));
    }

    #[test]
    fn placeholder_names_entry_file() {
        let html = placeholder_markup("App.js");
        assert!(html.contains("No App.js file found"));
        assert!(html.contains("Create an App.js file to see preview"));
    }
}

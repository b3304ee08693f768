use once_cell::sync::Lazy;
use syntect::{
    dumps::from_uncompressed_data,
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use super::types::RenderError;

/// Stylesheet for the `syntax-` classes, generated by the build script.
pub const CODE_THEME_CSS: &str = include_str!(env!("CODE_THEME_CSS_FILE"));

pub(crate) const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "syntax-" };

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(|| {
    let syntax_bytes = include_bytes!(env!("SYNTAX_PACK_FILE"));
    from_uncompressed_data(syntax_bytes).expect("syntax pack must be valid")
});

pub(crate) fn syntax_set() -> &'static SyntaxSet {
    &SYNTAX_SET
}

pub(crate) fn find_syntax<'a>(
    syntax_set: &'a SyntaxSet,
    token: &str,
) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(token))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

/// Highlight `code` with the grammar registered for `language`.
///
/// Returns `Ok(None)` when the language is absent or unknown so the caller can
/// fall back to plain monospace output.
pub(crate) fn highlight_code(
    language: Option<&str>,
    code: &str,
    syntax_set: &SyntaxSet,
    class_style: ClassStyle,
) -> Result<Option<String>, RenderError> {
    let Some(lang_token) = language else {
        return Ok(None);
    };
    let Some(syntax) = find_syntax(syntax_set, lang_token) else {
        return Ok(None);
    };

    let mut code_with_newline = code.to_string();
    if !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, class_style);

    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::Highlighting {
                language: lang_token.to_string(),
                message: err.to_string(),
            })?;
    }

    Ok(Some(generator.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_language_produces_classed_spans() {
        let html = highlight_code(Some("python"), "print(1)", syntax_set(), CLASS_STYLE)
            .expect("highlight")
            .expect("python is bundled");

        assert!(html.contains("syntax-"));
        assert!(html.contains("print"));
    }

    #[test]
    fn unknown_or_missing_language_is_not_highlighted() {
        assert!(
            highlight_code(Some("no-such-lang"), "x", syntax_set(), CLASS_STYLE)
                .expect("no error")
                .is_none()
        );
        assert!(
            highlight_code(None, "x", syntax_set(), CLASS_STYLE)
                .expect("no error")
                .is_none()
        );
    }
}

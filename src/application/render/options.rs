use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::Options;

/// Comrak options for article bodies: GFM extensions, raw HTML never emitted.
pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

/// Allow-list applied to every generic block after comrak has rendered it.
pub(crate) fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "blockquote",
        "br",
        "code",
        "del",
        "div",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "input",
        "kbd",
        "li",
        "ol",
        "p",
        "pre",
        "s",
        "span",
        "strong",
        "sub",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from(["class", "id", "title", "lang", "dir"]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("img", &["alt", "width", "height", "loading"]);
    builder.add_tag_attributes("code", &["data-language"]);
    builder.add_tag_attributes("pre", &["lang"]);
    builder.add_tag_attributes("th", &["align", "colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("td", &["align", "colspan", "rowspan"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);

    builder.url_schemes(HashSet::from(["http", "https", "mailto"]));

    builder
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.r#unsafe = false;
    render.sourcepos = false;
}

#[cfg(test)]
mod tests {
    use super::build_sanitizer;

    #[test]
    fn sanitizer_strips_scripts_and_event_handlers() {
        let html = build_sanitizer()
            .clean("<p onclick=\"steal()\">Hi<script>alert(1)</script></p>")
            .to_string();

        assert_eq!(html, "<p>Hi</p>");
    }

    #[test]
    fn sanitizer_drops_javascript_links() {
        let html = build_sanitizer()
            .clean("<a href=\"javascript:alert(1)\">x</a>")
            .to_string();

        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn sanitizer_keeps_strikethrough_and_tables() {
        let html = build_sanitizer()
            .clean("<table><tbody><tr><td><del>old</del></td></tr></tbody></table>")
            .to_string();

        assert!(html.contains("<del>old</del>"));
        assert!(html.contains("<td>"));
    }
}

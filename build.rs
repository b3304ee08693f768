use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use syntect::dumps::dump_to_uncompressed_file;
use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, css_for_theme_with_class_style};
use two_face::syntax;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    write_syntax_pack(&out_dir).expect("failed to write syntax pack");
    write_theme_css(&out_dir).expect("failed to write code theme stylesheet");

    println!("cargo:rerun-if-changed=build.rs");
}

fn write_theme_css(out_dir: &Path) -> Result<(), String> {
    let theme_css = render_theme_css()?;
    let css_path = out_dir.join("code-theme.css");

    let mut contents = String::with_capacity(theme_css.len() + 80);
    contents.push_str("/* Syntect theme (base16-ocean.light), generated at build time */\n");
    contents.push_str(&theme_css);
    contents.push('\n');

    fs::write(&css_path, contents)
        .map_err(|err| format!("failed to write {}: {err}", css_path.display()))?;

    println!("cargo:rustc-env=CODE_THEME_CSS_FILE={}", css_path.display());

    Ok(())
}

fn render_theme_css() -> Result<String, String> {
    let theme_set = ThemeSet::load_defaults();
    let theme = theme_set
        .themes
        .get("base16-ocean.light")
        .ok_or_else(|| "theme `base16-ocean.light` not found".to_string())?;

    css_for_theme_with_class_style(theme, ClassStyle::SpacedPrefixed { prefix: "syntax-" })
        .map_err(|err| err.to_string())
}

fn write_syntax_pack(out_dir: &Path) -> Result<(), String> {
    let syntax_set = syntax::extra_newlines();
    let pack_path = out_dir.join("syntaxes.packdump");
    dump_to_uncompressed_file(&syntax_set, &pack_path)
        .map_err(|err| format!("failed to encode syntax set: {err}"))?;

    println!("cargo:rustc-env=SYNTAX_PACK_FILE={}", pack_path.display());

    Ok(())
}

use prepwise::application::{
    page::blocks_html,
    render::{Block, CodeBlock, MarkdownPipeline, PipelineConfig},
};

fn load_markdown() -> String {
    include_str!("fixtures/article.md").to_string()
}

#[test]
fn article_fixture_splits_into_content_and_code_blocks() {
    let blocks = MarkdownPipeline::default()
        .render(&load_markdown())
        .expect("render succeeds");

    assert!(
        blocks
            .iter()
            .filter_map(Block::as_html)
            .all(|html| !html.contains("<h1>Two Sum</h1>")),
        "leading title must be suppressed"
    );

    let code: Vec<&CodeBlock> = blocks.iter().filter_map(Block::as_code).collect();
    assert_eq!(code.len(), 2);
    assert_eq!(code[0].language.as_deref(), Some("python"));
    assert!(code[0].text.starts_with("def two_sum(nums, target):"));
    assert_eq!(code[1].language, None);
    assert_eq!(code[1].text, "Input: nums = [2,7,11,15], target = 9\nOutput: [0,1]");

    assert!(
        blocks
            .iter()
            .filter_map(Block::as_html)
            .any(|html| html.contains("<h2>Approach</h2>"))
    );
}

#[test]
fn rendering_twice_yields_identical_blocks_and_html() {
    let pipeline = MarkdownPipeline::default();
    let markdown = load_markdown();

    let first = pipeline.render(&markdown).expect("first render");
    let second = pipeline.render(&markdown).expect("second render");

    assert_eq!(first, second);
    assert_eq!(blocks_html(&first), blocks_html(&second));
}

#[test]
fn keeping_the_leading_heading_adds_one_block() {
    let markdown = load_markdown();
    let suppressed = MarkdownPipeline::default().render(&markdown).expect("render");
    let kept = MarkdownPipeline::new(PipelineConfig {
        suppress_leading_heading: false,
    })
    .render(&markdown)
    .expect("render");

    assert_eq!(kept.len(), suppressed.len() + 1);
    assert!(kept[0].as_html().unwrap().contains("Two Sum"));
}

#[test]
fn body_html_never_contains_raw_script() {
    let blocks = MarkdownPipeline::default()
        .render(&load_markdown())
        .expect("render succeeds");
    let html = blocks_html(&blocks);

    assert!(!html.contains("<script"));
    assert!(html.contains("syntax-lang-python"));
    assert!(html.contains("<pre class=\"syntax-plain\">"));
}

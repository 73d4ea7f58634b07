//! Sample extraction from a problem page.
//!
//! A page holds one sample container with ordered `input` and `output` blocks.
//! Each block wraps a `<pre>` whose text is laid out in one of two ways: one
//! child element per line, or a single run of text split by `<br>` tags.

use derive_builder::Builder;
use scraper::Html;
use serde::Deserialize;
use strum::Display;
use thiserror::Error;
use tracing::debug;

use crate::dom::{self, DomNode, NodeKind};
use crate::sample::{Sample, SampleSet};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("could not find a `{0}` sample block on the page")]
    ContainerNotFound(String),
    #[error("sample input/output counts do not match or are missing ({inputs} input(s), {outputs} output(s))")]
    SampleCountMismatch { inputs: usize, outputs: usize },
    #[error("sample #{index} {kind} block has no <pre> element")]
    PreformattedNotFound { index: usize, kind: BlockKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BlockKind {
    Input,
    Output,
}

/// How the text inside a `<pre>` node is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Every direct child element is one line.
    LineChildren,
    /// Text nodes separated by `<br>` elements.
    BreakTags,
}

impl Layout {
    pub fn detect<'a, N: DomNode<'a>>(pre: N) -> Self {
        let mut has_elements = false;
        for child in pre.children() {
            if child.is_break() {
                return Layout::BreakTags;
            }
            if matches!(child.kind(), NodeKind::Element(_)) {
                has_elements = true;
            }
        }
        if has_elements {
            Layout::LineChildren
        } else {
            Layout::BreakTags
        }
    }

    pub fn extract<'a, N: DomNode<'a>>(self, pre: N) -> String {
        match self {
            Layout::LineChildren => line_children_text(pre),
            Layout::BreakTags => dom::flatten_text(pre),
        }
    }
}

fn line_children_text<'a, N: DomNode<'a>>(pre: N) -> String {
    let mut lines = Vec::new();
    for child in pre.children() {
        match child.kind() {
            NodeKind::Element(_) => lines.push(dom::flatten_text(child)),
            NodeKind::Text(text) => {
                // whitespace between line elements is markup, not content
                let text = text.trim();
                if !text.is_empty() {
                    lines.push(text.to_string());
                }
            }
            NodeKind::Other => {}
        }
    }
    lines.join("\n")
}

/// Cleanup applied to every extracted block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Normalization {
    /// Drop blank lines anywhere in the block. When off, only leading and
    /// trailing blank lines are removed.
    pub drop_blank_lines: bool,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            drop_blank_lines: true,
        }
    }
}

impl Normalization {
    pub fn apply(&self, text: &str) -> String {
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        if self.drop_blank_lines {
            return lines
                .into_iter()
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
        }
        let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
        let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
        lines[start..end].join("\n")
    }
}

#[derive(Debug, Clone, Builder)]
pub struct SampleExtractor {
    #[builder(setter(into), default = "\"sample-test\".to_string()")]
    container_class: String,
    #[builder(setter(into), default = "\"input\".to_string()")]
    input_class: String,
    #[builder(setter(into), default = "\"output\".to_string()")]
    output_class: String,
    #[builder(default)]
    normalization: Normalization,
}

impl Default for SampleExtractor {
    fn default() -> Self {
        Self {
            container_class: "sample-test".to_string(),
            input_class: "input".to_string(),
            output_class: "output".to_string(),
            normalization: Normalization::default(),
        }
    }
}

impl SampleExtractor {
    pub fn with_normalization(normalization: Normalization) -> Self {
        Self {
            normalization,
            ..Self::default()
        }
    }

    pub fn extract_html(&self, html: &Html) -> Result<SampleSet, ExtractionError> {
        self.extract(html.tree.root())
    }

    pub fn extract<'a, N: DomNode<'a>>(&self, root: N) -> Result<SampleSet, ExtractionError> {
        let container = dom::find_first(root, |n| n.has_class(&self.container_class))
            .ok_or_else(|| ExtractionError::ContainerNotFound(self.container_class.clone()))?;

        // two independent passes so neither group depends on the other's order
        let inputs = dom::find_all(container, |n| n.has_class(&self.input_class));
        let outputs = dom::find_all(container, |n| n.has_class(&self.output_class));
        debug!(
            inputs = inputs.len(),
            outputs = outputs.len(),
            "located sample blocks"
        );

        if inputs.is_empty() || inputs.len() != outputs.len() {
            return Err(ExtractionError::SampleCountMismatch {
                inputs: inputs.len(),
                outputs: outputs.len(),
            });
        }

        inputs
            .into_iter()
            .zip(outputs)
            .enumerate()
            .map(|(i, (input, output))| {
                let index = i + 1;
                Ok(Sample::new(
                    self.block_text(input, index, BlockKind::Input)?,
                    self.block_text(output, index, BlockKind::Output)?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(SampleSet::new)
    }

    fn block_text<'a, N: DomNode<'a>>(
        &self,
        block: N,
        index: usize,
        kind: BlockKind,
    ) -> Result<String, ExtractionError> {
        let pre = dom::find_first(block, |n| n.is_element("pre"))
            .ok_or(ExtractionError::PreformattedNotFound { index, kind })?;
        let layout = Layout::detect(pre);
        debug!(index, %kind, ?layout, "extracting sample block");
        Ok(self.normalization.apply(&layout.extract(pre)))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn extract(html: &str) -> Result<SampleSet, ExtractionError> {
        SampleExtractor::default().extract_html(&Html::parse_document(html))
    }

    fn pre_text(html: &str) -> (Layout, String) {
        let doc = Html::parse_fragment(html);
        let pre = dom::find_first(doc.tree.root(), |n| n.is_element("pre")).unwrap();
        let layout = Layout::detect(pre);
        (layout, Normalization::default().apply(&layout.extract(pre)))
    }

    #[test]
    fn break_tag_samples_should_extract_in_order() {
        let html = r#"
            <div class="sample-test">
              <div class="input"><div class="title">Input</div><pre>3<br>4</pre></div>
              <div class="output"><div class="title">Output</div><pre>7</pre></div>
              <div class="input"><div class="title">Input</div><pre>5<br />6<br></pre></div>
              <div class="output"><div class="title">Output</div><pre>11</pre></div>
            </div>"#;
        let set = extract(html).unwrap();
        assert_eq!(
            set,
            SampleSet::new(vec![Sample::new("3\n4", "7"), Sample::new("5\n6", "11")])
        );
    }

    #[test]
    fn line_children_and_break_tags_should_agree() {
        let (lines_layout, lines) = pre_text(
            r#"<pre><div class="test-example-line">1 2</div><div class="test-example-line">3 4</div>
            </pre>"#,
        );
        let (breaks_layout, breaks) = pre_text("<pre>1 2<br>3 4<br></pre>");
        assert_eq!(lines_layout, Layout::LineChildren);
        assert_eq!(breaks_layout, Layout::BreakTags);
        assert_eq!(lines, breaks);
        assert_eq!(lines, "1 2\n3 4");
    }

    #[test]
    fn plain_text_pre_uses_break_layout() {
        let (layout, text) = pre_text("<pre>\n1\n  2 3  \n\n</pre>");
        assert_eq!(layout, Layout::BreakTags);
        assert_eq!(text, "1\n2 3");
    }

    #[test]
    fn nested_inline_elements_are_transparent() {
        let (layout, text) = pre_text("<pre><span>a</span> b<br><b>c</b></pre>");
        assert_eq!(layout, Layout::BreakTags);
        assert_eq!(text, "a b\nc");
    }

    #[test]
    fn missing_container_should_fail() {
        let err = extract(r#"<div class="input"><pre>1</pre></div>"#).unwrap_err();
        assert_eq!(err, ExtractionError::ContainerNotFound("sample-test".into()));
    }

    #[test]
    fn missing_output_should_fail() {
        let html = r#"<div class="sample-test"><div class="input"><pre>1</pre></div></div>"#;
        assert_eq!(
            extract(html).unwrap_err(),
            ExtractionError::SampleCountMismatch {
                inputs: 1,
                outputs: 0
            }
        );
    }

    #[test]
    fn empty_container_should_fail() {
        let html = r#"<div class="sample-test"></div>"#;
        assert!(matches!(
            extract(html),
            Err(ExtractionError::SampleCountMismatch { inputs: 0, outputs: 0 })
        ));
    }

    #[test]
    fn block_without_pre_should_fail() {
        let html = r#"<div class="sample-test">
            <div class="input"><pre>1</pre></div>
            <div class="output"><p>2</p></div></div>"#;
        assert_eq!(
            extract(html).unwrap_err(),
            ExtractionError::PreformattedNotFound {
                index: 1,
                kind: BlockKind::Output
            }
        );
    }

    #[test]
    fn normalization_should_be_idempotent() {
        let policies = [
            Normalization::default(),
            Normalization {
                drop_blank_lines: false,
            },
        ];
        for policy in policies {
            let once = policy.apply("\n  a b \n\n c\t\n\n");
            assert_eq!(policy.apply(&once), once);
        }
    }

    #[test]
    fn keeping_blank_lines_trims_only_the_edges() {
        let policy = Normalization {
            drop_blank_lines: false,
        };
        assert_eq!(policy.apply("\n\n a \n\n b \n\n"), "a\n\nb");
        assert_eq!(policy.apply(" \n "), "");
        assert_eq!(Normalization::default().apply("\n\n a \n\n b \n\n"), "a\nb");
    }

    #[test]
    fn builder_should_override_markers() {
        let extractor = SampleExtractorBuilder::default()
            .container_class("samples")
            .input_class("in")
            .output_class("out")
            .build()
            .unwrap();
        let html = Html::parse_document(
            r#"<section class="samples"><div class="in"><pre>x</pre></div><div class="out"><pre>y</pre></div></section>"#,
        );
        let set = extractor.extract_html(&html).unwrap();
        assert_eq!(set.get(1), Some(&Sample::new("x", "y")));
    }

    #[test]
    fn break_tag_fixture_should_work() {
        let content = fs::read_to_string("fixtures/break_tags.html").unwrap();
        let set = extract(&content).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1), Some(&Sample::new("2\n1 2 3\n4 5 6", "6\n15")));
        assert_eq!(set.get(2), Some(&Sample::new("1\n-1 1", "0")));
    }

    #[test]
    fn line_children_fixture_should_work() {
        let content = fs::read_to_string("fixtures/line_children.html").unwrap();
        let set = extract(&content).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get(1),
            Some(&Sample::new("3\n5\n1 2 3 4 5\n2\n7 7\n1\n42", "YES\nNO\nYES"))
        );
    }
}

// src/core/extractor.rs — Pull one fenced code block out of a model reply

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

/// A fenced block found in a reply, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FencedBlock {
    lang: String,
    body: String,
}

fn fenced_blocks(text: &str) -> Vec<FencedBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<FencedBlock> = None;

    for event in Parser::new(text) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                let lang = info.split_whitespace().next().unwrap_or("").to_string();
                current = Some(FencedBlock {
                    lang,
                    body: String::new(),
                });
            }
            Event::Text(t) => {
                if let Some(block) = current.as_mut() {
                    block.body.push_str(&t);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
            }
            _ => {}
        }
    }

    blocks
}

/// Drop exactly one trailing newline, and the carriage return before it.
fn strip_one_newline(mut body: String) -> String {
    if body.ends_with('\n') {
        body.pop();
        if body.ends_with('\r') {
            body.pop();
        }
    }
    body
}

/// Extract the candidate solution from a raw model reply.
///
/// Prefers the first block tagged `language` (case-insensitive), then the
/// first untagged block. Blocks tagged with another language are ignored.
/// Returns `None` when there is nothing to extract.
pub fn extract(text: &str, language: &str) -> Option<String> {
    let blocks = fenced_blocks(text);

    let tagged = blocks
        .iter()
        .position(|b| b.lang.eq_ignore_ascii_case(language));
    let chosen = tagged.or_else(|| blocks.iter().position(|b| b.lang.is_empty()))?;

    let block = blocks.into_iter().nth(chosen)?;
    Some(strip_one_newline(block.body))
}

use std::borrow::Cow;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::errors::AppError;

// A4 in points, Courier 10pt (every glyph is 6pt wide).
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 10;
const LEADING: i64 = 12;
const GLYPH_WIDTH: i64 = 6;
const TAB_WIDTH: usize = 4;

const COLUMNS: usize = ((PAGE_WIDTH - 2 * MARGIN) / GLYPH_WIDTH) as usize;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

/// Renders a text blob to a paginated, word-wrapped PDF.
pub fn render_pdf(text: &str, title: &str) -> Result<Vec<u8>, AppError> {
    let lines = wrap_text(text, COLUMNS);
    let pages: Vec<&[String]> = if lines.is_empty() {
        vec![lines.as_slice()]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids: Vec<ObjectId> = Vec::with_capacity(pages.len());
    for page_lines in pages {
        let content = page_content(page_lines);
        let encoded = content
            .encode()
            .map_err(|e| AppError::Pdf(format!("could not encode page content: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let page_count = page_ids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.into_iter().map(Object::Reference).collect::<Vec<Object>>(),
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0_i64.into(), 0_i64.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(encode_win_ansi(title)),
        "Producer" => Object::string_literal("counsel"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| AppError::Pdf(format!("could not write PDF: {e}")))?;
    Ok(out)
}

fn page_content(lines: &[String]) -> Content {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
        Operation::new("TL", vec![LEADING.into()]),
        Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()]),
    ];
    for line in lines {
        operations.push(Operation::new("T*", vec![]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_win_ansi(line))],
        ));
    }
    operations.push(Operation::new("ET", vec![]));
    Content { operations }
}

/// Maps text onto single-byte WinAnsi codes. Characters outside Latin-1 become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7e | 0xa0..=0xff => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Splits text into lines of about `width` characters, breaking on spaces.
/// Blank source lines are kept so paragraphs stay separated.
///
/// Words are never split, so the text reads back unchanged after extraction:
/// a word longer than `width` gets a line of its own and overflows the margin.
/// Rule-like words (`___`, `---`, `===`, `***`) never start a wrapped line, since
/// a line holding only one of them parses as a thematic break or heading underline.
/// Underscore blanks are shortened to fit instead; any run reads as one blank.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    for raw_line in text.lines() {
        let line = raw_line.replace('\t', &" ".repeat(TAB_WIDTH));
        let line = line.trim_end();
        if line.is_empty() {
            out.push(String::new());
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0;
        for word in line.split(' ') {
            let mut word = Cow::Borrowed(word);
            let mut word_len = word.chars().count();

            if current_len > 0 && current_len + 1 + word_len > width {
                if !is_rule_like(&word) {
                    out.push(std::mem::take(&mut current));
                    current_len = 0;
                } else if is_underscore_run(&word) {
                    word_len = width.saturating_sub(current_len + 1).max(1);
                    word = Cow::Owned("_".repeat(word_len));
                }
            } else if current_len == 0 && word_len > width && is_underscore_run(&word) {
                // Leave room for the words that follow on the same line.
                word_len = (width / 2).max(1);
                word = Cow::Owned("_".repeat(word_len));
            }

            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(&word);
            current_len += word_len;
        }
        out.push(current);
    }
    out
}

fn is_rule_like(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| matches!(c, '_' | '-' | '=' | '*'))
}

fn is_underscore_run(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c == '_')
}

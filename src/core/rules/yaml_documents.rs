//! Line-oriented multi-document scanner for project config files.
//!
//! Config files are a stream of documents, each optionally introduced by
//! a `---` / header / `---` block:
//!
//! ```yaml
//! ---
//! Name: app
//! After: framework
//! ---
//! App\Page:
//!   extensions: [App\Extension]
//! ```
//!
//! A standalone `---` opens a header (closing the previous document when
//! it is not the first line); the next standalone `---` closes the header.
//! A standalone `...` ends the stream and everything from it on is dropped.
//! Markers inside quoted scalars are not recognised.

/// One document from a config stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct YamlDocument {
    /// Text between the opening and closing `---` markers.
    pub header: String,
    /// The document payload.
    pub content: String,
    /// Exact bytes preceding `content`: marker lines and header.
    prefix: String,
    /// 1-indexed line number of the first content line.
    content_line: usize,
}

impl YamlDocument {
    pub fn content_line(&self) -> usize {
        self.content_line
    }

    /// Original bytes of the document.
    pub fn raw(&self) -> String {
        format!("{}{}", self.prefix, self.content)
    }

    /// The document with its header block kept and `content` swapped in.
    pub fn with_content(&self, content: &str) -> String {
        format!("{}{}", self.prefix, content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Header,
    Content,
}

fn is_marker(line: &str, marker: &str) -> bool {
    line.trim_end() == marker
}

/// Split a config stream into documents. Concatenating `raw()` of every
/// document reproduces the input up to (not including) any `...` line.
pub fn split_documents(text: &str) -> Vec<YamlDocument> {
    let mut documents = Vec::new();
    let mut current = YamlDocument {
        content_line: 1,
        ..Default::default()
    };
    let mut mode = Mode::Content;

    for (index, line) in text.split_inclusive('\n').enumerate() {
        let line_number = index + 1;

        if is_marker(line, "...") {
            break;
        }

        if is_marker(line, "---") {
            match mode {
                Mode::Content => {
                    if line_number > 1 {
                        documents.push(std::mem::take(&mut current));
                    }
                    current.prefix.push_str(line);
                    mode = Mode::Header;
                }
                Mode::Header => {
                    current.prefix.push_str(line);
                    current.content_line = line_number + 1;
                    mode = Mode::Content;
                }
            }
            continue;
        }

        match mode {
            Mode::Header => {
                current.header.push_str(line);
                current.prefix.push_str(line);
            }
            Mode::Content => current.content.push_str(line),
        }
    }

    // A header left open has no content; its lines stay in the prefix
    documents.push(current);
    documents
}

/// Concatenate documents in order.
pub fn join_documents(parts: &[String]) -> String {
    parts.concat()
}

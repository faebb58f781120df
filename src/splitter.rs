//! Text segmentation for ingestion: sentence splitting for single files and
//! size-bounded recursive chunking for document batches.

/// Split after every `.`, `!` or `?` that is followed by whitespace.
///
/// The whitespace run is consumed, segments are trimmed, and empty segments
/// are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let end = i + c.len_utf8();
        match chars.peek() {
            Some(&(_, next)) if next.is_whitespace() => {
                push_trimmed(&mut segments, &text[start..end]);
                while let Some(&(_, ws)) = chars.peek() {
                    if !ws.is_whitespace() {
                        break;
                    }
                    chars.next();
                }
                start = chars.peek().map(|&(j, _)| j).unwrap_or(text.len());
            }
            _ => {}
        }
    }
    if start < text.len() {
        push_trimmed(&mut segments, &text[start..]);
    }
    segments
}

fn push_trimmed(out: &mut Vec<String>, segment: &str) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

struct Piece {
    text: String,
    /// Separator placed before this piece when it follows another in a chunk.
    joiner: &'static str,
}

const PARAGRAPH: &str = "\n\n";
const LINE: &str = "\n";
const SPACE: &str = " ";

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Boundaries are tried coarsest first: paragraphs, lines, sentences, words,
/// and finally raw characters. Consecutive pieces are packed together while
/// they fit. With `overlap_chars > 0`, each chunk after the first starts with
/// trailing pieces of its predecessor totalling at most `overlap_chars`.
pub fn chunk_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    collect_pieces(text.trim(), max_chars, 0, "", &mut pieces);

    let mut chunks = Vec::new();
    let mut current: Vec<Piece> = Vec::new();
    for piece in pieces {
        if !current.is_empty() && rendered_len(&current) + appended_len(&piece) > max_chars {
            chunks.push(render(&current));
            current = overlap_tail(current, overlap_chars);
            while !current.is_empty() && rendered_len(&current) + appended_len(&piece) > max_chars {
                current.remove(0);
            }
        }
        current.push(piece);
    }
    if !current.is_empty() {
        chunks.push(render(&current));
    }

    chunks
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

fn collect_pieces(text: &str, max_chars: usize, level: usize, joiner: &'static str, out: &mut Vec<Piece>) {
    if text.trim().is_empty() {
        return;
    }
    if char_len(text) <= max_chars {
        out.push(Piece {
            text: text.to_string(),
            joiner,
        });
        return;
    }

    let (parts, level_joiner): (Vec<String>, &'static str) = match level {
        0 => (text.split(PARAGRAPH).map(|p| p.trim().to_string()).collect(), PARAGRAPH),
        1 => (text.split(LINE).map(|l| l.trim().to_string()).collect(), LINE),
        2 => (split_sentences(text), SPACE),
        3 => (text.split_whitespace().map(str::to_string).collect(), SPACE),
        _ => {
            let chars: Vec<char> = text.chars().collect();
            for (i, window) in chars.chunks(max_chars).enumerate() {
                out.push(Piece {
                    text: window.iter().collect(),
                    joiner: if i == 0 { joiner } else { "" },
                });
            }
            return;
        }
    };

    let mut first = true;
    for part in parts.iter().filter(|p| !p.trim().is_empty()) {
        let j = if first { joiner } else { level_joiner };
        first = false;
        collect_pieces(part, max_chars, level + 1, j, out);
    }
}

fn overlap_tail(pieces: Vec<Piece>, overlap_chars: usize) -> Vec<Piece> {
    if overlap_chars == 0 {
        return Vec::new();
    }
    let mut tail: Vec<Piece> = Vec::new();
    for piece in pieces.into_iter().rev() {
        let extra = char_len(&piece.text) + if tail.is_empty() { 0 } else { tail[0].joiner.len() };
        if rendered_len(&tail) + extra > overlap_chars {
            break;
        }
        tail.insert(0, piece);
    }
    tail
}

fn appended_len(piece: &Piece) -> usize {
    piece.joiner.len() + char_len(&piece.text)
}

fn rendered_len(pieces: &[Piece]) -> usize {
    pieces
        .iter()
        .enumerate()
        .map(|(i, p)| if i == 0 { char_len(&p.text) } else { appended_len(p) })
        .sum()
}

fn render(pieces: &[Piece]) -> String {
    let mut out = String::new();
    for (i, piece) in pieces.iter().enumerate() {
        if i > 0 {
            out.push_str(piece.joiner);
        }
        out.push_str(&piece.text);
    }
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

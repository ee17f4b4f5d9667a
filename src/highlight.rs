use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub matched: bool,
}

// Chars whose lowercase form spans several chars compare by the first one,
// keeping byte offsets aligned with `text`.
fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Case-folds `text` the way search matching and highlighting compare it.
pub fn fold_case(text: &str) -> String {
    text.chars().map(fold).collect()
}

/// Splits `text` into segments, flagging every non-overlapping
/// case-insensitive occurrence of `query`.
pub fn highlight<'a>(text: &'a str, query: &str) -> Vec<Segment<'a>> {
    let needle: Vec<char> = query.chars().map(fold).collect();
    if needle.is_empty() {
        return vec![Segment { text, matched: false }];
    }

    let chars: Vec<(usize, char)> = text.char_indices().map(|(i, c)| (i, fold(c))).collect();

    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;
    while i + needle.len() <= chars.len() {
        let hit = chars[i..i + needle.len()]
            .iter()
            .map(|&(_, c)| c)
            .eq(needle.iter().copied());
        if !hit {
            i += 1;
            continue;
        }
        let start = chars[i].0;
        let end = chars
            .get(i + needle.len())
            .map_or(text.len(), |&(offset, _)| offset);
        if start > plain_start {
            segments.push(Segment {
                text: &text[plain_start..start],
                matched: false,
            });
        }
        segments.push(Segment {
            text: &text[start..end],
            matched: true,
        });
        plain_start = end;
        i += needle.len();
    }
    if plain_start < text.len() || segments.is_empty() {
        segments.push(Segment {
            text: &text[plain_start..],
            matched: false,
        });
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(segments: &[Segment<'_>]) -> String {
        segments
            .iter()
            .map(|s| {
                if s.matched {
                    format!("[{}]", s.text)
                } else {
                    s.text.to_owned()
                }
            })
            .collect()
    }

    #[test]
    fn marks_all_occurrences() {
        assert_eq!(render(&highlight("Ring of the Ring", "ring")), "[Ring] of the [Ring]");
        assert_eq!(render(&highlight("aaaa", "aa")), "[aa][aa]");
        assert_eq!(render(&highlight("Pokémon Legends", "MON L")), "Poké[mon L]egends");
    }

    #[test]
    fn no_match_or_empty_query() {
        assert_eq!(
            highlight("Dune", ""),
            vec![Segment {
                text: "Dune",
                matched: false
            }]
        );
        assert_eq!(render(&highlight("Dune", "x")), "Dune");
        assert_eq!(highlight("", "x").len(), 1);
    }

    #[test]
    fn multi_char_lowercase_folds_to_first_char() {
        assert_eq!(fold_case("İstanbul"), "istanbul");
        assert_eq!(render(&highlight("İstanbul Nights", "istanbul")), "[İstanbul] Nights");
    }
}

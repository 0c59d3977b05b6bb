use std::path::Path;

use anyhow::{Context, Result};

/// Read a URL list: one `url[,marker]` (or tab separated) entry per line.
///
/// A leading `URLs`/`URL` header is dropped, blank lines are ignored and an
/// empty marker counts as no marker.
pub fn read_url_list(path: &Path) -> Result<Vec<(String, Option<String>)>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;
    Ok(parse_url_list(&text))
}

fn parse_url_list(text: &str) -> Vec<(String, Option<String>)> {
    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (url, marker) = match line.split_once([',', '\t']) {
            Some((url, rest)) => (url.trim(), rest.split([',', '\t']).next().map(str::trim)),
            None => (line, None),
        };
        let url = url.trim_matches('"');
        if i == 0 && (url.eq_ignore_ascii_case("urls") || url.eq_ignore_ascii_case("url")) {
            continue;
        }
        let marker = marker
            .map(|m| m.trim_matches('"'))
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        out.push((url.to_string(), marker));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_markers_and_blanks() {
        let text = "URLs,skip\nhttps://s/product/a,\nhttps://s/product/b,x\n\n\"https://s/product/c\"\thold\thuh\nhttps://s/product/d\n";
        assert_eq!(
            parse_url_list(text),
            vec![
                ("https://s/product/a".to_string(), None),
                ("https://s/product/b".to_string(), Some("x".to_string())),
                ("https://s/product/c".to_string(), Some("hold".to_string())),
                ("https://s/product/d".to_string(), None),
            ]
        );
    }

    #[test]
    fn no_header() {
        let list = parse_url_list("https://s/product/a\r\nhttps://s/product/b , x\r\n");
        assert_eq!(list[0].0, "https://s/product/a");
        assert_eq!(list[1], ("https://s/product/b".to_string(), Some("x".to_string())));
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.csv");
        std::fs::write(&path, "URLs\nhttps://s/product/a\n").unwrap();
        assert_eq!(read_url_list(&path).unwrap().len(), 1);
        assert!(read_url_list(&dir.path().join("missing.csv")).is_err());
    }
}

//! Quest descriptors.
//!
//! A quest is an ordered list of levels plus a bit of metadata, stored
//! in a small line-based `.qst` file:
//!
//! ```text
//! // my_quest.qst
//! name "Waterworks Zone"
//! author "someone"
//! version "1.2"
//! level levels/waterworks_1.lev
//! level levels/waterworks_2.lev
//! <credits>
//! ```
//!
//! Statements starting with an identifier wrapped in angle brackets push
//! a built-in scene instead of a level file. A `.lev` path loads as an
//! implicit single-level quest. A couple of historical fields (`image`,
//! `hidden`) are accepted and ignored.

use std::fs;
use std::path::Path;

use bevy::log::info;
use thiserror::Error;

/// A loaded quest descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quest {
    /// Path the quest was loaded from.
    pub file: String,
    /// Display name.
    pub name: String,
    /// Author credit.
    pub author: String,
    /// Version string.
    pub version: String,
    /// Short description.
    pub description: String,
    /// Level paths (or `<builtin>` scene names) in play order.
    pub levels: Vec<String>,
}

/// Errors from the quest loader.
#[derive(Error, Debug)]
pub enum QuestError {
    /// The file could not be read.
    #[error("can't read quest file \"{path}\"")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Neither a `.qst` nor a `.lev` file.
    #[error("\"{0}\" is not a quest file")]
    UnsupportedExtension(String),

    /// A malformed statement.
    #[error("{path}:{line}: {message}")]
    Parse {
        /// Offending path.
        path: String,
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },
}

/// Load a quest from a `.qst` descriptor or a bare `.lev` level file.
pub fn load_quest(path: impl AsRef<Path>) -> Result<Quest, QuestError> {
    let path = path.as_ref();
    let display_path = path.display().to_string();

    info!("Loading quest \"{}\"...", display_path);

    let quest = if has_extension(path, "qst") {
        let source = fs::read_to_string(path).map_err(|source| QuestError::Io {
            path: display_path.clone(),
            source,
        })?;
        parse_quest(&source, &display_path)?
    } else if has_extension(path, "lev") {
        single_level_quest(&display_path)
    } else {
        return Err(QuestError::UnsupportedExtension(display_path));
    };

    info!("Quest \"{}\" has been loaded successfully!", quest.name);
    Ok(quest)
}

/// Parse `.qst` source text. `file` is only used for bookkeeping and
/// error messages.
pub fn parse_quest(source: &str, file: &str) -> Result<Quest, QuestError> {
    let mut quest = Quest {
        file: file.to_string(),
        ..Quest::default()
    };

    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        let mut tokens = tokenize(line);
        let Some(id) = tokens.next() else {
            continue;
        };

        let mut expect_string = |what: &str| {
            tokens.next().ok_or_else(|| QuestError::Parse {
                path: file.to_string(),
                line: line_number,
                message: format!("expected {what}"),
            })
        };

        if id.eq_ignore_ascii_case("level") {
            quest.levels.push(expect_string("level path")?);
        } else if id.starts_with('<') && id.ends_with('>') && id.len() > 2 {
            // A built-in scene.
            quest.levels.push(id);
        } else if id.eq_ignore_ascii_case("name") {
            quest.name = expect_string("quest name")?;
        } else if id.eq_ignore_ascii_case("author") {
            quest.author = expect_string("quest author")?;
        } else if id.eq_ignore_ascii_case("version") {
            quest.version = expect_string("quest version")?;
        } else if id.eq_ignore_ascii_case("description") {
            quest.description = expect_string("quest description")?;
        } else if id.eq_ignore_ascii_case("image") {
            // Removed field, kept for retro-compatibility.
            let _ = expect_string("quest image")?;
            info!("Quest loader: field image is obsolete");
        } else if id.eq_ignore_ascii_case("hidden") {
            info!("Quest loader: field hidden is obsolete");
        } else {
            return Err(QuestError::Parse {
                path: file.to_string(),
                line: line_number,
                message: format!("unknown statement \"{id}\""),
            });
        }
    }

    Ok(quest)
}

/// Wrap a bare level path in a quest of its own.
fn single_level_quest(path: &str) -> Quest {
    Quest {
        file: path.to_string(),
        name: path.to_string(),
        levels: vec![path.to_string()],
        ..Quest::default()
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Split a statement line into tokens: whitespace-separated words,
/// double-quoted strings, `//` comments.
fn tokenize(line: &str) -> impl Iterator<Item = String> + '_ {
    let mut chars = line.chars().peekable();

    std::iter::from_fn(move || {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        match *chars.peek()? {
            '"' => {
                chars.next();
                let mut token = String::new();
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    token.push(c);
                }
                Some(token)
            }
            _ => {
                let mut token = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    token.push(c);
                    chars.next();
                }
                if token.starts_with("//") {
                    // Comment: swallow the rest of the line.
                    for _ in chars.by_ref() {}
                    return None;
                }
                Some(token)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_descriptor() {
        let source = r#"
            // a little campaign
            name "Waterworks Zone"
            author "someone"
            version "1.2"
            description "Two levels and the credits."
            level levels/waterworks_1.lev
            level levels/waterworks_2.lev
            <credits>
        "#;

        let quest = parse_quest(source, "waterworks.qst").unwrap();
        assert_eq!(quest.name, "Waterworks Zone");
        assert_eq!(quest.author, "someone");
        assert_eq!(quest.version, "1.2");
        assert_eq!(
            quest.levels,
            vec![
                "levels/waterworks_1.lev",
                "levels/waterworks_2.lev",
                "<credits>"
            ]
        );
    }

    #[test]
    fn obsolete_fields_are_tolerated() {
        let source = "name \"Old\"\nimage \"cover.png\"\nhidden\nlevel a.lev\n";
        let quest = parse_quest(source, "old.qst").unwrap();
        assert_eq!(quest.levels, vec!["a.lev"]);
    }

    #[test]
    fn missing_parameter_is_an_error() {
        let err = parse_quest("name\n", "broken.qst").unwrap_err();
        assert!(matches!(err, QuestError::Parse { line: 1, .. }));
    }

    #[test]
    fn unknown_statement_is_an_error() {
        let err = parse_quest("frobnicate yes\n", "broken.qst").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("frobnicate"), "{message}");
    }

    #[test]
    fn lev_files_become_single_level_quests() {
        let quest = single_level_quest("levels/sandbox.lev");
        assert_eq!(quest.name, "levels/sandbox.lev");
        assert_eq!(quest.levels, vec!["levels/sandbox.lev"]);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = load_quest("quest.json").unwrap_err();
        assert!(matches!(err, QuestError::UnsupportedExtension(_)));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let source = "\n// nothing here\nlevel a.lev // trailing\n";
        let quest = parse_quest(source, "q.qst").unwrap();
        assert_eq!(quest.levels, vec!["a.lev"]);
    }
}

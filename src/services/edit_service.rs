use std::io::Write;
use std::path::Path;

use similar::{ChangeTag, TextDiff};

use crate::models::bookmark::Bookmark;
use crate::utils::error::{AppError, AppResult};

/// Round-trips a record through the user's text editor: render to the
/// line-based buffer form, edit, diff, confirm, parse back.
pub struct EditService {
    editor: String,
    color: bool,
}

impl EditService {
    pub fn new(editor_override: Option<&str>) -> Self {
        let editor = editor_override
            .map(str::to_string)
            .or_else(|| std::env::var("RSMARK_EDITOR").ok())
            .or_else(|| std::env::var("VISUAL").ok())
            .or_else(|| std::env::var("EDITOR").ok())
            .unwrap_or_else(|| "vi".to_string());
        let color = std::env::var_os("NO_COLOR").is_none();
        Self { editor, color }
    }

    /// Buffer plus the commented header the editor shows. The header is
    /// ignored on parse.
    pub fn render_buffer(record: &Bookmark, db_name: &str, note: Option<&str>) -> String {
        let mut header = format!(
            "# {} - rsmark v{}\n# edit the fields below, the description block runs to the end\n",
            db_name,
            env!("CARGO_PKG_VERSION"),
        );
        if let Some(note) = note {
            header.push_str(&format!("# {}\n", note));
        }
        format!("{}{}", header, record.to_buffer())
    }

    /// Unified diff between the original and edited buffers.
    pub fn diff_text(original: &str, edited: &str, color: bool) -> String {
        let diff = TextDiff::from_lines(original, edited);
        let mut out = String::new();
        for change in diff.iter_all_changes() {
            let (sign, open, close) = match change.tag() {
                ChangeTag::Delete if color => ("-", "\x1b[31m", "\x1b[0m"),
                ChangeTag::Insert if color => ("+", "\x1b[32m", "\x1b[0m"),
                ChangeTag::Delete => ("-", "", ""),
                ChangeTag::Insert => ("+", "", ""),
                ChangeTag::Equal => (" ", "", ""),
            };
            out.push_str(&format!("{}{}{}{}", open, sign, change.value(), close));
        }
        out
    }

    /// One record through the editor. `Unchanged` when the buffer comes
    /// back byte-identical, `Aborted` when the user discards.
    pub async fn edit(&self, record: &Bookmark, db_name: &str) -> AppResult<Bookmark> {
        let mut note: Option<String> = None;

        loop {
            let original = Self::render_buffer(record, db_name, note.as_deref());
            let edited = self.spawn_editor(&original).await?;
            if edited == original {
                return Err(AppError::Unchanged);
            }

            print!("{}", Self::diff_text(&original, &edited, self.color));
            match prompt_choice("save, discard or edit again? [s/d/e]: ")? {
                Choice::Discard => return Err(AppError::Aborted),
                Choice::EditAgain => {
                    note = None;
                    continue;
                }
                Choice::Save => match Bookmark::from_buffer(&edited) {
                    Ok(parsed) => return Ok(merge(record, parsed)),
                    Err(e) => {
                        // Annotate and send the user back into the editor.
                        note = Some(e.to_string());
                        continue;
                    }
                },
            }
        }
    }

    /// Sequential bulk edit. `Unchanged` records are skipped silently;
    /// `Aborted` short-circuits the rest of the batch.
    pub async fn edit_many(
        &self,
        records: &[Bookmark],
        db_name: &str,
    ) -> AppResult<Vec<(Bookmark, Bookmark)>> {
        let mut edits = Vec::new();
        for record in records {
            match self.edit(record, db_name).await {
                Ok(new) => edits.push((record.clone(), new)),
                Err(AppError::Unchanged) => continue,
                Err(AppError::Aborted) => return Err(AppError::Aborted),
                Err(e) => return Err(e),
            }
        }
        Ok(edits)
    }

    async fn spawn_editor(&self, buffer: &str) -> AppResult<String> {
        let mut tmp = tempfile::Builder::new()
            .prefix("rsmark-edit-")
            .suffix(".bmk")
            .tempfile()?;
        tmp.write_all(buffer.as_bytes())?;
        tmp.flush()?;

        self.run_editor(tmp.path()).await?;

        // Re-read from the path: some editors replace the file.
        let edited = std::fs::read_to_string(tmp.path())?;
        Ok(edited)
    }

    async fn run_editor(&self, path: &Path) -> AppResult<()> {
        // The editor value may carry arguments ("code --wait").
        let mut parts = self.editor.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| AppError::Io(std::io::Error::other("empty editor command")))?;

        let status = tokio::process::Command::new(program)
            .args(parts)
            .arg(path)
            .status()
            .await?;

        if !status.success() {
            return Err(AppError::Aborted);
        }
        Ok(())
    }
}

enum Choice {
    Save,
    Discard,
    EditAgain,
}

fn prompt_choice(prompt: &str) -> AppResult<Choice> {
    loop {
        print!("{}", prompt);
        std::io::stdout().flush()?;
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            return Ok(Choice::Discard);
        }
        match line.trim().to_lowercase().as_str() {
            "s" | "save" | "y" | "yes" => return Ok(Choice::Save),
            "d" | "discard" | "n" | "no" | "q" => return Ok(Choice::Discard),
            "e" | "edit" => return Ok(Choice::EditAgain),
            _ => continue,
        }
    }
}

/// The buffer carries only the editable fields; everything else stays
/// with the original record.
fn merge(original: &Bookmark, edited: Bookmark) -> Bookmark {
    Bookmark {
        id: original.id,
        url: edited.url,
        title: edited.title,
        desc: edited.desc,
        tags: edited.tags,
        favicon_url: edited.favicon_url,
        created_at: original.created_at,
        last_visit: original.last_visit,
        visit_count: original.visit_count,
        favorite: original.favorite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn record() -> Bookmark {
        Bookmark {
            id: 9,
            url: "https://example.com".to_string(),
            title: "example".to_string(),
            desc: "line one".to_string(),
            tags: ",web,".to_string(),
            favicon_url: None,
            created_at: Utc::now(),
            last_visit: None,
            visit_count: 3,
            favorite: true,
        }
    }

    #[test]
    fn test_render_buffer_parses_back() {
        let r = record();
        let buffer = EditService::render_buffer(&r, "work.db", None);
        assert!(buffer.starts_with("# work.db - rsmark v"));

        let parsed = Bookmark::from_buffer(&buffer).unwrap();
        assert_eq!(parsed.url, r.url);
        assert_eq!(parsed.tags, r.tags);
    }

    #[test]
    fn test_render_buffer_with_note() {
        let buffer = EditService::render_buffer(&record(), "work.db", Some("invalid url: x"));
        assert!(buffer.contains("# invalid url: x\n"));
    }

    #[test]
    fn test_diff_text_marks_changes() {
        let a = "url: https://a.example\ntitle: old\n";
        let b = "url: https://a.example\ntitle: new\n";
        let diff = EditService::diff_text(a, b, false);
        assert!(diff.contains("-title: old"));
        assert!(diff.contains("+title: new"));
        assert!(diff.contains(" url: https://a.example"));
    }

    #[test]
    fn test_merge_preserves_identity_and_counters() {
        let original = record();
        let mut edited = Bookmark::from_buffer(&original.to_buffer()).unwrap();
        edited.title = "renamed".to_string();

        let merged = merge(&original, edited);
        assert_eq!(merged.id, 9);
        assert_eq!(merged.visit_count, 3);
        assert!(merged.favorite);
        assert_eq!(merged.title, "renamed");
        assert_eq!(merged.created_at, original.created_at);
    }
}

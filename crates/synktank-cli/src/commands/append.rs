use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::common::{collection_for, parse_memo_id, Session};
use crate::error::CliError;

/// Stream stdin into the memo. Each line re-arms the autosave, so a fast
/// producer results in few writes; EOF flushes whatever is left.
pub async fn run_append(id: &str, permanent: bool, session: &Session) -> Result<(), CliError> {
    let id = parse_memo_id(id)?;
    let editor = session
        .service
        .open_editor(collection_for(permanent), &id)
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut content = editor.content();
    let mut appended = 0usize;
    while let Some(line) = lines.next_line().await? {
        content = append_line(&content, &line);
        editor.set_content(content.clone());
        appended += 1;
    }

    editor.flush().await?;
    tracing::info!("Appended {} line(s) to memo {}", appended, id);
    println!("{id}");
    Ok(())
}

/// `line` added on its own line after `content`.
pub fn append_line(content: &str, line: &str) -> String {
    if content.is_empty() {
        line.to_string()
    } else if content.ends_with('\n') {
        format!("{content}{line}")
    } else {
        format!("{content}\n{line}")
    }
}

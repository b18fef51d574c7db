use crate::commands::common::{
    capture_editor_input_with_initial, collection_for, parse_memo_id, Session,
};
use crate::error::CliError;

pub async fn run_edit(id: &str, permanent: bool, session: &Session) -> Result<(), CliError> {
    let id = parse_memo_id(id)?;
    let editor = session
        .service
        .open_editor(collection_for(permanent), &id)
        .await?;

    let edited_content = capture_editor_input_with_initial(&editor.content())?;
    if edited_content != editor.content() {
        editor.set_content(edited_content);
        editor.flush().await?;
    }

    println!("{id}");
    Ok(())
}

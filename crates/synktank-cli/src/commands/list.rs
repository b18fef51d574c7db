use crate::commands::common::{
    collection_for, format_memo_lines, memo_to_list_item, MemoListItem, Session,
};
use crate::error::CliError;

pub async fn run_list(permanent: bool, as_json: bool, session: &Session) -> Result<(), CliError> {
    let cache = session.service.list_cache(collection_for(permanent));
    let memos = cache.refresh().await?;

    if as_json {
        let json_items = memos
            .iter()
            .map(memo_to_list_item)
            .collect::<Vec<MemoListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if memos.is_empty() {
        println!("No {} memos", cache.collection());
    } else {
        for line in format_memo_lines(&memos) {
            println!("{line}");
        }
    }

    Ok(())
}

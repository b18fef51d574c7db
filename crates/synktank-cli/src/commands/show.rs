use crate::commands::common::{collection_for, parse_memo_id, Session};
use crate::error::CliError;

pub async fn run_show(id: &str, permanent: bool, session: &Session) -> Result<(), CliError> {
    let id = parse_memo_id(id)?;
    let memo = session
        .service
        .get_memo(collection_for(permanent), &id)
        .await?;

    println!("{}", memo.content);
    Ok(())
}

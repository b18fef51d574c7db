use synktank_core::Collection;

use crate::commands::common::{parse_memo_id, Session};
use crate::error::CliError;

pub async fn run_delete(id: &str, session: &Session) -> Result<(), CliError> {
    let id = parse_memo_id(id)?;
    let cache = session.service.list_cache(Collection::Temporary);
    cache.refresh().await?;

    if cache.find(&id).is_none() {
        return Err(synktank_core::Error::NotFound(id.to_string()).into());
    }

    cache.delete_local(&id).await?;
    println!("{id}");
    Ok(())
}

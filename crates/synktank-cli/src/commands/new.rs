use crate::commands::common::{collection_for, join_content, Session};
use crate::error::CliError;

pub async fn run_new(
    content_parts: &[String],
    permanent: bool,
    session: &Session,
) -> Result<(), CliError> {
    let content = join_content(content_parts);
    let memo = session
        .service
        .create_memo(collection_for(permanent), &content)
        .await?;

    println!("{}", memo.id);
    Ok(())
}

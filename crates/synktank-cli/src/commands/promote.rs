use crate::commands::common::{parse_memo_id, Session};
use crate::error::CliError;

pub async fn run_promote(id: &str, session: &Session) -> Result<(), CliError> {
    let id = parse_memo_id(id)?;
    match session.service.promote(id).await {
        Ok(permanent) => {
            println!("{}", permanent.id);
            Ok(())
        }
        Err(error) => {
            if let Some(partial) = error.as_partial_promotion() {
                eprintln!("{}", recovery_hint(&partial.temporary_id.to_string()));
            }
            Err(error.into())
        }
    }
}

pub async fn run_finish_promotion(id: &str, session: &Session) -> Result<(), CliError> {
    let id = parse_memo_id(id)?;
    session.service.finish_promotion(id).await?;
    println!("{id}");
    Ok(())
}

/// Command that removes the leftover temporary copy without creating a
/// second permanent memo.
pub fn recovery_hint(temporary_id: &str) -> String {
    format!(
        "The permanent memo was created. Do not run `promote` again; remove the temporary copy with:\n  synktank finish-promotion {temporary_id}"
    )
}

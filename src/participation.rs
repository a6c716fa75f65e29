//! Joining and leaving sessions.
//!
//! Both transitions are guarded twice: against the loaded participant list,
//! and by the store's conditional write, so two concurrent joins for the same
//! pair cannot both succeed.

use crate::store::Store;
use crate::Error;

pub const ALREADY_PARTICIPATING: &str = "User is already participating in this session";
pub const NOT_PARTICIPATING: &str = "User is not participating in this session";

/// Adds `user_id` to the session. The session is looked up before the user,
/// so a request naming neither reports the missing session.
pub async fn participate(store: &dyn Store, session_id: i64, user_id: i64) -> Result<(), Error> {
    let session = store
        .find_session(session_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Session {} not found", session_id)))?;
    let user = store
        .find_user(user_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {} not found", user_id)))?;

    if session.has_participant(user.id) || !store.add_participant(session.id, user.id).await? {
        return Err(Error::bad_request(ALREADY_PARTICIPATING));
    }
    log::info!("User {} joined session {}", user.id, session.id);
    Ok(())
}

/// Removes `user_id` from the session. Membership in the participant list is
/// the only check made on the user.
pub async fn no_longer_participate(
    store: &dyn Store,
    session_id: i64,
    user_id: i64,
) -> Result<(), Error> {
    let session = store
        .find_session(session_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Session {} not found", session_id)))?;

    if !session.has_participant(user_id) || !store.remove_participant(session.id, user_id).await? {
        return Err(Error::bad_request(NOT_PARTICIPATING));
    }
    log::info!("User {} left session {}", user_id, session.id);
    Ok(())
}

use subtle::ConstantTimeEq;
use tracing::info;

use crate::db::StoreHandle;
use crate::db::models::DbAccount;
use crate::error::StorefrontError;

/// Check `password` against the stored plaintext secret of `username`.
///
/// Unknown user and wrong password produce the same error.
pub async fn authenticate(
    store: &StoreHandle,
    username: &str,
    password: &str,
) -> Result<DbAccount, StorefrontError> {
    let account = store.find_account(username).await?;
    let matched = account
        .filter(|a| bool::from(a.password.as_bytes().ct_eq(password.as_bytes())));

    match matched {
        Some(account) => {
            info!(username = %account.username, role = %account.role, "login succeeded");
            Ok(account)
        }
        None => {
            info!(username, "login rejected");
            Err(StorefrontError::InvalidCredentials)
        }
    }
}

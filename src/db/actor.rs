use crate::db::models::{DbAccount, DbPackage, NewPackage};
use crate::db::schema::DEMO_ACCOUNTS;
use crate::db::traits::RecordStore;
use crate::error::StorefrontError;

use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tracing::{debug, info, warn};

type Reply<T> = RpcReplyPort<Result<T, StorefrontError>>;

/// Messages handled by the record store actor.
#[derive(Debug)]
pub enum StoreMessage {
    FindAccount(String, Reply<Option<DbAccount>>),
    /// Assign an id and persist a new, unapproved package.
    InsertPackage(NewPackage, Reply<DbPackage>),
    ListPackages(bool, Reply<Vec<DbPackage>>),
    SetApproved(i64, bool, Reply<bool>),
    DeletePackage(i64, Reply<bool>),
}

/// Handle for interacting with the record store actor.
#[derive(Clone)]
pub struct StoreHandle {
    actor: ActorRef<StoreMessage>,
}

macro_rules! store_call {
    ($actor:expr, $variant:expr, $name:literal $(, $arg:expr)*) => {
        ractor::call!($actor, $variant $(, $arg)*)
            .map_err(|e| StorefrontError::RactorError(format!("{} RPC failed: {e}", $name)))?
    };
}

impl StoreHandle {
    pub async fn find_account(
        &self,
        username: impl AsRef<str>,
    ) -> Result<Option<DbAccount>, StorefrontError> {
        store_call!(
            self.actor,
            StoreMessage::FindAccount,
            "FindAccount",
            username.as_ref().to_string()
        )
    }

    pub async fn insert_package(&self, package: NewPackage) -> Result<DbPackage, StorefrontError> {
        store_call!(self.actor, StoreMessage::InsertPackage, "InsertPackage", package)
    }

    pub async fn list_approved(&self) -> Result<Vec<DbPackage>, StorefrontError> {
        store_call!(self.actor, StoreMessage::ListPackages, "ListPackages", true)
    }

    pub async fn list_pending(&self) -> Result<Vec<DbPackage>, StorefrontError> {
        store_call!(self.actor, StoreMessage::ListPackages, "ListPackages", false)
    }

    pub async fn set_approved(&self, id: i64, approved: bool) -> Result<bool, StorefrontError> {
        store_call!(
            self.actor,
            StoreMessage::SetApproved,
            "SetApproved",
            id,
            approved
        )
    }

    pub async fn delete_package(&self, id: i64) -> Result<bool, StorefrontError> {
        store_call!(self.actor, StoreMessage::DeletePackage, "DeletePackage", id)
    }
}

struct StoreActorState {
    store: Box<dyn RecordStore>,
    last_id: i64,
}

impl StoreActorState {
    /// Millisecond timestamp, bumped past the last issued id when the clock has not advanced.
    fn next_id(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }
}

struct StoreActor;

pub struct StoreArguments {
    pub store: Box<dyn RecordStore>,
    pub seed_demo_accounts: bool,
}

#[ractor::async_trait]
impl Actor for StoreActor {
    type Msg = StoreMessage;
    type State = StoreActorState;
    type Arguments = StoreArguments;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let store = args.store;
        store
            .init()
            .await
            .map_err(|e| ActorProcessingErr::from(format!("record store init failed: {e}")))?;

        if args.seed_demo_accounts {
            seed_accounts(store.as_ref())
                .await
                .map_err(|e| ActorProcessingErr::from(format!("account seeding failed: {e}")))?;
        }

        let last_id = store
            .max_package_id()
            .await
            .map_err(|e| ActorProcessingErr::from(format!("reading max package id failed: {e}")))?
            .unwrap_or(0);

        info!(last_id, "StoreActor started");
        Ok(StoreActorState { store, last_id })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            StoreMessage::FindAccount(username, rp) => {
                let _ = rp.send(state.store.find_account(&username).await);
            }
            StoreMessage::InsertPackage(new_package, rp) => {
                let record = new_package.into_record(state.next_id());
                let res = state
                    .store
                    .insert_package(record.clone())
                    .await
                    .map(|()| record);
                if let Ok(pkg) = &res {
                    debug!(id = pkg.id, app = %pkg.app_name, "package inserted");
                }
                let _ = rp.send(res);
            }
            StoreMessage::ListPackages(approved, rp) => {
                let _ = rp.send(state.store.list_packages(approved).await);
            }
            StoreMessage::SetApproved(id, approved, rp) => {
                let _ = rp.send(state.store.set_approved(id, approved).await);
            }
            StoreMessage::DeletePackage(id, rp) => {
                let _ = rp.send(state.store.delete_package(id).await);
            }
        }
        Ok(())
    }
}

async fn seed_accounts(store: &dyn RecordStore) -> Result<(), StorefrontError> {
    if store.count_accounts().await? > 0 {
        return Ok(());
    }
    for (username, password, role) in DEMO_ACCOUNTS {
        store
            .insert_account(DbAccount {
                username: username.to_string(),
                password: password.to_string(),
                role: role.parse().unwrap_or(crate::db::models::Role::User),
            })
            .await?;
    }
    warn!(
        count = DEMO_ACCOUNTS.len(),
        "seeded demo accounts; passwords are stored and compared in plaintext"
    );
    Ok(())
}

/// Spawn the record store actor over `store` and return a handle.
pub async fn spawn(
    store: Box<dyn RecordStore>,
    seed_demo_accounts: bool,
) -> Result<StoreHandle, StorefrontError> {
    let (actor, _jh) = Actor::spawn(
        None,
        StoreActor,
        StoreArguments {
            store,
            seed_demo_accounts,
        },
    )
    .await
    .map_err(|e| StorefrontError::RactorError(format!("failed to spawn StoreActor: {e}")))?;
    Ok(StoreHandle { actor })
}
